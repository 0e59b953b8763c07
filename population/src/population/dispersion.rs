use crate::error::ConfigurationError;
use frbsim_common::{Degrees, DispersionMeasure, Redshift};
use ndarray::{Array1, Zip};
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};

/// Intergalactic (cosmological) contribution, linear in redshift after Ioka (2003) and Inoue (2004).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct IgmDispersion {
    /// pc cm^-3 per unit redshift.
    pub slope: f64,
    /// Gaussian scatter about the linear relation, in pc cm^-3.
    pub std: Option<f64>,
}

impl Default for IgmDispersion {
    fn default() -> Self {
        Self {
            slope: 1000.0,
            std: None,
        }
    }
}

impl IgmDispersion {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.slope.is_finite() && self.slope >= 0.0) {
            return Err(ConfigurationError::invalid(
                "dm_igm.slope",
                format!("{} must be non-negative", self.slope),
            ));
        }
        match self.std {
            Some(std) if !(std.is_finite() && std >= 0.0) => Err(ConfigurationError::invalid(
                "dm_igm.std",
                format!("standard deviation {std} is negative"),
            )),
            _ => Ok(()),
        }
    }

    pub fn sample_n<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        z: &Array1<Redshift>,
    ) -> Array1<DispersionMeasure> {
        match self.std {
            Some(std) if std > 0.0 => z.mapv(|z| {
                (self.slope * z + std * rng.sample::<f64, _>(StandardNormal)).max(0.0)
            }),
            _ => z.mapv(|z| self.slope * z),
        }
    }
}

/// Contribution of the Milky Way along the line of sight.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum GalacticDispersion {
    Zero,
    Constant {
        value: DispersionMeasure,
    },
    /// A plane-parallel disc: `scale / |sin b|`, capped at `max` near the plane.
    Cosecant {
        scale: DispersionMeasure,
        max: DispersionMeasure,
    },
}

impl Default for GalacticDispersion {
    fn default() -> Self {
        Self::Cosecant {
            scale: 30.0,
            max: 1000.0,
        }
    }
}

impl GalacticDispersion {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let ok = match *self {
            Self::Zero => true,
            Self::Constant { value } => value.is_finite() && value >= 0.0,
            Self::Cosecant { scale, max } => {
                scale.is_finite() && scale >= 0.0 && max.is_finite() && max >= scale
            }
        };
        if ok {
            Ok(())
        } else {
            Err(ConfigurationError::invalid(
                "dm_mw",
                format!("{self:?} must be non-negative with max >= scale"),
            ))
        }
    }

    pub fn evaluate(&self, gb: &Array1<Degrees>) -> Array1<DispersionMeasure> {
        match *self {
            Self::Zero => Array1::zeros(gb.len()),
            Self::Constant { value } => Array1::from_elem(gb.len(), value),
            Self::Cosecant { scale, max } => gb.mapv(|b| {
                let sin_b = b.to_radians().sin().abs();
                if sin_b * max > scale {
                    scale / sin_b
                } else {
                    max
                }
            }),
        }
    }
}

/// Which dispersion measure components are included in the total.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct DmComponents {
    pub igm: bool,
    pub host: bool,
    pub mw: bool,
}

impl Default for DmComponents {
    fn default() -> Self {
        Self {
            igm: true,
            host: true,
            mw: true,
        }
    }
}

/// Redshifts a rest-frame contribution into the observer frame, clipping at zero.
pub(crate) fn to_observer_frame(
    rest: &Array1<DispersionMeasure>,
    z: &Array1<Redshift>,
) -> Array1<DispersionMeasure> {
    Zip::from(rest)
        .and(z)
        .map_collect(|&dm, &z| (dm / (1.0 + z)).max(0.0))
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn igm_is_linear_without_scatter() {
        let z = array![0.0, 0.5, 2.0];
        let dm = IgmDispersion::default().sample_n(&mut StdRng::seed_from_u64(1), &z);
        assert_eq!(dm, array![0.0, 500.0, 2000.0]);
    }

    #[test]
    fn igm_scatter_never_negative() {
        let z = Array1::from_elem(1000, 0.01);
        let igm = IgmDispersion {
            slope: 1000.0,
            std: Some(100.0),
        };
        let dm = igm.sample_n(&mut StdRng::seed_from_u64(2), &z);
        assert!(dm.iter().all(|&dm| dm >= 0.0));
    }

    #[test]
    fn cosecant_law() {
        let mw = GalacticDispersion::default();
        let dm = mw.evaluate(&array![90.0, -30.0, 0.0]);
        assert_approx_eq!(dm[0], 30.0, 1e-9);
        assert_approx_eq!(dm[1], 60.0, 1e-9);
        assert_approx_eq!(dm[2], 1000.0, 1e-9);
    }

    #[test]
    fn host_frame_conversion() {
        let dm = to_observer_frame(&array![100.0, -50.0], &array![1.0, 0.5]);
        assert_eq!(dm, array![50.0, 0.0]);
    }

    #[test]
    fn invalid_galactic_models() {
        assert!(GalacticDispersion::Constant { value: -1.0 }.validate().is_err());
        let cosecant = GalacticDispersion::Cosecant {
            scale: 30.0,
            max: 10.0,
        };
        assert!(cosecant.validate().is_err());
    }
}
