//! Beam response as a function of angular offset from the pointing centre.
use crate::error::ConfigurationError;
use frbsim_common::Arcminutes;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, f64::consts::PI, str::FromStr};
use strum::{Display, EnumString};

/// `x` at which `(2 J1(x) / x)^2` falls to one half.
const AIRY_HALF_POWER: f64 = 1.616_340;

/// First zeros of the Bessel function J1.
const J1_ZEROS: [f64; 4] = [3.831_706, 7.015_587, 10.173_468, 13.323_692];

/// Below this the power series for J1 is used, above it the asymptotic expansion.
const J1_SERIES_LIMIT: f64 = 12.0;

#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum BeamPattern {
    /// Gain 1 inside the field of view, 0 outside.
    #[default]
    Perfect,
    Gaussian,
    /// Diffraction pattern of a uniformly illuminated circular aperture.
    Airy,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Beam {
    pub pattern: BeamPattern,
    /// Full width at half maximum.
    pub fwhm: Arcminutes,
    /// Side lobes of an airy pattern inside the field of view.
    #[serde(default)]
    pub n_sidelobes: u32,
    /// Overrides the field of view radius derived from the pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_offset: Option<Arcminutes>,
}

impl Beam {
    pub fn new(pattern: BeamPattern, fwhm: Arcminutes) -> Result<Self, ConfigurationError> {
        let beam = Self {
            pattern,
            fwhm,
            n_sidelobes: 0,
            max_offset: None,
        };
        beam.validate()?;
        Ok(beam)
    }

    /// Builds a beam from a pattern name and its parameters (`fwhm`,
    /// `n_sidelobes`, `max_offset`). `default_fwhm` is used when `fwhm` is absent.
    pub fn from_params(
        pattern: &str,
        params: &BTreeMap<String, f64>,
        default_fwhm: Option<Arcminutes>,
    ) -> Result<Self, ConfigurationError> {
        let pattern = BeamPattern::from_str(pattern)
            .map_err(|_| ConfigurationError::UnknownModel(pattern.to_owned()))?;
        let fwhm = params.get("fwhm").copied().or(default_fwhm).ok_or_else(|| {
            ConfigurationError::MissingParameter {
                model: pattern.to_string(),
                parameter: "fwhm".to_owned(),
            }
        })?;
        let n_sidelobes = match params.get("n_sidelobes").copied() {
            None => 0,
            Some(n) if n >= 0.0 && n.fract() == 0.0 && n <= u32::MAX as f64 => n as u32,
            Some(n) => {
                return Err(ConfigurationError::invalid(
                    "n_sidelobes",
                    format!("{n} is not a non-negative integer"),
                ));
            }
        };
        let beam = Self {
            pattern,
            fwhm,
            n_sidelobes,
            max_offset: params.get("max_offset").copied(),
        };
        beam.validate()?;
        Ok(beam)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.fwhm.is_finite() && self.fwhm > 0.0) {
            return Err(ConfigurationError::invalid(
                "fwhm",
                format!("beam width {} must be positive", self.fwhm),
            ));
        }
        match self.max_offset {
            Some(offset) if !(offset.is_finite() && offset > 0.0) => Err(
                ConfigurationError::invalid("max_offset", format!("{offset} must be positive")),
            ),
            _ => Ok(()),
        }
    }

    /// Radius of the field of view.
    pub fn max_offset(&self) -> Arcminutes {
        if let Some(offset) = self.max_offset {
            return offset;
        }
        match self.pattern {
            BeamPattern::Perfect => self.fwhm / 2.0,
            BeamPattern::Gaussian => self.fwhm,
            BeamPattern::Airy => {
                airy_null(self.n_sidelobes as usize + 1) * self.fwhm / (2.0 * AIRY_HALF_POWER)
            }
        }
    }

    /// Gain in `[0, 1]` at `offset`, 1 on axis.
    pub fn response(&self, offset: Arcminutes) -> f64 {
        let offset = offset.abs();
        match self.pattern {
            BeamPattern::Perfect => {
                if offset <= self.max_offset() {
                    1.0
                } else {
                    0.0
                }
            }
            BeamPattern::Gaussian => {
                (-4.0 * 2f64.ln() * offset * offset / (self.fwhm * self.fwhm)).exp()
            }
            BeamPattern::Airy => {
                let x = 2.0 * AIRY_HALF_POWER * offset / self.fwhm;
                if x < 1e-8 {
                    1.0
                } else {
                    (2.0 * bessel_j1(x) / x).powi(2).clamp(0.0, 1.0)
                }
            }
        }
    }

    /// Offsets uniform over the field of view disc.
    pub fn sample_offsets<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<Arcminutes> {
        let radius = self.max_offset();
        (0..n).map(|_| radius * rng.random::<f64>().sqrt()).collect()
    }
}

/// The `k`-th positive zero of J1, `k >= 1`.
fn airy_null(k: usize) -> f64 {
    J1_ZEROS.get(k.saturating_sub(1)).copied().unwrap_or_else(|| {
        // McMahon's expansion
        let beta = (k as f64 + 0.25) * PI;
        beta - 3.0 / (8.0 * beta) + 3.0 / (128.0 * beta.powi(3))
    })
}

/// Bessel function of the first kind, order one.
pub(crate) fn bessel_j1(x: f64) -> f64 {
    let ax = x.abs();
    let value = if ax < J1_SERIES_LIMIT {
        let half = ax / 2.0;
        let minus_half_sq = -half * half;
        let mut term = half;
        let mut sum = term;
        for k in 1..60 {
            let k = k as f64;
            term *= minus_half_sq / (k * (k + 1.0));
            sum += term;
            if term.abs() < 1e-17 * sum.abs() {
                break;
            }
        }
        sum
    } else {
        let inv = 1.0 / ax;
        let p = 1.0 + 0.117_187_5 * inv * inv - 0.144_195_556_640_625 * inv.powi(4);
        let q = 0.375 * inv - 0.102_539_062_5 * inv.powi(3);
        let chi = ax - 0.75 * PI;
        (2.0 / (PI * ax)).sqrt() * (p * chi.cos() - q * chi.sin())
    };
    // Odd function
    if x < 0.0 { -value } else { value }
}
