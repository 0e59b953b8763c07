//! Sky geometry shared by source directions and survey coverage. Angles in degrees.
use crate::error::ConfigurationError;
use frbsim_common::Degrees;
use ndarray::{Array1, Zip};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// J2000 equatorial coordinates of the north galactic pole.
const NGP_RA: Degrees = 192.859_48;
const NGP_DEC: Degrees = 27.128_25;
/// Galactic longitude of the north celestial pole.
const NCP_L: Degrees = 122.931_92;

/// A right ascension / declination box.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SkyRegion {
    pub ra_min: Degrees,
    pub ra_max: Degrees,
    pub dec_min: Degrees,
    pub dec_max: Degrees,
}

impl Default for SkyRegion {
    fn default() -> Self {
        Self::full_sky()
    }
}

impl SkyRegion {
    pub fn full_sky() -> Self {
        Self {
            ra_min: 0.0,
            ra_max: 360.0,
            dec_min: -90.0,
            dec_max: 90.0,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let ra_ok = (0.0..=360.0).contains(&self.ra_min)
            && (0.0..=360.0).contains(&self.ra_max)
            && self.ra_min <= self.ra_max;
        if !ra_ok {
            return Err(ConfigurationError::invalid(
                "ra",
                format!("[{}, {}] is not within [0, 360]", self.ra_min, self.ra_max),
            ));
        }
        let dec_ok = (-90.0..=90.0).contains(&self.dec_min)
            && (-90.0..=90.0).contains(&self.dec_max)
            && self.dec_min <= self.dec_max;
        if !dec_ok {
            return Err(ConfigurationError::invalid(
                "dec",
                format!("[{}, {}] is not within [-90, 90]", self.dec_min, self.dec_max),
            ));
        }
        Ok(())
    }

    pub fn contains(&self, ra: Degrees, dec: Degrees) -> bool {
        (self.ra_min..=self.ra_max).contains(&ra) && (self.dec_min..=self.dec_max).contains(&dec)
    }

    /// Fraction of the celestial sphere inside the region.
    pub fn sky_fraction(&self) -> f64 {
        let ra_span = (self.ra_max - self.ra_min).to_radians();
        let sin_span = self.dec_max.to_radians().sin() - self.dec_min.to_radians().sin();
        ra_span * sin_span / (4.0 * PI)
    }

    /// Directions uniform on the sphere within the region, returned as `(ra, dec)`.
    pub fn sample_n<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        n: usize,
    ) -> (Array1<Degrees>, Array1<Degrees>) {
        let sin_min = self.dec_min.to_radians().sin();
        let sin_max = self.dec_max.to_radians().sin();
        let mut ra = Array1::zeros(n);
        let mut dec = Array1::zeros(n);
        for (ra_i, dec_i) in ra.iter_mut().zip(dec.iter_mut()) {
            *ra_i = self.ra_min + (self.ra_max - self.ra_min) * rng.random::<f64>();
            let sin_dec = sin_min + (sin_max - sin_min) * rng.random::<f64>();
            *dec_i = sin_dec.clamp(-1.0, 1.0).asin().to_degrees();
        }
        (ra, dec)
    }
}

/// Converts J2000 equatorial coordinates into galactic `(l, b)`, with `l` in `[0, 360)`.
pub fn to_galactic(ra: Degrees, dec: Degrees) -> (Degrees, Degrees) {
    let (ra, dec) = (ra.to_radians(), dec.to_radians());
    let (pole_ra, pole_dec) = (NGP_RA.to_radians(), NGP_DEC.to_radians());
    let delta_ra = ra - pole_ra;

    let sin_b = dec.sin() * pole_dec.sin() + dec.cos() * pole_dec.cos() * delta_ra.cos();
    let b = sin_b.clamp(-1.0, 1.0).asin();

    let y = dec.cos() * delta_ra.sin();
    let x = dec.sin() * pole_dec.cos() - dec.cos() * pole_dec.sin() * delta_ra.cos();
    let l = (NCP_L - y.atan2(x).to_degrees()).rem_euclid(360.0);
    (l, b.to_degrees())
}

pub fn to_galactic_n(
    ra: &Array1<Degrees>,
    dec: &Array1<Degrees>,
) -> (Array1<Degrees>, Array1<Degrees>) {
    let galactic = Zip::from(ra).and(dec).map_collect(|&ra, &dec| to_galactic(ra, dec));
    (galactic.mapv(|(l, _)| l), galactic.mapv(|(_, b)| b))
}

/// Great-circle separation between two directions.
pub fn angular_separation(ra1: Degrees, dec1: Degrees, ra2: Degrees, dec2: Degrees) -> Degrees {
    let (ra1, dec1, ra2, dec2) = (
        ra1.to_radians(),
        dec1.to_radians(),
        ra2.to_radians(),
        dec2.to_radians(),
    );
    // Haversine, well conditioned for the small offsets inside a beam
    let half_dec = 0.5 * (dec2 - dec1);
    let half_ra = 0.5 * (ra2 - ra1);
    let h = half_dec.sin().powi(2) + dec1.cos() * dec2.cos() * half_ra.sin().powi(2);
    (2.0 * h.sqrt().clamp(0.0, 1.0).asin()).to_degrees()
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn galactic_pole_and_centre() {
        let (_, b) = to_galactic(NGP_RA, NGP_DEC);
        assert_approx_eq!(b, 90.0, 1e-6);

        let (l, b) = to_galactic(266.404_99, -28.936_17);
        assert!(l < 0.01 || l > 359.99, "{l}");
        assert_approx_eq!(b, 0.0, 0.01);
    }

    #[test]
    fn full_sky_fraction() {
        assert_approx_eq!(SkyRegion::full_sky().sky_fraction(), 1.0, 1e-12);
        let northern = SkyRegion {
            dec_min: 0.0,
            ..SkyRegion::full_sky()
        };
        assert_approx_eq!(northern.sky_fraction(), 0.5, 1e-12);
    }

    #[test]
    fn sampled_directions_inside_region() {
        let region = SkyRegion {
            ra_min: 10.0,
            ra_max: 50.0,
            dec_min: -30.0,
            dec_max: 10.0,
        };
        let (ra, dec) = region.sample_n(&mut StdRng::seed_from_u64(21), 2_000);
        assert!(Zip::from(&ra).and(&dec).all(|&ra, &dec| region.contains(ra, dec)));
    }

    #[test]
    fn full_sky_directions_are_isotropic() {
        let (_, dec) = SkyRegion::full_sky().sample_n(&mut StdRng::seed_from_u64(22), 40_000);
        let north = dec.iter().filter(|&&d| d > 30.0).count() as f64 / 40_000.0;
        // Cap above 30 degrees covers (1 - sin 30) / 2 of the sphere
        assert_approx_eq!(north, 0.25, 0.01);
    }

    #[test]
    fn separations() {
        assert_approx_eq!(angular_separation(0.0, 0.0, 90.0, 0.0), 90.0, 1e-9);
        assert_approx_eq!(angular_separation(10.0, 89.0, 190.0, 89.0), 2.0, 1e-9);
        assert_approx_eq!(angular_separation(45.0, 20.0, 45.0, 20.0), 0.0, 1e-12);
    }

    #[test]
    fn invalid_regions() {
        let region = SkyRegion {
            dec_min: 20.0,
            dec_max: 10.0,
            ..SkyRegion::full_sky()
        };
        assert!(region.validate().is_err());
        let region = SkyRegion {
            ra_max: 400.0,
            ..SkyRegion::full_sky()
        };
        assert!(region.validate().is_err());
    }
}
