//! Cosmological distances and volume-weighted redshift sampling.
//!
//! Distances are in Mpc and volumes in Gpc^3. Lambda-CDM with curvature
//! `1 - omega_m - omega_lambda` (no radiation term), following Hogg (1999).
use crate::error::{ConfigurationError, DomainError, PopulationResult};
use frbsim_common::{Megaparsec, Redshift, SPEED_OF_LIGHT_KM_S};
use itertools::Itertools;
use ndarray::Array1;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

const TABLE_POINTS: usize = 10_001;
const SAMPLER_POINTS: usize = 4_001;
const EXACT_INTERVALS: usize = 20_000;
const FLAT_TOLERANCE: f64 = 1e-10;
/// Redshift at which star formation is taken to begin, for the stellar mass density.
const FIRST_STAR_REDSHIFT: Redshift = 20.0;
const SMD_STEP: Redshift = 1e-3;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Cosmology {
    /// Hubble constant in km/s/Mpc.
    pub h0: f64,
    pub omega_m: f64,
    pub omega_lambda: f64,
}

impl Default for Cosmology {
    /// Planck 2015.
    fn default() -> Self {
        Self {
            h0: 67.74,
            omega_m: 0.3089,
            omega_lambda: 0.6911,
        }
    }
}

impl Cosmology {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !(self.h0.is_finite() && self.h0 > 0.0) {
            return Err(ConfigurationError::invalid(
                "h0",
                format!("Hubble constant {} must be positive", self.h0),
            ));
        }
        if !(self.omega_m.is_finite() && self.omega_m >= 0.0) {
            return Err(ConfigurationError::invalid(
                "omega_m",
                format!("matter density {} must be non-negative", self.omega_m),
            ));
        }
        if !(self.omega_lambda.is_finite() && self.omega_lambda >= 0.0) {
            return Err(ConfigurationError::invalid(
                "omega_lambda",
                format!("dark energy density {} must be non-negative", self.omega_lambda),
            ));
        }
        if self.omega_m + self.omega_lambda <= 0.0 {
            return Err(ConfigurationError::invalid(
                "omega_m",
                "an empty universe is not supported",
            ));
        }
        Ok(())
    }

    pub fn omega_k(&self) -> f64 {
        1.0 - self.omega_m - self.omega_lambda
    }

    pub fn hubble_distance(&self) -> Megaparsec {
        SPEED_OF_LIGHT_KM_S / self.h0
    }

    /// Dimensionless Hubble parameter `E(z)`.
    pub fn efunc(&self, z: Redshift) -> f64 {
        let a = 1.0 + z;
        (self.omega_m * a.powi(3) + self.omega_k() * a.powi(2) + self.omega_lambda).sqrt()
    }

    /// Line-of-sight comoving distance by composite Simpson integration, without any table.
    pub fn comoving_distance_exact(&self, z: Redshift) -> Megaparsec {
        if z <= 0.0 {
            return 0.0;
        }
        let h = z / EXACT_INTERVALS as f64;
        let sum: f64 = (0..=EXACT_INTERVALS)
            .map(|i| {
                let weight = match i {
                    0 | EXACT_INTERVALS => 1.0,
                    i if i % 2 == 1 => 4.0,
                    _ => 2.0,
                };
                weight / self.efunc(i as f64 * h)
            })
            .sum();
        self.hubble_distance() * sum * h / 3.0
    }

    pub fn luminosity_distance_exact(&self, z: Redshift) -> Megaparsec {
        (1.0 + z) * self.transverse_distance(self.comoving_distance_exact(z))
    }

    /// Converts a line-of-sight comoving distance into a transverse comoving distance.
    pub fn transverse_distance(&self, comoving: Megaparsec) -> Megaparsec {
        let omega_k = self.omega_k();
        let d_h = self.hubble_distance();
        if omega_k.abs() < FLAT_TOLERANCE {
            comoving
        } else if omega_k > 0.0 {
            let root = omega_k.sqrt();
            d_h / root * (root * comoving / d_h).sinh()
        } else {
            let root = (-omega_k).sqrt();
            d_h / root * (root * comoving / d_h).sin()
        }
    }

    /// All-sky comoving volume in Gpc^3 enclosed by a transverse comoving distance.
    pub fn comoving_volume(&self, transverse: Megaparsec) -> f64 {
        let omega_k = self.omega_k();
        let volume = if omega_k.abs() < FLAT_TOLERANCE {
            4.0 / 3.0 * PI * transverse.powi(3)
        } else {
            let d_h = self.hubble_distance();
            let ratio = transverse / d_h;
            let root = omega_k.abs().sqrt();
            let angular = if omega_k > 0.0 {
                (root * ratio).asinh()
            } else {
                (root * ratio).asin()
            };
            4.0 * PI * d_h.powi(3) / (2.0 * omega_k)
                * (ratio * (1.0 + omega_k * ratio * ratio).sqrt() - angular / root)
        };
        volume * 1e-9
    }
}

/// Comoving distances tabulated over `[0, z_max]`, linearly interpolated.
#[derive(Clone, Debug)]
pub struct DistanceTable {
    cosmology: Cosmology,
    z_max: Redshift,
    step: Redshift,
    comoving: Vec<Megaparsec>,
}

impl DistanceTable {
    pub fn new(cosmology: &Cosmology, z_max: Redshift) -> PopulationResult<Self> {
        cosmology.validate()?;
        if !z_max.is_finite() {
            return Err(DomainError::InvalidRange { z_min: 0.0, z_max }.into());
        }
        if z_max <= 0.0 {
            return Err(DomainError::NonPositiveUpperLimit(z_max).into());
        }
        let step = z_max / (TABLE_POINTS - 1) as f64;
        let d_h = cosmology.hubble_distance();
        let mut comoving = Vec::with_capacity(TABLE_POINTS);
        let mut previous = 1.0 / cosmology.efunc(0.0);
        let mut total = 0.0;
        comoving.push(total);
        for i in 1..TABLE_POINTS {
            let current = 1.0 / cosmology.efunc(i as f64 * step);
            total += 0.5 * (previous + current) * step;
            comoving.push(d_h * total);
            previous = current;
        }
        Ok(Self {
            cosmology: cosmology.clone(),
            z_max,
            step,
            comoving,
        })
    }

    pub fn cosmology(&self) -> &Cosmology {
        &self.cosmology
    }

    pub fn z_max(&self) -> Redshift {
        self.z_max
    }

    /// Beyond the table the distance is integrated directly.
    pub fn comoving_distance(&self, z: Redshift) -> Megaparsec {
        if z <= 0.0 {
            return 0.0;
        }
        if z > self.z_max {
            return self.cosmology.comoving_distance_exact(z);
        }
        let position = z / self.step;
        let index = (position.floor() as usize).min(TABLE_POINTS - 2);
        let fraction = position - index as f64;
        match (self.comoving.get(index), self.comoving.get(index + 1)) {
            (Some(lower), Some(upper)) => lower + fraction * (upper - lower),
            _ => self.cosmology.comoving_distance_exact(z),
        }
    }

    pub fn transverse_distance(&self, z: Redshift) -> Megaparsec {
        self.cosmology
            .transverse_distance(self.comoving_distance(z))
    }

    pub fn luminosity_distance(&self, z: Redshift) -> Megaparsec {
        (1.0 + z) * self.transverse_distance(z)
    }

    /// All-sky comoving volume out to `z`, in Gpc^3.
    pub fn comoving_volume(&self, z: Redshift) -> f64 {
        self.cosmology.comoving_volume(self.transverse_distance(z))
    }

    /// All-sky `dV/dz` in Gpc^3 per unit redshift.
    pub fn differential_comoving_volume(&self, z: Redshift) -> f64 {
        let transverse = self.transverse_distance(z);
        4.0 * PI * self.cosmology.hubble_distance() * transverse * transverse
            / self.cosmology.efunc(z)
            * 1e-9
    }
}

/// How the number density of sources evolves with redshift.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum NumberDensity {
    /// Weighted by comoving volume. `alpha` is the source-count slope of a
    /// perfectly detected population; -1.5 is a constant comoving density.
    VolCo { alpha: f64 },
    /// Follows the cosmic star formation history.
    Sfr,
    /// Follows the stellar mass density.
    Smd,
}

impl Default for NumberDensity {
    fn default() -> Self {
        Self::VolCo { alpha: -1.5 }
    }
}

impl NumberDensity {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        match *self {
            Self::VolCo { alpha } if !(alpha.is_finite() && alpha < 0.0) => {
                Err(ConfigurationError::invalid(
                    "alpha",
                    format!("source-count slope {alpha} must be negative"),
                ))
            }
            _ => Ok(()),
        }
    }
}

/// Madau & Dickinson (2014) star formation rate density, up to normalisation.
pub fn star_formation_rate(z: Redshift) -> f64 {
    let a = 1.0 + z;
    a.powf(2.7) / (1.0 + (a / 2.9).powf(5.6))
}

/// Stellar mass density at each of `grid`, up to normalisation: star formation
/// integrated over cosmic time from [FIRST_STAR_REDSHIFT].
fn stellar_mass_density(cosmology: &Cosmology, grid: &[Redshift]) -> Vec<f64> {
    let integrand = |z: Redshift| star_formation_rate(z) / ((1.0 + z) * cosmology.efunc(z));
    let steps = (FIRST_STAR_REDSHIFT / SMD_STEP).round() as usize;
    // cumulative[i] is the integral from i * SMD_STEP to FIRST_STAR_REDSHIFT
    let mut cumulative = vec![0.0; steps + 1];
    for i in (0..steps).rev() {
        let (lower, upper) = (i as f64 * SMD_STEP, (i + 1) as f64 * SMD_STEP);
        let slab = 0.5 * (integrand(lower) + integrand(upper)) * SMD_STEP;
        cumulative[i] = cumulative[i + 1] + slab;
    }
    grid.iter()
        .map(|&z| {
            let position = (z / SMD_STEP).clamp(0.0, steps as f64);
            let index = (position.floor() as usize).min(steps.saturating_sub(1));
            let fraction = position - index as f64;
            match (cumulative.get(index), cumulative.get(index + 1)) {
                (Some(lower), Some(upper)) => lower + fraction * (upper - lower),
                _ => 0.0,
            }
        })
        .collect()
}

/// Draws redshifts in `[z_min, z_max]` by inverting a tabulated cumulative distribution.
#[derive(Clone, Debug)]
pub struct RedshiftSampler {
    z_min: Redshift,
    z_max: Redshift,
    grid: Vec<Redshift>,
    cdf: Vec<f64>,
}

impl RedshiftSampler {
    pub fn new(
        table: &DistanceTable,
        model: &NumberDensity,
        z_min: Redshift,
        z_max: Redshift,
    ) -> PopulationResult<Self> {
        check_range(z_min, z_max)?;
        model.validate()?;
        if z_max > table.z_max() {
            return Err(DomainError::InvalidRange { z_min, z_max }.into());
        }
        let step = (z_max - z_min) / (SAMPLER_POINTS - 1) as f64;
        let grid: Vec<Redshift> = (0..SAMPLER_POINTS)
            .map(|i| (z_min + i as f64 * step).min(z_max))
            .collect();

        let cdf = match *model {
            NumberDensity::VolCo { alpha } => {
                let k = -2.0 * alpha / 3.0;
                let scaled: Vec<f64> = grid
                    .iter()
                    .map(|&z| table.comoving_volume(z).powf(k))
                    .collect();
                let base = scaled.first().copied().unwrap_or_default();
                scaled.iter().map(|v| v - base).collect()
            }
            NumberDensity::Sfr | NumberDensity::Smd => {
                let density = match model {
                    NumberDensity::Smd => stellar_mass_density(table.cosmology(), &grid),
                    _ => grid.iter().map(|&z| star_formation_rate(z)).collect(),
                };
                let weights: Vec<f64> = grid
                    .iter()
                    .zip(density)
                    .map(|(&z, rho)| rho * table.differential_comoving_volume(z) / (1.0 + z))
                    .collect();
                let mut total = 0.0;
                let mut cdf = Vec::with_capacity(weights.len());
                cdf.push(total);
                for (lower, upper) in weights.iter().tuple_windows() {
                    total += 0.5 * (lower + upper) * step;
                    cdf.push(total);
                }
                cdf
            }
        };
        let norm = cdf.last().copied().unwrap_or_default();
        let cdf = if norm > 0.0 && norm.is_finite() {
            cdf.into_iter().map(|c| c / norm).collect()
        } else {
            // Degenerate range, every draw lands on z_min
            vec![0.0; grid.len()]
        };
        Ok(Self {
            z_min,
            z_max,
            grid,
            cdf,
        })
    }

    pub fn z_min(&self) -> Redshift {
        self.z_min
    }

    pub fn z_max(&self) -> Redshift {
        self.z_max
    }

    /// `u` is uniform on `[0, 1)`.
    fn invert(&self, u: f64) -> Redshift {
        let upper = self
            .cdf
            .partition_point(|&c| c <= u)
            .clamp(1, self.cdf.len().saturating_sub(1).max(1));
        let lower = upper - 1;
        let z = match (
            self.cdf.get(lower),
            self.cdf.get(upper),
            self.grid.get(lower),
            self.grid.get(upper),
        ) {
            (Some(&c0), Some(&c1), Some(&z0), Some(&z1)) if c1 > c0 => {
                z0 + (u - c0) / (c1 - c0) * (z1 - z0)
            }
            (_, _, Some(&z0), _) => z0,
            _ => self.z_min,
        };
        z.clamp(self.z_min, self.z_max)
    }

    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Array1<Redshift> {
        if self.z_min == self.z_max {
            return Array1::from_elem(n, self.z_min);
        }
        Array1::from_shape_fn(n, |_| self.invert(rng.random()))
    }
}

pub(crate) fn check_range(z_min: Redshift, z_max: Redshift) -> Result<(), DomainError> {
    if !(z_min.is_finite() && z_max.is_finite()) || z_min < 0.0 || z_min > z_max {
        Err(DomainError::InvalidRange { z_min, z_max })
    } else if z_max <= 0.0 {
        Err(DomainError::NonPositiveUpperLimit(z_max))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn planck_luminosity_distance() {
        let table = DistanceTable::new(&Cosmology::default(), 2.0).unwrap();
        assert_approx_eq!(table.luminosity_distance(1.0), 6792.4, 1.0);
        assert_approx_eq!(table.comoving_distance(2.0), 5312.4, 1.0);
        assert_approx_eq!(table.comoving_volume(2.0), 628.0, 0.5);
    }

    #[test]
    fn table_matches_direct_integration() {
        let cosmologies = [
            Cosmology::default(),
            Cosmology {
                h0: 70.0,
                omega_m: 0.3,
                omega_lambda: 0.5,
            },
            Cosmology {
                h0: 70.0,
                omega_m: 0.5,
                omega_lambda: 0.7,
            },
        ];
        for cosmology in cosmologies {
            let table = DistanceTable::new(&cosmology, 6.0).unwrap();
            for z in [1e-4, 0.003, 0.05, 0.5, 1.2345, 3.0, 5.999] {
                let exact = cosmology.luminosity_distance_exact(z);
                let relative = (table.luminosity_distance(z) - exact).abs() / exact;
                assert!(relative < 1e-3, "z = {z}: relative error {relative}");
            }
        }
    }

    #[test]
    fn luminosity_distance_is_monotonic() {
        let table = DistanceTable::new(&Cosmology::default(), 6.0).unwrap();
        let distances: Vec<f64> = (0..=6000)
            .map(|i| table.luminosity_distance(i as f64 * 1e-3))
            .collect();
        assert!(distances.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn beyond_table_falls_back_to_integration() {
        let cosmology = Cosmology::default();
        let table = DistanceTable::new(&cosmology, 1.0).unwrap();
        assert_approx_eq!(
            table.comoving_distance(2.0),
            cosmology.comoving_distance_exact(2.0),
            1e-9
        );
    }

    #[test]
    fn invalid_ranges() {
        let table = DistanceTable::new(&Cosmology::default(), 2.0).unwrap();
        let model = NumberDensity::default();
        for (z_min, z_max) in [(1.0, 0.5), (-0.1, 1.0)] {
            assert!(matches!(
                RedshiftSampler::new(&table, &model, z_min, z_max),
                Err(crate::error::PopulationError::Domain(
                    DomainError::InvalidRange { .. }
                ))
            ));
        }
        let zero = RedshiftSampler::new(&table, &model, 0.0, 0.0);
        assert!(matches!(
            zero,
            Err(crate::error::PopulationError::Domain(
                DomainError::NonPositiveUpperLimit(z)
            )) if z == 0.0
        ));
        assert!(
            zero.map_err(|e| e.to_string())
                .unwrap_err()
                .contains("z_max = 0 Must Be Positive")
        );
        assert!(matches!(
            DistanceTable::new(&Cosmology::default(), -1.0),
            Err(crate::error::PopulationError::Domain(
                DomainError::NonPositiveUpperLimit(_)
            ))
        ));
    }

    #[test]
    fn sampled_redshifts_within_range() {
        let table = DistanceTable::new(&Cosmology::default(), 6.0).unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for model in [
            NumberDensity::default(),
            NumberDensity::VolCo { alpha: -1.0 },
            NumberDensity::Sfr,
            NumberDensity::Smd,
        ] {
            let sampler = RedshiftSampler::new(&table, &model, 0.5, 6.0).unwrap();
            let z = sampler.sample_n(&mut rng, 5_000);
            assert!(z.iter().all(|&z| (0.5..=6.0).contains(&z)), "{model:?}");
        }
    }

    #[test]
    fn euclidean_volume_weighting() {
        // Nearby, volume grows as z^3 so the median is z_max / 2^(1/3)
        let table = DistanceTable::new(&Cosmology::default(), 0.01).unwrap();
        let sampler = RedshiftSampler::new(&table, &NumberDensity::default(), 0.0, 0.01).unwrap();
        let mut z = sampler
            .sample_n(&mut StdRng::seed_from_u64(12), 20_001)
            .to_vec();
        z.sort_by(f64::total_cmp);
        assert_approx_eq!(z[10_000], 0.01 * 0.5f64.cbrt(), 2e-4);
    }

    /// Median redshift of `density(z) dV/dz / (1 + z)` on `[0, 6]`, integrated
    /// directly on a fine grid. The default cosmology is flat, so dV/dz is
    /// proportional to `D_C^2 / E(z)`.
    fn integrated_median(density: impl Fn(Redshift) -> f64) -> Redshift {
        let cosmology = Cosmology::default();
        let (steps, h) = (6_000, 1e-3);
        let mut comoving = 0.0;
        let mut weights = vec![0.0];
        for i in 1..=steps {
            let z = i as f64 * h;
            comoving += 0.5 * (1.0 / cosmology.efunc(z - h) + 1.0 / cosmology.efunc(z)) * h;
            weights.push(density(z) * comoving * comoving / cosmology.efunc(z) / (1.0 + z));
        }
        let mut cdf = vec![0.0];
        for (lower, upper) in weights.iter().tuple_windows() {
            let last = cdf.last().copied().unwrap();
            cdf.push(last + 0.5 * (lower + upper) * h);
        }
        let half = cdf[steps] / 2.0;
        let i = cdf.iter().position(|&c| c >= half).unwrap() - 1;
        (i as f64 + (half - cdf[i]) / (cdf[i + 1] - cdf[i])) * h
    }

    fn sampled_median(model: &NumberDensity, seed: u64) -> Redshift {
        let table = DistanceTable::new(&Cosmology::default(), 6.0).unwrap();
        let sampler = RedshiftSampler::new(&table, model, 0.0, 6.0).unwrap();
        let mut z = sampler
            .sample_n(&mut StdRng::seed_from_u64(seed), 20_001)
            .to_vec();
        z.sort_by(f64::total_cmp);
        z[10_000]
    }

    #[test]
    fn star_formation_weighting() {
        let expected = integrated_median(star_formation_rate);
        assert_approx_eq!(expected, 2.054, 0.01);
        assert_approx_eq!(sampled_median(&NumberDensity::Sfr, 14), expected, 0.05);
    }

    #[test]
    fn stellar_mass_weighting() {
        let cosmology = Cosmology::default();
        let rate = |z: Redshift| star_formation_rate(z) / ((1.0 + z) * cosmology.efunc(z));
        // Mass formed between z and the first stars, tabulated every 0.01
        let formed_after: Vec<f64> = (0..=600)
            .map(|i| {
                let z = i as f64 * 0.01;
                let h = (FIRST_STAR_REDSHIFT - z) / 4_000.0;
                (0..4_000)
                    .map(|j| {
                        let lower = z + j as f64 * h;
                        0.5 * (rate(lower) + rate(lower + h)) * h
                    })
                    .sum::<f64>()
            })
            .collect();
        let mass = |z: Redshift| {
            let position = z / 0.01;
            let i = (position.floor() as usize).min(599);
            formed_after[i] + (position - i as f64) * (formed_after[i + 1] - formed_after[i])
        };
        let expected = integrated_median(mass);
        assert_approx_eq!(expected, 1.175, 0.01);
        assert_approx_eq!(sampled_median(&NumberDensity::Smd, 15), expected, 0.05);
    }

    #[test]
    fn degenerate_range_is_constant() {
        let table = DistanceTable::new(&Cosmology::default(), 1.0).unwrap();
        let sampler = RedshiftSampler::new(&table, &NumberDensity::Sfr, 1.0, 1.0).unwrap();
        let z = sampler.sample_n(&mut StdRng::seed_from_u64(13), 10);
        assert!(z.iter().all(|&z| z == 1.0));
    }

    #[test]
    fn star_formation_peaks_near_two() {
        let peak = (0..600)
            .map(|i| i as f64 * 0.01)
            .max_by(|a, b| star_formation_rate(*a).total_cmp(&star_formation_rate(*b)))
            .unwrap();
        assert!((1.5..2.2).contains(&peak), "{peak}");
    }
}
