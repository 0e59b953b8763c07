//! Samplers for the parametrised models every per-source property is drawn from.
//!
//! All sampling takes the random source as an argument, there is no
//! module-level random state.
use crate::error::ConfigurationError;
use ndarray::Array1;
use rand::Rng;
use rand_distr::StandardNormal;
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, str::FromStr};
use strum::{Display, EnumString};

/// Names accepted by [Distribution::from_params].
#[derive(Clone, Copy, Debug, Display, EnumString, PartialEq, Eq)]
#[strum(serialize_all = "lowercase")]
pub enum DistributionKind {
    Constant,
    Uniform,
    Powerlaw,
    Gauss,
    Lognormal,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", tag = "model")]
pub enum Distribution {
    Constant {
        value: f64,
    },
    Uniform {
        low: f64,
        high: f64,
    },
    /// Probability density proportional to `x^power` on `[low, high]`.
    Powerlaw {
        low: f64,
        high: f64,
        power: f64,
    },
    Gauss {
        mean: f64,
        std: f64,
    },
    /// `mean` and `std` are those of the distribution itself, not of its logarithm.
    Lognormal {
        mean: f64,
        std: f64,
    },
}

fn param(
    kind: DistributionKind,
    params: &BTreeMap<String, f64>,
    name: &str,
) -> Result<f64, ConfigurationError> {
    params
        .get(name)
        .copied()
        .ok_or_else(|| ConfigurationError::MissingParameter {
            model: kind.to_string(),
            parameter: name.to_owned(),
        })
}

impl Distribution {
    /// Builds and validates a distribution from a model name and its shape parameters.
    pub fn from_params(
        model: &str,
        params: &BTreeMap<String, f64>,
    ) -> Result<Self, ConfigurationError> {
        let kind = DistributionKind::from_str(model)
            .map_err(|_| ConfigurationError::UnknownModel(model.to_owned()))?;
        let distribution = match kind {
            DistributionKind::Constant => Self::Constant {
                value: param(kind, params, "value")?,
            },
            DistributionKind::Uniform => Self::Uniform {
                low: param(kind, params, "low")?,
                high: param(kind, params, "high")?,
            },
            DistributionKind::Powerlaw => Self::Powerlaw {
                low: param(kind, params, "low")?,
                high: param(kind, params, "high")?,
                power: param(kind, params, "power")?,
            },
            DistributionKind::Gauss => Self::Gauss {
                mean: param(kind, params, "mean")?,
                std: param(kind, params, "std")?,
            },
            DistributionKind::Lognormal => Self::Lognormal {
                mean: param(kind, params, "mean")?,
                std: param(kind, params, "std")?,
            },
        };
        distribution.validate()?;
        Ok(distribution)
    }

    pub fn kind(&self) -> DistributionKind {
        match self {
            Self::Constant { .. } => DistributionKind::Constant,
            Self::Uniform { .. } => DistributionKind::Uniform,
            Self::Powerlaw { .. } => DistributionKind::Powerlaw,
            Self::Gauss { .. } => DistributionKind::Gauss,
            Self::Lognormal { .. } => DistributionKind::Lognormal,
        }
    }

    fn parameters(&self) -> Vec<(&'static str, f64)> {
        match *self {
            Self::Constant { value } => vec![("value", value)],
            Self::Uniform { low, high } => vec![("low", low), ("high", high)],
            Self::Powerlaw { low, high, power } => {
                vec![("low", low), ("high", high), ("power", power)]
            }
            Self::Gauss { mean, std } | Self::Lognormal { mean, std } => {
                vec![("mean", mean), ("std", std)]
            }
        }
    }

    /// Checks the shape parameters are usable.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let non_finite = self.parameters().into_iter().find(|(_, v)| !v.is_finite());
        if let Some((name, value)) = non_finite {
            return Err(ConfigurationError::invalid(
                name,
                format!("{value} is not finite"),
            ));
        }
        match *self {
            Self::Constant { .. } => Ok(()),
            Self::Uniform { low, high } if low > high => Err(ConfigurationError::invalid(
                "low",
                format!("{low} is greater than high {high}"),
            )),
            Self::Uniform { .. } => Ok(()),
            Self::Powerlaw { low, high, .. } if low <= 0.0 => Err(ConfigurationError::invalid(
                "low",
                format!("power law bounds must be positive, got [{low}, {high}]"),
            )),
            Self::Powerlaw { low, high, .. } if low > high => Err(ConfigurationError::invalid(
                "low",
                format!("{low} is greater than high {high}"),
            )),
            Self::Powerlaw { .. } => Ok(()),
            Self::Gauss { std, .. } if std < 0.0 => Err(ConfigurationError::invalid(
                "std",
                format!("standard deviation {std} is negative"),
            )),
            Self::Gauss { .. } => Ok(()),
            Self::Lognormal { mean, .. } if mean <= 0.0 => Err(ConfigurationError::invalid(
                "mean",
                format!("log-normal mean {mean} must be positive"),
            )),
            Self::Lognormal { std, .. } if std < 0.0 => Err(ConfigurationError::invalid(
                "std",
                format!("standard deviation {std} is negative"),
            )),
            Self::Lognormal { .. } => Ok(()),
        }
    }

    /// As [Self::validate], and additionally requires every draw to be strictly positive
    /// (after folding Gaussian draws onto the positive axis).
    pub fn validate_positive(&self, parameter: &str) -> Result<(), ConfigurationError> {
        self.validate()?;
        let positive = match *self {
            Self::Constant { value } => value > 0.0,
            Self::Uniform { low, .. } => low > 0.0,
            Self::Gauss { mean, std } => mean != 0.0 || std > 0.0,
            Self::Powerlaw { .. } | Self::Lognormal { .. } => true,
        };
        if positive {
            Ok(())
        } else {
            Err(ConfigurationError::invalid(
                parameter,
                format!("{self:?} can produce non-positive values"),
            ))
        }
    }

    /// Draws `n` values, in order, from `rng`.
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Array1<f64> {
        match *self {
            Self::Constant { value } => Array1::from_elem(n, value),
            Self::Uniform { low, high } | Self::Powerlaw { low, high, .. } if low == high => {
                Array1::from_elem(n, low)
            }
            Self::Uniform { low, high } => {
                Array1::from_shape_fn(n, |_| low + (high - low) * rng.random::<f64>())
            }
            Self::Powerlaw { low, high, power } => {
                Array1::from_shape_fn(n, |_| powerlaw_inverse_cdf(low, high, power, rng.random()))
            }
            Self::Gauss { mean, std } => Array1::from_shape_fn(n, |_| {
                mean + std * rng.sample::<f64, _>(StandardNormal)
            }),
            Self::Lognormal { mean, std } => {
                let (mu, sigma) = lognormal_shape(mean, std);
                Array1::from_shape_fn(n, |_| {
                    (mu + sigma * rng.sample::<f64, _>(StandardNormal)).exp()
                })
            }
        }
    }

    /// As [Self::sample_n], folding every draw onto the strictly positive axis.
    pub fn sample_positive_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Array1<f64> {
        self.sample_n(rng, n)
            .mapv_into(|v| v.abs().max(f64::MIN_POSITIVE))
    }
}

/// Draws `n` values from the named model, failing on unknown names or malformed parameters.
pub fn sample<R: Rng + ?Sized>(
    model: &str,
    n: usize,
    params: &BTreeMap<String, f64>,
    rng: &mut R,
) -> Result<Array1<f64>, ConfigurationError> {
    Ok(Distribution::from_params(model, params)?.sample_n(rng, n))
}

/// `u` is uniform on `[0, 1)`.
fn powerlaw_inverse_cdf(low: f64, high: f64, power: f64, u: f64) -> f64 {
    let p1 = power + 1.0;
    if p1.abs() < 1e-12 {
        // Log-uniform
        low * (high / low).powf(u)
    } else {
        let (lo, hi) = (low.powf(p1), high.powf(p1));
        (lo + u * (hi - lo)).powf(p1.recip()).clamp(low, high)
    }
}

/// Converts the mean and standard deviation of a log-normal distribution
/// into the location and scale of the underlying normal.
fn lognormal_shape(mean: f64, std: f64) -> (f64, f64) {
    let variance_ratio = (std / mean).powi(2);
    let sigma = (1.0 + variance_ratio).ln().sqrt();
    let mu = mean.ln() - 0.5 * sigma * sigma;
    (mu, sigma)
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use rand::{SeedableRng, rngs::StdRng};

    fn params(values: &[(&str, f64)]) -> BTreeMap<String, f64> {
        values.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn constant_is_constant() {
        let mut rng = StdRng::seed_from_u64(1);
        let values = Distribution::Constant { value: 1e40 }.sample_n(&mut rng, 100);
        assert_eq!(values.len(), 100);
        assert!(values.iter().all(|&v| v == 1e40));
    }

    #[test]
    fn equal_bounds_degenerate_to_constant() {
        let mut rng = StdRng::seed_from_u64(1);
        let uniform = Distribution::Uniform { low: 3.0, high: 3.0 }.sample_n(&mut rng, 10);
        let powerlaw = Distribution::Powerlaw {
            low: 3.0,
            high: 3.0,
            power: -2.0,
        }
        .sample_n(&mut rng, 10);
        assert!(uniform.iter().chain(powerlaw.iter()).all(|&v| v == 3.0));
    }

    #[test]
    fn uniform_within_bounds() {
        let mut rng = StdRng::seed_from_u64(2);
        let values = Distribution::Uniform {
            low: -1.0,
            high: 4.0,
        }
        .sample_n(&mut rng, 10_000);
        assert!(values.iter().all(|&v| (-1.0..4.0).contains(&v)));
        assert_approx_eq!(values.mean().unwrap(), 1.5, 0.1);
    }

    #[test]
    fn powerlaw_within_bounds() {
        let mut rng = StdRng::seed_from_u64(3);
        for power in [-2.0, -1.0, 0.0, 1.5] {
            let values = Distribution::Powerlaw {
                low: 1e40,
                high: 1e43,
                power,
            }
            .sample_n(&mut rng, 5_000);
            assert!(values.iter().all(|&v| (1e40..=1e43).contains(&v)));
        }
    }

    #[test]
    fn powerlaw_minus_one_is_log_uniform() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut values = Distribution::Powerlaw {
            low: 1.0,
            high: 100.0,
            power: -1.0,
        }
        .sample_n(&mut rng, 20_001)
        .to_vec();
        values.sort_by(f64::total_cmp);
        assert_approx_eq!(values[10_000], 10.0, 0.5);
    }

    #[test]
    fn gauss_moments() {
        let mut rng = StdRng::seed_from_u64(5);
        let values = Distribution::Gauss {
            mean: -1.4,
            std: 1.0,
        }
        .sample_n(&mut rng, 50_000);
        assert_approx_eq!(values.mean().unwrap(), -1.4, 0.03);
        assert_approx_eq!(values.std(0.0), 1.0, 0.03);
    }

    #[test]
    fn lognormal_moments_are_of_the_distribution() {
        let mut rng = StdRng::seed_from_u64(6);
        let values = Distribution::Lognormal {
            mean: 10.0,
            std: 10.0,
        }
        .sample_n(&mut rng, 200_000);
        assert!(values.iter().all(|&v| v > 0.0));
        assert_approx_eq!(values.mean().unwrap(), 10.0, 0.3);
    }

    #[test]
    fn folded_draws_are_positive() {
        let mut rng = StdRng::seed_from_u64(7);
        let values = Distribution::Gauss {
            mean: 10.0,
            std: 10.0,
        }
        .sample_positive_n(&mut rng, 10_000);
        assert!(values.iter().all(|&v| v > 0.0));
    }

    #[test]
    fn seeded_sampling_is_reproducible() {
        let distribution = Distribution::Lognormal { mean: 0.1, std: 1.0 };
        let a = distribution.sample_n(&mut StdRng::seed_from_u64(42), 1000);
        let b = distribution.sample_n(&mut StdRng::seed_from_u64(42), 1000);
        assert_eq!(a, b);
    }

    #[test]
    fn from_params_by_name() {
        let distribution = Distribution::from_params(
            "powerlaw",
            &params(&[("low", 1e40), ("high", 1e43), ("power", -1.0)]),
        )
        .unwrap();
        assert_eq!(distribution.kind(), DistributionKind::Powerlaw);

        let mut rng = StdRng::seed_from_u64(8);
        let values = sample("gauss", 7, &params(&[("mean", 0.0), ("std", 1.0)]), &mut rng).unwrap();
        assert_eq!(values.len(), 7);
    }

    #[test]
    fn unknown_model_name() {
        let result = Distribution::from_params("cauchy", &BTreeMap::new());
        assert!(matches!(result, Err(ConfigurationError::UnknownModel(name)) if name == "cauchy"));
    }

    #[test]
    fn missing_parameter() {
        let result = Distribution::from_params("uniform", &params(&[("low", 1.0)]));
        assert!(matches!(
            result,
            Err(ConfigurationError::MissingParameter { parameter, .. }) if parameter == "high"
        ));
    }

    #[test]
    fn malformed_parameters() {
        assert!(Distribution::Gauss { mean: 1.0, std: -1.0 }.validate().is_err());
        assert!(Distribution::Lognormal { mean: -1.0, std: 1.0 }.validate().is_err());
        assert!(Distribution::Uniform { low: 2.0, high: 1.0 }.validate().is_err());
        assert!(Distribution::Powerlaw { low: 0.0, high: 1.0, power: 0.0 }.validate().is_err());
        assert!(Distribution::Constant { value: f64::NAN }.validate().is_err());
        assert!(Distribution::Constant { value: 0.0 }.validate_positive("w").is_err());
        assert!(Distribution::Uniform { low: 0.1, high: 10.0 }.validate_positive("w").is_ok());
    }

    #[test]
    fn deserialise_tagged() {
        let distribution: Distribution =
            serde_json::from_str(r#"{ "model": "lognormal", "mean": 0.1, "std": 0.5 }"#).unwrap();
        assert_eq!(distribution, Distribution::Lognormal { mean: 0.1, std: 0.5 });
    }
}
