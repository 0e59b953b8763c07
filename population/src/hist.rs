//! Binned counts of per-source values, and the cumulative logN-logS form.
use crate::error::DomainError;
use itertools::Itertools;
use ndarray::{Array1, ArrayBase, Data, Ix1};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub const DEFAULT_BINS: usize = 25;

#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum BinType {
    #[default]
    Linear,
    /// Bins of equal width in `log10`.
    Log,
}

#[derive(Clone, Copy, Debug, Default, Display, EnumString, PartialEq, Eq, Serialize, Deserialize)]
#[strum(serialize_all = "lowercase")]
#[serde(rename_all = "kebab-case")]
pub enum Normalisation {
    #[default]
    None,
    /// Highest bin scaled to 1.
    Max,
    /// Bins sum to 1.
    Probability,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Histogram {
    pub bin_type: BinType,
    /// Ascending, one more than there are bins.
    pub edges: Array1<f64>,
    pub counts: Array1<f64>,
}

impl Histogram {
    pub fn n_bins(&self) -> usize {
        self.counts.len()
    }

    pub fn total(&self) -> f64 {
        self.counts.sum()
    }

    /// Bin centres, geometric for logarithmic bins.
    pub fn centres(&self) -> Array1<f64> {
        self.edges
            .iter()
            .tuple_windows()
            .map(|(lower, upper)| match self.bin_type {
                BinType::Linear => 0.5 * (lower + upper),
                BinType::Log => (lower * upper).sqrt(),
            })
            .collect()
    }

    pub fn normalised(mut self, normalisation: Normalisation) -> Self {
        let scale = match normalisation {
            Normalisation::None => return self,
            Normalisation::Max => self.counts.fold(0.0, |max: f64, &c| max.max(c)),
            Normalisation::Probability => self.total(),
        };
        if scale > 0.0 {
            self.counts.mapv_inplace(|c| c / scale);
        }
        self
    }

    /// Number of values at or above each lower bin edge.
    pub fn cumulative_from_top(&self) -> Array1<f64> {
        let mut cumulative = self.counts.clone();
        let mut running = 0.0;
        for count in cumulative.iter_mut().rev() {
            running += *count;
            *count = running;
        }
        cumulative
    }
}

pub fn hist<S>(values: &ArrayBase<S, Ix1>, bin_type: BinType) -> Result<Histogram, DomainError>
where
    S: Data<Elem = f64>,
{
    hist_with_bins(values, bin_type, DEFAULT_BINS)
}

/// Counts `values` in `n_bins` bins (at least one) spanning their range.
pub fn hist_with_bins<S>(
    values: &ArrayBase<S, Ix1>,
    bin_type: BinType,
    n_bins: usize,
) -> Result<Histogram, DomainError>
where
    S: Data<Elem = f64>,
{
    if values.is_empty() {
        return Err(DomainError::NoValues);
    }
    if let Some(&value) = values.iter().find(|v| !v.is_finite()) {
        return Err(DomainError::NonFiniteValue(value));
    }
    if bin_type == BinType::Log {
        if let Some(&value) = values.iter().find(|&&v| v <= 0.0) {
            return Err(DomainError::NonPositiveValue(value));
        }
    }
    let n_bins = n_bins.max(1);

    // Binning happens in log10 space for logarithmic bins
    let scaled = match bin_type {
        BinType::Linear => values.to_owned(),
        BinType::Log => values.mapv(f64::log10),
    };
    let (mut low, mut high) = scaled.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| {
        (lo.min(v), hi.max(v))
    });
    if low == high {
        // One unit, or one decade, centred on the single value
        low -= 0.5;
        high += 0.5;
    }

    let mut counts = Array1::<f64>::zeros(n_bins);
    let width = high - low;
    for &v in scaled.iter() {
        let index = (((v - low) / width * n_bins as f64).floor() as usize).min(n_bins - 1);
        if let Some(count) = counts.get_mut(index) {
            *count += 1.0;
        }
    }

    let edges = match bin_type {
        BinType::Linear => Array1::linspace(low, high, n_bins + 1),
        BinType::Log => Array1::logspace(10.0, low, high, n_bins + 1),
    };
    Ok(Histogram {
        bin_type,
        edges,
        counts,
    })
}

/// Cumulative counts above each lower edge of logarithmic bins, with edges
/// rescaled so the first sits at 1. Slopes can then be compared across surveys.
pub fn log_n_log_s<S>(values: &ArrayBase<S, Ix1>, n_bins: usize) -> Result<Histogram, DomainError>
where
    S: Data<Elem = f64>,
{
    let histogram = hist_with_bins(values, BinType::Log, n_bins)?;
    let first = histogram.edges.first().copied().unwrap_or(1.0);
    Ok(Histogram {
        bin_type: BinType::Log,
        counts: histogram.cumulative_from_top(),
        edges: histogram.edges.mapv(|edge| edge / first),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;
    use ndarray::array;

    #[test]
    fn logarithmic_scenario() {
        let histogram = hist(&array![1.0, 1.0, 10.0, 100.0], BinType::Log).unwrap();
        assert_eq!(histogram.n_bins(), DEFAULT_BINS);
        assert_eq!(histogram.edges.len(), DEFAULT_BINS + 1);
        assert_approx_eq!(histogram.edges[0], 1.0, 1e-12);
        assert_approx_eq!(histogram.edges[DEFAULT_BINS], 100.0, 1e-9);
        assert_eq!(histogram.counts[0], 2.0);
        assert_eq!(histogram.counts[12], 1.0);
        assert_eq!(histogram.counts[DEFAULT_BINS - 1], 1.0);
        assert_eq!(histogram.cumulative_from_top()[0], 4.0);
    }

    #[test]
    fn counts_sum_to_inputs() {
        let values = Array1::from_shape_fn(1_000, |i| ((i * 7919) % 1_000) as f64 + 0.5);
        for bin_type in [BinType::Linear, BinType::Log] {
            for n_bins in [1, 7, 25, 100] {
                let histogram = hist_with_bins(&values, bin_type, n_bins).unwrap();
                assert_eq!(histogram.total(), 1_000.0);
                assert_eq!(histogram.cumulative_from_top()[0], 1_000.0);
                assert!(histogram.edges.iter().tuple_windows().all(|(a, b)| a < b));
            }
        }
    }

    #[test]
    fn linear_bins() {
        let histogram = hist_with_bins(&array![0.0, 1.0, 2.0, 3.0, 4.0], BinType::Linear, 4).unwrap();
        assert_eq!(histogram.edges, array![0.0, 1.0, 2.0, 3.0, 4.0]);
        assert_eq!(histogram.counts, array![1.0, 1.0, 1.0, 2.0]);
        assert_eq!(histogram.centres(), array![0.5, 1.5, 2.5, 3.5]);
        assert_eq!(histogram.cumulative_from_top(), array![5.0, 4.0, 3.0, 2.0]);
    }

    #[test]
    fn degenerate_range() {
        let histogram = hist_with_bins(&array![3.0, 3.0], BinType::Linear, 2).unwrap();
        assert_eq!(histogram.edges, array![2.5, 3.0, 3.5]);
        assert_eq!(histogram.total(), 2.0);

        let histogram = hist_with_bins(&array![10.0], BinType::Log, 1).unwrap();
        assert_approx_eq!(histogram.edges[0], 10f64.powf(0.5), 1e-12);
        assert_approx_eq!(histogram.edges[1], 10f64.powf(1.5), 1e-9);
        assert_approx_eq!(histogram.centres()[0], 10.0, 1e-9);
    }

    #[test]
    fn normalisations() {
        let histogram = hist_with_bins(&array![0.0, 0.0, 0.0, 1.0], BinType::Linear, 2).unwrap();
        assert_eq!(
            histogram.clone().normalised(Normalisation::Max).counts,
            array![1.0, 1.0 / 3.0]
        );
        assert_eq!(
            histogram.clone().normalised(Normalisation::Probability).counts,
            array![0.75, 0.25]
        );
        assert_eq!(histogram.clone().normalised(Normalisation::None), histogram);
    }

    #[test]
    fn log_n_log_s_starts_at_one() {
        let result = log_n_log_s(&array![20.0, 50.0, 90.0, 160.0], 3).unwrap();
        assert_approx_eq!(result.edges[0], 1.0, 1e-12);
        assert_approx_eq!(result.edges[3], 8.0, 1e-9);
        assert_eq!(result.counts, array![4.0, 3.0, 2.0]);
    }

    #[test]
    fn invalid_inputs() {
        let empty = Array1::<f64>::zeros(0);
        assert!(matches!(hist(&empty, BinType::Linear), Err(DomainError::NoValues)));
        assert!(matches!(
            hist(&array![1.0, 0.0], BinType::Log),
            Err(DomainError::NonPositiveValue(v)) if v == 0.0
        ));
        assert!(matches!(
            hist(&array![1.0, -2.0], BinType::Log),
            Err(DomainError::NonPositiveValue(v)) if v == -2.0
        ));
        assert!(hist(&array![1.0, -2.0], BinType::Linear).is_ok());
        assert!(matches!(
            hist(&array![1.0, f64::NAN], BinType::Linear),
            Err(DomainError::NonFiniteValue(_))
        ));
    }
}
