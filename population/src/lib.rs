//! Monte-Carlo population synthesis of fast radio bursts and simulated
//! detection by radio surveys.
//!
//! Data flows one way: a [PopulationConfig] is generated into a [Population],
//! which is observed by a [Survey] into a [SurveyPopulation], from which
//! [Rates] and histograms are derived.
pub mod cosmology;
pub mod detection;
pub mod distributions;
pub mod error;
pub mod export;
pub mod hist;
pub mod population;
pub mod rates;
pub mod sky;
pub mod survey;

pub use cosmology::{Cosmology, DistanceTable, NumberDensity, RedshiftSampler};
pub use detection::{
    ObserveOptions, Observed, SurveyPopulation, SurveyPopulationSnapshot, observe, observe_with,
};
pub use distributions::{Distribution, DistributionKind};
pub use error::{ConfigurationError, DomainError, PopulationError, PopulationResult, StateError};
pub use export::Export;
pub use hist::{BinType, Histogram, Normalisation, hist, hist_with_bins, log_n_log_s};
pub use population::{Population, PopulationConfig, Sources, generate};
pub use rates::{RateReport, Rates, rate_report, rates};
pub use sky::SkyRegion;
pub use survey::{Beam, BeamPattern, Survey, SurveyCatalog};
