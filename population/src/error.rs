use frbsim_common::Redshift;
use thiserror::Error;

pub type PopulationResult<T> = Result<T, PopulationError>;

/// Raised while parameters are being set, never deferred to generation.
#[derive(Debug, Error)]
pub enum ConfigurationError {
    #[error("Unknown Model: {0}")]
    UnknownModel(String),
    #[error("Missing Parameter {parameter} for Model {model}")]
    MissingParameter { model: String, parameter: String },
    #[error("Invalid Parameter {parameter}: {reason}")]
    InvalidParameter { parameter: String, reason: String },
    #[error("Survey Not Found: {0}")]
    SurveyNotFound(String),
}

impl ConfigurationError {
    pub(crate) fn invalid(parameter: &str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            parameter: parameter.to_owned(),
            reason: reason.into(),
        }
    }
}

/// Raised when an object is used before it is ready.
#[derive(Debug, Error)]
pub enum StateError {
    #[error("Population {0} has not been generated")]
    EmptyPopulation(String),
    #[error("Survey {0} has no beam configured")]
    UnconfiguredSurvey(String),
}

/// Raised before any partially invalid result is produced.
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("Invalid Redshift Range: z_min = {z_min}, z_max = {z_max}")]
    InvalidRange { z_min: Redshift, z_max: Redshift },
    #[error("Redshift Upper Limit z_max = {0} Must Be Positive")]
    NonPositiveUpperLimit(Redshift),
    #[error("Non-Positive Value {0} in Logarithmic Binning")]
    NonPositiveValue(f64),
    #[error("Non-Finite Value {0}")]
    NonFiniteValue(f64),
    #[error("No Values to Bin")]
    NoValues,
}

#[derive(Debug, Error)]
pub enum PopulationError {
    #[error("Configuration Error: {0}")]
    Configuration(#[from] ConfigurationError),
    #[error("State Error: {0}")]
    State(#[from] StateError),
    #[error("Domain Error: {0}")]
    Domain(#[from] DomainError),
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialisation Error: {0}")]
    Serialisation(#[from] serde_json::Error),
}
