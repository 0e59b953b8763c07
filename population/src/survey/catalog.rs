use super::{Beam, BeamPattern, Pointing, Survey};
use crate::{
    error::{ConfigurationError, PopulationError, PopulationResult},
    sky::SkyRegion,
};
use frbsim_common::{Arcminutes, Degrees, Kelvin, Megahertz, Milliseconds};
use serde::{Deserialize, Serialize};
use std::{fs::File, io::BufReader, path::Path};
use tracing::{debug, info, instrument};

const EMBEDDED_CATALOG: &str = include_str!("../../surveys.json");

fn full_ra_min() -> Degrees {
    0.0
}

fn full_ra_max() -> Degrees {
    360.0
}

fn full_dec_min() -> Degrees {
    -90.0
}

fn full_dec_max() -> Degrees {
    90.0
}

fn default_beta() -> f64 {
    1.0
}

fn default_n_pol() -> u32 {
    2
}

/// One row of a survey catalog file.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct SurveyRow {
    pub name: String,
    pub sampling_time: Milliseconds,
    pub bandwidth: Megahertz,
    pub central_freq: Megahertz,
    pub channel_bw: Megahertz,
    pub t_sys: Kelvin,
    pub gain: f64,
    #[serde(default = "default_n_pol")]
    pub n_pol: u32,
    #[serde(default = "default_beta")]
    pub beta: f64,
    pub snr_limit: f64,
    #[serde(default)]
    pub fwhm: Option<Arcminutes>,
    /// Surveys without a pattern must have one set before observing.
    #[serde(default)]
    pub beam_pattern: Option<BeamPattern>,
    #[serde(default)]
    pub n_sidelobes: Option<u32>,
    #[serde(default = "full_ra_min")]
    pub ra_min: Degrees,
    #[serde(default = "full_ra_max")]
    pub ra_max: Degrees,
    #[serde(default = "full_dec_min")]
    pub dec_min: Degrees,
    #[serde(default = "full_dec_max")]
    pub dec_max: Degrees,
    #[serde(default)]
    pub pointing_ra: Option<Degrees>,
    #[serde(default)]
    pub pointing_dec: Option<Degrees>,
}

impl TryFrom<SurveyRow> for Survey {
    type Error = ConfigurationError;

    fn try_from(row: SurveyRow) -> Result<Self, Self::Error> {
        let beam = match row.beam_pattern {
            Some(pattern) => {
                let fwhm = row.fwhm.ok_or_else(|| ConfigurationError::MissingParameter {
                    model: pattern.to_string(),
                    parameter: "fwhm".to_owned(),
                })?;
                Some(Beam {
                    n_sidelobes: row.n_sidelobes.unwrap_or_default(),
                    ..Beam::new(pattern, fwhm)?
                })
            }
            None => None,
        };
        let pointing = match (row.pointing_ra, row.pointing_dec) {
            (Some(ra), Some(dec)) => Some(Pointing { ra, dec }),
            (None, None) => None,
            _ => {
                return Err(ConfigurationError::invalid(
                    "pointing",
                    format!("survey {} gives only one pointing coordinate", row.name),
                ));
            }
        };
        let survey = Survey {
            name: row.name,
            sampling_time: row.sampling_time,
            bandwidth: row.bandwidth,
            central_freq: row.central_freq,
            channel_bw: row.channel_bw,
            t_sys: row.t_sys,
            gain: row.gain,
            n_pol: row.n_pol,
            beta: row.beta,
            snr_limit: row.snr_limit,
            fwhm: row.fwhm,
            beam,
            region: SkyRegion {
                ra_min: row.ra_min,
                ra_max: row.ra_max,
                dec_min: row.dec_min,
                dec_max: row.dec_max,
            },
            pointing,
        };
        survey.validate()?;
        Ok(survey)
    }
}

/// A table of survey parameters keyed by survey name.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SurveyCatalog {
    rows: Vec<SurveyRow>,
}

impl SurveyCatalog {
    /// The catalog shipped with the library.
    pub fn embedded() -> PopulationResult<Self> {
        Self::from_json_str(EMBEDDED_CATALOG)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    pub fn from_path(path: impl AsRef<Path>) -> PopulationResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let rows: Vec<SurveyRow> = serde_json::from_reader(reader)?;
        info!(surveys = rows.len(), "Survey catalog loaded");
        Ok(Self { rows })
    }

    pub fn from_json_str(json: &str) -> PopulationResult<Self> {
        let rows: Vec<SurveyRow> = serde_json::from_str(json)?;
        debug!(surveys = rows.len(), "Survey catalog parsed");
        Ok(Self { rows })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.rows.iter().map(|row| row.name.as_str())
    }

    pub fn row(&self, name: &str) -> Option<&SurveyRow> {
        self.rows.iter().find(|row| row.name == name)
    }

    /// Builds the named survey, validating its row.
    pub fn survey(&self, name: &str) -> PopulationResult<Survey> {
        let row = self
            .row(name)
            .cloned()
            .ok_or_else(|| ConfigurationError::SurveyNotFound(name.to_owned()))?;
        Survey::try_from(row).map_err(PopulationError::from)
    }
}
