//! Instrument configuration of a radio survey.
//!
//! A [Survey] is a plain value. Every setter consumes it and returns a new,
//! validated configuration, so detections already computed against the old
//! value are unaffected.
pub mod beam;
pub mod catalog;

pub use beam::{Beam, BeamPattern};
pub use catalog::{SurveyCatalog, SurveyRow};

use crate::{
    error::{ConfigurationError, PopulationResult, StateError},
    sky::{self, SkyRegion},
};
use frbsim_common::{
    ARCMIN_PER_DEGREE, Arcminutes, Degrees, Kelvin, Megahertz, Milliseconds,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Direction the beam is centred on.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Pointing {
    pub ra: Degrees,
    pub dec: Degrees,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Survey {
    pub name: String,
    pub sampling_time: Milliseconds,
    pub bandwidth: Megahertz,
    pub central_freq: Megahertz,
    pub channel_bw: Megahertz,
    pub t_sys: Kelvin,
    /// Telescope gain, K/Jy.
    pub gain: f64,
    pub n_pol: u32,
    /// Digitisation loss factor.
    pub beta: f64,
    pub snr_limit: f64,
    /// Catalogued beam width, used when a beam is set without one.
    pub fwhm: Option<Arcminutes>,
    pub beam: Option<Beam>,
    pub region: SkyRegion,
    pub pointing: Option<Pointing>,
}

impl Survey {
    /// Looks a survey up in the embedded default catalog.
    pub fn load(name: &str) -> PopulationResult<Self> {
        SurveyCatalog::embedded()?.survey(name)
    }

    pub fn validate(&self) -> Result<(), ConfigurationError> {
        let positive = [
            ("sampling_time", self.sampling_time),
            ("bandwidth", self.bandwidth),
            ("central_freq", self.central_freq),
            ("channel_bw", self.channel_bw),
            ("t_sys", self.t_sys),
            ("gain", self.gain),
            ("beta", self.beta),
        ];
        for (parameter, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigurationError::invalid(
                    parameter,
                    format!("{value} must be positive"),
                ));
            }
        }
        if self.channel_bw > self.bandwidth {
            return Err(ConfigurationError::invalid(
                "channel_bw",
                format!(
                    "channel width {} exceeds the bandwidth {}",
                    self.channel_bw, self.bandwidth
                ),
            ));
        }
        if self.bandwidth / 2.0 >= self.central_freq {
            return Err(ConfigurationError::invalid(
                "bandwidth",
                format!(
                    "band of {} MHz about {} MHz reaches zero frequency",
                    self.bandwidth, self.central_freq
                ),
            ));
        }
        if self.n_pol == 0 || self.n_pol > 2 {
            return Err(ConfigurationError::invalid(
                "n_pol",
                format!("{} polarisations, expected 1 or 2", self.n_pol),
            ));
        }
        if !(self.snr_limit.is_finite() && self.snr_limit >= 0.0) {
            return Err(ConfigurationError::invalid(
                "snr_limit",
                format!("{} must be non-negative", self.snr_limit),
            ));
        }
        if let Some(fwhm) = self.fwhm.filter(|fwhm| !(fwhm.is_finite() && *fwhm > 0.0)) {
            return Err(ConfigurationError::invalid(
                "fwhm",
                format!("beam width {fwhm} must be positive"),
            ));
        }
        if let Some(beam) = &self.beam {
            beam.validate()?;
        }
        if let Some(pointing) = &self.pointing {
            validate_pointing(pointing)?;
        }
        self.region.validate()
    }

    /// Lowest and highest observed frequency.
    pub fn band(&self) -> (Megahertz, Megahertz) {
        (
            self.central_freq - self.bandwidth / 2.0,
            self.central_freq + self.bandwidth / 2.0,
        )
    }

    pub fn beam(&self) -> Result<&Beam, StateError> {
        self.beam
            .as_ref()
            .ok_or_else(|| StateError::UnconfiguredSurvey(self.name.clone()))
    }

    /// Beam gain at an angular offset from the pointing centre.
    pub fn response(&self, offset: Arcminutes) -> Result<f64, StateError> {
        Ok(self.beam()?.response(offset))
    }

    /// Fraction of the sky the survey can observe.
    pub fn coverage_fraction(&self) -> f64 {
        self.region.sky_fraction()
    }

    pub fn in_region(&self, ra: Degrees, dec: Degrees) -> bool {
        self.region.contains(ra, dec)
    }

    /// Offset of a direction from the pointing centre, if the survey has one.
    pub fn pointing_offset(&self, ra: Degrees, dec: Degrees) -> Option<Arcminutes> {
        self.pointing.map(|pointing| {
            sky::angular_separation(pointing.ra, pointing.dec, ra, dec) * ARCMIN_PER_DEGREE
        })
    }

    /// Selects a beam pattern by name. Parameters not given (e.g. `fwhm`)
    /// fall back to the catalogued values.
    pub fn set_beam(self, pattern: &str, params: &BTreeMap<String, f64>) -> PopulationResult<Self> {
        let beam = Beam::from_params(pattern, params, self.fwhm)?;
        self.with_beam(beam)
    }

    pub fn with_beam(mut self, beam: Beam) -> PopulationResult<Self> {
        beam.validate()?;
        self.beam = Some(beam);
        Ok(self)
    }

    pub fn set_pointing(mut self, ra: Degrees, dec: Degrees) -> PopulationResult<Self> {
        let pointing = Pointing { ra, dec };
        validate_pointing(&pointing)?;
        self.pointing = Some(pointing);
        Ok(self)
    }

    pub fn with_region(mut self, region: SkyRegion) -> PopulationResult<Self> {
        region.validate()?;
        self.region = region;
        Ok(self)
    }

    pub fn with_snr_limit(self, snr_limit: f64) -> PopulationResult<Self> {
        self.modified(|survey| survey.snr_limit = snr_limit)
    }

    pub fn with_sampling_time(self, sampling_time: Milliseconds) -> PopulationResult<Self> {
        self.modified(|survey| survey.sampling_time = sampling_time)
    }

    pub fn with_t_sys(self, t_sys: Kelvin) -> PopulationResult<Self> {
        self.modified(|survey| survey.t_sys = t_sys)
    }

    pub fn with_gain(self, gain: f64) -> PopulationResult<Self> {
        self.modified(|survey| survey.gain = gain)
    }

    pub fn with_band(
        self,
        central_freq: Megahertz,
        bandwidth: Megahertz,
        channel_bw: Megahertz,
    ) -> PopulationResult<Self> {
        self.modified(|survey| {
            survey.central_freq = central_freq;
            survey.bandwidth = bandwidth;
            survey.channel_bw = channel_bw;
        })
    }

    fn modified(mut self, change: impl FnOnce(&mut Self)) -> PopulationResult<Self> {
        change(&mut self);
        self.validate()?;
        Ok(self)
    }
}

fn validate_pointing(pointing: &Pointing) -> Result<(), ConfigurationError> {
    if (0.0..=360.0).contains(&pointing.ra) && (-90.0..=90.0).contains(&pointing.dec) {
        Ok(())
    } else {
        Err(ConfigurationError::invalid(
            "pointing",
            format!("({}, {}) is not a valid direction", pointing.ra, pointing.dec),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PopulationError;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn perfect_survey_needs_a_beam() {
        let survey = Survey::load("perfect").unwrap();
        assert!(matches!(
            survey.response(0.0),
            Err(StateError::UnconfiguredSurvey(name)) if name == "perfect"
        ));
        let survey = survey.set_beam("perfect", &BTreeMap::new()).unwrap();
        assert_eq!(survey.response(0.0).unwrap(), 1.0);
        assert_eq!(survey.beam().unwrap().fwhm, 60.0);
    }

    #[test]
    fn setters_return_new_configuration() {
        let htru = Survey::load("htru").unwrap();
        let strict = htru.clone().with_snr_limit(20.0).unwrap();
        assert_eq!(htru.snr_limit, 9.0);
        assert_eq!(strict.snr_limit, 20.0);
        assert!(htru.clone().with_gain(-1.0).is_err());
        assert!(htru.clone().with_band(100.0, 300.0, 0.1).is_err());
    }

    #[test]
    fn unknown_beam_pattern() {
        let result = Survey::load("htru")
            .unwrap()
            .set_beam("tophat", &BTreeMap::new());
        assert!(matches!(
            result,
            Err(PopulationError::Configuration(ConfigurationError::UnknownModel(_)))
        ));
    }

    #[test]
    fn pointing_offsets() {
        let survey = Survey::load("htru").unwrap();
        assert_eq!(survey.pointing_offset(10.0, 10.0), None);
        let survey = survey.set_pointing(10.0, 0.0).unwrap();
        assert_approx_eq!(survey.pointing_offset(10.0, 1.0).unwrap(), 60.0, 1e-9);
        assert!(survey.clone().set_pointing(10.0, 95.0).is_err());
    }

    #[test]
    fn coverage() {
        let htru = Survey::load("htru").unwrap();
        assert!(htru.in_region(100.0, -45.0));
        assert!(!htru.in_region(100.0, 45.0));
        assert!(htru.coverage_fraction() > 0.5 && htru.coverage_fraction() < 1.0);
        assert_eq!(htru.band(), (1182.0, 1522.0));
    }
}
