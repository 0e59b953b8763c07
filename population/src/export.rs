//! JSON snapshots of populations, observations and rate reports.
//!
//! Floats are written with enough digits to be read back bit for bit, so a
//! snapshot restores every array value and metadata field exactly.
use crate::{
    detection::SurveyPopulationSnapshot,
    error::{ConfigurationError, PopulationResult},
    population::Population,
    rates::RateReport,
};
use serde::{Serialize, de::DeserializeOwned};
use std::{
    fs::File,
    io::{BufReader, BufWriter, Write},
    path::Path,
};
use tracing::{info, instrument};

pub trait Export: Serialize + DeserializeOwned {
    /// Checks a value read back from JSON.
    fn check(&self) -> PopulationResult<()> {
        Ok(())
    }

    fn to_json(&self) -> PopulationResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    fn from_json(json: &str) -> PopulationResult<Self> {
        let value: Self = serde_json::from_str(json)?;
        value.check()?;
        Ok(value)
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    fn write_json(&self, path: impl AsRef<Path>) -> PopulationResult<()> {
        let mut writer = BufWriter::new(File::create(path.as_ref())?);
        serde_json::to_writer(&mut writer, self)?;
        writer.flush()?;
        info!("Snapshot written");
        Ok(())
    }

    #[instrument(skip_all, fields(path = %path.as_ref().display()))]
    fn read_json(path: impl AsRef<Path>) -> PopulationResult<Self> {
        let reader = BufReader::new(File::open(path.as_ref())?);
        let value: Self = serde_json::from_reader(reader)?;
        value.check()?;
        info!("Snapshot read");
        Ok(value)
    }
}

fn check_population(population: &Population) -> PopulationResult<()> {
    population.config.validate()?;
    match population.generation() {
        Some(generation) if !generation.sources.is_consistent() => Err(
            ConfigurationError::invalid("sources", "per-source arrays differ in length").into(),
        ),
        _ => Ok(()),
    }
}

impl Export for Population {
    fn check(&self) -> PopulationResult<()> {
        check_population(self)
    }
}

impl Export for SurveyPopulationSnapshot {
    fn check(&self) -> PopulationResult<()> {
        check_population(&self.population)?;
        self.survey.validate()?;
        let n = self.population.sources()?.len();
        let observed = &self.observed;
        let lengths = [
            observed.offset.len(),
            observed.beam_gain.len(),
            observed.s_peak.len(),
            observed.w_arr.len(),
            observed.w_eff.len(),
            observed.t_dm.len(),
            observed.t_scat.len(),
            observed.snr.len(),
            observed.in_region.len(),
            observed.detected.len(),
        ];
        if lengths.iter().all(|&len| len == n) {
            Ok(())
        } else {
            Err(ConfigurationError::invalid(
                "observed",
                format!("observed arrays do not all match the {n} sources"),
            )
            .into())
        }
    }
}

impl Export for RateReport {}
