//! Detection rates of observed populations.
use crate::{
    detection::{self, SurveyPopulation},
    error::PopulationResult,
    population::Population,
    survey::Survey,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, instrument};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Rates {
    pub survey: String,
    pub population: String,
    pub total: usize,
    pub detected: usize,
    /// Inside the survey region but below the signal to noise limit.
    pub too_faint: usize,
    /// Outside the survey region or the field of view of the beam.
    pub out_of_region: usize,
    pub n_days: f64,
    pub coverage_fraction: f64,
    pub rate_per_day: f64,
    /// Rate scaled up from the survey region to the whole sky.
    pub rate_per_day_full_sky: f64,
    /// `None` when nothing was detected.
    pub days_per_detection: Option<f64>,
}

#[instrument(skip_all, fields(survey = %survey_population.survey().name))]
pub fn rates(survey_population: &SurveyPopulation) -> Rates {
    let population = survey_population.population();
    let survey = survey_population.survey();
    let observed = survey_population.observed();
    let max_offset = survey.beam.as_ref().map_or(f64::INFINITY, |beam| beam.max_offset());

    let total = observed.len();
    let detected = survey_population.n_detected();
    let out_of_region = observed
        .in_region
        .iter()
        .zip(observed.offset.iter())
        .filter(|&(&in_region, &offset)| !in_region || offset > max_offset)
        .count();
    let too_faint = total - detected - out_of_region;

    let n_days = population.n_days;
    let coverage_fraction = survey.coverage_fraction();
    let rate_per_day = detected as f64 / n_days;
    let rate_per_day_full_sky = if coverage_fraction > 0.0 {
        rate_per_day / coverage_fraction
    } else {
        0.0
    };
    let rates = Rates {
        survey: survey.name.clone(),
        population: population.name.clone(),
        total,
        detected,
        too_faint,
        out_of_region,
        n_days,
        coverage_fraction,
        rate_per_day,
        rate_per_day_full_sky,
        days_per_detection: (detected > 0).then(|| n_days / detected as f64),
    };
    info!(detected, total, rate_per_day, "Rates computed");
    rates
}

/// Rates keyed by survey name.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RateReport(BTreeMap<String, Rates>);

impl RateReport {
    /// Replaces any earlier entry for the same survey.
    pub fn insert(&mut self, rates: Rates) {
        self.0.insert(rates.survey.clone(), rates);
    }

    pub fn get(&self, survey: &str) -> Option<&Rates> {
        self.0.get(survey)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rates> {
        self.0.values()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Observes one population with every survey in turn.
pub fn rate_report(
    population: &Population,
    surveys: &[Survey],
    seed: Option<u64>,
) -> PopulationResult<RateReport> {
    let mut report = RateReport::default();
    for survey in surveys {
        let survey_population = detection::observe(population, survey, seed)?;
        report.insert(rates(&survey_population));
    }
    Ok(report)
}
