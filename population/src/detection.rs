//! Observes a generated population with a survey.
//!
//! Random draws (beam offsets) are taken first, in order, from one seeded
//! generator. The per-source physics then runs as a parallel map with no
//! further randomness, so results do not depend on the thread count.
use crate::{
    error::{ConfigurationError, PopulationResult},
    population::{EmissionRange, Population, Sources},
    survey::Survey,
};
use frbsim_common::{
    Arcminutes, DISPERSION_SMEARING_MS, DispersionMeasure, HZ_PER_MHZ, JANSKY_SI, Jansky,
    METRES_PER_MEGAPARSEC, Megaparsec, Milliseconds, Redshift, SECONDS_PER_MS,
    WATTS_PER_ERG_PER_SECOND,
};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use rayon::iter::{IndexedParallelIterator, IntoParallelIterator, ParallelIterator};
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use tracing::{debug, info, instrument};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct ObserveOptions {
    pub seed: Option<u64>,
    /// Beam offset of each source, overriding both the pointing and random draws.
    pub offsets: Option<Vec<Arcminutes>>,
    /// Adds scatter broadening to the effective pulse width.
    pub scattering: bool,
}

/// Per-source arrays added by observing a population.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Observed {
    pub offset: Array1<Arcminutes>,
    pub beam_gain: Array1<f64>,
    /// Band-averaged peak flux density before beam attenuation.
    pub s_peak: Array1<Jansky>,
    pub w_arr: Array1<Milliseconds>,
    pub w_eff: Array1<Milliseconds>,
    pub t_dm: Array1<Milliseconds>,
    pub t_scat: Array1<Milliseconds>,
    pub snr: Array1<f64>,
    pub in_region: Array1<bool>,
    pub detected: Array1<bool>,
}

impl Observed {
    pub fn len(&self) -> usize {
        self.snr.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A population as seen by a survey. Borrows both for provenance and never
/// modifies either.
#[derive(Clone, Debug)]
pub struct SurveyPopulation<'a> {
    population: &'a Population,
    survey: &'a Survey,
    seed: u64,
    observed: Observed,
}

impl<'a> SurveyPopulation<'a> {
    pub fn population(&self) -> &'a Population {
        self.population
    }

    pub fn survey(&self) -> &'a Survey {
        self.survey
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn observed(&self) -> &Observed {
        &self.observed
    }

    pub fn n_detected(&self) -> usize {
        self.observed.detected.iter().filter(|&&d| d).count()
    }

    pub fn detected_indices(&self) -> Vec<usize> {
        self.observed
            .detected
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| d.then_some(i))
            .collect()
    }

    /// The entries of a per-source array belonging to detected sources.
    pub fn detected_values(&self, values: &Array1<f64>) -> Array1<f64> {
        values
            .iter()
            .zip(self.observed.detected.iter())
            .filter_map(|(&value, &detected)| detected.then_some(value))
            .collect()
    }

    pub fn detected_snr(&self) -> Array1<f64> {
        self.detected_values(&self.observed.snr)
    }

    pub fn snapshot(&self) -> SurveyPopulationSnapshot {
        SurveyPopulationSnapshot {
            population: self.population.clone(),
            survey: self.survey.clone(),
            seed: self.seed,
            observed: self.observed.clone(),
        }
    }
}

/// Owned copy of a [SurveyPopulation], for export.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct SurveyPopulationSnapshot {
    pub population: Population,
    pub survey: Survey,
    pub seed: u64,
    pub observed: Observed,
}

pub fn observe<'a>(
    population: &'a Population,
    survey: &'a Survey,
    seed: Option<u64>,
) -> PopulationResult<SurveyPopulation<'a>> {
    let options = ObserveOptions {
        seed,
        ..Default::default()
    };
    observe_with(population, survey, &options)
}

#[instrument(skip_all, fields(population = %population.name, survey = %survey.name))]
pub fn observe_with<'a>(
    population: &'a Population,
    survey: &'a Survey,
    options: &ObserveOptions,
) -> PopulationResult<SurveyPopulation<'a>> {
    let beam = survey.beam()?;
    let sources = population.sources()?;
    let n = sources.len();

    let seed = options.seed.unwrap_or_else(|| rand::rng().random());
    let offsets = match &options.offsets {
        Some(offsets) if offsets.len() != n => {
            return Err(ConfigurationError::invalid(
                "offsets",
                format!("{} offsets given for {n} sources", offsets.len()),
            )
            .into());
        }
        Some(offsets) => {
            if let Some(bad) = offsets
                .iter()
                .find(|offset| !(offset.is_finite() && **offset >= 0.0))
            {
                return Err(ConfigurationError::invalid(
                    "offsets",
                    format!("offset {bad} is not a finite non-negative angle"),
                )
                .into());
            }
            offsets.clone()
        }
        None => match survey.pointing {
            Some(_) => sources
                .ra
                .iter()
                .zip(sources.dec.iter())
                .map(|(&ra, &dec)| survey.pointing_offset(ra, dec).unwrap_or_default())
                .collect(),
            None => beam.sample_offsets(&mut StdRng::seed_from_u64(seed), n),
        },
    };
    debug!(seed, "Beam offsets assigned");

    let emission = &population.config.emission_range;
    let max_offset = beam.max_offset();
    let observations = offsets
        .into_par_iter()
        .enumerate()
        .map(|(i, offset)| {
            let source = SourceView::new(sources, i);
            let mut observation = observe_source(survey, emission, &source, options.scattering);
            observation.offset = offset;
            observation.beam_gain = beam.response(offset);
            observation.snr = (observation.beam_gain * observation.snr).min(f64::MAX);
            observation.in_region = survey.in_region(source.ra, source.dec);
            observation.detected = observation.snr >= survey.snr_limit
                && observation.in_region
                && offset <= max_offset;
            observation
        })
        .collect::<Vec<Observation>>();

    let observed = Observed {
        offset: observations.iter().map(|o| o.offset).collect(),
        beam_gain: observations.iter().map(|o| o.beam_gain).collect(),
        s_peak: observations.iter().map(|o| o.s_peak).collect(),
        w_arr: observations.iter().map(|o| o.w_arr).collect(),
        w_eff: observations.iter().map(|o| o.w_eff).collect(),
        t_dm: observations.iter().map(|o| o.t_dm).collect(),
        t_scat: observations.iter().map(|o| o.t_scat).collect(),
        snr: observations.iter().map(|o| o.snr).collect(),
        in_region: observations.iter().map(|o| o.in_region).collect(),
        detected: observations.iter().map(|o| o.detected).collect(),
    };
    let survey_population = SurveyPopulation {
        population,
        survey,
        seed,
        observed,
    };
    info!(
        total = n,
        detected = survey_population.n_detected(),
        "Population observed"
    );
    Ok(survey_population)
}

/// The per-source values the detection physics reads.
struct SourceView {
    z: Redshift,
    dist_lum: Megaparsec,
    lum_bol: f64,
    si: f64,
    w_int: Milliseconds,
    dm: DispersionMeasure,
    ra: f64,
    dec: f64,
}

impl SourceView {
    fn new(sources: &Sources, i: usize) -> Self {
        let at = |values: &Array1<f64>| values.get(i).copied().unwrap_or_default();
        Self {
            z: at(&sources.z),
            dist_lum: at(&sources.dist_lum),
            lum_bol: at(&sources.lum_bol),
            si: at(&sources.si),
            w_int: at(&sources.w_int),
            dm: at(&sources.dm),
            ra: at(&sources.ra),
            dec: at(&sources.dec),
        }
    }
}

#[derive(Default)]
struct Observation {
    offset: Arcminutes,
    beam_gain: f64,
    s_peak: Jansky,
    w_arr: Milliseconds,
    w_eff: Milliseconds,
    t_dm: Milliseconds,
    t_scat: Milliseconds,
    /// On-axis until the beam gain is applied.
    snr: f64,
    in_region: bool,
    detected: bool,
}

fn observe_source(
    survey: &Survey,
    emission: &EmissionRange,
    source: &SourceView,
    scattering: bool,
) -> Observation {
    let (low, high) = survey.band();
    let s_peak = flux_density(source, emission, low, high, survey.bandwidth).min(f64::MAX);

    let w_arr = source.w_int * (1.0 + source.z);
    let t_dm = dispersion_smearing(source.dm, survey.channel_bw, survey.central_freq);
    let t_scat = if scattering {
        scattering_time(source.dm, survey.central_freq)
    } else {
        0.0
    };
    let w_eff = (w_arr.powi(2) + t_dm.powi(2) + survey.sampling_time.powi(2) + t_scat.powi(2))
        .sqrt();

    let s_eff = s_peak * w_arr / w_eff;
    let radiometer = survey.gain
        * (survey.n_pol as f64 * survey.bandwidth * HZ_PER_MHZ * w_eff * SECONDS_PER_MS).sqrt()
        / (survey.beta * survey.t_sys);
    Observation {
        s_peak,
        w_arr,
        w_eff,
        t_dm,
        t_scat,
        snr: (s_eff * radiometer).min(f64::MAX),
        ..Default::default()
    }
}

/// Mean flux density over the observed band `[low, high]`, in Jy.
fn flux_density(
    source: &SourceView,
    emission: &EmissionRange,
    low: f64,
    high: f64,
    bandwidth: f64,
) -> Jansky {
    let p = source.si + 1.0;
    // Fraction of the bolometric luminosity emitted in the redshifted band
    let fraction = if p.abs() < 1e-9 {
        (high / low).ln() / (emission.high / emission.low).ln()
    } else {
        (1.0 + source.z).powf(p) * (high.powf(p) - low.powf(p))
            / (emission.high.powf(p) - emission.low.powf(p))
    };
    let distance = source.dist_lum * METRES_PER_MEGAPARSEC;
    let luminosity = source.lum_bol * WATTS_PER_ERG_PER_SECOND;
    luminosity * fraction / (4.0 * PI * distance * distance * bandwidth * HZ_PER_MHZ) / JANSKY_SI
}

/// Intra-channel dispersion smearing, ms.
fn dispersion_smearing(dm: DispersionMeasure, channel_bw: f64, central_freq: f64) -> Milliseconds {
    DISPERSION_SMEARING_MS * channel_bw * dm / central_freq.powi(3)
}

/// Scatter broadening of Bhat et al. (2004), ms.
fn scattering_time(dm: DispersionMeasure, central_freq: f64) -> Milliseconds {
    if dm <= 0.0 {
        return 0.0;
    }
    let log_dm = dm.log10();
    let log_freq = (central_freq / 1e3).log10();
    10f64.powf(-6.46 + 0.154 * log_dm + 1.07 * log_dm * log_dm - 3.86 * log_freq)
}
