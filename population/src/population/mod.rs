//! Synthetic source populations.
//!
//! A [Population] is created with a name, a target size, a time span and a
//! [PopulationConfig]. Nothing is drawn until [Population::generate] (or the
//! free function [generate]) is called, which returns a new value holding
//! every per-source array. Parameter sweeps build a fresh configuration per
//! variant and generate each independently.
pub mod config;
pub mod dispersion;
pub mod sources;

pub use config::{EmissionRange, PopulationConfig};
pub use dispersion::{DmComponents, GalacticDispersion, IgmDispersion};
pub use sources::Sources;

use crate::{
    cosmology::{DistanceTable, RedshiftSampler},
    error::{ConfigurationError, PopulationResult, StateError},
    sky,
};
use chrono::{DateTime, Utc};
use ndarray::Array1;
use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

/// Set once the arrays have been drawn.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Generation {
    pub seed: u64,
    pub generated_at: DateTime<Utc>,
    pub sources: Sources,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct Population {
    pub name: String,
    /// Requested number of sources.
    pub n_srcs: usize,
    /// Time span the population represents, in days.
    pub n_days: f64,
    pub config: PopulationConfig,
    generation: Option<Generation>,
}

impl Population {
    /// An ungenerated population.
    pub fn new(
        name: &str,
        n_srcs: usize,
        n_days: f64,
        config: PopulationConfig,
    ) -> PopulationResult<Self> {
        if !(n_days.is_finite() && n_days > 0.0) {
            return Err(ConfigurationError::invalid(
                "n_days",
                format!("time span {n_days} must be positive"),
            )
            .into());
        }
        config.validate()?;
        Ok(Self {
            name: name.to_owned(),
            n_srcs,
            n_days,
            config,
            generation: None,
        })
    }

    /// Draws every per-source array from the stored configuration, returning the generated
    /// population. Without a seed one is drawn and recorded in [Generation::seed].
    pub fn generate(&self, seed: Option<u64>) -> PopulationResult<Self> {
        let seed = seed.unwrap_or_else(|| rand::rng().random());
        let sources = generate_sources(&self.name, &self.config, self.n_srcs, seed)?;
        Ok(Self {
            name: self.name.clone(),
            n_srcs: self.n_srcs,
            n_days: self.n_days,
            config: self.config.clone(),
            generation: Some(Generation {
                seed,
                generated_at: Utc::now(),
                sources,
            }),
        })
    }

    pub fn is_generated(&self) -> bool {
        self.generation.is_some()
    }

    pub fn generation(&self) -> Option<&Generation> {
        self.generation.as_ref()
    }

    pub fn sources(&self) -> Result<&Sources, StateError> {
        self.generation
            .as_ref()
            .map(|generation| &generation.sources)
            .ok_or_else(|| StateError::EmptyPopulation(self.name.clone()))
    }

    pub fn seed(&self) -> Option<u64> {
        self.generation.as_ref().map(|generation| generation.seed)
    }
}

/// Generates a population of `n` sources in one call.
pub fn generate(
    config: &PopulationConfig,
    name: &str,
    n: usize,
    n_days: f64,
    seed: Option<u64>,
) -> PopulationResult<Population> {
    Population::new(name, n, n_days, config.clone())?.generate(seed)
}

/// Draws every array, in a fixed order, from a single generator seeded with `seed`.
#[instrument(skip_all, fields(name = name, n_srcs = n, seed = seed))]
fn generate_sources(
    name: &str,
    config: &PopulationConfig,
    n: usize,
    seed: u64,
) -> PopulationResult<Sources> {
    config.validate()?;
    let mut rng = StdRng::seed_from_u64(seed);

    let table = DistanceTable::new(&config.cosmology, config.z_max)?;
    let sampler =
        RedshiftSampler::new(&table, &config.number_density, config.z_min, config.z_max)?;
    let z = sampler.sample_n(&mut rng, n);
    let dist_co = z.mapv(|z| table.comoving_distance(z));
    let dist_lum = z.mapv(|z| table.luminosity_distance(z));
    debug!("Redshifts drawn");

    let lum_bol = config.luminosity.sample_positive_n(&mut rng, n);
    let si = config.spectral_index.sample_n(&mut rng, n);
    let w_int = config.width.sample_positive_n(&mut rng, n);

    let (ra, dec) = config.direction.sample_n(&mut rng, n);
    let (gl, gb) = sky::to_galactic_n(&ra, &dec);

    let components = &config.dm_components;
    let dm_igm = if components.igm {
        config.dm_igm.sample_n(&mut rng, &z)
    } else {
        Array1::zeros(n)
    };
    let dm_host = if components.host {
        dispersion::to_observer_frame(&config.dm_host.sample_n(&mut rng, n), &z)
    } else {
        Array1::zeros(n)
    };
    let dm_intervening =
        dispersion::to_observer_frame(&config.dm_intervening.sample_n(&mut rng, n), &z);
    let dm_mw = if components.mw {
        config.dm_mw.evaluate(&gb)
    } else {
        Array1::zeros(n)
    };
    let dm = &dm_igm + &dm_host + &dm_intervening + &dm_mw;

    let sources = Sources {
        z,
        dist_co,
        dist_lum,
        lum_bol,
        si,
        w_int,
        dm_igm,
        dm_host,
        dm_intervening,
        dm_mw,
        dm,
        ra,
        dec,
        gl,
        gb,
    };
    info!(n_srcs = sources.len(), "Population generated");
    Ok(sources)
}
