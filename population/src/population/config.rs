use super::dispersion::{DmComponents, GalacticDispersion, IgmDispersion};
use crate::{
    cosmology::{Cosmology, NumberDensity, check_range},
    distributions::Distribution,
    error::{ConfigurationError, PopulationResult},
    sky::SkyRegion,
};
use frbsim_common::{Megahertz, Redshift};
use serde::{Deserialize, Serialize};

/// Rest-frame band over which the bolometric luminosity is emitted.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct EmissionRange {
    pub low: Megahertz,
    pub high: Megahertz,
}

impl Default for EmissionRange {
    fn default() -> Self {
        Self {
            low: 100.0,
            high: 10_000.0,
        }
    }
}

impl EmissionRange {
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if self.low.is_finite() && self.high.is_finite() && 0.0 < self.low && self.low < self.high
        {
            Ok(())
        } else {
            Err(ConfigurationError::invalid(
                "emission_range",
                format!("[{}, {}] MHz is not a positive band", self.low, self.high),
            ))
        }
    }
}

/// Every parameter a population is drawn from. Setters validate immediately
/// and never draw anything, generation reads whatever is stored at call time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct PopulationConfig {
    pub cosmology: Cosmology,
    pub number_density: NumberDensity,
    pub z_min: Redshift,
    pub z_max: Redshift,
    pub emission_range: EmissionRange,
    /// Bolometric luminosity, erg/s.
    pub luminosity: Distribution,
    pub spectral_index: Distribution,
    /// Intrinsic pulse width, ms.
    pub width: Distribution,
    pub dm_igm: IgmDispersion,
    /// Rest-frame host contribution, pc cm^-3.
    pub dm_host: Distribution,
    /// Rest-frame contribution of intervening matter, pc cm^-3.
    pub dm_intervening: Distribution,
    pub dm_mw: GalacticDispersion,
    pub dm_components: DmComponents,
    pub direction: SkyRegion,
}

impl Default for PopulationConfig {
    fn default() -> Self {
        Self::complex()
    }
}

impl PopulationConfig {
    /// Standard candles in a nearby, Euclidean universe with no dispersion.
    pub fn simple() -> Self {
        Self {
            cosmology: Cosmology::default(),
            number_density: NumberDensity::default(),
            z_min: 0.0,
            z_max: 0.01,
            emission_range: EmissionRange::default(),
            luminosity: Distribution::Constant { value: 1e38 },
            spectral_index: Distribution::Constant { value: 0.0 },
            width: Distribution::Constant { value: 10.0 },
            dm_igm: IgmDispersion::default(),
            dm_host: Distribution::Constant { value: 0.0 },
            dm_intervening: Distribution::Constant { value: 0.0 },
            dm_mw: GalacticDispersion::Zero,
            dm_components: DmComponents {
                igm: false,
                host: false,
                mw: false,
            },
            direction: SkyRegion::full_sky(),
        }
    }

    /// A cosmological population with spreads in every property.
    pub fn complex() -> Self {
        Self {
            cosmology: Cosmology::default(),
            number_density: NumberDensity::default(),
            z_min: 0.0,
            z_max: 1.0,
            emission_range: EmissionRange::default(),
            luminosity: Distribution::Powerlaw {
                low: 1e40,
                high: 1e45,
                power: 0.0,
            },
            spectral_index: Distribution::Gauss {
                mean: -1.4,
                std: 1.0,
            },
            width: Distribution::Lognormal {
                mean: 0.1,
                std: 1.0,
            },
            dm_igm: IgmDispersion::default(),
            dm_host: Distribution::Gauss {
                mean: 100.0,
                std: 200.0,
            },
            dm_intervening: Distribution::Constant { value: 0.0 },
            dm_mw: GalacticDispersion::default(),
            dm_components: DmComponents::default(),
            direction: SkyRegion::full_sky(),
        }
    }

    /// Checks every stored parameter, e.g. after deserialising a configuration file.
    pub fn validate(&self) -> PopulationResult<()> {
        self.cosmology.validate()?;
        self.number_density.validate()?;
        check_range(self.z_min, self.z_max)?;
        self.emission_range.validate()?;
        self.luminosity.validate_positive("luminosity")?;
        self.spectral_index.validate()?;
        self.width.validate_positive("width")?;
        self.dm_igm.validate()?;
        self.dm_host.validate()?;
        self.dm_intervening.validate()?;
        self.dm_mw.validate()?;
        self.direction.validate()?;
        Ok(())
    }

    pub fn with_cosmology(mut self, cosmology: Cosmology) -> PopulationResult<Self> {
        cosmology.validate()?;
        self.cosmology = cosmology;
        Ok(self)
    }

    /// Sets the redshift range and how the number density evolves across it.
    pub fn with_dist(
        mut self,
        number_density: NumberDensity,
        z_min: Redshift,
        z_max: Redshift,
    ) -> PopulationResult<Self> {
        number_density.validate()?;
        check_range(z_min, z_max)?;
        self.number_density = number_density;
        self.z_min = z_min;
        self.z_max = z_max;
        Ok(self)
    }

    pub fn with_z_max(self, z_max: Redshift) -> PopulationResult<Self> {
        let (number_density, z_min) = (self.number_density.clone(), self.z_min);
        self.with_dist(number_density, z_min, z_max)
    }

    pub fn with_emission_range(mut self, low: Megahertz, high: Megahertz) -> PopulationResult<Self> {
        let emission_range = EmissionRange { low, high };
        emission_range.validate()?;
        self.emission_range = emission_range;
        Ok(self)
    }

    pub fn with_lum(mut self, luminosity: Distribution) -> PopulationResult<Self> {
        luminosity.validate_positive("luminosity")?;
        self.luminosity = luminosity;
        Ok(self)
    }

    pub fn with_si(mut self, spectral_index: Distribution) -> PopulationResult<Self> {
        spectral_index.validate()?;
        self.spectral_index = spectral_index;
        Ok(self)
    }

    pub fn with_w(mut self, width: Distribution) -> PopulationResult<Self> {
        width.validate_positive("width")?;
        self.width = width;
        Ok(self)
    }

    pub fn with_dm_igm(mut self, dm_igm: IgmDispersion) -> PopulationResult<Self> {
        dm_igm.validate()?;
        self.dm_igm = dm_igm;
        Ok(self)
    }

    pub fn with_dm_host(mut self, dm_host: Distribution) -> PopulationResult<Self> {
        dm_host.validate()?;
        self.dm_host = dm_host;
        Ok(self)
    }

    pub fn with_dm_intervening(mut self, dm_intervening: Distribution) -> PopulationResult<Self> {
        dm_intervening.validate()?;
        self.dm_intervening = dm_intervening;
        Ok(self)
    }

    pub fn with_dm_mw(mut self, dm_mw: GalacticDispersion) -> PopulationResult<Self> {
        dm_mw.validate()?;
        self.dm_mw = dm_mw;
        Ok(self)
    }

    /// Switches dispersion measure components on or off.
    pub fn with_dm(mut self, igm: bool, host: bool, mw: bool) -> Self {
        self.dm_components = DmComponents { igm, host, mw };
        self
    }

    pub fn with_direction(mut self, direction: SkyRegion) -> PopulationResult<Self> {
        direction.validate()?;
        self.direction = direction;
        Ok(self)
    }
}
