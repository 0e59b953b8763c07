use frbsim_population::{Beam, PopulationConfig, PopulationResult, Survey, SurveyCatalog};
use serde::Deserialize;
use std::{collections::BTreeMap, fs::File, io::BufReader, path::Path};

/// Contents of the `--config` file. Every field is optional.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub(crate) struct SimulationConfig {
    pub(crate) population: PopulationConfig,
    /// Beams applied to catalog surveys by name, e.g. to give `perfect` one.
    pub(crate) beams: BTreeMap<String, Beam>,
    pub(crate) snr_limits: BTreeMap<String, f64>,
}

impl SimulationConfig {
    pub(crate) fn from_path(path: &Path) -> anyhow::Result<Self> {
        let config: Self = serde_json::from_reader(BufReader::new(File::open(path)?))?;
        config.population.validate()?;
        Ok(config)
    }

    /// Loads the named surveys from the catalog with any overrides applied.
    pub(crate) fn surveys(
        &self,
        catalog: &SurveyCatalog,
        names: &[String],
    ) -> PopulationResult<Vec<Survey>> {
        names
            .iter()
            .map(|name| {
                let mut survey = catalog.survey(name)?;
                if let Some(beam) = self.beams.get(name) {
                    survey = survey.with_beam(beam.clone())?;
                }
                if let Some(&snr_limit) = self.snr_limits.get(name) {
                    survey = survey.with_snr_limit(snr_limit)?;
                }
                Ok(survey)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frbsim_population::{BeamPattern, Distribution};

    const JSON_INPUT: &str = r#"
    {
        "population": {
            "z-max": 2.0,
            "luminosity": { "model": "constant", "value": 1e40 }
        },
        "beams": {
            "perfect": { "pattern": "perfect", "fwhm": 60.0 }
        },
        "snr-limits": { "htru": 12.0 }
    }
    "#;

    #[test]
    fn parse_config() {
        let config: SimulationConfig = serde_json::from_str(JSON_INPUT).unwrap();
        assert_eq!(config.population.z_max, 2.0);
        assert_eq!(
            config.population.luminosity,
            Distribution::Constant { value: 1e40 }
        );

        let catalog = SurveyCatalog::embedded().unwrap();
        let names = ["perfect".to_owned(), "htru".to_owned()];
        let surveys = config.surveys(&catalog, &names).unwrap();
        assert_eq!(
            surveys[0].beam.as_ref().map(|beam| beam.pattern),
            Some(BeamPattern::Perfect)
        );
        assert_eq!(surveys[1].snr_limit, 12.0);
    }

    #[test]
    fn empty_config_uses_defaults() {
        let config: SimulationConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config.population, PopulationConfig::default());
        assert!(config.beams.is_empty());
    }

    #[test]
    fn misspelled_override_is_rejected() {
        let result =
            serde_json::from_str::<SimulationConfig>(r#"{ "snr_limits": { "htru": 12.0 } }"#);
        assert!(result.is_err());
        let result = serde_json::from_str::<SimulationConfig>(
            r#"{ "beams": { "perfect": { "pattern": "perfect", "fwhm": 60.0, "sidelobes": 2 } } }"#,
        );
        assert!(result.is_err());
    }
}
