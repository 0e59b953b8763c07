use tracing::{info, level_filters::LevelFilter, subscriber::SetGlobalDefaultError};
use tracing_subscriber::{EnvFilter, Layer, layer::SubscriberExt};

pub struct TracerOptions {
    pub default_level: LevelFilter,
    pub ansi: bool,
}

impl TracerOptions {
    pub fn new(default_level: LevelFilter) -> Self {
        Self {
            default_level,
            ansi: true,
        }
    }
}

/// This object initialises the stderr tracer, given a TracerOptions struct.
pub struct TracerEngine {
    service_name: String,
}

impl TracerEngine {
    /// Initialises the stderr tracer for the crate
    /// #Arguments
    /// * `options` - The caller-specified instance of TracerOptions.
    /// * `service_name` - The name of the binary the tracer is installed for.
    /// #Returns
    /// An instance of TracerEngine, or an error if a global subscriber already exists.
    pub fn new(options: TracerOptions, service_name: &str) -> Result<Self, SetGlobalDefaultError> {
        let stderr_tracer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(options.ansi);

        // This filter is applied to the stderr tracer
        let log_filter = EnvFilter::builder()
            .with_default_directive(options.default_level.into())
            .from_env_lossy();

        let subscriber =
            tracing_subscriber::Registry::default().with(stderr_tracer.with_filter(log_filter));

        tracing::subscriber::set_global_default(subscriber)?;
        info!(service = service_name, "Tracer initialised");

        Ok(Self {
            service_name: service_name.to_owned(),
        })
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_one_global_tracer() {
        let options = TracerOptions {
            ansi: false,
            ..TracerOptions::new(LevelFilter::DEBUG)
        };
        let engine = TracerEngine::new(options, "frbsim-test");
        assert_eq!(engine.as_ref().map(TracerEngine::service_name).ok(), Some("frbsim-test"));
        assert!(TracerEngine::new(TracerOptions::new(LevelFilter::INFO), "again").is_err());
    }
}
