use crate::error::ConfigError;
use crate::settings::Config;
use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use settings::{
    DateSettings, LoggingConfig, OrchestratorSettings, SelectionPolicy, ServiceConfig,
    TableSettings,
};

/// Prefix for environment overrides, e.g. `FRONTIER__SERVICE__BASE_URL`.
const ENV_PREFIX: &str = "FRONTIER";

/// Loads the application configuration from the given TOML file.
///
/// This function is the primary entry point for this crate. It reads the configuration file,
/// layers environment overrides on top, deserializes the result into our strongly-typed
/// `Config` struct and checks it for internal consistency.
pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(config::Environment::with_prefix(ENV_PREFIX).separator("__"))
        .build()?;

    let config = builder.try_deserialize::<Config>()?;
    validate(&config)?;

    tracing::debug!(
        path = %path.display(),
        catalog = config.catalog.len(),
        "Configuration loaded."
    );
    Ok(config)
}

/// Parses a configuration from an in-memory TOML document. No environment overrides apply.
pub fn parse_config(toml: &str) -> Result<Config, ConfigError> {
    let config = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?
        .try_deserialize::<Config>()?;
    validate(&config)?;
    Ok(config)
}

/// Rejects configurations whose policies contradict each other.
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    let selection = &config.selection;
    if selection.min_instruments == 0 {
        return Err(ConfigError::ValidationError(
            "selection.min_instruments must be at least 1".to_string(),
        ));
    }
    if let Some(max) = selection.max_instruments {
        if max < selection.min_instruments {
            return Err(ConfigError::ValidationError(format!(
                "selection.max_instruments ({}) is below selection.min_instruments ({})",
                max, selection.min_instruments
            )));
        }
    }
    if config.service.base_url.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "service.base_url must not be empty".to_string(),
        ));
    }
    if config.service.call_timeout.is_zero() {
        return Err(ConfigError::ValidationError(
            "service.call_timeout must be positive".to_string(),
        ));
    }
    if config.table.rows.is_empty() {
        return Err(ConfigError::ValidationError(
            "table.rows must name at least one portfolio".to_string(),
        ));
    }
    let mut seen = std::collections::HashSet::new();
    for instrument in &config.catalog {
        if !seen.insert(instrument.identifier.as_str()) {
            return Err(ConfigError::ValidationError(format!(
                "catalog lists {} more than once",
                instrument.identifier
            )));
        }
    }
    Ok(())
}
