use std::path::Path;

// Declare the modules that make up this crate.
pub mod error;
pub mod settings;

// Re-export the core types to provide a clean public API.
pub use error::ConfigError;
pub use settings::{EngineConfig, Exclusions, ExclusionsConfig, normalize};

/// Loads the engine configuration from a TOML file.
///
/// Values can be overridden with `LOTCOST__`-prefixed environment variables,
/// for example `LOTCOST__EXCLUSIONS__EXPORTERS="DISTRIBUTOR A,DISTRIBUTOR B"`.
/// A missing file is an error; use [`EngineConfig::default`] to run without one.
pub fn load_config(path: &Path) -> Result<EngineConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from(path))
        .add_source(environment_source())
        .build()?;

    let config = builder.try_deserialize::<EngineConfig>()?;
    // Fail fast on invalid exclusion lists instead of at the first analysis run.
    let exclusions = config.exclusions()?;
    tracing::debug!(
        path = %path.display(),
        excluded_charge_types = exclusions.charge_types().len(),
        excluded_exporters = exclusions.exporters().len(),
        "Loaded engine configuration."
    );

    Ok(config)
}

/// Parses configuration from an in-memory TOML document.
pub fn load_config_from_str(toml: &str) -> Result<EngineConfig, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::from_str(toml, config::FileFormat::Toml))
        .build()?;

    let config = builder.try_deserialize::<EngineConfig>()?;
    config.exclusions()?;
    Ok(config)
}

fn environment_source() -> config::Environment {
    config::Environment::with_prefix("LOTCOST")
        .prefix_separator("__")
        .separator("__")
        .list_separator(",")
        .with_list_parse_key("exclusions.charge_types")
        .with_list_parse_key("exclusions.exporters")
        .try_parsing(true)
}
