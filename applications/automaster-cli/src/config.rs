/// Configuration loading
use anyhow::{Context, Result};
use automaster_engine::MasteringConfig;
use std::path::Path;

/// Prefix of environment overrides (`AUTOMASTER_TARGET_LUFS=-16`)
pub const ENV_PREFIX: &str = "AUTOMASTER";

/// Load a [`MasteringConfig`] from an optional TOML file and the environment
///
/// Missing keys keep their defaults. Environment variables override the file;
/// `AUTOMASTER_BAND_CROSSOVERS` takes a comma-separated list.
pub fn load_config(path: Option<&Path>) -> Result<MasteringConfig> {
    let mut settings = config::Config::builder();

    if let Some(path) = path {
        settings = settings.add_source(
            config::File::from(path)
                .format(config::FileFormat::Toml)
                .required(true),
        );
    }

    settings = settings.add_source(
        config::Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .list_separator(",")
            .with_list_parse_key("band_crossovers"),
    );

    let config: MasteringConfig = settings
        .build()
        .context("Failed to load configuration")?
        .try_deserialize()
        .context("Invalid configuration")?;

    tracing::debug!(?config, "Configuration loaded");
    Ok(config)
}
