mod settings;

use config::{Config, ConfigError, Environment, File};

pub use settings::{
    AuthSettings, BrokerSettings, PartialAuthSettings, PartialBrokerSettings, PartialServerSettings,
    PartialSettings, ServerSettings, Settings,
};

/// Prefix for environment overrides, e.g. `LITEMSG_SERVER__PORT=9000`.
pub const ENV_PREFIX: &str = "LITEMSG";

/// Loads the configuration from `config/default` (if present) and the
/// environment, then merges it over the built-in defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    load_config_from("config/default")
}

/// Same as [`load_config`] with an explicit file path (extension optional).
pub fn load_config_from(path: &str) -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name(path).required(false))
        .add_source(
            Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(Settings::merge(partial))
}
