mod settings;

use std::env;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{LogSettings, RelaySettings, ServerSettings, Settings};

/// Loads the configuration and merges it with default values.
///
/// Sources, lowest precedence first:
/// - `config/default.{toml,json,yaml,...}` (optional)
/// - `CHATSUB_`-prefixed environment variables, `__` between sections
///   (`CHATSUB_SERVER__PORT=9000`, `CHATSUB_RELAY__ECHO_TO_SENDER=false`)
/// - plain `HOST` and `PORT`
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("CHATSUB")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .set_override_option("server.host", env::var("HOST").ok())?
        .set_override_option("server.port", env::var("PORT").ok())?;

    let config = builder.build()?;

    // Try to deserialize what is available
    let partial: PartialSettings = config.try_deserialize()?;

    Ok(partial.merge(Settings::default()))
}
