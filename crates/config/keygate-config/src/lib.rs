//! Configuration for keygate.
//!
//! Loads [`Settings`] from a TOML file and `KEYGATE`-prefixed environment
//! variables, then builds the matching [`Backend`]. Also sets up logging
//! for binaries that embed keygate.

mod backend;
mod error;
mod settings;

pub use backend::Backend;
pub use error::{ConfigError, ConfigResult};
pub use settings::{
    CONFIG_FILE_VAR, DEFAULT_CONFIG_FILE, ENV_PREFIX, LoggingSettings, Settings, StashSettings,
    TeamSettings,
};

use tracing_subscriber::EnvFilter;

/// Install a global `tracing` subscriber for the configured filter and
/// format. Does nothing if one is already installed.
pub fn init_tracing(logging: &LoggingSettings) {
    let filter =
        EnvFilter::try_new(logging.log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(true);

    let _ = if logging.format.eq_ignore_ascii_case("compact") {
        builder.compact().try_init()
    } else {
        builder.pretty().try_init()
    };
}
