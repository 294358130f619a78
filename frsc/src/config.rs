//! Configuration management for the codec
use config::Config;
use config::ConfigError;
use config::Environment;
use config::File;
use serde::Deserialize;
use std::path::Path;

use crate::encoding::StringEncoding;

/// Settings applied when decoding containers.
#[derive(Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Settings {
    /// The encoding of every string in the container.
    #[serde(default)]
    pub encoding: StringEncoding,
    /// Reject containers whose blocks are not in the canonical shape the
    /// encoder writes: non-empty, ascending, non-overlapping and back to
    /// back in the pointer table.
    #[serde(default)]
    pub strict: bool,
}

impl Settings {
    /// Initializing the global config first with default values, then with
    /// the optional config file and finally with provided/overwritten
    /// environment variables.
    ///
    /// The environment variables are prefixed with `FRSC_`, for example
    /// `FRSC_ENCODING=utf16le` or `FRSC_STRICT=true`.
    pub fn new(config_path: Option<impl AsRef<Path>>) -> Result<Self, ConfigError> {
        let env = Environment::with_prefix("FRSC")
            .prefix_separator("_")
            .try_parsing(true);

        let mut cfg_builder = Config::builder();
        cfg_builder = cfg_builder.set_default("encoding", "utf8")?;
        cfg_builder = cfg_builder.set_default("strict", false)?;

        if let Some(path) = config_path {
            cfg_builder = cfg_builder.add_source(File::from(path.as_ref()));
        }
        cfg_builder = cfg_builder.add_source(env);

        let cfg = cfg_builder.build()?;

        let settings: Settings = cfg.try_deserialize()?;

        Ok(settings)
    }
}
