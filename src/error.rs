use std::path::PathBuf;
use thiserror::Error;

use crate::convert::ConvertError;

/// Errors produced while looking up, converting, or binding settings.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    #[error("unable to locate a value for '{key}' in section '{section}'")]
    MissingValue { key: String, section: String },

    #[error(transparent)]
    Convert(#[from] ConvertError),

    #[error("could not obtain value for '{key}': {source}")]
    Lookup { key: String, source: ConvertError },

    #[error("failed to bind member '{member}': {source}")]
    BindMember {
        member: &'static str,
        source: Box<ConfigError>,
    },

    #[error("required settings file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("failed to read settings file '{path}': {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse settings file '{path}': {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("cannot use non-scalar value for '{section}.{key}'")]
    NonScalarValue { section: String, key: String },
}
