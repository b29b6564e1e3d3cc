//! File-based configuration source.

use std::path::Path;

use tracing::debug;

use super::{ConfigSource, MemorySource, SETTINGS_SECTION};
use crate::error::ConfigError;

/// A source that loads flat sections from a TOML file.
///
/// The file is read and parsed once, at construction; lookups afterwards
/// touch no I/O. Top-level tables become sections and top-level scalars land
/// in the default [`SETTINGS_SECTION`]. Values must be scalars (strings,
/// numbers, booleans, datetimes); nested tables and arrays are rejected,
/// since sections are flat.
///
/// Files can be marked as required or optional. A required file that doesn't
/// exist causes an error; an optional one yields an empty source.
#[derive(Debug, Clone)]
pub struct FileSource {
    sections: MemorySource,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, required: bool) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let sections = match load_settings_file(path, required)? {
            Some(table) => sections_from_table(table)?,
            None => MemorySource::new(),
        };
        debug!(path = %path.display(), "loaded settings file");
        Ok(Self { sections })
    }
}

impl ConfigSource for FileSource {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.sections.get(section, key)
    }

    fn keys(&self, section: &str) -> Vec<String> {
        self.sections.keys(section)
    }
}

/// Loads and parses a TOML settings file.
///
/// Returns `Ok(None)` if the file doesn't exist and `required` is false.
fn load_settings_file(path: &Path, required: bool) -> Result<Option<toml::Table>, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(contents) => {
            let table = toml::from_str(&contents).map_err(|e| ConfigError::Parse {
                path: path.to_path_buf(),
                source: e,
            })?;
            Ok(Some(table))
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if required {
                Err(ConfigError::FileNotFound(path.to_path_buf()))
            } else {
                Ok(None)
            }
        }
        Err(e) => Err(ConfigError::Read {
            path: path.to_path_buf(),
            source: e,
        }),
    }
}

fn sections_from_table(table: toml::Table) -> Result<MemorySource, ConfigError> {
    let mut sections = MemorySource::new();

    for (name, value) in table {
        match value {
            toml::Value::Table(entries) => {
                for (key, value) in entries {
                    let value = scalar_to_string(&value).ok_or_else(|| {
                        ConfigError::NonScalarValue {
                            section: name.clone(),
                            key: key.clone(),
                        }
                    })?;
                    sections.insert(name.clone(), key, value);
                }
            }
            other => {
                let value =
                    scalar_to_string(&other).ok_or_else(|| ConfigError::NonScalarValue {
                        section: SETTINGS_SECTION.to_string(),
                        key: name.clone(),
                    })?;
                sections.insert(SETTINGS_SECTION, name, value);
            }
        }
    }

    Ok(sections)
}

fn scalar_to_string(value: &toml::Value) -> Option<String> {
    match value {
        toml::Value::String(s) => Some(s.clone()),
        toml::Value::Integer(i) => Some(i.to_string()),
        toml::Value::Float(f) => Some(f.to_string()),
        toml::Value::Boolean(b) => Some(b.to_string()),
        toml::Value::Datetime(dt) => Some(dt.to_string()),
        toml::Value::Array(_) | toml::Value::Table(_) => None,
    }
}
