//! Configuration sources: flat, string-keyed sections of settings.

mod env;
mod file;

pub use env::EnvSource;
pub use file::FileSource;

/// Conventional section name for application settings.
pub const SETTINGS_SECTION: &str = "settings";

/// Conventional section name for named connection strings.
pub const CONNECTION_STRINGS_SECTION: &str = "connection_strings";

/// A pre-loaded store of flat key/value sections.
///
/// Sources are injected into [`Settings`](crate::Settings) explicitly, so
/// tests can substitute a [`MemorySource`]. Implementations must not perform
/// I/O per lookup; anything that needs to read a file or the process
/// environment does so eagerly or against already-resident state.
pub trait ConfigSource: Send + Sync + std::fmt::Debug {
    /// Returns the value stored under `key` in `section`, if any.
    fn get(&self, section: &str, key: &str) -> Option<String>;

    /// Returns every key in `section`, in the source's native order.
    fn keys(&self, section: &str) -> Vec<String>;
}

/// An insertion-ordered in-memory source.
///
/// The standard test double, and the way to feed settings assembled
/// programmatically. Keys enumerate in insertion order; re-inserting a key
/// replaces its value in place.
#[derive(Debug, Clone, Default)]
pub struct MemorySource {
    sections: Vec<(String, Vec<(String, String)>)>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`insert`](Self::insert).
    pub fn with(
        mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.insert(section, key, value);
        self
    }

    pub fn insert(
        &mut self,
        section: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) {
        let section = section.into();
        let key = key.into();
        let value = value.into();

        let index = match self.sections.iter().position(|(name, _)| *name == section) {
            Some(index) => index,
            None => {
                self.sections.push((section, Vec::new()));
                self.sections.len() - 1
            }
        };
        let entries = &mut self.sections[index].1;

        match entries.iter_mut().find(|(k, _)| *k == key) {
            Some((_, existing)) => *existing = value,
            None => entries.push((key, value)),
        }
    }

    fn section(&self, name: &str) -> Option<&[(String, String)]> {
        self.sections
            .iter()
            .find(|(section, _)| section == name)
            .map(|(_, entries)| entries.as_slice())
    }
}

impl ConfigSource for MemorySource {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        self.section(section)?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone())
    }

    fn keys(&self, section: &str) -> Vec<String> {
        self.section(section)
            .map(|entries| entries.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }
}
