use std::any::Any;
use std::fmt;

use tracing::trace;

use crate::bind::{Bindable, Pairs};
use crate::convert::{Converter, ConverterRegistry, Locale};
use crate::error::ConfigError;
use crate::source::{ConfigSource, CONNECTION_STRINGS_SECTION, SETTINGS_SECTION};

/// Typed access to one flat section of a configuration source.
///
/// A `Settings` instance borrows its [`ConfigSource`] and never mutates it;
/// every operation is a synchronous, in-memory read. Once built it can be
/// shared by reference across threads.
///
/// ## Example
///
/// ```
/// use flatconf::{MemorySource, Settings};
///
/// let source = MemorySource::new()
///     .with("settings", "host", "db.example.com")
///     .with("settings", "port", "5432");
///
/// let settings = Settings::builder().build(&source);
///
/// assert_eq!(settings.raw("host")?, Some("db.example.com".to_string()));
/// assert_eq!(settings.get::<u16>("port")?, Some(5432));
/// assert_eq!(settings.get_or("retries", 3u32)?, 3);
/// # Ok::<(), flatconf::ConfigError>(())
/// ```
pub struct Settings<'s> {
    source: &'s dyn ConfigSource,
    section: String,
    registry: ConverterRegistry,
    missing_is_error: bool,
}

impl<'s> Settings<'s> {
    /// Creates a builder with default options: the `settings` section, the
    /// default [`Locale`], no custom converters, missing keys not an error.
    pub fn builder() -> SettingsBuilder {
        SettingsBuilder::default()
    }

    /// The section this instance reads from.
    pub fn section(&self) -> &str {
        &self.section
    }

    /// Looks up the raw string value for `key`.
    ///
    /// An absent key yields `Ok(None)`, unless the instance was built with
    /// [`missing_is_error`](SettingsBuilder::missing_is_error), in which case
    /// it fails with [`ConfigError::MissingValue`].
    pub fn raw(&self, key: &str) -> Result<Option<String>, ConfigError> {
        trace!(section = %self.section, key, "raw lookup");
        let value = self.source.get(&self.section, key);

        if self.missing_is_error && value.is_none() {
            return Err(ConfigError::MissingValue {
                key: key.to_string(),
                section: self.section.clone(),
            });
        }

        Ok(value)
    }

    /// Looks up `key` and converts the value to `T`.
    ///
    /// An absent key converts to `Ok(None)` without consulting any
    /// converter. Conversion failures propagate as
    /// [`ConfigError::Convert`].
    pub fn get<T: Any>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.raw(key)? {
            Some(raw) => Ok(Some(self.registry.convert_to(&raw)?)),
            None => Ok(None),
        }
    }

    /// Looks up `key`, substituting `fallback` when the key is absent.
    ///
    /// The fallback is returned as supplied; no converter runs for it. A
    /// conversion failure for a present key is reported as
    /// [`ConfigError::Lookup`] naming the key, with the conversion error as
    /// its cause. The missing-key strictness still applies: an instance
    /// built with `missing_is_error` fails the lookup before the fallback is
    /// considered.
    pub fn get_or<T: Any>(&self, key: &str, fallback: T) -> Result<T, ConfigError> {
        match self.raw(key)? {
            Some(raw) => self
                .registry
                .convert_to(&raw)
                .map_err(|source| ConfigError::Lookup {
                    key: key.to_string(),
                    source,
                }),
            None => Ok(fallback),
        }
    }

    /// Binds a freshly constructed `T` from this section.
    ///
    /// See [`Bindable`] for how a type declares its members.
    pub fn bind<T: Bindable + Default>(&self) -> Result<T, ConfigError> {
        self.bind_into(T::default())
    }

    /// Binds into a caller-supplied instance, preserving members whose keys
    /// are absent from the source.
    pub fn bind_into<T: Bindable>(&self, instance: T) -> Result<T, ConfigError> {
        T::plan().apply(instance, self)
    }

    /// Produces one `T` per key in this section, lazily.
    ///
    /// Each key is converted to `K` and its value to `V` through the
    /// built-in converters, then assigned into a `T::default()` via the two
    /// setters. The returned iterator is single-pass: conversion happens as
    /// items are consumed, and a conversion failure surfaces at the failing
    /// item. Calling `bind_pairs` again re-reads the source.
    ///
    /// ```
    /// use flatconf::{MemorySource, Settings};
    ///
    /// #[derive(Debug, Default, PartialEq)]
    /// struct Entry {
    ///     name: String,
    ///     weight: i32,
    /// }
    ///
    /// let source = MemorySource::new()
    ///     .with("settings", "a", "1")
    ///     .with("settings", "b", "2");
    ///
    /// let settings = Settings::builder().build(&source);
    /// let entries: Vec<Entry> = settings
    ///     .bind_pairs(|e: &mut Entry, k: String| e.name = k, |e, v: i32| e.weight = v)
    ///     .collect::<Result<_, _>>()?;
    ///
    /// assert_eq!(entries[0], Entry { name: "a".into(), weight: 1 });
    /// assert_eq!(entries[1], Entry { name: "b".into(), weight: 2 });
    /// # Ok::<(), flatconf::ConfigError>(())
    /// ```
    pub fn bind_pairs<T, K, V, FK, FV>(
        &self,
        set_key: FK,
        set_value: FV,
    ) -> Pairs<'_, 's, T, K, V, FK, FV>
    where
        T: Default,
        K: Any,
        V: Any,
        FK: Fn(&mut T, K),
        FV: Fn(&mut T, V),
    {
        Pairs::new(self, self.source.keys(&self.section), set_key, set_value)
    }

    /// An accessor over the conventional connection-strings section of the
    /// same source.
    ///
    /// The returned instance shares the source and strictness flag but has
    /// its own default converter registry; custom converters registered on
    /// this instance do not carry over.
    pub fn connection_strings(&self) -> Settings<'s> {
        Settings {
            source: self.source,
            section: CONNECTION_STRINGS_SECTION.to_string(),
            registry: ConverterRegistry::new(self.registry.locale().clone()),
            missing_is_error: self.missing_is_error,
        }
    }

    pub(crate) fn lookup(&self, key: &str) -> Option<String> {
        self.source.get(&self.section, key)
    }

    pub(crate) fn registry(&self) -> &ConverterRegistry {
        &self.registry
    }
}

impl fmt::Debug for Settings<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settings")
            .field("section", &self.section)
            .field("registry", &self.registry)
            .field("missing_is_error", &self.missing_is_error)
            .finish_non_exhaustive()
    }
}

/// Builder for [`Settings`].
///
/// All options are independent and defaultable.
#[must_use = "builders do nothing until .build() is called"]
pub struct SettingsBuilder {
    section: String,
    locale: Locale,
    converters: Vec<Box<dyn Converter>>,
    missing_is_error: bool,
}

impl Default for SettingsBuilder {
    fn default() -> Self {
        Self {
            section: SETTINGS_SECTION.to_string(),
            locale: Locale::default(),
            converters: Vec::new(),
            missing_is_error: false,
        }
    }
}

impl SettingsBuilder {
    /// Selects the section to read from. Defaults to `settings`.
    pub fn section(mut self, name: impl Into<String>) -> Self {
        self.section = name.into();
        self
    }

    /// Sets the locale used by locale-sensitive built-in converters.
    pub fn locale(mut self, locale: Locale) -> Self {
        self.locale = locale;
        self
    }

    /// Appends a custom converter.
    ///
    /// Converters are consulted in registration order, after the built-in
    /// conversions; the first one accepting the source value's type wins.
    pub fn converter(mut self, converter: impl Converter + 'static) -> Self {
        self.converters.push(Box::new(converter));
        self
    }

    /// Treats absent keys as [`ConfigError::MissingValue`] on every lookup
    /// performed through the built instance. Defaults to `false`.
    pub fn missing_is_error(mut self, flag: bool) -> Self {
        self.missing_is_error = flag;
        self
    }

    /// Builds a [`Settings`] over the given source.
    pub fn build(self, source: &dyn ConfigSource) -> Settings<'_> {
        let mut registry = ConverterRegistry::new(self.locale);
        for converter in self.converters {
            registry.register(converter);
        }

        Settings {
            source,
            section: self.section,
            registry,
            missing_is_error: self.missing_is_error,
        }
    }
}

impl fmt::Debug for SettingsBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SettingsBuilder")
            .field("section", &self.section)
            .field("locale", &self.locale)
            .field("converters", &self.converters.len())
            .field("missing_is_error", &self.missing_is_error)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::{ConvertError, TypedConverter};
    use crate::source::MemorySource;

    fn source() -> MemorySource {
        MemorySource::new()
            .with("settings", "host", "db.example.com")
            .with("settings", "port", "5432")
            .with("connection_strings", "main", "Server=db;Database=app")
    }

    #[test]
    fn test_raw_returns_value_or_none() {
        let source = source();
        let settings = Settings::builder().build(&source);

        assert_eq!(
            settings.raw("host").unwrap(),
            Some("db.example.com".to_string())
        );
        assert_eq!(settings.raw("missing").unwrap(), None);
    }

    #[test]
    fn test_missing_is_error_names_key_and_section() {
        let source = source();
        let settings = Settings::builder().missing_is_error(true).build(&source);

        match settings.raw("missing") {
            Err(ConfigError::MissingValue { key, section }) => {
                assert_eq!(key, "missing");
                assert_eq!(section, "settings");
            }
            other => panic!("expected MissingValue, got {other:?}"),
        }
    }

    #[test]
    fn test_typed_get() {
        let source = source();
        let settings = Settings::builder().build(&source);

        assert_eq!(settings.get::<u16>("port").unwrap(), Some(5432));
        assert_eq!(settings.get::<u16>("missing").unwrap(), None);
    }

    #[test]
    fn test_get_or_prefers_present_value() {
        let source = source();
        let settings = Settings::builder().build(&source);

        assert_eq!(settings.get_or("port", 1u16).unwrap(), 5432);
        assert_eq!(settings.get_or("missing", 7i32).unwrap(), 7);
    }

    #[test]
    fn test_get_or_wraps_conversion_failure_with_key() {
        let source = MemorySource::new().with("settings", "port", "not-a-number");
        let settings = Settings::builder().build(&source);

        match settings.get_or("port", 1u16) {
            Err(ConfigError::Lookup { key, source }) => {
                assert_eq!(key, "port");
                assert!(matches!(source, ConvertError::Failed { .. }));
            }
            other => panic!("expected Lookup, got {other:?}"),
        }
    }

    #[test]
    fn test_get_or_respects_strict_lookup() {
        let source = source();
        let settings = Settings::builder().missing_is_error(true).build(&source);

        assert!(matches!(
            settings.get_or("missing", 7i32),
            Err(ConfigError::MissingValue { .. })
        ));
    }

    #[test]
    fn test_custom_section() {
        let source = MemorySource::new().with("features", "beta", "true");
        let settings = Settings::builder().section("features").build(&source);

        assert_eq!(settings.get::<bool>("beta").unwrap(), Some(true));
    }

    #[test]
    fn test_custom_converter_applies() {
        #[derive(Debug, PartialEq)]
        struct Upper(String);

        let source = MemorySource::new().with("settings", "name", "svc");
        let settings = Settings::builder()
            .converter(TypedConverter::new(|raw: &str, _locale: &Locale| {
                Ok(Upper(raw.to_uppercase()))
            }))
            .build(&source);

        assert_eq!(
            settings.get::<Upper>("name").unwrap(),
            Some(Upper("SVC".to_string()))
        );
    }

    #[test]
    fn test_connection_strings_sub_accessor() {
        let source = source();
        let settings = Settings::builder().build(&source);

        let connections = settings.connection_strings();
        assert_eq!(connections.section(), "connection_strings");
        assert_eq!(
            connections.raw("main").unwrap(),
            Some("Server=db;Database=app".to_string())
        );
    }
}
