//! Binding configuration values onto user-defined types.

use std::any::Any;
use std::marker::PhantomData;

use tracing::debug;

use crate::error::ConfigError;
use crate::settings::Settings;

/// A type that can be populated from a settings section.
///
/// Implementors declare their members once in [`plan`](Self::plan); no
/// runtime reflection is involved. Each member is bound from the key with
/// the exact same name, and left untouched when that key is absent.
///
/// ```
/// use flatconf::{BindPlan, Bindable, MemorySource, Settings};
///
/// #[derive(Debug, Default, PartialEq)]
/// struct Database {
///     host: String,
///     port: u16,
/// }
///
/// impl Bindable for Database {
///     fn plan() -> BindPlan<Self> {
///         BindPlan::new()
///             .member("host", |d: &mut Self, v: String| d.host = v)
///             .member("port", |d: &mut Self, v: u16| d.port = v)
///     }
/// }
///
/// let source = MemorySource::new()
///     .with("settings", "host", "db.example.com")
///     .with("settings", "port", "5432");
///
/// let settings = Settings::builder().build(&source);
/// let database: Database = settings.bind()?;
///
/// assert_eq!(
///     database,
///     Database { host: "db.example.com".into(), port: 5432 }
/// );
/// # Ok::<(), flatconf::ConfigError>(())
/// ```
pub trait Bindable: Sized {
    /// Builds the member plan used by [`Settings::bind`].
    fn plan() -> BindPlan<Self>;
}

type Populate<T> = Box<dyn Fn(&mut T, &Settings<'_>) -> Result<(), ConfigError> + Send + Sync>;

struct Member<T> {
    name: &'static str,
    populate: Populate<T>,
}

/// An ordered list of bindable members for a destination type.
///
/// Members are independent; binding one never depends on another having been
/// bound first.
#[must_use = "a plan does nothing until applied via Settings::bind"]
pub struct BindPlan<T> {
    members: Vec<Member<T>>,
}

impl<T> Default for BindPlan<T> {
    fn default() -> Self {
        Self {
            members: Vec::new(),
        }
    }
}

impl<T> BindPlan<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a member bound from the key `name`.
    ///
    /// During binding the key is looked up and converted to `V`; on success
    /// `set` assigns it. An absent key leaves the member untouched. A
    /// conversion failure aborts the whole bind with
    /// [`ConfigError::BindMember`]; members already assigned keep their new
    /// values.
    pub fn member<V: Any>(
        mut self,
        name: &'static str,
        set: impl Fn(&mut T, V) + Send + Sync + 'static,
    ) -> Self {
        let populate = Box::new(
            move |target: &mut T, settings: &Settings<'_>| match settings.get::<V>(name) {
                Ok(Some(value)) => {
                    set(target, value);
                    Ok(())
                }
                Ok(None) => Ok(()),
                Err(err @ ConfigError::MissingValue { .. }) => Err(err),
                Err(err) => Err(ConfigError::BindMember {
                    member: name,
                    source: Box::new(err),
                }),
            },
        );

        self.members.push(Member { name, populate });
        self
    }

    pub(crate) fn apply(&self, mut instance: T, settings: &Settings<'_>) -> Result<T, ConfigError> {
        for member in &self.members {
            debug!(member = member.name, section = settings.section(), "binding member");
            (member.populate)(&mut instance, settings)?;
        }
        Ok(instance)
    }
}

/// Lazy iterator produced by [`Settings::bind_pairs`].
///
/// Yields one `Result<T>` per key in the section, converting the key and its
/// value as each item is consumed. Single-pass; not restartable.
pub struct Pairs<'a, 's, T, K, V, FK, FV> {
    settings: &'a Settings<'s>,
    keys: std::vec::IntoIter<String>,
    set_key: FK,
    set_value: FV,
    _produces: PhantomData<fn(K, V) -> T>,
}

impl<'a, 's, T, K, V, FK, FV> Pairs<'a, 's, T, K, V, FK, FV>
where
    T: Default,
    K: Any,
    V: Any,
    FK: Fn(&mut T, K),
    FV: Fn(&mut T, V),
{
    pub(crate) fn new(
        settings: &'a Settings<'s>,
        keys: Vec<String>,
        set_key: FK,
        set_value: FV,
    ) -> Self {
        Self {
            settings,
            keys: keys.into_iter(),
            set_key,
            set_value,
            _produces: PhantomData,
        }
    }

    fn produce(&self, key: &str, raw: &str) -> Result<T, ConfigError> {
        let registry = self.settings.registry();
        let converted_key = registry.convert_builtin::<K>(key)?;
        let converted_value = registry.convert_builtin::<V>(raw)?;

        let mut instance = T::default();
        (self.set_key)(&mut instance, converted_key);
        (self.set_value)(&mut instance, converted_value);
        Ok(instance)
    }
}

impl<T, K, V, FK, FV> Iterator for Pairs<'_, '_, T, K, V, FK, FV>
where
    T: Default,
    K: Any,
    V: Any,
    FK: Fn(&mut T, K),
    FV: Fn(&mut T, V),
{
    type Item = Result<T, ConfigError>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            let key = self.keys.next()?;
            // A key can disappear only if the source lies about keys();
            // skip it rather than invent a value.
            let Some(raw) = self.settings.lookup(&key) else {
                continue;
            };
            return Some(self.produce(&key, &raw));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[derive(Debug, Default, PartialEq)]
    struct Database {
        host: String,
        port: u16,
    }

    impl Bindable for Database {
        fn plan() -> BindPlan<Self> {
            BindPlan::new()
                .member("host", |d: &mut Self, v: String| d.host = v)
                .member("port", |d: &mut Self, v: u16| d.port = v)
        }
    }

    #[test]
    fn test_bind_populates_members_from_same_named_keys() {
        let source = MemorySource::new()
            .with("settings", "host", "db.example.com")
            .with("settings", "port", "5432");
        let settings = Settings::builder().build(&source);

        let database: Database = settings.bind().unwrap();
        assert_eq!(
            database,
            Database {
                host: "db.example.com".to_string(),
                port: 5432,
            }
        );
    }

    #[test]
    fn test_bind_leaves_absent_members_at_default() {
        let source = MemorySource::new().with("settings", "host", "db.example.com");
        let settings = Settings::builder().build(&source);

        let database: Database = settings.bind().unwrap();
        assert_eq!(database.host, "db.example.com");
        assert_eq!(database.port, 0);
    }

    #[test]
    fn test_bind_into_preserves_caller_defaults() {
        let source = MemorySource::new().with("settings", "host", "db.example.com");
        let settings = Settings::builder().build(&source);

        let seeded = Database {
            host: String::new(),
            port: 9000,
        };
        let database = settings.bind_into(seeded).unwrap();

        assert_eq!(database.host, "db.example.com");
        assert_eq!(database.port, 9000);
    }

    #[test]
    fn test_bind_reports_offending_member() {
        let source = MemorySource::new()
            .with("settings", "host", "db.example.com")
            .with("settings", "port", "not-a-number");
        let settings = Settings::builder().build(&source);

        match settings.bind::<Database>() {
            Err(ConfigError::BindMember { member, .. }) => assert_eq!(member, "port"),
            other => panic!("expected BindMember, got {other:?}"),
        }
    }

    #[test]
    fn test_bind_propagates_strict_missing_value() {
        let source = MemorySource::new().with("settings", "host", "db.example.com");
        let settings = Settings::builder().missing_is_error(true).build(&source);

        assert!(matches!(
            settings.bind::<Database>(),
            Err(ConfigError::MissingValue { .. })
        ));
    }

    #[derive(Debug, Default, PartialEq)]
    struct Entry {
        name: String,
        weight: i32,
    }

    #[test]
    fn test_bind_pairs_yields_items_in_source_order() {
        let source = MemorySource::new()
            .with("settings", "a", "1")
            .with("settings", "b", "2");
        let settings = Settings::builder().build(&source);

        let entries: Vec<Entry> = settings
            .bind_pairs(|e: &mut Entry, k: String| e.name = k, |e, v: i32| e.weight = v)
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(
            entries,
            vec![
                Entry {
                    name: "a".to_string(),
                    weight: 1,
                },
                Entry {
                    name: "b".to_string(),
                    weight: 2,
                },
            ]
        );
    }

    #[test]
    fn test_bind_pairs_converts_numeric_keys() {
        #[derive(Debug, Default)]
        struct Numbered {
            id: u32,
            label: String,
        }

        let source = MemorySource::new()
            .with("settings", "1", "one")
            .with("settings", "2", "two");
        let settings = Settings::builder().build(&source);

        let entries: Vec<Numbered> = settings
            .bind_pairs(
                |e: &mut Numbered, k: u32| e.id = k,
                |e, v: String| e.label = v,
            )
            .collect::<Result<_, _>>()
            .unwrap();

        assert_eq!(entries[1].id, 2);
        assert_eq!(entries[1].label, "two");
    }

    #[test]
    fn test_bind_pairs_is_lazy_and_fails_at_the_failing_item() {
        let source = MemorySource::new()
            .with("settings", "a", "1")
            .with("settings", "b", "not-a-number");
        let settings = Settings::builder().build(&source);

        // Constructing the iterator converts nothing, even though "b" is
        // malformed.
        let mut pairs = settings.bind_pairs(
            |e: &mut Entry, k: String| e.name = k,
            |e, v: i32| e.weight = v,
        );

        let first = pairs.next().unwrap().unwrap();
        assert_eq!(first.weight, 1);

        let second = pairs.next().unwrap();
        assert!(matches!(second, Err(ConfigError::Convert(_))));

        assert!(pairs.next().is_none());
    }

    #[test]
    fn test_bind_pairs_bypasses_custom_converters() {
        use crate::convert::{ConvertError, Locale, TypedConverter};

        #[derive(Debug, Default, PartialEq)]
        struct Weight(i32);

        #[derive(Debug, Default)]
        struct Weighted {
            name: String,
            weight: Weight,
        }

        // `get` would resolve Weight through this converter; the pairs
        // binder uses built-in conversions only, so Weight is unsupported
        // there.
        let source = MemorySource::new().with("settings", "a", "1");
        let settings = Settings::builder()
            .converter(TypedConverter::new(|raw: &str, _locale: &Locale| {
                Ok(Weight(raw.parse()?))
            }))
            .build(&source);

        assert_eq!(
            settings.get::<Weight>("a").unwrap(),
            Some(Weight(1)),
        );

        let failure = settings
            .bind_pairs(
                |e: &mut Weighted, k: String| e.name = k,
                |e, v: Weight| e.weight = v,
            )
            .next()
            .unwrap();
        assert!(matches!(
            failure,
            Err(ConfigError::Convert(ConvertError::NotSupported { .. }))
        ));
    }
}
