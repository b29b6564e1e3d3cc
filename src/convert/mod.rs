//! Conversion of raw configuration strings into typed values.

mod builtin;
mod locale;

pub use locale::Locale;

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConvertError {
    #[error("no converter can convert '{value}' to {destination}; register a custom converter for {destination}")]
    NotSupported {
        destination: &'static str,
        value: String,
    },

    #[error("failed to convert '{value}' to {destination}: {source}")]
    Failed {
        destination: &'static str,
        value: String,
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("converter selected for '{value}' produced a value that is not a {destination}")]
    WrongProduct {
        destination: &'static str,
        value: String,
    },
}

/// A conversion capability producing values of one destination type.
///
/// Custom converters are registered through
/// [`SettingsBuilder::converter`](crate::SettingsBuilder::converter) and are
/// consulted in registration order after the built-in converters.
pub trait Converter: Send + Sync {
    /// The destination type this converter produces.
    fn destination(&self) -> TypeId;

    /// Human-readable name of the destination type, used in error messages.
    fn destination_name(&self) -> &'static str;

    /// Whether this converter accepts source values of the given runtime type.
    ///
    /// Values read from a configuration source are always `String`s.
    fn can_convert(&self, source: TypeId) -> bool;

    /// Converts a raw value.
    ///
    /// Implementations report parse failures as [`ConvertError::Failed`] with
    /// the concrete parse error attached as the cause.
    fn convert(&self, raw: &str, locale: &Locale) -> Result<Box<dyn Any>, ConvertError>;
}

type ParseFn<T> =
    Box<dyn Fn(&str, &Locale) -> Result<T, Box<dyn std::error::Error + Send + Sync>> + Send + Sync>;

/// A [`Converter`] built from a parse function.
///
/// This is the simplest way to register a custom conversion:
///
/// ```
/// use flatconf::TypedConverter;
///
/// #[derive(Debug, PartialEq)]
/// struct Percentage(f64);
///
/// let converter = TypedConverter::new(|raw, _locale| {
///     let number: f64 = raw.trim_end_matches('%').parse()?;
///     Ok(Percentage(number / 100.0))
/// });
/// ```
pub struct TypedConverter<T> {
    parse: ParseFn<T>,
}

impl<T: Any> TypedConverter<T> {
    pub fn new(
        parse: impl Fn(&str, &Locale) -> Result<T, Box<dyn std::error::Error + Send + Sync>>
            + Send
            + Sync
            + 'static,
    ) -> Self {
        Self {
            parse: Box::new(parse),
        }
    }

    /// Builds a converter from the type's [`FromStr`] implementation.
    ///
    /// Useful for enums and other types that already know how to parse
    /// themselves and need no locale handling.
    pub fn from_str() -> Self
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        Self::new(|raw, _locale| raw.trim().parse::<T>().map_err(Into::into))
    }
}

impl<T: Any> fmt::Debug for TypedConverter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypedConverter")
            .field("destination", &std::any::type_name::<T>())
            .finish()
    }
}

impl<T: Any> Converter for TypedConverter<T> {
    fn destination(&self) -> TypeId {
        TypeId::of::<T>()
    }

    fn destination_name(&self) -> &'static str {
        std::any::type_name::<T>()
    }

    fn can_convert(&self, source: TypeId) -> bool {
        source == TypeId::of::<String>()
    }

    fn convert(&self, raw: &str, locale: &Locale) -> Result<Box<dyn Any>, ConvertError> {
        match (self.parse)(raw, locale) {
            Ok(value) => Ok(Box::new(value)),
            Err(source) => Err(ConvertError::Failed {
                destination: self.destination_name(),
                value: raw.to_string(),
                source,
            }),
        }
    }
}

/// Resolves and applies converters for requested destination types.
///
/// Resolution order is fixed: the identity conversion for `String`
/// destinations, then the built-in converter registered for the destination
/// type, then the custom converters in registration order. The custom scan
/// selects by source-type support alone; a custom converter whose product is
/// not the requested type fails with [`ConvertError::WrongProduct`].
pub struct ConverterRegistry {
    builtin: HashMap<TypeId, Box<dyn Converter>>,
    custom: Vec<Box<dyn Converter>>,
    locale: Locale,
}

impl ConverterRegistry {
    /// Creates a registry with the built-in converters and no custom ones.
    pub fn new(locale: Locale) -> Self {
        Self {
            builtin: builtin::all(),
            custom: Vec::new(),
            locale,
        }
    }

    /// Appends a custom converter to the end of the chain.
    pub fn register(&mut self, converter: Box<dyn Converter>) {
        self.custom.push(converter);
    }

    pub fn locale(&self) -> &Locale {
        &self.locale
    }

    /// Converts a raw string to `T` using the full resolution order.
    pub fn convert_to<T: Any>(&self, raw: &str) -> Result<T, ConvertError> {
        match self.convert_builtin(raw) {
            Err(ConvertError::NotSupported { .. }) => {}
            resolved => return resolved,
        }

        let source_type = TypeId::of::<String>();
        if let Some(converter) = self.custom.iter().find(|c| c.can_convert(source_type)) {
            debug!(
                destination = converter.destination_name(),
                "selected custom converter"
            );
            let value = converter.convert(raw, &self.locale)?;
            return value.downcast::<T>().map(|v| *v).map_err(|_| {
                ConvertError::WrongProduct {
                    destination: std::any::type_name::<T>(),
                    value: raw.to_string(),
                }
            });
        }

        Err(ConvertError::NotSupported {
            destination: std::any::type_name::<T>(),
            value: raw.to_string(),
        })
    }

    /// Converts using only the identity path and the built-in converters.
    ///
    /// The pairs binder resolves keys and values through this path, bypassing
    /// the custom chain.
    pub(crate) fn convert_builtin<T: Any>(&self, raw: &str) -> Result<T, ConvertError> {
        // Identity: the raw value already is a String.
        if TypeId::of::<T>() == TypeId::of::<String>() {
            let boxed: Box<dyn Any> = Box::new(raw.to_string());
            let value = boxed.downcast::<T>().expect("T is String");
            return Ok(*value);
        }

        if let Some(converter) = self.builtin.get(&TypeId::of::<T>()) {
            if converter.can_convert(TypeId::of::<String>()) {
                debug!(
                    destination = converter.destination_name(),
                    "selected built-in converter"
                );
                let value = converter.convert(raw, &self.locale)?;
                return value.downcast::<T>().map(|v| *v).map_err(|_| {
                    ConvertError::WrongProduct {
                        destination: std::any::type_name::<T>(),
                        value: raw.to_string(),
                    }
                });
            }
        }

        Err(ConvertError::NotSupported {
            destination: std::any::type_name::<T>(),
            value: raw.to_string(),
        })
    }
}

impl fmt::Debug for ConverterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConverterRegistry")
            .field("builtin", &self.builtin.len())
            .field("custom", &self.custom.len())
            .field("locale", &self.locale)
            .finish()
    }
}
