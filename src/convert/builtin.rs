//! Built-in converters for standard primitive and common value types.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use uuid::Uuid;

use super::{Converter, TypedConverter};

fn add<T: Any>(map: &mut HashMap<TypeId, Box<dyn Converter>>, converter: TypedConverter<T>) {
    map.insert(converter.destination(), Box::new(converter));
}

macro_rules! integers {
    ($map:expr, $($ty:ty),* $(,)?) => {
        $(
            add::<$ty>($map, TypedConverter::new(|raw, locale| {
                locale.normalize_integer(raw).parse::<$ty>().map_err(Into::into)
            }));
        )*
    };
}

macro_rules! floats {
    ($map:expr, $($ty:ty),* $(,)?) => {
        $(
            add::<$ty>($map, TypedConverter::new(|raw, locale| {
                locale.normalize_number(raw).parse::<$ty>().map_err(Into::into)
            }));
        )*
    };
}

pub(super) fn all() -> HashMap<TypeId, Box<dyn Converter>> {
    let mut map = HashMap::new();

    integers!(
        &mut map, i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize,
    );
    floats!(&mut map, f32, f64);

    // String has no entry here: it is handled by the identity fast path.

    add::<bool>(
        &mut map,
        TypedConverter::new(|raw, _locale| {
            raw.trim().to_ascii_lowercase().parse::<bool>().map_err(Into::into)
        }),
    );

    add::<char>(
        &mut map,
        TypedConverter::new(|raw, _locale| raw.trim().parse::<char>().map_err(Into::into)),
    );

    add::<PathBuf>(
        &mut map,
        TypedConverter::new(|raw, _locale| Ok(PathBuf::from(raw))),
    );

    add::<IpAddr>(
        &mut map,
        TypedConverter::new(|raw, _locale| raw.trim().parse::<IpAddr>().map_err(Into::into)),
    );

    add::<SocketAddr>(
        &mut map,
        TypedConverter::new(|raw, _locale| raw.trim().parse::<SocketAddr>().map_err(Into::into)),
    );

    add::<Duration>(
        &mut map,
        TypedConverter::new(|raw, _locale| {
            humantime::parse_duration(raw.trim()).map_err(Into::into)
        }),
    );

    add::<Uuid>(
        &mut map,
        TypedConverter::new(|raw, _locale| Uuid::parse_str(raw.trim()).map_err(Into::into)),
    );

    add::<NaiveDate>(
        &mut map,
        TypedConverter::new(|raw, locale| {
            parse_with_formats(raw, locale.date_formats(), NaiveDate::parse_from_str)
        }),
    );

    add::<NaiveDateTime>(
        &mut map,
        TypedConverter::new(|raw, locale| {
            parse_with_formats(raw, locale.datetime_formats(), NaiveDateTime::parse_from_str)
        }),
    );

    add::<DateTime<Utc>>(
        &mut map,
        TypedConverter::new(|raw, locale| {
            let raw = raw.trim();
            if let Ok(value) = DateTime::parse_from_rfc3339(raw) {
                return Ok(value.with_timezone(&Utc));
            }
            parse_with_formats(raw, locale.datetime_formats(), NaiveDateTime::parse_from_str)
                .map(|naive| naive.and_utc())
        }),
    );

    map
}

/// Tries each format in order, reporting the last parse error if none match.
fn parse_with_formats<T>(
    raw: &str,
    formats: &[&'static str],
    parse: impl Fn(&str, &str) -> chrono::ParseResult<T>,
) -> Result<T, Box<dyn std::error::Error + Send + Sync>> {
    let raw = raw.trim();
    let mut last_error = None;

    for format in formats {
        match parse(raw, format) {
            Ok(value) => return Ok(value),
            Err(err) => last_error = Some(err),
        }
    }

    // Locale constructors reject empty format lists.
    Err(last_error.expect("at least one format").into())
}
