//! Locale-sensitive parsing rules used by the built-in converters.

/// Parsing rules for locale-sensitive value formats.
///
/// The built-in numeric converters strip the group separator and normalize
/// the decimal separator to `.` before parsing. The date and time converters
/// try each configured format in order.
///
/// The default locale uses `.` as the decimal separator, no group separator,
/// and ISO-8601 date formats.
#[derive(Debug, Clone)]
pub struct Locale {
    decimal_separator: char,
    group_separator: Option<char>,
    date_formats: Vec<&'static str>,
    datetime_formats: Vec<&'static str>,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            decimal_separator: '.',
            group_separator: None,
            date_formats: vec!["%Y-%m-%d"],
            datetime_formats: vec!["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"],
        }
    }
}

impl Locale {
    /// Creates a locale with the given numeric separators and default date formats.
    pub fn new(decimal_separator: char, group_separator: Option<char>) -> Self {
        Self {
            decimal_separator,
            group_separator,
            ..Self::default()
        }
    }

    /// Replaces the date formats tried by the date converter.
    ///
    /// Formats use `chrono` strftime syntax and are tried in order.
    pub fn with_date_formats(mut self, formats: Vec<&'static str>) -> Self {
        assert!(!formats.is_empty(), "date formats must not be empty");
        self.date_formats = formats;
        self
    }

    /// Replaces the formats tried by the date-time converters.
    pub fn with_datetime_formats(mut self, formats: Vec<&'static str>) -> Self {
        assert!(!formats.is_empty(), "datetime formats must not be empty");
        self.datetime_formats = formats;
        self
    }

    pub(crate) fn normalize_number(&self, raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| Some(*c) != self.group_separator)
            .map(|c| if c == self.decimal_separator { '.' } else { c })
            .collect()
    }

    pub(crate) fn normalize_integer(&self, raw: &str) -> String {
        raw.trim()
            .chars()
            .filter(|c| Some(*c) != self.group_separator)
            .collect()
    }

    pub(crate) fn date_formats(&self) -> &[&'static str] {
        &self.date_formats
    }

    pub(crate) fn datetime_formats(&self) -> &[&'static str] {
        &self.datetime_formats
    }
}
