use super::ConfigSource;

/// A source backed by environment variables.
///
/// A key `port` in section `database` with prefix `MYAPP` and separator `__`
/// maps to the variable `MYAPP__DATABASE__PORT`. Keys enumerate lowercased
/// and sorted, since the process environment has no stable order of its own.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
    separator: String,
}

impl EnvSource {
    pub fn new(prefix: impl Into<String>, separator: impl Into<String>) -> Self {
        let separator = separator.into();
        assert!(!separator.is_empty(), "separator must not be empty");
        Self {
            prefix: prefix.into(),
            separator,
        }
    }

    fn section_prefix(&self, section: &str) -> String {
        format!(
            "{}{}{}{}",
            self.prefix,
            self.separator,
            section.to_uppercase(),
            self.separator
        )
    }
}

impl ConfigSource for EnvSource {
    fn get(&self, section: &str, key: &str) -> Option<String> {
        let name = format!("{}{}", self.section_prefix(section), key.to_uppercase());
        std::env::var(name).ok()
    }

    fn keys(&self, section: &str) -> Vec<String> {
        let prefix = self.section_prefix(section);
        let mut keys = Vec::new();

        for (name, _) in std::env::vars() {
            if let Some(rest) = name.strip_prefix(&prefix) {
                if !rest.is_empty() && !rest.contains(&self.separator) {
                    keys.push(rest.to_lowercase());
                }
            }
        }

        keys.sort();
        keys
    }
}
