use indexmap::IndexMap;
use std::path::Path;

/// A flat `section -> key -> value` store built by layering one or more
/// INI-style files, each later file overriding same-named keys from earlier
/// ones. `{%key%}` references expand against keys loaded so far, scanning
/// `section.key` first and falling back to a bare `key` match across all
/// sections (first-loaded wins on ambiguity).
#[derive(Debug, Clone, Default)]
pub struct ConfigStore {
    sections: IndexMap<String, IndexMap<String, String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unresolved template reference {{%{0}%}}")]
    UnresolvedTemplate(String),
}

impl ConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads and merges `path` into this store, expanding `{%key%}`
    /// templates against keys already present before this file was loaded.
    pub fn load(&mut self, path: &Path) -> Result<(), ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        self.load_str(&text)
    }

    pub fn load_str(&mut self, text: &str) -> Result<(), ConfigError> {
        let mut current_section = String::from("default");
        for raw_line in text.lines() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with(';') || line.starts_with('#') {
                continue;
            }
            if line.starts_with('[') && line.ends_with(']') {
                current_section = line[1..line.len() - 1].trim().to_string();
                self.sections.entry(current_section.clone()).or_default();
                continue;
            }
            if let Some((key, value)) = line.split_once('=') {
                let key = key.trim().to_ascii_lowercase();
                let value = self.expand(value.trim())?;
                self.sections
                    .entry(current_section.clone())
                    .or_default()
                    .insert(key, value);
            }
        }
        Ok(())
    }

    fn expand(&self, value: &str) -> Result<String, ConfigError> {
        let mut output = String::new();
        let mut rest = value;
        while let Some(start) = rest.find("{%") {
            output.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find("%}") else {
                output.push_str("{%");
                rest = after;
                continue;
            };
            let key = after[..end].trim().to_ascii_lowercase();
            let resolved = self.lookup_flat(&key).ok_or(ConfigError::UnresolvedTemplate(key))?;
            output.push_str(&resolved);
            rest = &after[end + 2..];
        }
        output.push_str(rest);
        Ok(output)
    }

    fn lookup_flat(&self, key: &str) -> Option<String> {
        if let Some((section, bare)) = key.split_once('.') {
            if let Some(value) = self.sections.get(section).and_then(|s| s.get(bare)) {
                return Some(value.clone());
            }
        }
        self.sections.values().find_map(|s| s.get(key)).cloned()
    }

    pub fn section(&self, name: &str) -> Option<&IndexMap<String, String>> {
        self.sections.get(name)
    }

    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        self.sections.get(section)?.get(key).map(|s| s.as_str())
    }

    pub fn sections(&self) -> impl Iterator<Item = &str> {
        self.sections.keys().map(|s| s.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_file_overrides_earlier() {
        let mut store = ConfigStore::new();
        store.load_str("[cloud]\nregion = us-east-1\n").unwrap();
        store.load_str("[cloud]\nregion = us-west-2\n").unwrap();
        assert_eq!(store.get("cloud", "region"), Some("us-west-2"));
    }

    #[test]
    fn template_expands_against_previously_loaded_keys() {
        let mut store = ConfigStore::new();
        store.load_str("[cloud]\nregion = us-east-1\n").unwrap();
        store
            .load_str("[database]\nhost = db.{%cloud.region%}.example.com\n")
            .unwrap();
        assert_eq!(store.get("database", "host"), Some("db.us-east-1.example.com"));
    }

    #[test]
    fn unresolved_template_is_an_error() {
        let mut store = ConfigStore::new();
        let err = store.load_str("[a]\nk = {%missing%}\n").unwrap_err();
        assert!(matches!(err, ConfigError::UnresolvedTemplate(_)));
    }
}
