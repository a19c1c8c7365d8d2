//! The user environment file, `~/.hatch.env`.
//!
//! A dotenv-format file holding the catalog location and registry URL. It is
//! created with defaults on first run, read as one configuration layer, and
//! edited by `hatch config set/reset`.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use tracing::debug;

/// File name under the user's home directory.
pub const ENV_FILE_NAME: &str = ".hatch.env";

/// Catalog server used until the user configures another.
pub const DEFAULT_BASE_URL: &str = "https://templates.hatch.dev";

/// Variables `hatch config set` accepts.
pub const SETTABLE_KEYS: [&str; 4] = [
    "BASE_URL",
    "PROJECT_TEMPLATE",
    "COMPONENT_TEMPLATE",
    "REGISTRY_URL",
];

/// Contents written on first run and by `hatch config reset`.
pub const DEFAULT_VARS: [(&str, &str); 3] = [
    ("BASE_URL", DEFAULT_BASE_URL),
    ("PROJECT_TEMPLATE", "/project.json"),
    ("COMPONENT_TEMPLATE", "/component.json"),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn in_home(home: &Path) -> Self {
        Self::new(home.join(ENV_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create the file with [`DEFAULT_VARS`] if it does not exist.
    /// Returns `true` when it was created.
    pub fn ensure(&self) -> io::Result<bool> {
        if self.path.exists() {
            return Ok(false);
        }
        debug!(path = %self.path.display(), "creating environment file");
        self.reset()?;
        Ok(true)
    }

    /// All variables in the file. A missing file has none.
    pub fn read(&self) -> Result<BTreeMap<String, String>, dotenvy::Error> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        dotenvy::from_path_iter(&self.path)?.collect()
    }

    pub fn get(&self, key: &str) -> Result<Option<String>, dotenvy::Error> {
        Ok(self.read()?.remove(key))
    }

    /// Set one variable, keeping the others.
    pub fn set(&self, key: &str, value: &str) -> Result<(), dotenvy::Error> {
        let mut vars = self.read()?;
        vars.insert(key.to_string(), value.to_string());
        self.write(&vars).map_err(dotenvy::Error::Io)
    }

    /// Overwrite the file with [`DEFAULT_VARS`].
    pub fn reset(&self) -> io::Result<()> {
        let defaults: BTreeMap<String, String> = DEFAULT_VARS
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        self.write(&defaults)
    }

    fn write(&self, vars: &BTreeMap<String, String>) -> io::Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let text: String = vars
            .iter()
            .map(|(key, value)| format!("{key}={}\n", quote(value)))
            .collect();
        fs::write(&self.path, text)
    }
}

/// `true` if `key` may be changed with `hatch config set`.
pub fn is_settable(key: &str) -> bool {
    SETTABLE_KEYS.contains(&key)
}

fn quote(value: &str) -> String {
    let needs_quotes = value.is_empty()
        || value
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '#' | '"' | '\'' | '\\' | '$'));
    if !needs_quotes {
        return value.to_string();
    }
    let escaped = value
        .replace('\\', "\\\\")
        .replace('"', "\\\"")
        .replace('$', "\\$");
    format!("\"{escaped}\"")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn ensure_writes_defaults_once() {
        let home = TempDir::new().unwrap();
        let file = EnvFile::in_home(home.path());

        assert!(file.ensure().unwrap());
        file.set("BASE_URL", "https://mirror.example.com").unwrap();
        assert!(!file.ensure().unwrap());

        let vars = file.read().unwrap();
        assert_eq!(vars["BASE_URL"], "https://mirror.example.com");
        assert_eq!(vars["PROJECT_TEMPLATE"], "/project.json");
    }

    #[test]
    fn values_with_spaces_survive_a_round_trip() {
        let home = TempDir::new().unwrap();
        let file = EnvFile::in_home(home.path());

        file.set("COMPONENT_TEMPLATE", "my list #2 \"quoted\"").unwrap();

        assert_eq!(
            file.get("COMPONENT_TEMPLATE").unwrap().as_deref(),
            Some("my list #2 \"quoted\"")
        );
    }

    #[test]
    fn reset_restores_defaults() {
        let home = TempDir::new().unwrap();
        let file = EnvFile::in_home(home.path());
        file.set("REGISTRY_URL", "https://npm.example.com").unwrap();

        file.reset().unwrap();

        let vars = file.read().unwrap();
        assert!(!vars.contains_key("REGISTRY_URL"));
        assert_eq!(vars["BASE_URL"], DEFAULT_BASE_URL);
    }

    #[test]
    fn missing_file_reads_empty() {
        let home = TempDir::new().unwrap();
        assert!(EnvFile::in_home(home.path()).read().unwrap().is_empty());
    }

    #[test]
    fn settable_keys() {
        assert!(is_settable("BASE_URL"));
        assert!(!is_settable("CLI_HOME"));
    }
}
