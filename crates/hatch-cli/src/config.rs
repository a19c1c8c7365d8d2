//! Application configuration.
//!
//! [`AppConfig`] is loaded once at startup and passed down by value. The
//! CLI layer owns config; the core crate only ever sees the
//! [`CoreSettings`] built from it.
//!
//! # Resolution order (highest priority first)
//!
//! 1. CLI flags (applied in [`AppConfig::core_settings`])
//! 2. `HATCH_*` environment variables (`HATCH_RUNTIME__PROGRAM` for nested keys)
//! 3. The user environment file `~/.hatch.env`
//! 4. Config file (`--config FILE`, or the platform config dir)
//! 5. Built-in defaults (always present)

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context as _;
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use hatch_core::application::{CoreSettings, DEFAULT_COMPONENT_DIR, DEFAULT_REGISTRY, RuntimeConfig};

use crate::cli::GlobalArgs;
use crate::envfile::{DEFAULT_BASE_URL, EnvFile};

/// CLI home directory name under the user's home.
pub const DEFAULT_CLI_HOME: &str = ".hatch-cli";

/// Environment file variables and the config keys they set.
const ENV_FILE_KEYS: [(&str, &str); 5] = [
    ("BASE_URL", "base_url"),
    ("PROJECT_TEMPLATE", "project_template"),
    ("COMPONENT_TEMPLATE", "component_template"),
    ("REGISTRY_URL", "registry_url"),
    ("CLI_HOME", "cli_home"),
];

/// Application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Root of cached packages and logs. Relative paths are taken from the
    /// user's home directory.
    pub cli_home: Option<PathBuf>,
    pub registry_url: String,
    /// Catalog server (or local directory).
    pub base_url: String,
    pub project_template: String,
    pub component_template: String,
    /// Where `hatch add` puts components when no path is given.
    pub component_dir: PathBuf,
    pub strict_install: bool,
    pub keep_staging_on_failure: bool,
    pub lock_timeout_secs: u64,
    pub timeout_secs: Option<u64>,
    pub check_updates: bool,
    pub runtime: RuntimeConfig,
    pub installer: InstallerConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,

    #[serde(skip)]
    home: PathBuf,
}

/// Package manager that installs a staged template's own dependencies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    pub program: String,
    pub args: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Also write logs to `<cli_home>/logs/hatch.log`.
    pub file: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub no_color: bool,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            program: "pnpm".into(),
            args: vec!["install".into()],
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            cli_home: None,
            registry_url: DEFAULT_REGISTRY.into(),
            base_url: DEFAULT_BASE_URL.into(),
            project_template: "/project.json".into(),
            component_template: "/component.json".into(),
            component_dir: PathBuf::from(DEFAULT_COMPONENT_DIR),
            strict_install: false,
            keep_staging_on_failure: false,
            lock_timeout_secs: 60,
            timeout_secs: None,
            check_updates: true,
            runtime: RuntimeConfig::default(),
            installer: InstallerConfig::default(),
            logging: LoggingConfig::default(),
            output: OutputConfig::default(),
            home: PathBuf::new(),
        }
    }
}

impl AppConfig {
    /// Load and merge every configuration layer.
    ///
    /// `config_file` is the path given with `--config`; it must exist. The
    /// default location is optional. Fails when the user's home directory
    /// cannot be determined.
    pub fn load(config_file: Option<&PathBuf>) -> anyhow::Result<Self> {
        let home = dirs::home_dir()
            .filter(|h| h.is_dir())
            .context("the current user's home directory does not exist")?;

        let env_file = EnvFile::in_home(&home);
        env_file
            .ensure()
            .with_context(|| format!("creating {}", env_file.path().display()))?;

        let (file, required) = match config_file {
            Some(path) => (path.clone(), true),
            None => (Self::config_path(), false),
        };

        let mut cfg: Self = Config::builder()
            .add_source(File::from(file.as_path()).format(FileFormat::Toml).required(required))
            .add_source(env_file_layer(&env_file)?)
            .add_source(
                Environment::with_prefix("HATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .with_context(|| format!("reading configuration from {}", file.display()))?
            .try_deserialize()
            .context("invalid configuration")?;

        cfg.home = home;
        Ok(cfg)
    }

    /// Path to the default configuration file.
    ///
    /// Uses `directories::ProjectDirs` for cross-platform correctness,
    /// falling back to `.hatch.toml` in the current directory.
    pub fn config_path() -> PathBuf {
        directories::ProjectDirs::from("dev", "hatch", "hatch")
            .map(|d| d.config_dir().join("config.toml"))
            .unwrap_or_else(|| PathBuf::from(".hatch.toml"))
    }

    pub fn home(&self) -> &Path {
        &self.home
    }

    pub fn env_file(&self) -> EnvFile {
        EnvFile::in_home(&self.home)
    }

    /// The resolved CLI home directory.
    pub fn cli_home(&self) -> PathBuf {
        match &self.cli_home {
            None => self.home.join(DEFAULT_CLI_HOME),
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => self.home.join(path),
        }
    }

    pub fn log_dir(&self) -> PathBuf {
        self.cli_home().join("logs")
    }

    /// Overall per-command timeout; `--timeout` wins over the config.
    pub fn timeout(&self, global: &GlobalArgs) -> Option<Duration> {
        global
            .timeout
            .or(self.timeout_secs)
            .map(Duration::from_secs)
    }

    /// Settings for the core services, with CLI flags applied.
    pub fn core_settings(&self, global: &GlobalArgs) -> CoreSettings {
        let mut settings = CoreSettings::new(self.cli_home());
        settings.registry_url = self.registry_url.clone();
        settings.strict_install = self.strict_install || global.debug;
        settings.keep_staging_on_failure = self.keep_staging_on_failure;
        settings.local_override = global.target_path.as_ref().map(|p| self.resolve(p));
        settings.runtime = self.runtime.clone();
        settings.lock_timeout = Duration::from_secs(self.lock_timeout_secs);
        settings.timeout = self.timeout(global);
        settings
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf())
    }
}

/// `~/.hatch.env` as a configuration layer.
fn env_file_layer(env_file: &EnvFile) -> anyhow::Result<Config> {
    let vars = env_file
        .read()
        .with_context(|| format!("parsing {}", env_file.path().display()))?;

    let mut layer = Config::builder();
    for (var, key) in ENV_FILE_KEYS {
        if let Some(value) = vars.get(var) {
            layer = layer.set_override(key, value.as_str())?;
        }
    }
    Ok(layer.build()?)
}
