//! Explicit configuration for the core services.
//!
//! [`CoreSettings`] is built once by the CLI from its layered configuration
//! and passed by reference into every service. Nothing in `hatch-core` reads
//! environment variables or looks up the home directory on its own.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Directory (under the CLI home) holding cached plugin packages.
pub const DEPENDENCIES_DIR: &str = "dependencies";
/// Directory (under the CLI home) holding cached registry templates.
pub const TEMPLATE_DIR: &str = "template";
/// Store directory name inside a cache root.
pub const STORE_DIR: &str = "node_modules";

/// Default registry used for version lookups and installs.
pub const DEFAULT_REGISTRY: &str = "https://registry.npmjs.org";

/// Fixed bootstrap for the default `node` runtime.
///
/// Loads the module named by `HATCH_ENTRY_POINT` and calls its export with the
/// payload read from the file named by `HATCH_PAYLOAD`: the argument list for
/// plugin commands, the options object for custom installers.
pub const NODE_BOOTSTRAP: &str = r#"
const fs = require('fs');
const envelope = JSON.parse(fs.readFileSync(process.env.HATCH_PAYLOAD, 'utf8'));
const target = require(process.env.HATCH_ENTRY_POINT);
const fn = typeof target === 'function' ? target : target.default;
Promise.resolve(fn(envelope.payload)).catch((e) => {
  console.error(e && e.message ? e.message : e);
  process.exit(1);
});
"#;

/// How to launch the isolated child process that loads an entry point.
///
/// The command line is `<program> <args...> <entry point>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub program: String,
    pub args: Vec<String>,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            program: "node".into(),
            args: vec!["-e".into(), NODE_BOOTSTRAP.trim().into()],
        }
    }
}

/// Settings shared by every core service.
#[derive(Debug, Clone)]
pub struct CoreSettings {
    /// Root of all persistent state (`~/.hatch-cli` by default).
    pub cli_home: PathBuf,
    pub registry_url: String,
    /// Surface registry install failures instead of logging and continuing.
    pub strict_install: bool,
    /// Leave staging directories behind when an install does not complete.
    pub keep_staging_on_failure: bool,
    /// Run plugins from this directory instead of the cache.
    pub local_override: Option<PathBuf>,
    pub runtime: RuntimeConfig,
    /// How long to wait for another process's cache lock.
    pub lock_timeout: Duration,
    /// Overall per-command timeout; `None` means unbounded.
    pub timeout: Option<Duration>,
}

impl CoreSettings {
    pub fn new(cli_home: impl Into<PathBuf>) -> Self {
        Self {
            cli_home: cli_home.into(),
            registry_url: DEFAULT_REGISTRY.into(),
            strict_install: false,
            keep_staging_on_failure: false,
            local_override: None,
            runtime: RuntimeConfig::default(),
            lock_timeout: Duration::from_secs(60),
            timeout: None,
        }
    }

    /// `(target_path, store_dir)` of the plugin cache.
    pub fn plugin_cache(&self) -> (PathBuf, PathBuf) {
        cache_root(&self.cli_home, DEPENDENCIES_DIR)
    }

    /// `(target_path, store_dir)` of the registry template cache.
    pub fn template_cache(&self) -> (PathBuf, PathBuf) {
        cache_root(&self.cli_home, TEMPLATE_DIR)
    }
}

fn cache_root(home: &Path, dir: &str) -> (PathBuf, PathBuf) {
    let target = home.join(dir);
    let store = target.join(STORE_DIR);
    (target, store)
}
