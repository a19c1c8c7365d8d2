//! `hatch config`: read and write the user environment file and the
//! configuration file.

use std::fs;

use crate::{
    cli::ConfigCommands,
    config::AppConfig,
    envfile::{EnvFile, is_settable},
    error::{CliError, CliResult, IntoCli},
    output::OutputManager,
};

/// Dispatch to the correct config subcommand.
pub fn execute(cmd: ConfigCommands, config: AppConfig, output: OutputManager) -> CliResult<()> {
    let env_file = config.env_file();

    match cmd {
        ConfigCommands::Get { key: Some(key) } => match env_file.get(&key).map_err(|e| env_error(&env_file, e))? {
            Some(value) => output.print(&value)?,
            None => output.warning(&format!("{key} is not set"))?,
        },

        ConfigCommands::Get { key: None } | ConfigCommands::List => {
            let vars = env_file.read().map_err(|e| env_error(&env_file, e))?;
            for (key, value) in vars {
                output.print(&format!("{key}={value}"))?;
            }
        }

        ConfigCommands::Set { key, value } => {
            set_var(&env_file, &key, &value)?;
            output.success(&format!("{key} = {value}"))?;
        }

        ConfigCommands::Reset => {
            env_file
                .reset()
                .with_cli_context(|| format!("Failed to reset {}", env_file.path().display()))?;
            output.success(&format!("Restored defaults in {}", env_file.path().display()))?;
        }

        ConfigCommands::Path => {
            output.print(&env_file.path().display().to_string())?;
            output.print(&AppConfig::config_path().display().to_string())?;
        }

        ConfigCommands::Show => {
            output.header("Current Configuration:")?;
            output.print(&to_toml(&config)?)?;
        }

        ConfigCommands::Init { force } => init_file(force, &output)?,
    }

    Ok(())
}

fn set_var(env_file: &EnvFile, key: &str, value: &str) -> CliResult<()> {
    if !is_settable(key) {
        return Err(CliError::UnknownConfigKey { key: key.into() });
    }
    env_file
        .set(key, value)
        .map_err(|e| env_error(env_file, e))
}

fn to_toml(config: &AppConfig) -> CliResult<String> {
    toml::to_string_pretty(config).map_err(|e| CliError::ConfigError {
        message: format!("Failed to serialise config: {e}"),
        source: Some(Box::new(e)),
    })
}

/// Write the default configuration file.
fn init_file(force: bool, output: &OutputManager) -> CliResult<()> {
    let config_path = AppConfig::config_path();
    if config_path.exists() && !force {
        output.warning(&format!(
            "Config already exists at {}  (use --force to overwrite)",
            config_path.display(),
        ))?;
        return Ok(());
    }

    let toml = to_toml(&AppConfig::default())?;
    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).with_cli_context(|| {
            format!("Failed to create config directory '{}'", parent.display())
        })?;
    }
    fs::write(&config_path, toml)
        .with_cli_context(|| format!("Failed to write config to '{}'", config_path.display()))?;

    output.success(&format!("Configuration created at {}", config_path.display()))?;
    Ok(())
}

fn env_error(env_file: &EnvFile, e: dotenvy::Error) -> CliError {
    CliError::ConfigError {
        message: format!("cannot use {}: {e}", env_file.path().display()),
        source: Some(Box::new(e)),
    }
}

// ── tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn set_known_key() {
        let dir = TempDir::new().unwrap();
        let env_file = EnvFile::in_home(dir.path());
        set_var(&env_file, "BASE_URL", "https://example.com").unwrap();
        assert_eq!(
            env_file.get("BASE_URL").unwrap().as_deref(),
            Some("https://example.com")
        );
    }

    #[test]
    fn set_unknown_key_is_error() {
        let dir = TempDir::new().unwrap();
        let env_file = EnvFile::in_home(dir.path());
        assert!(matches!(
            set_var(&env_file, "CLI_HOME", "/tmp"),
            Err(CliError::UnknownConfigKey { .. })
        ));
        assert!(!env_file.path().exists());
    }

    #[test]
    fn default_config_serialises() {
        let text = to_toml(&AppConfig::default()).unwrap();
        assert!(text.contains("registry_url"));
        assert!(text.contains("[runtime]"));
    }
}
