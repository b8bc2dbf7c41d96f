//! Config command implementations

use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::output::{print_error, print_info, print_success, print_warning};
use tl_core::config::{self, TtylogConfig};

fn resolve_path(config_path: Option<&PathBuf>) -> PathBuf {
    config_path
        .cloned()
        .unwrap_or_else(config::default_config_path)
}

/// Load the configuration in effect
///
/// A missing file means defaults; a file that fails to parse is an error.
pub fn load_effective_config(config_path: Option<&PathBuf>) -> Result<TtylogConfig> {
    let path = resolve_path(config_path);
    if !path.exists() {
        tracing::debug!("No config at {:?}, using defaults", path);
        return Ok(TtylogConfig::default());
    }

    config::load_config(&path).with_context(|| format!("Failed to load config from {:?}", path))
}

/// Print the config file path
pub fn config_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", resolve_path(config_path).display());
    Ok(())
}

/// Show the configuration file, or the defaults when there is none
pub fn config_show(config_path: Option<&PathBuf>) -> Result<()> {
    let path = resolve_path(config_path);

    if !path.exists() {
        print_warning(&format!("No configuration file found at {:?}", path));
        print_info("Showing defaults. Run 'ttylog config init' to create one");
        println!();
        println!("{}", toml::to_string_pretty(&TtylogConfig::default())?);
        return Ok(());
    }

    print_info(&format!("Configuration file: {:?}", path));
    println!();

    let content = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config file: {:?}", path))?;
    println!("{}", content);

    Ok(())
}

/// Write a default configuration file
pub fn config_init(config_path: Option<&PathBuf>, force: bool) -> Result<()> {
    let path = resolve_path(config_path);

    if path.exists() && !force {
        print_error(&format!("Config file already exists: {:?}", path));
        print_info("Use --force to overwrite");
        return Ok(());
    }

    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        if !dir.exists() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create config directory: {:?}", dir))?;
            print_success(&format!("Created config directory: {:?}", dir));
        }
    }

    std::fs::write(&path, generate_default_config()?)
        .with_context(|| format!("Failed to write config file: {:?}", path))?;
    print_success(&format!("Created configuration file: {:?}", path));

    Ok(())
}

/// Print one value from the effective configuration, e.g. `target.host`
pub fn config_get(config_path: Option<&PathBuf>, key: &str) -> Result<()> {
    let config = load_effective_config(config_path)?;
    let root = toml::Value::try_from(&config).context("Failed to convert configuration")?;

    let Some(value) = lookup(&root, key) else {
        anyhow::bail!("Key not found: {}", key);
    };

    match value {
        toml::Value::String(s) => println!("{}", s),
        toml::Value::Table(_) => println!("{}", toml::to_string_pretty(value)?),
        other => println!("{}", other),
    }
    Ok(())
}

fn lookup<'a>(root: &'a toml::Value, key: &str) -> Option<&'a toml::Value> {
    key.split('.')
        .try_fold(root, |current, part| current.as_table()?.get(part))
}

fn generate_default_config() -> Result<String> {
    let body = toml::to_string_pretty(&TtylogConfig::default())?;
    Ok(format!(
        "# ttylog configuration\n\
         # Durations are in milliseconds. Command-line flags override these values.\n\n{}",
        body
    ))
}

/// The logs directory from the effective configuration
pub(crate) fn logs_dir(config_path: Option<&PathBuf>) -> Result<(PathBuf, usize)> {
    let config = load_effective_config(config_path)?;
    Ok((config.recorder.logs_dir, config.recorder.max_files))
}
