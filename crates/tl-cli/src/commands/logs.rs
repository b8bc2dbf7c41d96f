//! Saved log command implementations

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

use super::config::logs_dir;
use crate::output::{format_saved_logs, format_size, print_success};
use tl_store::LogExporter;

fn exporter(config_path: Option<&PathBuf>) -> Result<LogExporter> {
    let (dir, max_files) = logs_dir(config_path)?;
    Ok(LogExporter::new(dir, max_files))
}

/// List recordings and snapshots, newest first
pub fn logs_list(config_path: Option<&PathBuf>) -> Result<()> {
    let exporter = exporter(config_path)?;
    let logs = exporter
        .list()
        .with_context(|| format!("Failed to list {:?}", exporter.logs_dir()))?;
    println!("{}", format_saved_logs(&logs));
    Ok(())
}

/// Print a saved log
pub fn logs_show(config_path: Option<&PathBuf>, name: &str) -> Result<()> {
    let text = exporter(config_path)?.read(name)?;
    print!("{}", text);
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

/// Copy a saved log out of the logs directory
pub fn logs_export(config_path: Option<&PathBuf>, name: &str, dest: &Path) -> Result<()> {
    let copied = exporter(config_path)?.copy_to(name, dest)?;
    print_success(&format!(
        "Exported {} to {} ({})",
        name,
        dest.display(),
        format_size(copied)
    ));
    Ok(())
}

/// Delete a saved log
pub fn logs_delete(config_path: Option<&PathBuf>, name: &str) -> Result<()> {
    exporter(config_path)?.delete(name)?;
    print_success(&format!("Deleted {}", name));
    Ok(())
}

/// Print the logs directory
pub fn logs_path(config_path: Option<&PathBuf>) -> Result<()> {
    println!("{}", exporter(config_path)?.logs_dir().display());
    Ok(())
}
