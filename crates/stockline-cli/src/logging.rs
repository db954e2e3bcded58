// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use crate::config::Config;
use anyhow::{Context, Result, anyhow, bail};
use std::env::{self, VarError};
use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

pub const LOG_ENV: &str = "STOCKLINE_LOG";

/// Installs a file-backed subscriber. The terminal belongs to the table
/// view, so nothing is written to stdout or stderr.
pub fn init_tracing(config: &Config) -> Result<PathBuf> {
    let path = config.log_file()?;
    let file = open_log_file(&path)?;
    let filter = resolve_filter(config.log_level())?;

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(Mutex::new(file))
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .map_err(|error| anyhow!("install log subscriber: {error}"))?;

    Ok(path)
}

fn resolve_filter(configured: &str) -> Result<EnvFilter> {
    match env::var(LOG_ENV) {
        Ok(value) => build_filter(Some(&value), configured),
        Err(VarError::NotPresent) => build_filter(None, configured),
        Err(VarError::NotUnicode(_)) => bail!("{LOG_ENV} is not valid UTF-8"),
    }
}

fn build_filter(from_env: Option<&str>, configured: &str) -> Result<EnvFilter> {
    match from_env {
        Some(value) => EnvFilter::try_new(value)
            .with_context(|| format!("invalid log filter {value:?} in {LOG_ENV}")),
        None => EnvFilter::try_new(configured)
            .with_context(|| format!("invalid log filter {configured:?}")),
    }
}

fn open_log_file(path: &Path) -> Result<File> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .with_context(|| format!("create log directory {}", parent.display()))?;
    }
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .with_context(|| format!("open log file {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::{build_filter, open_log_file};
    use anyhow::Result;
    use std::io::Write;

    #[test]
    fn log_file_is_created_with_missing_parents() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("nested").join("logs").join("stockline.log");
        let mut file = open_log_file(&path)?;
        writeln!(file, "first")?;
        drop(file);

        let mut file = open_log_file(&path)?;
        writeln!(file, "second")?;
        drop(file);

        assert_eq!(std::fs::read_to_string(&path)?, "first\nsecond\n");
        Ok(())
    }

    #[test]
    fn configured_filter_must_parse() {
        assert!(build_filter(None, "stockline=debug,info").is_ok());
        let error = build_filter(None, "stockline=loud").expect_err("bad filter should fail");
        assert!(error.to_string().contains("invalid log filter"));
    }

    #[test]
    fn env_filter_overrides_config_and_must_parse() {
        assert!(build_filter(Some("debug"), "stockline=loud").is_ok());

        let error = build_filter(Some("stockline=loud"), "info")
            .expect_err("bad env filter should fail");
        assert!(error.to_string().contains("STOCKLINE_LOG"));
    }
}
