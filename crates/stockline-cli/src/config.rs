// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use stockline_app::Labels;
use tracing_subscriber::EnvFilter;

const CONFIG_VERSION: i64 = 1;
const DEFAULT_SERVICE_BASE_URL: &str = "http://localhost:8080/api";
const DEFAULT_RECORD_URL: &str = "http://localhost:8080/records/{id}/view";
const DEFAULT_LOG_LEVEL: &str = "info";
pub const RECORD_ID_PLACEHOLDER: &str = "{id}";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backend {
    Sqlite,
    Http,
}

impl Backend {
    fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Some(Self::Sqlite),
            "http" => Some(Self::Http),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub source: Source,
    #[serde(default)]
    pub storage: Storage,
    #[serde(default)]
    pub service: Service,
    #[serde(default)]
    pub session: Session,
    #[serde(default)]
    pub navigation: Navigation,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            source: Source::default(),
            storage: Storage::default(),
            service: Service::default(),
            session: Session::default(),
            navigation: Navigation::default(),
            labels: Labels::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Source {
    pub backend: Option<String>,
}

impl Default for Source {
    fn default() -> Self {
        Self {
            backend: Some("sqlite".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Storage {
    pub db_path: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Service {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

impl Default for Service {
    fn default() -> Self {
        Self {
            base_url: Some(DEFAULT_SERVICE_BASE_URL.to_owned()),
            timeout: Some("5s".to_owned()),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Session {
    pub profile: Option<String>,
    pub opportunity: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Navigation {
    pub record_url: Option<String>,
    pub open_command: Option<String>,
}

impl Default for Navigation {
    fn default() -> Self {
        Self {
            record_url: Some(DEFAULT_RECORD_URL.to_owned()),
            open_command: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Default for Log {
    fn default() -> Self {
        Self {
            level: Some(DEFAULT_LOG_LEVEL.to_owned()),
            file: None,
        }
    }
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os("STOCKLINE_CONFIG_PATH") {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!(
                "cannot resolve config directory; set STOCKLINE_CONFIG_PATH to the config file"
            )
        })?;

        let app_dir = config_root.join(stockline_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create config directory {}", app_dir.display()))?;
        Ok(app_dir.join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let raw = fs::read_to_string(path)
            .with_context(|| format!("read config file {}", path.display()))?;
        let value: toml::Value = toml::from_str(&raw)
            .with_context(|| format!("parse TOML config {}", path.display()))?;

        let version = value
            .get("version")
            .and_then(toml::Value::as_integer)
            .ok_or_else(|| {
                anyhow!(
                    "config file {} is not versioned. Add `version = 1` at the top and keep values under [source], [storage], [service], [session], [navigation], [labels], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1. Regenerate a template with `stockline --print-example-config`",
                version,
                path.display()
            );
        }

        let config: Config = value
            .try_into()
            .with_context(|| format!("decode config {}", path.display()))?;
        config.validate(path)?;
        Ok(config)
    }

    fn validate(&self, path: &Path) -> Result<()> {
        if let Some(backend) = &self.source.backend
            && Backend::parse(backend).is_none()
        {
            bail!(
                "source.backend in {} must be \"sqlite\" or \"http\", got {backend:?}",
                path.display()
            );
        }

        if let Some(db_path) = &self.storage.db_path {
            stockline_db::validate_db_path(db_path)?;
        }

        if let Some(timeout) = &self.service.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "service.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(record_url) = &self.navigation.record_url
            && !record_url.contains(RECORD_ID_PLACEHOLDER)
        {
            bail!(
                "navigation.record_url in {} must contain the {RECORD_ID_PLACEHOLDER} placeholder, got {record_url:?}",
                path.display()
            );
        }

        if let Some(command) = &self.navigation.open_command
            && command.trim().is_empty()
        {
            bail!(
                "navigation.open_command in {} is empty; remove it or name a program such as xdg-open",
                path.display()
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!(
                    "log.level in {} is not a valid filter: {level:?}",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    pub fn backend(&self) -> Backend {
        self.source
            .backend
            .as_deref()
            .and_then(Backend::parse)
            .unwrap_or(Backend::Sqlite)
    }

    pub fn db_path(&self) -> Result<PathBuf> {
        match &self.storage.db_path {
            Some(path) => Ok(PathBuf::from(path)),
            None => stockline_db::default_db_path(),
        }
    }

    pub fn service_base_url(&self) -> &str {
        self.service
            .base_url
            .as_deref()
            .unwrap_or(DEFAULT_SERVICE_BASE_URL)
            .trim_end_matches('/')
    }

    pub fn service_timeout(&self) -> Result<Duration> {
        parse_duration(self.service.timeout.as_deref().unwrap_or("5s"))
    }

    pub fn session_profile(&self) -> Option<&str> {
        self.session
            .profile
            .as_deref()
            .map(str::trim)
            .filter(|profile| !profile.is_empty())
    }

    pub fn session_opportunity(&self) -> Option<&str> {
        self.session
            .opportunity
            .as_deref()
            .map(str::trim)
            .filter(|opportunity| !opportunity.is_empty())
    }

    pub fn record_url(&self) -> &str {
        self.navigation
            .record_url
            .as_deref()
            .unwrap_or(DEFAULT_RECORD_URL)
    }

    pub fn open_command(&self) -> Option<&str> {
        self.navigation.open_command.as_deref().map(str::trim)
    }

    pub fn labels(&self) -> &Labels {
        &self.labels
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_file(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let state_root = dirs::state_dir()
            .or_else(dirs::data_local_dir)
            .ok_or_else(|| anyhow!("cannot resolve log directory; set [log].file"))?;
        let app_dir = state_root.join(stockline_db::APP_NAME);
        fs::create_dir_all(&app_dir)
            .with_context(|| format!("create log directory {}", app_dir.display()))?;
        Ok(app_dir.join("stockline.log"))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# stockline config\n# Place this file at: {}\n\nversion = 1\n\n[source]\n# \"sqlite\" reads the local database, \"http\" talks to a record service\nbackend = \"sqlite\"\n\n[storage]\n# Optional. Default is platform data dir (for example ~/.local/share/stockline/stockline.db)\n# db_path = \"/absolute/path/to/stockline.db\"\n\n[service]\nbase_url = \"{}\"\ntimeout = \"5s\"\n\n[session]\n# profile = \"System Administrator\"\n# opportunity = \"006000000000000001\"\n\n[navigation]\nrecord_url = \"{}\"\n# open_command = \"xdg-open\"\n\n[labels]\n# opportunity_products = \"Opportunity Products\"\n# delete = \"Delete\"\n\n[log]\nlevel = \"{}\"\n# file = \"/absolute/path/to/stockline.log\"\n",
            path.display(),
            DEFAULT_SERVICE_BASE_URL,
            DEFAULT_RECORD_URL,
            DEFAULT_LOG_LEVEL,
        )
    }
}

fn parse_duration(raw: &str) -> Result<Duration> {
    if let Some(value) = raw.strip_suffix("ms") {
        let millis: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_millis(millis));
    }
    if let Some(value) = raw.strip_suffix('s') {
        let secs: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(secs));
    }
    if let Some(value) = raw.strip_suffix('m') {
        let mins: u64 = value
            .parse()
            .with_context(|| format!("invalid timeout duration {raw:?}"))?;
        return Ok(Duration::from_secs(mins * 60));
    }

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 5s)")
}

#[cfg(test)]
mod tests {
    use super::{Backend, Config, parse_duration};
    use anyhow::Result;
    use std::path::PathBuf;
    use std::sync::{Mutex, OnceLock};
    use std::time::Duration;

    fn write_config(content: &str) -> Result<(tempfile::TempDir, PathBuf)> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        std::fs::write(&path, content)?;
        Ok((temp, path))
    }

    fn env_lock() -> std::sync::MutexGuard<'static, ()> {
        static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
        match ENV_LOCK.get_or_init(|| Mutex::new(())).lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[test]
    fn missing_config_uses_defaults() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let config = Config::load(&temp.path().join("missing.toml"))?;
        assert_eq!(config.version, 1);
        assert_eq!(config.backend(), Backend::Sqlite);
        assert_eq!(config.service_base_url(), "http://localhost:8080/api");
        assert_eq!(config.log_level(), "info");
        assert!(config.session_profile().is_none());
        assert!(config.open_command().is_none());
        Ok(())
    }

    #[test]
    fn unversioned_config_is_rejected_with_actionable_message() -> Result<()> {
        let (_temp, path) = write_config("[service]\nbase_url=\"http://x\"\n")?;
        let error = Config::load(&path).expect_err("unversioned config should fail");
        let message = error.to_string();
        assert!(message.contains("version = 1"));
        assert!(message.contains("[navigation]"));
        Ok(())
    }

    #[test]
    fn full_config_parses() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[source]\nbackend = \"http\"\n[service]\nbase_url = \"https://records.example/api/\"\ntimeout = \"750ms\"\n[session]\nprofile = \"Commercial\"\nopportunity = \"006A\"\n[navigation]\nrecord_url = \"https://records.example/r/{id}\"\nopen_command = \"xdg-open\"\n[labels]\ndelete = \"Supprimer\"\n[log]\nlevel = \"debug\"\nfile = \"/tmp/stockline-test.log\"\n",
        )?;

        let config = Config::load(&path)?;
        assert_eq!(config.backend(), Backend::Http);
        assert_eq!(config.service_base_url(), "https://records.example/api");
        assert_eq!(config.service_timeout()?, Duration::from_millis(750));
        assert_eq!(config.session_profile(), Some("Commercial"));
        assert_eq!(config.session_opportunity(), Some("006A"));
        assert_eq!(config.record_url(), "https://records.example/r/{id}");
        assert_eq!(config.open_command(), Some("xdg-open"));
        assert_eq!(config.labels().delete, "Supprimer");
        assert_eq!(config.labels().view_product, "View Product");
        assert_eq!(config.log_level(), "debug");
        assert_eq!(config.log_file()?, PathBuf::from("/tmp/stockline-test.log"));
        Ok(())
    }

    #[test]
    fn malformed_config_returns_parse_error() -> Result<()> {
        let (_temp, path) = write_config("{{not toml")?;
        let error = Config::load(&path).expect_err("malformed config should fail");
        assert!(error.to_string().contains("parse TOML config"));
        Ok(())
    }

    #[test]
    fn unsupported_config_version_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 2\n")?;
        let error = Config::load(&path).expect_err("v2 config should fail");
        assert!(error.to_string().contains("unsupported config version 2"));
        Ok(())
    }

    #[test]
    fn unknown_backend_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[source]\nbackend = \"soap\"\n")?;
        let error = Config::load(&path).expect_err("unknown backend should fail");
        assert!(error.to_string().contains("\"sqlite\" or \"http\""));
        Ok(())
    }

    #[test]
    fn record_url_requires_placeholder() -> Result<()> {
        let (_temp, path) =
            write_config("version = 1\n[navigation]\nrecord_url = \"https://records.example\"\n")?;
        let error = Config::load(&path).expect_err("record url without placeholder should fail");
        assert!(error.to_string().contains("{id}"));
        Ok(())
    }

    #[test]
    fn invalid_log_level_is_rejected() -> Result<()> {
        let (_temp, path) = write_config("version = 1\n[log]\nlevel = \"stockline=loud\"\n")?;
        let error = Config::load(&path).expect_err("bad log filter should fail");
        assert!(error.to_string().contains("log.level"));
        Ok(())
    }

    #[test]
    fn default_path_honors_env_override() -> Result<()> {
        let _guard = env_lock();
        let temp = tempfile::tempdir()?;
        let override_path = temp.path().join("custom-config.toml");
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("STOCKLINE_CONFIG_PATH", &override_path);
        }
        let resolved = Config::default_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("STOCKLINE_CONFIG_PATH");
        }
        assert_eq!(resolved, override_path);
        Ok(())
    }

    #[test]
    fn db_path_prefers_storage_config_over_env_override() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) =
            write_config("version = 1\n[storage]\ndb_path = \"/explicit/from-config.db\"\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("STOCKLINE_DB_PATH", "/from/env.db");
        }
        let config = Config::load(&path)?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("STOCKLINE_DB_PATH");
        }
        assert_eq!(config.db_path()?, PathBuf::from("/explicit/from-config.db"));
        Ok(())
    }

    #[test]
    fn db_path_uses_env_override_when_storage_db_path_missing() -> Result<()> {
        let _guard = env_lock();
        let (_temp, path) = write_config("version = 1\n")?;
        // SAFETY: test-only process-local env mutation.
        unsafe {
            std::env::set_var("STOCKLINE_DB_PATH", "/from/env-only.db");
        }
        let config = Config::load(&path)?;
        let resolved = config.db_path()?;
        // SAFETY: test cleanup for process-local env mutation.
        unsafe {
            std::env::remove_var("STOCKLINE_DB_PATH");
        }
        assert_eq!(resolved, PathBuf::from("/from/env-only.db"));
        Ok(())
    }

    #[test]
    fn db_path_rejects_uri_style_storage_value() -> Result<()> {
        let (_temp, path) = write_config(
            "version = 1\n[storage]\ndb_path = \"https://evil.example/stockline.db\"\n",
        )?;
        let error = Config::load(&path).expect_err("URI db_path should fail validation");
        let message = error.to_string();
        assert!(
            message.contains("looks like a URI") || message.contains("filesystem path"),
            "unexpected message: {message}"
        );
        Ok(())
    }

    #[test]
    fn service_timeout_parses_ms_seconds_and_minutes() -> Result<()> {
        assert_eq!(parse_duration("500ms")?, Duration::from_millis(500));
        assert_eq!(parse_duration("5s")?, Duration::from_secs(5));
        assert_eq!(parse_duration("2m")?, Duration::from_secs(120));
        Ok(())
    }

    #[test]
    fn service_timeout_rejects_invalid_and_zero_values() -> Result<()> {
        let error = parse_duration("oops").expect_err("invalid duration should fail");
        let message = error.to_string();
        assert!(
            message.contains("invalid duration") || message.contains("invalid timeout duration"),
            "unexpected message: {message}"
        );

        let (_temp, path) = write_config("version = 1\n[service]\ntimeout = \"0s\"\n")?;
        let error = Config::load(&path).expect_err("zero timeout should fail");
        assert!(error.to_string().contains("must be positive"));
        Ok(())
    }

    #[test]
    fn example_config_round_trips_through_load() -> Result<()> {
        let temp = tempfile::tempdir()?;
        let path = temp.path().join("config.toml");
        let example = Config::example_config(&path);
        assert!(example.contains("version = 1"));
        for section in [
            "[source]",
            "[storage]",
            "[service]",
            "[session]",
            "[navigation]",
            "[labels]",
            "[log]",
        ] {
            assert!(example.contains(section), "missing {section}");
        }

        std::fs::write(&path, &example)?;
        let config = Config::load(&path)?;
        assert_eq!(config.backend(), Backend::Sqlite);
        Ok(())
    }
}
