// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

use anyhow::{Context, Result, anyhow, bail};
use catalog_app::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing_subscriber::EnvFilter;
use url::Url;

pub const APP_NAME: &str = "catalog-admin";
const CONFIG_VERSION: i64 = 1;
const CONFIG_PATH_ENV: &str = "CATALOG_ADMIN_CONFIG_PATH";
const API_URL_ENV: &str = "CATALOG_ADMIN_API_URL";
const DEFAULT_API_BASE_URL: &str = "http://localhost:3000/api";
const DEFAULT_TIMEOUT: &str = "10s";
const DEFAULT_CURRENCY_SYMBOL: &str = "€";
const DEFAULT_LOG_LEVEL: &str = "info";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub version: i64,
    #[serde(default)]
    pub api: Api,
    #[serde(default)]
    pub ui: Ui,
    #[serde(default)]
    pub log: Log,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            api: Api::default(),
            ui: Ui::default(),
            log: Log::default(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Api {
    pub base_url: Option<String>,
    pub timeout: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Ui {
    pub page_size: Option<u32>,
    pub include_deleted: Option<bool>,
    pub currency_symbol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Log {
    pub level: Option<String>,
    pub file: Option<String>,
}

impl Config {
    pub fn default_path() -> Result<PathBuf> {
        if let Some(path) = env::var_os(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_root = dirs::config_dir().ok_or_else(|| {
            anyhow!("cannot resolve config directory; set {CONFIG_PATH_ENV} to the config file")
        })?;
        Ok(config_root.join(APP_NAME).join("config.toml"))
    }

    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            let config = Self::default();
            config.validate(path)?;
            return Ok(config);
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
                    "config file {} has no version. Add `version = 1` and put values under [api], [ui], and [log]",
                    path.display()
                )
            })?;

        if version != CONFIG_VERSION {
            bail!(
                "unsupported config version {} in {}; expected version = 1",
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
        let base_url = self.api_base_url();
        let parsed = Url::parse(&base_url).with_context(|| {
            format!(
                "api.base_url {base_url:?} in {} is not a valid URL",
                path.display()
            )
        })?;
        if !matches!(parsed.scheme(), "http" | "https") {
            bail!(
                "api.base_url in {} must use http or https, got {:?}",
                path.display(),
                parsed.scheme()
            );
        }

        if let Some(timeout) = &self.api.timeout {
            let parsed = parse_duration(timeout)?;
            if parsed <= Duration::ZERO {
                bail!(
                    "api.timeout in {} must be positive, got {}",
                    path.display(),
                    timeout
                );
            }
        }

        if let Some(page_size) = self.ui.page_size
            && !(1..=MAX_PAGE_SIZE).contains(&page_size)
        {
            bail!(
                "ui.page_size in {} must be between 1 and {MAX_PAGE_SIZE}, got {}",
                path.display(),
                page_size
            );
        }

        if let Some(level) = &self.log.level {
            EnvFilter::try_new(level).with_context(|| {
                format!(
                    "log.level {level:?} in {} is not a valid filter; use error, warn, info, debug, or trace",
                    path.display()
                )
            })?;
        }

        Ok(())
    }

    /// `[api].base_url`, then `CATALOG_ADMIN_API_URL`, then the local default.
    pub fn api_base_url(&self) -> String {
        let raw = match &self.api.base_url {
            Some(url) => url.clone(),
            None => env::var(API_URL_ENV).unwrap_or_else(|_| DEFAULT_API_BASE_URL.to_owned()),
        };
        raw.trim().trim_end_matches('/').to_owned()
    }

    pub fn api_timeout(&self) -> Result<Duration> {
        parse_duration(self.api.timeout.as_deref().unwrap_or(DEFAULT_TIMEOUT))
    }

    pub fn page_size(&self) -> u32 {
        self.ui.page_size.unwrap_or(DEFAULT_PAGE_SIZE)
    }

    pub fn include_deleted(&self) -> bool {
        self.ui.include_deleted.unwrap_or(false)
    }

    pub fn currency_symbol(&self) -> &str {
        self.ui
            .currency_symbol
            .as_deref()
            .unwrap_or(DEFAULT_CURRENCY_SYMBOL)
    }

    pub fn log_level(&self) -> &str {
        self.log.level.as_deref().unwrap_or(DEFAULT_LOG_LEVEL)
    }

    pub fn log_path(&self) -> Result<PathBuf> {
        if let Some(file) = &self.log.file {
            return Ok(PathBuf::from(file));
        }
        let data_root = dirs::data_dir().ok_or_else(|| {
            anyhow!("cannot resolve data directory; set [log].file to an absolute path")
        })?;
        Ok(data_root.join(APP_NAME).join(format!("{APP_NAME}.log")))
    }

    pub fn example_config(path: &Path) -> String {
        format!(
            "# catalog-admin config\n# Place this file at: {}\n\nversion = 1\n\n[api]\n# {API_URL_ENV} is used when base_url is unset\nbase_url = \"{DEFAULT_API_BASE_URL}\"\ntimeout = \"{DEFAULT_TIMEOUT}\"\n\n[ui]\npage_size = {DEFAULT_PAGE_SIZE}\ninclude_deleted = false\ncurrency_symbol = \"{DEFAULT_CURRENCY_SYMBOL}\"\n\n[log]\n# RUST_LOG overrides this\nlevel = \"{DEFAULT_LOG_LEVEL}\"\n# Optional. Default is the platform data dir (for example ~/.local/share/catalog-admin/catalog-admin.log)\n# file = \"/absolute/path/catalog-admin.log\"\n",
            path.display(),
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

    bail!("invalid duration {raw:?}; use one of: <N>ms, <N>s, <N>m (for example 500ms or 10s)")
}
