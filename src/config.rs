//! Server configuration
//!
//! Loaded from a YAML file (path given as the first CLI argument or in
//! `LANTERN_CONFIG`), then overridden by the `LISTEN` and `DOCROOT`
//! environment variables. Every field has a default, so running without a
//! file serves `./public` on `127.0.0.1:8080`.
//!
//! ```yaml
//! server:
//!   listen_addr: "0.0.0.0:8080"
//!   max_connections: 256
//!   idle_timeout_secs: 30
//! static_files:
//!   root: ./public
//!   not_found_page: 404.html
//! ```

use std::path::{Component, Path, PathBuf};
use std::time::Duration;

use anyhow::Context;
use serde::Deserialize;

use crate::http::connection::{ConnectionOptions, DEFAULT_MAX_HEAD_SIZE};

pub const CONFIG_ENV: &str = "LANTERN_CONFIG";
pub const LISTEN_ENV: &str = "LISTEN";
pub const DOCROOT_ENV: &str = "DOCROOT";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub server: ServerConfig,
    pub static_files: StaticFilesConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Connections processed at once; extra ones wait for a free slot
    pub max_connections: Option<usize>,
    /// Close connections whose reads stay silent this long
    pub idle_timeout_secs: Option<u64>,
    pub max_head_size: usize,
    pub log_level: String,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StaticFilesConfig {
    pub root: PathBuf,
    /// Served for `/` and for directory paths
    pub index: String,
    pub not_found_page: Option<String>,
    pub bad_request_page: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:8080".to_string(),
            max_connections: None,
            idle_timeout_secs: None,
            max_head_size: DEFAULT_MAX_HEAD_SIZE,
            log_level: "info".to_string(),
        }
    }
}

impl Default for StaticFilesConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./public"),
            index: "index.html".to_string(),
            not_found_page: None,
            bad_request_page: None,
        }
    }
}

impl Config {
    /// Builds the process configuration from the CLI, environment and file.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::args()
            .nth(1)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        let mut cfg = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };

        cfg.apply_overrides(
            std::env::var(LISTEN_ENV).ok(),
            std::env::var(DOCROOT_ENV).ok(),
        );
        cfg.validate()?;

        Ok(cfg)
    }

    pub fn from_file(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;

        Self::from_yaml_str(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    pub fn from_yaml_str(contents: &str) -> anyhow::Result<Self> {
        Ok(serde_yaml::from_str(contents)?)
    }

    pub fn apply_overrides(&mut self, listen_addr: Option<String>, docroot: Option<String>) {
        if let Some(addr) = listen_addr {
            self.server.listen_addr = addr;
        }
        if let Some(root) = docroot {
            self.static_files.root = PathBuf::from(root);
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.server.listen_addr.trim().is_empty() {
            anyhow::bail!("server.listen_addr must not be empty");
        }
        if self.server.max_head_size == 0 {
            anyhow::bail!("server.max_head_size must be > 0");
        }
        if self.server.max_connections == Some(0) {
            anyhow::bail!("server.max_connections must be >= 1");
        }
        if self.server.idle_timeout_secs == Some(0) {
            anyhow::bail!("server.idle_timeout_secs must be > 0");
        }
        self.log_level()?;

        check_relative("static_files.index", &self.static_files.index)?;
        if let Some(page) = &self.static_files.not_found_page {
            check_relative("static_files.not_found_page", page)?;
        }
        if let Some(page) = &self.static_files.bad_request_page {
            check_relative("static_files.bad_request_page", page)?;
        }

        Ok(())
    }

    pub fn log_level(&self) -> anyhow::Result<tracing::Level> {
        self.server
            .log_level
            .parse()
            .map_err(|_| anyhow::anyhow!("unknown log level {:?}", self.server.log_level))
    }

    pub fn connection_options(&self) -> ConnectionOptions {
        ConnectionOptions {
            idle_timeout: self.server.idle_timeout_secs.map(Duration::from_secs),
            max_head_size: self.server.max_head_size,
        }
    }
}

/// Docroot-relative paths must stay inside the docroot.
fn check_relative(field: &str, value: &str) -> anyhow::Result<()> {
    if value.is_empty() {
        anyhow::bail!("{field} must not be empty");
    }

    let escapes = Path::new(value)
        .components()
        .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));
    if escapes {
        anyhow::bail!("{field} must be a relative path inside the document root: {value:?}");
    }

    Ok(())
}
