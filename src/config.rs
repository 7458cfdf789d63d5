//! Settings for the preview server and the renderers.
//!
//! Read from a TOML file (`TEXMARK_CONFIG`, default `texmark.toml`); a
//! missing file means defaults. `PORT` and `RUST_ENV` override the file.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, info};

use crate::bootstrap::{BootstrapOptions, DEFAULT_CDN_URL};
use crate::error::Result;
use crate::latex::TransformOptions;

pub const CONFIG_ENV: &str = "TEXMARK_CONFIG";
pub const DEFAULT_CONFIG_PATH: &str = "texmark.toml";

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub render: RenderConfig,
    pub mathjax: MathJaxSettings,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
    pub content_dir: PathBuf,
    /// Enables hot reload.
    pub development: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            content_dir: PathBuf::from("content"),
            development: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub header_window: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            header_window: TransformOptions::default().header_window,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct MathJaxSettings {
    pub cdn_url: String,
    pub load_timeout_ms: u64,
    pub poll_interval_ms: u64,
}

impl Default for MathJaxSettings {
    fn default() -> Self {
        Self {
            cdn_url: String::from(DEFAULT_CDN_URL),
            load_timeout_ms: 15_000,
            poll_interval_ms: 50,
        }
    }
}

impl Config {
    pub fn from_toml_str(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// Reads `path`, falling back to defaults when it does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(source) => {
                info!(path = %path.display(), "loaded configuration");
                Self::from_toml_str(&source)
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "no configuration file, using defaults");
                Ok(Self::default())
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Loads the configured file and applies environment overrides.
    pub fn from_env() -> Result<Self> {
        let path = std::env::var(CONFIG_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        let mut config = Self::load(Path::new(&path))?;
        config.apply_overrides(
            std::env::var("PORT").ok().as_deref(),
            std::env::var("RUST_ENV").ok().as_deref(),
        );
        Ok(config)
    }

    fn apply_overrides(&mut self, port: Option<&str>, rust_env: Option<&str>) {
        if let Some(port) = port.and_then(|p| p.parse().ok()) {
            self.server.port = port;
        }
        if let Some(rust_env) = rust_env {
            self.server.development = rust_env == "development";
        }
    }

    pub fn transform_options(&self) -> TransformOptions {
        TransformOptions {
            header_window: self.render.header_window,
        }
    }

    pub fn bootstrap_options(&self) -> BootstrapOptions {
        BootstrapOptions {
            cdn_url: self.mathjax.cdn_url.clone(),
            poll_interval: Duration::from_millis(self.mathjax.poll_interval_ms),
            load_timeout: Duration::from_millis(self.mathjax.load_timeout_ms),
            ..BootstrapOptions::default()
        }
    }
}
