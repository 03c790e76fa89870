//! Runtime configuration.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::{Context as _, ensure};
use booker_engine::RetryPolicy;
use config::{Config, ConfigBuilder, Environment, File, builder::DefaultState};
use serde::Deserialize;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `BOOKER_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:                 String,
  pub port:                 u16,
  pub store_path:           PathBuf,
  pub sweep_interval_secs:  u64,
  pub retry_attempts:       usize,
  pub retry_base_delay_ms:  u64,
  /// Upper bound on handling one HTTP request.
  pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:                 "0.0.0.0".to_owned(),
      port:                 8080,
      store_path:           PathBuf::from("booker.db"),
      sweep_interval_secs:  30,
      retry_attempts:       3,
      retry_base_delay_ms:  500,
      request_timeout_secs: 10,
    }
  }
}

impl ServerConfig {
  /// Layer the environment over the (optional) file at `path`.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let builder = Config::builder()
      .add_source(File::from(path).required(false))
      .add_source(Environment::with_prefix("BOOKER"));
    Self::from_builder(builder)
  }

  fn from_builder(builder: ConfigBuilder<DefaultState>) -> anyhow::Result<Self> {
    let cfg: Self = builder
      .build()
      .context("failed to read config")?
      .try_deserialize()
      .context("failed to deserialise ServerConfig")?;
    cfg.validate()?;
    Ok(cfg)
  }

  pub fn validate(&self) -> anyhow::Result<()> {
    ensure!(self.sweep_interval_secs > 0, "sweep_interval_secs must be greater than zero");
    ensure!(self.retry_attempts >= 1, "retry_attempts must be at least 1");
    ensure!(self.request_timeout_secs > 0, "request_timeout_secs must be greater than zero");
    Ok(())
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn sweep_interval(&self) -> Duration { Duration::from_secs(self.sweep_interval_secs) }

  pub fn request_timeout(&self) -> Duration { Duration::from_secs(self.request_timeout_secs) }

  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy::new(self.retry_attempts, Duration::from_millis(self.retry_base_delay_ms))
  }

  /// `store_path` with a leading `~` expanded to the user's home directory.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
