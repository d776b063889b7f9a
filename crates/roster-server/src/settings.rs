//! Server configuration: an optional TOML file layered under `ROSTER_*`
//! environment variables.

use std::{
  path::{Path, PathBuf},
  time::Duration,
};

use anyhow::Context as _;
use serde::Deserialize;

/// Runtime server configuration, deserialised from `roster.toml`.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:                String,
  #[serde(default = "default_port")]
  pub port:                u16,
  #[serde(default = "default_store_path")]
  pub store_path:          PathBuf,
  /// argon2 PHC string; admin reset is refused while unset.
  #[serde(default)]
  pub admin_password_hash: Option<String>,
  #[serde(default = "default_busy_timeout_ms")]
  pub busy_timeout_ms:     u64,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_store_path() -> PathBuf { PathBuf::from("~/.local/share/roster/roster.db") }

fn default_busy_timeout_ms() -> u64 {
  roster_store_sqlite::DEFAULT_BUSY_TIMEOUT.as_millis() as u64
}

impl ServerConfig {
  /// Read `path` (if present) and the environment.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let settings = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("ROSTER"))
      .build()
      .context("failed to read config file")?;

    settings
      .try_deserialize()
      .context("failed to deserialise ServerConfig")
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  pub fn busy_timeout(&self) -> Duration { Duration::from_millis(self.busy_timeout_ms) }

  /// `store_path` with a leading `~` expanded.
  pub fn resolved_store_path(&self) -> PathBuf { expand_tilde(&self.store_path) }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;
  use config::{Config, File, FileFormat};

  fn from_toml(toml: &str) -> ServerConfig {
    Config::builder()
      .add_source(File::from_str(toml, FileFormat::Toml))
      .build()
      .unwrap()
      .try_deserialize()
      .unwrap()
  }

  #[test]
  fn empty_file_uses_defaults() {
    let cfg = from_toml("");
    assert_eq!(cfg.address(), "127.0.0.1:8080");
    assert_eq!(cfg.busy_timeout(), Duration::from_secs(5));
    assert!(cfg.admin_password_hash.is_none());
  }

  #[test]
  fn file_values_override_defaults() {
    let cfg = from_toml(
      r#"
        host = "0.0.0.0"
        port = 9000
        store_path = "/var/lib/roster/roster.db"
        admin_password_hash = "$argon2id$v=19$stub"
        busy_timeout_ms = 250
      "#,
    );
    assert_eq!(cfg.address(), "0.0.0.0:9000");
    assert_eq!(cfg.resolved_store_path(), PathBuf::from("/var/lib/roster/roster.db"));
    assert_eq!(cfg.busy_timeout(), Duration::from_millis(250));
    assert_eq!(cfg.admin_password_hash.as_deref(), Some("$argon2id$v=19$stub"));
  }

  #[test]
  fn missing_file_is_not_an_error() {
    let cfg = ServerConfig::load(Path::new("/nonexistent/roster.toml")).unwrap();
    assert_eq!(cfg.port, 8080);
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    let plain = Path::new("/tmp/roster.db");
    assert_eq!(expand_tilde(plain), plain);
    let odd = Path::new("/tmp/~/roster.db");
    assert_eq!(expand_tilde(odd), odd);
  }
}
