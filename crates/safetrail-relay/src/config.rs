//! Relay configuration.
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `SAFETRAIL_*` environment variables (e.g. `SAFETRAIL_PORT`).

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use safetrail_core::facility::FacilityCatalog;
use serde::Deserialize;

/// Runtime relay configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
  pub host:         String,
  pub port:         u16,
  /// JSON facility catalog; the built-in Bengaluru set when absent.
  pub catalog_path: Option<PathBuf>,
}

impl RelayConfig {
  pub fn load(path: &Path) -> Result<Self, config::ConfigError> {
    config::Config::builder()
      .set_default("host", "0.0.0.0")?
      .set_default("port", 3000)?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("SAFETRAIL"))
      .build()?
      .try_deserialize()
  }

  pub fn address(&self) -> String { format!("{}:{}", self.host, self.port) }

  /// Load the configured facility catalog.
  pub fn catalog(&self) -> anyhow::Result<FacilityCatalog> {
    let Some(path) = &self.catalog_path else {
      return Ok(FacilityCatalog::bengaluru());
    };
    let raw = std::fs::read_to_string(path)
      .with_context(|| format!("reading facility catalog {}", path.display()))?;
    FacilityCatalog::from_json(&raw)
      .with_context(|| format!("parsing facility catalog {}", path.display()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_file_falls_back_to_defaults() {
    let cfg = RelayConfig::load(Path::new("/nonexistent/relay.toml")).unwrap();
    assert_eq!(cfg.host, "0.0.0.0");
    assert_eq!(cfg.port, 3000);
    assert!(cfg.catalog_path.is_none());
    assert_eq!(cfg.catalog().unwrap(), FacilityCatalog::bengaluru());
  }

  #[test]
  fn file_values_override_defaults() {
    let dir = std::env::temp_dir().join(format!("safetrail-relay-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    let catalog = dir.join("catalog.json");
    std::fs::write(
      &catalog,
      r#"{"police":[{"id":1,"name":"Fort Station","lat":0.0,"lng":0.0}],"hospitals":[]}"#,
    )
    .unwrap();
    let file = dir.join("relay.toml");
    std::fs::write(
      &file,
      format!("port = 4100\ncatalog_path = {:?}\n", catalog.display().to_string()),
    )
    .unwrap();

    let cfg = RelayConfig::load(&file).unwrap();
    assert_eq!(cfg.port, 4100);
    assert_eq!(cfg.address(), "0.0.0.0:4100");
    let loaded = cfg.catalog().unwrap();
    assert_eq!(loaded.police[0].name, "Fort Station");
    assert!(loaded.hospitals.is_empty());

    std::fs::remove_dir_all(dir).ok();
  }
}
