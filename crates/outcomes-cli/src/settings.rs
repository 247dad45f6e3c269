//! Layered configuration: defaults, then `outcomes.toml`, then `OUTCOMES_*`
//! environment variables. Command-line flags are applied on top by `main`.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Settings {
  /// SQLite database file; a leading `~/` is expanded.
  pub database_path:       PathBuf,
  /// Identity written to the audit columns.
  pub acting_user:         Option<String>,
  /// Institution that owns imported ISLOs.
  pub institution_code:    String,
  /// Bound on messages kept in an import report.
  pub max_report_messages: usize,
}

impl Default for Settings {
  fn default() -> Self {
    Self {
      database_path:       PathBuf::from("outcomes.sqlite3"),
      acting_user:         None,
      institution_code:    "DEFAULT".to_string(),
      max_report_messages: outcomes_core::import::DEFAULT_MAX_MESSAGES,
    }
  }
}

impl Settings {
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    let mut settings: Self = config::Config::builder()
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("OUTCOMES").try_parsing(true))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise settings")?;
    settings.database_path = expand_tilde(&settings.database_path);
    Ok(settings)
  }
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &Path) -> PathBuf {
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

  #[test]
  fn missing_file_yields_defaults() {
    let settings =
      Settings::load(Path::new("/nonexistent/outcomes-test.toml")).unwrap();
    assert_eq!(settings.institution_code, "DEFAULT");
    assert_eq!(settings.max_report_messages, 50);
  }

  #[test]
  fn file_values_override_defaults() {
    let path = std::env::temp_dir()
      .join(format!("outcomes-settings-{}.toml", std::process::id()));
    std::fs::write(
      &path,
      "acting_user = \"registrar\"\nmax_report_messages = 5\n",
    )
    .unwrap();
    let settings = Settings::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(settings.acting_user.as_deref(), Some("registrar"));
    assert_eq!(settings.max_report_messages, 5);
    assert_eq!(settings.database_path, PathBuf::from("outcomes.sqlite3"));
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    assert_eq!(expand_tilde(Path::new("/a/~/b")), PathBuf::from("/a/~/b"));
    if let Ok(home) = std::env::var("HOME") {
      assert_eq!(
        expand_tilde(Path::new("~/db.sqlite3")),
        PathBuf::from(home).join("db.sqlite3")
      );
    }
  }
}
