use std::path::Path;

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

use crate::errors::{Result, VaultError};

pub const LOG_ENV: &str = "VAULT_LOG";

/// `VAULT_LOG` wins over the configured level. A level that does not parse
/// falls back to `warn`.
fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_new(default_level))
        .unwrap_or_else(|_| EnvFilter::new("warn"))
}

/// Logs to stderr. Safe to call more than once.
pub fn init(default_level: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Logs to `path` instead of the terminal, for full-screen mode.
pub fn init_to_file(path: &Path, default_level: &str) -> Result<()> {
    let file_name = path
        .file_name()
        .ok_or_else(|| VaultError::InvalidInput(format!("{} is not a file", path.display())))?;
    let dir = path.parent().unwrap_or(Path::new("."));
    std::fs::create_dir_all(dir)?;
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(dir)
        .map_err(std::io::Error::other)?;
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter(default_level))
        .with_target(false)
        .with_ansi(false)
        .with_writer(appender)
        .try_init();
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_init_to_file_creates_log() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("logs/vault.log");
        init_to_file(&path, "info").unwrap();
        assert!(path.exists());
    }

    #[test]
    fn test_init_to_file_rejects_directory_path() {
        let result = init_to_file(Path::new("/"), "info");
        assert!(matches!(result, Err(VaultError::InvalidInput(_))));
    }

    #[test]
    fn test_init_twice_is_harmless() {
        init("not a level ===");
        init("debug");
    }
}
