use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::filter::{FilterType, SortMode};

pub const HOME_ENV: &str = "VAULT_HOME";

pub struct AppPaths {
    pub base_dir: PathBuf,
    pub db_path: PathBuf,
    pub uploads_dir: PathBuf,
    pub session_file: PathBuf,
    pub config_file: PathBuf,
    pub log_file: PathBuf,
}

impl AppPaths {
    /// `$VAULT_HOME` when set, `~/.vault` otherwise.
    pub fn resolve() -> Result<Self> {
        if let Some(dir) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(Self::from_base(PathBuf::from(dir)));
        }
        let home = dirs::home_dir()
            .ok_or_else(|| VaultError::Config("could not determine home directory".into()))?;
        Ok(Self::from_base(home.join(".vault")))
    }

    pub fn from_base(base: PathBuf) -> Self {
        Self {
            db_path: base.join("vault.db"),
            uploads_dir: base.join("uploads"),
            session_file: base.join("session.json"),
            config_file: base.join("config.toml"),
            log_file: base.join("vault.log"),
            base_dir: base,
        }
    }

    pub fn ensure_dirs(&self) -> Result<()> {
        fs::create_dir_all(&self.base_dir)?;
        fs::create_dir_all(&self.uploads_dir)?;
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VaultConfig {
    pub default_filter: FilterType,
    pub default_sort: SortMode,
    pub list_limit: usize,
    pub max_upload_bytes: u64,
    pub log_level: String,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            default_filter: FilterType::All,
            default_sort: SortMode::Recent,
            list_limit: 20,
            max_upload_bytes: 5 * 1024 * 1024,
            log_level: "warn".to_string(),
        }
    }
}

impl VaultConfig {
    /// A missing file yields the defaults.
    pub fn load(path: &Path) -> Result<Self> {
        match fs::read_to_string(path) {
            Ok(contents) => Self::parse(&contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(VaultError::Io(e)),
        }
    }

    pub fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| VaultError::Config(e.to_string()))
    }
}
