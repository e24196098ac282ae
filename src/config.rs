use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// How variant attributes are laid out in the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageLayout {
    /// One extension table per variant, joined 1:1 on the component id
    Separate,
    /// All variant columns folded into the `components` table
    Wide,
}

impl StorageLayout {
    pub fn as_str(&self) -> &'static str {
        match self {
            StorageLayout::Separate => "separate",
            StorageLayout::Wide => "wide",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "separate" => Some(StorageLayout::Separate),
            "wide" => Some(StorageLayout::Wide),
            _ => None,
        }
    }
}

impl fmt::Display for StorageLayout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Options recognized by the component store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// `true` stores each variant's attributes in its own table joined by id;
    /// `false` stores everything in one wide table.
    pub separate_storage_per_variant: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            separate_storage_per_variant: true,
        }
    }
}

impl StoreConfig {
    pub fn separate() -> Self {
        Self {
            separate_storage_per_variant: true,
        }
    }

    pub fn wide() -> Self {
        Self {
            separate_storage_per_variant: false,
        }
    }

    pub fn layout(&self) -> StorageLayout {
        if self.separate_storage_per_variant {
            StorageLayout::Separate
        } else {
            StorageLayout::Wide
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct CompstoreConfig {
    pub database: Option<String>,
    #[serde(default)]
    pub store: StoreConfig,
}

pub fn default_config_path() -> PathBuf {
    PathBuf::from("compstore.toml")
}

pub fn default_database_path() -> PathBuf {
    PathBuf::from("compstore.db")
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Option<CompstoreConfig>> {
    let path = path.map(Path::to_path_buf).unwrap_or_else(default_config_path);
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(&path)?;
    let config: CompstoreConfig = toml::from_str(&contents)?;
    Ok(Some(config))
}

pub fn write_config(path: &Path, config: &CompstoreConfig, force: bool) -> anyhow::Result<()> {
    if path.exists() && !force {
        anyhow::bail!("config already exists at {} (use --force to overwrite)", path.display());
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(path, contents)?;
    Ok(())
}

pub fn ensure_db_dir(db_path: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() && !parent.exists() {
            std::fs::create_dir_all(parent)?;
        }
    }
    Ok(())
}
