use anyhow::Context;
use std::env;
use std::path::PathBuf;
use std::str::FromStr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StorageBackend {
    Sled,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sled" => Ok(Self::Sled),
            "memory" => Ok(Self::Memory),
            other => Err(anyhow::anyhow!("unknown storage backend '{other}'")),
        }
    }
}

#[derive(Clone, Debug)]
pub struct Config {
    pub storage: StorageBackend,
    pub db_path: PathBuf,
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage: StorageBackend::Sled,
            db_path: PathBuf::from("shareit.db"),
            log_filter: "shareit=info".to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();

        let defaults = Self::default();
        let storage = match env::var("SHAREIT_STORAGE") {
            Ok(value) => value.parse().context("SHAREIT_STORAGE")?,
            Err(_) => defaults.storage,
        };

        Ok(Config {
            storage,
            db_path: env::var("SHAREIT_DB_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.db_path),
            log_filter: env::var("SHAREIT_LOG").unwrap_or(defaults.log_filter),
        })
    }
}
