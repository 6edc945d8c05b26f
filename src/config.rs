use anyhow::{Context, Result};
use directories::BaseDirs;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

pub const GAME_CONFIG_FILE: &str = "game.yaml";
const APP_CONFIG_FILE: &str = "config.json";

/// Process-wide preferences, persisted as JSON in the app data dir.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppConfig {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub library_directory: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_browser_dir: Option<PathBuf>,
    #[serde(default = "default_true")]
    pub show_intro: bool,
    #[serde(skip)]
    data_dir: PathBuf,
}

impl AppConfig {
    pub fn load_or_create() -> Result<Self> {
        Self::load_or_create_in(base_data_dir()?)
    }

    pub fn load_or_create_in(data_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&data_dir).context("create app data dir")?;
        let path = data_dir.join(APP_CONFIG_FILE);
        if path.exists() {
            let raw = fs::read_to_string(&path).context("read app config")?;
            let mut config: AppConfig = serde_json::from_str(&raw).context("parse app config")?;
            config.data_dir = data_dir;
            return Ok(config);
        }

        let config = AppConfig {
            library_directory: None,
            last_browser_dir: None,
            show_intro: true,
            data_dir,
        };
        config.save()?;
        Ok(config)
    }

    pub fn save(&self) -> Result<()> {
        fs::create_dir_all(&self.data_dir).context("create app data dir")?;
        let path = self.data_dir.join(APP_CONFIG_FILE);
        let raw = serde_json::to_string_pretty(self).context("serialize app config")?;
        fs::write(path, raw).context("write app config")?;
        Ok(())
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn library_directory(&self) -> Option<&Path> {
        self.library_directory.as_deref()
    }

    /// `None` removes the key from the stored file.
    pub fn set_library_directory(&mut self, path: Option<PathBuf>) -> Result<()> {
        self.library_directory = path;
        self.save()
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("malformed {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
    #[error("serialize game config: {0}")]
    Serialize(#[source] serde_yaml::Error),
}

impl ConfigError {
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigError::Read { path, .. }
            | ConfigError::Write { path, .. }
            | ConfigError::Parse { path, .. } => Some(path),
            ConfigError::Serialize(_) => None,
        }
    }
}

/// Per-game settings stored next to the game's packs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameConfig {
    #[serde(default)]
    pub mods_folder_path: String,
}

impl GameConfig {
    pub fn new(mods_folder_path: impl Into<String>) -> Self {
        Self {
            mods_folder_path: mods_folder_path.into(),
        }
    }

    /// Reads `<game_dir>/game.yaml`. A missing file is first written with the
    /// default record and then read back; a malformed file is an error and is
    /// left untouched.
    pub fn load_or_create(game_dir: &Path) -> Result<Self, ConfigError> {
        let path = game_config_path(game_dir);
        if !path.exists() {
            GameConfig::default().save(game_dir)?;
        }
        let raw = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse { path, source })
    }

    /// Overwrites the sidecar file; last writer wins.
    pub fn save(&self, game_dir: &Path) -> Result<(), ConfigError> {
        let path = game_config_path(game_dir);
        let raw = serde_yaml::to_string(self).map_err(ConfigError::Serialize)?;
        fs::write(&path, raw).map_err(|source| ConfigError::Write { path, source })
    }
}

pub fn game_config_path(game_dir: &Path) -> PathBuf {
    game_dir.join(GAME_CONFIG_FILE)
}

fn default_true() -> bool {
    true
}

fn base_data_dir() -> Result<PathBuf> {
    let base = BaseDirs::new().context("resolve home dir")?;
    Ok(base.data_local_dir().join("multipack"))
}
