use crate::config::GameConfig;
use std::{
    fs,
    path::{Path, PathBuf},
    sync::atomic::{AtomicU64, Ordering},
    time::{SystemTime, UNIX_EPOCH},
};

pub const PACK_EXTENSION: &str = "pack";

/// In-memory identity of a list entry. Every scan mints fresh ids; the
/// on-disk identity of an entry is its canonical path.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntryId(u64);

impl EntryId {
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        EntryId(NEXT.fetch_add(1, Ordering::Relaxed))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    Game,
    Pack,
}

impl ItemKind {
    pub fn label(self) -> &'static str {
        match self {
            ItemKind::Game => "game",
            ItemKind::Pack => "pack",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Library {
    pub name: String,
    pub root: PathBuf,
}

impl Library {
    pub fn from_path(root: PathBuf) -> Self {
        let name = file_label(&root);
        Self { name, root }
    }
}

#[derive(Debug, Clone)]
pub struct Game {
    pub id: EntryId,
    pub name: String,
    pub path: PathBuf,
    pub config: Option<GameConfig>,
}

impl Game {
    pub fn new(path: PathBuf, config: Option<GameConfig>) -> Self {
        Self {
            id: EntryId::next(),
            name: file_label(&path),
            path,
            config,
        }
    }

    pub fn mods_folder(&self) -> &str {
        self.config
            .as_ref()
            .map(|config| config.mods_folder_path.as_str())
            .unwrap_or("")
    }

    pub fn is_at(&self, path: &Path) -> bool {
        same_location(&self.path, path)
    }
}

#[derive(Debug, Clone)]
pub struct Pack {
    pub id: EntryId,
    pub name: String,
    pub path: PathBuf,
    pub game: Game,
}

impl Pack {
    pub fn new(path: PathBuf, game: Game) -> Self {
        Self {
            id: EntryId::next(),
            name: file_label(&path),
            path,
            game,
        }
    }

    pub fn is_at(&self, path: &Path) -> bool {
        same_location(&self.path, path)
    }

    pub fn belongs_to(&self, game_path: &Path) -> bool {
        same_location(&self.game.path, game_path)
    }

    pub fn stem(&self) -> &str {
        self.name
            .strip_suffix(PACK_EXTENSION)
            .and_then(|rest| rest.strip_suffix('.'))
            .unwrap_or(&self.name)
    }

    pub fn size_bytes(&self) -> Option<u64> {
        fs::metadata(&self.path).ok().map(|meta| meta.len())
    }

    pub fn modified_at(&self) -> Option<i64> {
        fs::metadata(&self.path)
            .ok()
            .and_then(|meta| meta.modified().ok())
            .and_then(system_time_to_epoch)
    }
}

pub fn pack_file_name(name: &str) -> String {
    format!("{name}.{PACK_EXTENSION}")
}

/// Canonical form used to decide whether two paths name the same entry.
/// Paths that no longer exist compare by their literal form.
pub fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

pub fn same_location(left: &Path, right: &Path) -> bool {
    left == right || canonical(left) == canonical(right)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .and_then(|name| name.to_str())
        .map(|name| name.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

fn system_time_to_epoch(time: SystemTime) -> Option<i64> {
    time.duration_since(UNIX_EPOCH)
        .ok()
        .map(|duration| duration.as_secs() as i64)
}
