//! Rebuilds the Game and Pack lists from the filesystem.
//!
//! Both scans only read (plus the one-time sidecar creation) and return a
//! complete list; callers replace their list with it in one step.

use crate::{
    config::{ConfigError, GameConfig},
    file_ops,
    library::{Game, Library, Pack, PACK_EXTENSION},
};
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScanError {
    #[error("no game named {game:?} owns {}", pack.display())]
    UnknownGame { game: String, pack: PathBuf },
}

#[derive(Debug, Default)]
pub struct GameScan {
    pub games: Vec<Game>,
    /// Games left out because their sidecar could not be read or written.
    pub failures: Vec<ConfigError>,
}

/// One Game per subdirectory of the library root, in directory-listing order.
/// A missing `game.yaml` is created with defaults; a malformed one keeps that
/// game out of the result.
pub fn scan_games(library: &Library) -> GameScan {
    let mut scan = GameScan::default();
    for dir in file_ops::list_subdirectories(&library.root) {
        match GameConfig::load_or_create(&dir) {
            Ok(config) => scan.games.push(Game::new(dir, Some(config))),
            Err(err) => scan.failures.push(err),
        }
    }
    scan
}

/// Packs inside `game`'s directory. The owning game is looked up by directory
/// name in `current_games`; a miss means the snapshot is stale.
pub fn scan_packs(game: &Game, current_games: &[Game]) -> Result<Vec<Pack>, ScanError> {
    let mut packs = Vec::new();
    for file in file_ops::list_files_by_extension(&game.path, PACK_EXTENSION) {
        let parent_name = file
            .parent()
            .and_then(|parent| parent.file_name())
            .and_then(|name| name.to_str())
            .unwrap_or_default()
            .to_string();
        let Some(owner) = current_games.iter().find(|game| game.name == parent_name) else {
            return Err(ScanError::UnknownGame {
                game: parent_name,
                pack: file,
            });
        };
        packs.push(Pack::new(file, owner.clone()));
    }
    Ok(packs)
}
