use crate::{
    config::GameConfig,
    library::{EntryId, Game, ItemKind, Pack},
};
use std::path::{Path, PathBuf};

/// Authoritative Game and Pack lists. Knows nothing about selection; `Store`
/// reconciles navigation after every mutation.
#[derive(Debug, Default)]
pub struct ViewModel {
    games: Vec<Game>,
    packs: Vec<Pack>,
}

#[derive(Debug, Clone)]
pub enum Removed {
    Game(Game),
    Pack(Pack),
}

impl ViewModel {
    pub fn games(&self) -> &[Game] {
        &self.games
    }

    pub fn packs(&self) -> &[Pack] {
        &self.packs
    }

    pub fn game(&self, id: EntryId) -> Option<&Game> {
        self.games.iter().find(|game| game.id == id)
    }

    pub fn pack(&self, id: EntryId) -> Option<&Pack> {
        self.packs.iter().find(|pack| pack.id == id)
    }

    pub fn game_at(&self, path: &Path) -> Option<&Game> {
        self.games.iter().find(|game| game.is_at(path))
    }

    pub fn pack_at(&self, path: &Path) -> Option<&Pack> {
        self.packs.iter().find(|pack| pack.is_at(path))
    }

    pub fn set_games(&mut self, games: Vec<Game>) {
        self.games = games;
    }

    pub fn set_packs(&mut self, packs: Vec<Pack>) {
        self.packs = packs;
    }

    /// Renames the entry in place and moves its path to the sibling named
    /// `new_name`. Its packs move along. Returns the updated record.
    pub fn rename_game(&mut self, id: EntryId, new_name: &str) -> Option<Game> {
        let game = self.games.iter_mut().find(|game| game.id == id)?;
        let old_path = game.path.clone();
        game.path = sibling_path(&game.path, new_name);
        game.name = new_name.to_string();
        let game = game.clone();
        self.follow_game(&old_path, &game);
        Some(game)
    }

    pub fn relocate_game(&mut self, id: EntryId, new_path: PathBuf) -> Option<Game> {
        let game = self.games.iter_mut().find(|game| game.id == id)?;
        let old_path = std::mem::replace(&mut game.path, new_path);
        let game = game.clone();
        self.follow_game(&old_path, &game);
        Some(game)
    }

    pub fn set_game_config(&mut self, id: EntryId, config: GameConfig) -> Option<Game> {
        let game = self.games.iter_mut().find(|game| game.id == id)?;
        game.config = Some(config);
        let game = game.clone();
        self.follow_game(&game.path, &game);
        Some(game)
    }

    /// Drops the entry from its list. Removing a game also drops the packs
    /// scoped to it. Absent ids are a no-op.
    pub fn remove_item(&mut self, kind: ItemKind, id: EntryId) -> Option<Removed> {
        match kind {
            ItemKind::Game => {
                let index = self.games.iter().position(|game| game.id == id)?;
                let game = self.games.remove(index);
                self.packs.retain(|pack| !pack.belongs_to(&game.path));
                Some(Removed::Game(game))
            }
            ItemKind::Pack => {
                let index = self.packs.iter().position(|pack| pack.id == id)?;
                Some(Removed::Pack(self.packs.remove(index)))
            }
        }
    }

    /// Packs carry a copy of their game. Points the ones that lived under
    /// `old_path` at the updated record and its directory.
    fn follow_game(&mut self, old_path: &Path, game: &Game) {
        for pack in self.packs.iter_mut().filter(|pack| pack.belongs_to(old_path)) {
            if let Some(file_name) = pack.path.file_name() {
                pack.path = game.path.join(file_name);
            }
            pack.game = game.clone();
        }
    }
}

fn sibling_path(path: &Path, name: &str) -> PathBuf {
    match path.parent() {
        Some(parent) => parent.join(name),
        None => PathBuf::from(name),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn game(path: &str) -> Game {
        Game::new(PathBuf::from(path), Some(GameConfig::default()))
    }

    #[test]
    fn rename_updates_name_and_sibling_path() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        let other = game("/lib/Other");
        view.set_games(vec![foo.clone(), other.clone()]);

        let renamed = view.rename_game(foo.id, "Bar").unwrap();
        assert_eq!(renamed.id, foo.id);
        assert_eq!(renamed.name, "Bar");
        assert_eq!(renamed.path, PathBuf::from("/lib/Bar"));
        assert_eq!(view.games()[0].name, "Bar");
        assert_eq!(view.games()[1].name, "Other");
        assert_eq!(view.games().len(), 2);
    }

    #[test]
    fn relocate_touches_only_the_path() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        view.set_games(vec![foo.clone()]);

        view.relocate_game(foo.id, PathBuf::from("/elsewhere/Foo"))
            .unwrap();
        assert_eq!(view.games()[0].name, "Foo");
        assert_eq!(view.games()[0].path, PathBuf::from("/elsewhere/Foo"));
    }

    #[test]
    fn operations_on_absent_items_are_noops() {
        let mut view = ViewModel::default();
        view.set_games(vec![game("/lib/Foo")]);
        let ghost = game("/lib/Ghost");

        assert!(view.rename_game(ghost.id, "X").is_none());
        assert!(view.relocate_game(ghost.id, PathBuf::from("/x")).is_none());
        assert!(view.remove_item(ItemKind::Game, ghost.id).is_none());
        assert!(view.remove_item(ItemKind::Pack, ghost.id).is_none());
        assert_eq!(view.games().len(), 1);
        assert_eq!(view.games()[0].name, "Foo");
    }

    #[test]
    fn removing_a_game_drops_its_packs() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        let bar = game("/lib/Bar");
        view.set_games(vec![foo.clone(), bar.clone()]);
        view.set_packs(vec![
            Pack::new(PathBuf::from("/lib/Foo/a.pack"), foo.clone()),
            Pack::new(PathBuf::from("/lib/Bar/b.pack"), bar.clone()),
        ]);

        let removed = view.remove_item(ItemKind::Game, foo.id);
        assert!(matches!(removed, Some(Removed::Game(ref game)) if game.id == foo.id));
        assert_eq!(view.games().len(), 1);
        assert_eq!(view.packs().len(), 1);
        assert_eq!(view.packs()[0].name, "b.pack");
    }

    #[test]
    fn removing_a_pack_leaves_games_alone() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        let pack = Pack::new(PathBuf::from("/lib/Foo/a.pack"), foo.clone());
        view.set_games(vec![foo]);
        view.set_packs(vec![pack.clone()]);

        assert!(view.remove_item(ItemKind::Pack, pack.id).is_some());
        assert!(view.packs().is_empty());
        assert_eq!(view.games().len(), 1);
    }

    #[test]
    fn packs_follow_a_renamed_game() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        let other = game("/lib/Other");
        view.set_games(vec![foo.clone(), other.clone()]);
        view.set_packs(vec![
            Pack::new(PathBuf::from("/lib/Foo/quest.pack"), foo.clone()),
            Pack::new(PathBuf::from("/lib/Other/side.pack"), other.clone()),
        ]);

        view.rename_game(foo.id, "Bar").unwrap();
        let quest = &view.packs()[0];
        assert_eq!(quest.path, PathBuf::from("/lib/Bar/quest.pack"));
        assert_eq!(quest.game.name, "Bar");
        assert_eq!(quest.game.path, PathBuf::from("/lib/Bar"));
        assert!(view.pack_at(Path::new("/lib/Bar/quest.pack")).is_some());
        assert_eq!(view.packs()[1].path, PathBuf::from("/lib/Other/side.pack"));

        view.relocate_game(foo.id, PathBuf::from("/moved/Bar")).unwrap();
        assert_eq!(view.packs()[0].path, PathBuf::from("/moved/Bar/quest.pack"));
        assert_eq!(view.packs()[0].game.path, PathBuf::from("/moved/Bar"));
    }

    #[test]
    fn packs_see_updated_game_config() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        view.set_games(vec![foo.clone()]);
        view.set_packs(vec![Pack::new(PathBuf::from("/lib/Foo/a.pack"), foo.clone())]);

        view.set_game_config(foo.id, GameConfig::new("/mods/new"));
        assert_eq!(view.packs()[0].game.mods_folder(), "/mods/new");
        assert_eq!(view.packs()[0].path, PathBuf::from("/lib/Foo/a.pack"));
    }

    #[test]
    fn set_game_config_replaces_record() {
        let mut view = ViewModel::default();
        let foo = game("/lib/Foo");
        view.set_games(vec![foo.clone()]);

        view.set_game_config(foo.id, GameConfig::new("/mods"));
        assert_eq!(view.game(foo.id).unwrap().mods_folder(), "/mods");
    }
}
