//! Single owner of the lists and the navigation state. Every list mutation
//! goes through here and reconciles the selection before returning, so a
//! reader never sees a selection pointing at a missing entry.

use crate::{
    config::GameConfig,
    library::{EntryId, Game, ItemKind, Library, Pack},
    navigation::{NavigationState, Reconciled},
    view_model::{Removed, ViewModel},
};
use std::{path::PathBuf, time::Instant};

#[derive(Debug)]
pub struct Store {
    view: ViewModel,
    nav: NavigationState,
}

impl Store {
    pub fn new(show_intro: bool) -> Self {
        Self {
            view: ViewModel::default(),
            nav: NavigationState::new(show_intro, Instant::now()),
        }
    }

    pub fn view(&self) -> &ViewModel {
        &self.view
    }

    pub fn nav(&self) -> &NavigationState {
        &self.nav
    }

    /// Navigation changes that do not touch the lists.
    pub fn nav_mut(&mut self) -> &mut NavigationState {
        &mut self.nav
    }

    /// Opening a library empties both lists until its first scan lands.
    pub fn set_library(&mut self, library: Option<Library>) {
        self.nav.set_library(library);
        self.view.set_games(Vec::new());
        self.view.set_packs(Vec::new());
    }

    pub fn replace_games(&mut self, games: Vec<Game>) -> Reconciled {
        self.view.set_games(games);
        let out = self.nav.reconcile(&self.view);
        if self.nav.selected_game().is_none() {
            self.view.set_packs(Vec::new());
        }
        out
    }

    pub fn replace_packs(&mut self, packs: Vec<Pack>) -> Reconciled {
        self.view.set_packs(packs);
        self.nav.reconcile(&self.view)
    }

    /// Mirrors an on-disk directory rename. The selection follows the entry.
    pub fn rename_game(&mut self, id: EntryId, new_name: &str) -> Option<Game> {
        let game = self.view.rename_game(id, new_name)?;
        self.nav
            .rename_selected_game(game.id, &game.name, game.path.clone());
        Some(game)
    }

    pub fn relocate_game(&mut self, id: EntryId, new_path: PathBuf) -> Option<Game> {
        let game = self.view.relocate_game(id, new_path)?;
        self.nav
            .rename_selected_game(game.id, &game.name, game.path.clone());
        Some(game)
    }

    pub fn set_game_config(&mut self, id: EntryId, config: GameConfig) -> Option<Game> {
        self.view.set_game_config(id, config)
    }

    pub fn remove_item(&mut self, kind: ItemKind, id: EntryId) -> Option<Removed> {
        let removed = self.view.remove_item(kind, id)?;
        self.nav.reconcile(&self.view);
        Some(removed)
    }

    /// Returns false when `id` is not in the games list.
    pub fn select_game(&mut self, id: EntryId) -> bool {
        let Some(game) = self.view.game(id) else {
            return false;
        };
        let switched = !self.nav.is_game_selected(game);
        self.nav.select_game(game);
        if switched {
            self.view.set_packs(Vec::new());
        }
        true
    }

    pub fn clear_game(&mut self) {
        self.nav.clear_game();
        self.view.set_packs(Vec::new());
    }

    pub fn select_pack(&mut self, id: EntryId) -> bool {
        let Some(pack) = self.view.pack(id) else {
            return false;
        };
        self.nav.select_pack(pack);
        true
    }

    pub fn selected_game(&self) -> Option<&Game> {
        let selected = self.nav.selected_game()?;
        self.view.game(selected.id)
    }

    pub fn selected_pack(&self) -> Option<&Pack> {
        let selected = self.nav.selected_pack()?;
        self.view.pack(selected.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::navigation::Panel;

    fn game(path: &str) -> Game {
        Game::new(PathBuf::from(path), Some(GameConfig::default()))
    }

    fn store_with(games: Vec<Game>, packs: Vec<Pack>) -> Store {
        let mut store = Store::new(false);
        store.set_library(Some(Library::from_path(PathBuf::from("/lib"))));
        store.replace_games(games);
        store.view.set_packs(packs);
        store
    }

    #[test]
    fn replacing_games_without_selected_clears_selection() {
        let skyrim = game("/lib/Skyrim");
        let fallout = game("/lib/Fallout");
        let quest = Pack::new(PathBuf::from("/lib/Skyrim/quest.pack"), skyrim.clone());
        let mut store = store_with(vec![skyrim.clone(), fallout.clone()], vec![quest.clone()]);
        assert!(store.select_game(skyrim.id));
        assert!(store.select_pack(quest.id));

        let out = store.replace_games(vec![game("/lib/Fallout")]);
        assert!(out.game_cleared);
        assert!(out.pack_cleared);
        assert!(store.selected_game().is_none());
        assert!(store.selected_pack().is_none());
        assert!(store.view().packs().is_empty());
        assert_eq!(store.nav().panel(), Panel::Browsing);
    }

    #[test]
    fn rename_selected_game_keeps_packs_and_selection() {
        let foo = game("/lib/Foo");
        let quest = Pack::new(PathBuf::from("/lib/Foo/quest.pack"), foo.clone());
        let mut store = store_with(vec![foo.clone()], vec![quest.clone()]);
        store.select_game(foo.id);
        store.view.set_packs(vec![quest.clone()]);

        let renamed = store.rename_game(foo.id, "Bar").unwrap();
        assert!(renamed.path.ends_with("Bar"));
        assert_eq!(store.view().games()[0].name, "Bar");
        assert_eq!(store.nav().selected_game().unwrap().name, "Bar");
        assert_eq!(store.selected_game().unwrap().id, foo.id);
        assert_eq!(store.view().packs().len(), 1);
        assert_eq!(store.view().packs()[0].name, "quest.pack");
    }

    #[test]
    fn selected_pack_survives_reconcile_after_game_rename() {
        let foo = game("/lib/Foo");
        let quest = Pack::new(PathBuf::from("/lib/Foo/quest.pack"), foo.clone());
        let other = Pack::new(PathBuf::from("/lib/Foo/other.pack"), foo.clone());
        let mut store = store_with(vec![foo.clone()], Vec::new());
        store.select_game(foo.id);
        store.replace_packs(vec![quest.clone(), other.clone()]);
        store.select_pack(quest.id);

        store.rename_game(foo.id, "Bar").unwrap();
        assert_eq!(
            store.nav().selected_pack().unwrap().path,
            PathBuf::from("/lib/Bar/quest.pack")
        );
        assert_eq!(
            store.selected_pack().unwrap().path,
            PathBuf::from("/lib/Bar/quest.pack")
        );

        store.remove_item(ItemKind::Pack, other.id);
        let selected = store.selected_pack().unwrap();
        assert_eq!(selected.id, quest.id);
        assert_eq!(selected.game.name, "Bar");
        assert_eq!(store.nav().panel(), Panel::Detail);
    }

    #[test]
    fn removing_selected_pack_keeps_game() {
        let skyrim = game("/lib/Skyrim");
        let quest = Pack::new(PathBuf::from("/lib/Skyrim/quest.pack"), skyrim.clone());
        let other = Pack::new(PathBuf::from("/lib/Skyrim/other.pack"), skyrim.clone());
        let mut store = store_with(vec![skyrim.clone()], Vec::new());
        store.select_game(skyrim.id);
        store.replace_packs(vec![quest.clone(), other.clone()]);
        store.select_pack(quest.id);

        assert!(matches!(
            store.remove_item(ItemKind::Pack, quest.id),
            Some(Removed::Pack(_))
        ));
        assert_eq!(store.view().packs().len(), 1);
        assert!(store.selected_pack().is_none());
        assert_eq!(store.selected_game().unwrap().id, skyrim.id);
    }

    #[test]
    fn removing_selected_game_clears_pack_selection() {
        let skyrim = game("/lib/Skyrim");
        let quest = Pack::new(PathBuf::from("/lib/Skyrim/quest.pack"), skyrim.clone());
        let mut store = store_with(vec![skyrim.clone()], Vec::new());
        store.select_game(skyrim.id);
        store.replace_packs(vec![quest.clone()]);
        store.select_pack(quest.id);

        store.remove_item(ItemKind::Game, skyrim.id);
        assert!(store.view().games().is_empty());
        assert!(store.view().packs().is_empty());
        assert!(store.nav().selected_game().is_none());
        assert!(store.nav().selected_pack().is_none());
    }

    #[test]
    fn selecting_absent_entries_is_refused() {
        let mut store = store_with(vec![game("/lib/Skyrim")], Vec::new());
        let ghost = game("/lib/Ghost");
        assert!(!store.select_game(ghost.id));
        assert!(!store.select_pack(ghost.id));
        assert!(store.nav().selected_game().is_none());
    }

    #[test]
    fn switching_games_empties_packs() {
        let skyrim = game("/lib/Skyrim");
        let fallout = game("/lib/Fallout");
        let quest = Pack::new(PathBuf::from("/lib/Skyrim/quest.pack"), skyrim.clone());
        let mut store = store_with(vec![skyrim.clone(), fallout.clone()], Vec::new());
        store.select_game(skyrim.id);
        store.replace_packs(vec![quest]);

        store.select_game(skyrim.id);
        assert_eq!(store.view().packs().len(), 1);
        store.select_game(fallout.id);
        assert!(store.view().packs().is_empty());
    }
}
