//! Selection, panel and dialog state.
//!
//! Holds only identifiers into the `ViewModel` lists. `reconcile` must run
//! after every list mutation so no selection outlives its entry.

use crate::{
    library::{same_location, EntryId, Game, ItemKind, Library, Pack},
    view_model::ViewModel,
};
use std::{
    path::PathBuf,
    time::{Duration, Instant},
};

/// Logo on screen for 2s, then a 3s fade.
pub const INTRO_DURATION: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Intro { started_at: Instant },
    Main,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Panel {
    /// Games and Packs side by side.
    Browsing,
    /// Selected pack alone, with a way back.
    Detail,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Games,
    Packs,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameTarget {
    Game,
    Pack,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingDialog {
    None,
    NameInput(NameTarget),
    GameSettings,
    ConfirmDelete(ItemKind),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection {
    pub id: EntryId,
    pub name: String,
    pub path: PathBuf,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackSelection {
    pub id: EntryId,
    pub name: String,
    pub path: PathBuf,
    pub game_path: PathBuf,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Reconciled {
    pub game_cleared: bool,
    pub pack_cleared: bool,
    pub dialog_closed: bool,
}

#[derive(Debug, Clone)]
pub struct NavigationState {
    library: Option<Library>,
    selected_game: Option<Selection>,
    selected_pack: Option<PackSelection>,
    screen: Screen,
    panel: Panel,
    focus: Focus,
    pending_dialog: PendingDialog,
}

impl NavigationState {
    pub fn new(show_intro: bool, now: Instant) -> Self {
        let screen = if show_intro {
            Screen::Intro { started_at: now }
        } else {
            Screen::Main
        };
        Self {
            library: None,
            selected_game: None,
            selected_pack: None,
            screen,
            panel: Panel::Browsing,
            focus: Focus::Games,
            pending_dialog: PendingDialog::None,
        }
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    pub fn intro_elapsed(&self, now: Instant) -> bool {
        match self.screen {
            Screen::Intro { started_at } => now.saturating_duration_since(started_at) >= INTRO_DURATION,
            Screen::Main => true,
        }
    }

    /// Leaves the intro. Returns false when already on the main screen.
    pub fn finish_intro(&mut self) -> bool {
        if self.screen == Screen::Main {
            return false;
        }
        self.screen = Screen::Main;
        true
    }

    pub fn library(&self) -> Option<&Library> {
        self.library.as_ref()
    }

    pub fn set_library(&mut self, library: Option<Library>) {
        self.library = library;
        self.selected_game = None;
        self.selected_pack = None;
        self.panel = Panel::Browsing;
        self.focus = Focus::Games;
    }

    pub fn selected_game(&self) -> Option<&Selection> {
        self.selected_game.as_ref()
    }

    pub fn selected_pack(&self) -> Option<&PackSelection> {
        self.selected_pack.as_ref()
    }

    pub fn is_game_selected(&self, game: &Game) -> bool {
        self.selected_game
            .as_ref()
            .is_some_and(|selected| same_location(&selected.path, &game.path))
    }

    pub fn is_pack_selected(&self, pack: &Pack) -> bool {
        self.selected_pack
            .as_ref()
            .is_some_and(|selected| same_location(&selected.path, &pack.path))
    }

    pub fn select_game(&mut self, game: &Game) {
        let same_game = self.is_game_selected(game);
        self.selected_game = Some(Selection {
            id: game.id,
            name: game.name.clone(),
            path: game.path.clone(),
        });
        if !same_game {
            self.clear_pack();
        }
    }

    pub fn clear_game(&mut self) {
        self.selected_game = None;
        self.clear_pack();
    }

    /// Selecting a pack also selects its owning game and opens the detail
    /// panel.
    pub fn select_pack(&mut self, pack: &Pack) {
        if !self.is_game_selected(&pack.game) {
            self.select_game(&pack.game);
        }
        self.selected_pack = Some(PackSelection {
            id: pack.id,
            name: pack.name.clone(),
            path: pack.path.clone(),
            game_path: pack.game.path.clone(),
        });
        self.panel = Panel::Detail;
    }

    pub fn clear_pack(&mut self) {
        self.selected_pack = None;
        self.panel = Panel::Browsing;
    }

    /// The selected game keeps its identity across a rename; its name and
    /// path follow the new on-disk location.
    pub fn rename_selected_game(&mut self, id: EntryId, name: &str, path: PathBuf) {
        let Some(selected) = self.selected_game.as_mut() else {
            return;
        };
        if selected.id != id {
            return;
        }
        let old_path = std::mem::replace(&mut selected.path, path.clone());
        selected.name = name.to_string();
        if let Some(pack) = self.selected_pack.as_mut() {
            if same_location(&pack.game_path, &old_path) {
                if let Ok(rest) = pack.path.strip_prefix(&old_path) {
                    pack.path = path.join(rest);
                }
                pack.game_path = path;
            }
        }
    }

    pub fn panel(&self) -> Panel {
        self.panel
    }

    pub fn panel_visible(&self) -> bool {
        self.panel == Panel::Browsing
    }

    pub fn back(&mut self) {
        self.panel = Panel::Browsing;
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
    }

    pub fn toggle_focus(&mut self) {
        self.focus = match self.focus {
            Focus::Games => Focus::Packs,
            Focus::Packs => Focus::Games,
        };
    }

    pub fn pending_dialog(&self) -> PendingDialog {
        self.pending_dialog
    }

    /// At most one dialog at a time. Returns false if another is pending.
    pub fn open_dialog(&mut self, dialog: PendingDialog) -> bool {
        if dialog == PendingDialog::None || self.pending_dialog != PendingDialog::None {
            return false;
        }
        self.pending_dialog = dialog;
        true
    }

    pub fn close_dialog(&mut self) {
        self.pending_dialog = PendingDialog::None;
    }

    /// Re-resolves selections against the current lists. Entries that are
    /// gone are cleared (a pack never outlives its game), surviving ones pick
    /// up the ids minted by the latest scan.
    pub fn reconcile(&mut self, view: &ViewModel) -> Reconciled {
        let mut out = Reconciled::default();

        if let Some(selected) = self.selected_game.take() {
            match view.game_at(&selected.path) {
                Some(game) => {
                    self.selected_game = Some(Selection {
                        id: game.id,
                        name: game.name.clone(),
                        path: selected.path,
                    });
                }
                None => out.game_cleared = true,
            }
        }

        if let Some(selected) = self.selected_pack.take() {
            let owner_selected = self
                .selected_game
                .as_ref()
                .is_some_and(|game| same_location(&game.path, &selected.game_path));
            match view.pack_at(&selected.path).filter(|_| owner_selected) {
                Some(pack) => {
                    self.selected_pack = Some(PackSelection {
                        id: pack.id,
                        ..selected
                    });
                }
                None => out.pack_cleared = true,
            }
        }

        if self.selected_pack.is_none() {
            self.panel = Panel::Browsing;
        }

        let dialog_target_gone = match self.pending_dialog {
            PendingDialog::GameSettings
            | PendingDialog::ConfirmDelete(ItemKind::Game)
            | PendingDialog::NameInput(NameTarget::Pack) => self.selected_game.is_none(),
            PendingDialog::ConfirmDelete(ItemKind::Pack) => self.selected_pack.is_none(),
            PendingDialog::NameInput(NameTarget::Game) | PendingDialog::None => false,
        };
        if dialog_target_gone {
            self.pending_dialog = PendingDialog::None;
            out.dialog_closed = true;
        }

        out
    }
}
