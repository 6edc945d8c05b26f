use crate::{
    config::{game_config_path, AppConfig, GameConfig, GAME_CONFIG_FILE},
    file_ops::{self, DeleteOutcome, FileOpError},
    library::{
        pack_file_name, same_location, EntryId, Game, ItemKind, Library, Pack, PACK_EXTENSION,
    },
    navigation::{Focus, NameTarget, Panel, PendingDialog, Reconciled, Screen},
    scan::{self, GameScan, ScanError},
    store::Store,
    view_model::Removed,
};
use anyhow::{anyhow, Context, Result};
use directories::BaseDirs;
use std::{
    fs,
    io::{self, Write},
    path::{Path, PathBuf},
    sync::mpsc::{self, Receiver, Sender, TryRecvError},
    thread,
    time::{Duration, Instant},
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

const LOG_CAPACITY: usize = 200;
const LOG_FILE: &str = "multipack.log";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StartupMode {
    #[default]
    Ui,
    Headless,
}

#[derive(Debug, Clone, Default)]
pub struct StartupOptions {
    pub mode: StartupMode,
    pub library: Option<PathBuf>,
    pub forget_library: bool,
    pub no_intro: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing {
        prompt: String,
        buffer: String,
        target: NameTarget,
    },
    Settings(SettingsForm),
    Browsing(PathBrowser),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsField {
    Name,
    ModsFolder,
    Browse,
}

/// Edits the selected game. The target is resolved at submit time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SettingsForm {
    pub original_name: String,
    pub name: String,
    pub mods_path: String,
    pub field: SettingsField,
}

impl SettingsForm {
    fn for_game(game: &Game) -> Self {
        Self {
            original_name: game.name.clone(),
            name: game.name.clone(),
            mods_path: game.mods_folder().to_string(),
            field: SettingsField::Name,
        }
    }

    pub fn next_field(&mut self) {
        self.field = match self.field {
            SettingsField::Name => SettingsField::ModsFolder,
            SettingsField::ModsFolder => SettingsField::Browse,
            SettingsField::Browse => SettingsField::Name,
        };
    }

    pub fn prev_field(&mut self) {
        self.field = match self.field {
            SettingsField::Name => SettingsField::Browse,
            SettingsField::ModsFolder => SettingsField::Name,
            SettingsField::Browse => SettingsField::ModsFolder,
        };
    }

    pub fn active_buffer_mut(&mut self) -> Option<&mut String> {
        match self.field {
            SettingsField::Name => Some(&mut self.name),
            SettingsField::ModsFolder => Some(&mut self.mods_path),
            SettingsField::Browse => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathBrowserPurpose {
    Library,
    ModsFolder(SettingsForm),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathBrowserEntryKind {
    Select,
    Parent,
    Dir,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBrowserEntry {
    pub label: String,
    pub path: PathBuf,
    pub kind: PathBrowserEntryKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathBrowser {
    pub purpose: PathBrowserPurpose,
    pub current: PathBuf,
    pub entries: Vec<PathBrowserEntry>,
    pub selected: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DialogChoice {
    Yes,
    No,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogKind {
    /// Deletes whatever is selected of `kind` when confirmed.
    Delete { kind: ItemKind },
}

#[derive(Debug, Clone)]
pub struct Dialog {
    pub title: String,
    pub message: String,
    pub yes_label: String,
    pub no_label: String,
    pub choice: DialogChoice,
    pub kind: DialogKind,
}

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
pub struct Toast {
    pub message: String,
    pub level: ToastLevel,
    pub expires_at: Instant,
}

enum ScanMessage {
    Games {
        scan_id: u64,
        root: PathBuf,
        scan: GameScan,
    },
    Packs {
        scan_id: u64,
        game_path: PathBuf,
        result: Result<Vec<Pack>, ScanError>,
    },
    /// The worker exited without a result.
    Aborted { kind: ItemKind, scan_id: u64 },
}

/// Held by a scan worker. If the worker unwinds before sending its result,
/// dropping the guard posts `Aborted` so the in-flight count still settles.
struct ScanGuard {
    tx: Sender<ScanMessage>,
    kind: ItemKind,
    scan_id: u64,
    sent: bool,
}

impl ScanGuard {
    fn new(tx: Sender<ScanMessage>, kind: ItemKind, scan_id: u64) -> Self {
        Self {
            tx,
            kind,
            scan_id,
            sent: false,
        }
    }

    fn send(mut self, message: ScanMessage) {
        self.sent = true;
        let _ = self.tx.send(message);
    }
}

impl Drop for ScanGuard {
    fn drop(&mut self) {
        if !self.sent {
            let _ = self.tx.send(ScanMessage::Aborted {
                kind: self.kind,
                scan_id: self.scan_id,
            });
        }
    }
}

/// Owns the store and is its only writer. Scans run on worker threads and
/// post results back; each result is applied only if it answers the latest
/// request of its kind.
pub struct App {
    pub app_config: AppConfig,
    pub store: Store,
    pub status: String,
    pub input_mode: InputMode,
    pub dialog: Option<Dialog>,
    pub logs: Vec<LogEntry>,
    pub log_scroll: usize,
    pub toast: Option<Toast>,
    pub should_quit: bool,
    pub games_cursor: usize,
    pub packs_cursor: usize,
    mode: StartupMode,
    log_path: PathBuf,
    scan_tx: Sender<ScanMessage>,
    scan_rx: Receiver<ScanMessage>,
    games_scan_id: u64,
    games_scan_active: Option<u64>,
    packs_scan_id: u64,
    packs_scan_active: Option<u64>,
    scans_in_flight: usize,
}

impl App {
    pub fn initialize(options: StartupOptions) -> Result<Self> {
        let app_config = AppConfig::load_or_create()?;
        Self::with_config(app_config, options)
    }

    pub fn with_config(mut app_config: AppConfig, options: StartupOptions) -> Result<Self> {
        if options.forget_library {
            app_config
                .set_library_directory(None)
                .context("clear stored library")?;
        }
        let show_intro =
            app_config.show_intro && !options.no_intro && options.mode == StartupMode::Ui;
        let log_path = app_config.data_dir().join(LOG_FILE);
        let (scan_tx, scan_rx) = mpsc::channel();

        let mut app = App {
            app_config,
            store: Store::new(show_intro),
            status: "Ready".to_string(),
            input_mode: InputMode::Normal,
            dialog: None,
            logs: Vec::new(),
            log_scroll: 0,
            toast: None,
            should_quit: false,
            games_cursor: 0,
            packs_cursor: 0,
            mode: options.mode,
            log_path,
            scan_tx,
            scan_rx,
            games_scan_id: 0,
            games_scan_active: None,
            packs_scan_id: 0,
            packs_scan_active: None,
            scans_in_flight: 0,
        };

        app.log_info(format!(
            "Data dir: {}",
            app.app_config.data_dir().display()
        ));
        if options.forget_library {
            app.log_info("Stored library forgotten".to_string());
        }
        if let Some(path) = options.library {
            app.select_library(path)?;
        }
        if !show_intro {
            app.enter_main();
        }
        Ok(app)
    }

    pub fn tick(&mut self) {
        if let Some(toast) = &self.toast {
            if toast.expires_at <= Instant::now() {
                self.toast = None;
            }
        }

        if self.store.nav().intro_elapsed(Instant::now()) {
            self.skip_intro();
        }

        self.poll_scans();
    }

    pub fn intro_active(&self) -> bool {
        matches!(self.store.nav().screen(), Screen::Intro { .. })
    }

    pub fn skip_intro(&mut self) {
        if self.store.nav_mut().finish_intro() {
            self.enter_main();
        }
    }

    /// Opens the remembered library, or asks for one.
    fn enter_main(&mut self) {
        if self.store.nav().library().is_some() {
            return;
        }
        match self.app_config.library_directory().map(Path::to_path_buf) {
            Some(dir) if dir.is_dir() => {
                if let Err(err) = self.open_library(dir, false) {
                    self.report_failure("Open library", &err);
                }
            }
            Some(dir) => {
                self.log_warn(format!("Stored library is missing: {}", dir.display()));
                self.prompt_library();
            }
            None => self.prompt_library(),
        }
    }

    fn prompt_library(&mut self) {
        if self.mode == StartupMode::Headless {
            self.status = "No library selected".to_string();
            return;
        }
        self.open_library_browser();
    }

    pub fn select_library(&mut self, path: PathBuf) -> Result<()> {
        self.open_library(path, true)
    }

    fn open_library(&mut self, path: PathBuf, remember: bool) -> Result<()> {
        if !path.is_dir() {
            return Err(anyhow!("not a directory: {}", path.display()));
        }
        let root = fs::canonicalize(&path).unwrap_or(path);
        let library = Library::from_path(root.clone());
        self.store.set_library(Some(library.clone()));
        self.games_cursor = 0;
        self.packs_cursor = 0;
        self.packs_scan_active = None;

        if remember {
            if let Err(err) = self.app_config.set_library_directory(Some(root)) {
                self.log_warn(format!("Could not remember library: {err:#}"));
            }
        }
        self.log_info(format!("Library opened: {}", library.root.display()));
        self.status = format!("Library: {}", library.name);
        self.refresh_games();
        Ok(())
    }

    pub fn clear_library(&mut self) -> Result<()> {
        self.store.set_library(None);
        self.games_scan_active = None;
        self.packs_scan_active = None;
        self.games_cursor = 0;
        self.packs_cursor = 0;
        self.app_config
            .set_library_directory(None)
            .context("clear stored library")?;
        self.status = "Library closed (press o to open one)".to_string();
        self.log_info("Library closed".to_string());
        Ok(())
    }

    pub fn refresh_games(&mut self) {
        let Some(library) = self.store.nav().library().cloned() else {
            self.status = "No library selected".to_string();
            return;
        };
        self.games_scan_id = self.games_scan_id.wrapping_add(1);
        let scan_id = self.games_scan_id;
        self.games_scan_active = Some(scan_id);
        self.scans_in_flight += 1;
        self.status = format!("Scanning {}...", library.name);

        let guard = ScanGuard::new(self.scan_tx.clone(), ItemKind::Game, scan_id);
        thread::spawn(move || {
            let scan = scan::scan_games(&library);
            guard.send(ScanMessage::Games {
                scan_id,
                root: library.root,
                scan,
            });
        });
    }

    pub fn refresh_packs(&mut self) {
        let Some(game) = self.store.selected_game().cloned() else {
            self.status = "Select a game first".to_string();
            return;
        };
        let games = self.store.view().games().to_vec();
        self.packs_scan_id = self.packs_scan_id.wrapping_add(1);
        let scan_id = self.packs_scan_id;
        self.packs_scan_active = Some(scan_id);
        self.scans_in_flight += 1;

        let guard = ScanGuard::new(self.scan_tx.clone(), ItemKind::Pack, scan_id);
        thread::spawn(move || {
            let result = scan::scan_packs(&game, &games);
            guard.send(ScanMessage::Packs {
                scan_id,
                game_path: game.path,
                result,
            });
        });
    }

    pub fn scans_pending(&self) -> bool {
        self.scans_in_flight > 0
    }

    pub fn poll_scans(&mut self) {
        loop {
            match self.scan_rx.try_recv() {
                Ok(message) => self.handle_scan_message(message),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => break,
            }
        }
    }

    /// Blocks until every scan started so far (and any it triggers) is in.
    pub fn wait_for_scans(&mut self) {
        while self.scans_in_flight > 0 {
            match self.scan_rx.recv() {
                Ok(message) => self.handle_scan_message(message),
                Err(_) => break,
            }
        }
    }

    fn handle_scan_message(&mut self, message: ScanMessage) {
        self.scans_in_flight = self.scans_in_flight.saturating_sub(1);
        match message {
            ScanMessage::Games {
                scan_id,
                root,
                scan,
            } => self.apply_games_scan(scan_id, &root, scan),
            ScanMessage::Packs {
                scan_id,
                game_path,
                result,
            } => self.apply_packs_scan(scan_id, &game_path, result),
            ScanMessage::Aborted { kind, scan_id } => self.abort_scan(kind, scan_id),
        }
    }

    fn abort_scan(&mut self, kind: ItemKind, scan_id: u64) {
        let active = match kind {
            ItemKind::Game => &mut self.games_scan_active,
            ItemKind::Pack => &mut self.packs_scan_active,
        };
        if *active == Some(scan_id) {
            *active = None;
        }
        self.status = format!("Scanning {}s failed (press r to retry)", kind.label());
        self.log_error(format!("Scan #{scan_id} of {}s stopped without a result", kind.label()));
    }

    fn apply_games_scan(&mut self, scan_id: u64, root: &Path, scan: GameScan) {
        let Some(library) = self
            .store
            .nav()
            .library()
            .filter(|library| same_location(&library.root, root))
            .cloned()
        else {
            self.log_info(format!("Dropped games scan #{scan_id}: library changed"));
            return;
        };
        if self.games_scan_active != Some(scan_id) {
            self.log_info(format!("Dropped outdated games scan #{scan_id}"));
            return;
        }
        self.games_scan_active = None;

        let mut skipped = Vec::new();
        for failure in &scan.failures {
            self.log_error(format!("Game skipped: {failure}"));
            if let Some(name) = failure
                .path()
                .and_then(Path::parent)
                .and_then(Path::file_name)
            {
                skipped.push(name.to_string_lossy().into_owned());
            }
        }
        if !scan.failures.is_empty() {
            let names = if skipped.is_empty() {
                format!("{} game(s)", scan.failures.len())
            } else {
                skipped.join(", ")
            };
            self.set_toast(
                &format!("Skipped {names}: unreadable {GAME_CONFIG_FILE}"),
                ToastLevel::Warn,
                Duration::from_secs(4),
            );
        }

        let count = scan.games.len();
        let reconciled = self.store.replace_games(scan.games);
        self.after_reconcile(reconciled);
        self.clamp_selection();
        self.status = format!("{}: {count} game(s)", library.name);
        self.log_info(format!("Scanned {}: {count} game(s)", library.name));

        // Packs hold copies of their game; rebuild them against the new list.
        if self.store.selected_game().is_some() {
            self.refresh_packs();
        }
    }

    fn apply_packs_scan(
        &mut self,
        scan_id: u64,
        game_path: &Path,
        result: Result<Vec<Pack>, ScanError>,
    ) {
        let for_selected = self
            .store
            .nav()
            .selected_game()
            .is_some_and(|selected| same_location(&selected.path, game_path));
        if !for_selected || self.packs_scan_active != Some(scan_id) {
            self.log_info(format!("Dropped outdated packs scan #{scan_id}"));
            return;
        }
        self.packs_scan_active = None;

        match result {
            Ok(packs) => {
                let count = packs.len();
                let reconciled = self.store.replace_packs(packs);
                self.after_reconcile(reconciled);
                self.clamp_selection();
                let name = self
                    .store
                    .nav()
                    .selected_game()
                    .map(|game| game.name.clone())
                    .unwrap_or_default();
                self.status = format!("{name}: {count} pack(s)");
            }
            Err(err) => {
                let err = anyhow::Error::new(err).context("games list is out of date (press r)");
                self.report_failure("Pack scan", &err);
            }
        }
    }

    fn after_reconcile(&mut self, reconciled: Reconciled) {
        if reconciled.game_cleared {
            self.log_info("Selected game is no longer in the library".to_string());
        }
        if reconciled.pack_cleared {
            self.log_info("Selected pack is no longer listed".to_string());
        }
        if reconciled.dialog_closed {
            self.dialog = None;
            let closes_input = match &self.input_mode {
                InputMode::Editing { target, .. } => *target == NameTarget::Pack,
                InputMode::Settings(_) => true,
                InputMode::Browsing(browser) => {
                    matches!(browser.purpose, PathBrowserPurpose::ModsFolder(_))
                }
                InputMode::Normal => false,
            };
            if closes_input {
                self.input_mode = InputMode::Normal;
            }
            self.set_toast(
                "Dialog closed: its item is gone",
                ToastLevel::Warn,
                Duration::from_secs(3),
            );
        }
    }

    pub fn select_game(&mut self, id: EntryId) {
        if !self.store.select_game(id) {
            return;
        }
        self.packs_cursor = 0;
        if let Some(name) = self.store.selected_game().map(|game| game.name.clone()) {
            self.status = format!("Game: {name}");
        }
        self.refresh_packs();
    }

    pub fn clear_game(&mut self) {
        self.store.clear_game();
        self.packs_scan_active = None;
        self.packs_cursor = 0;
        self.status = "No game selected".to_string();
    }

    pub fn select_pack(&mut self, id: EntryId) {
        if !self.store.select_pack(id) {
            return;
        }
        if let Some(name) = self.store.selected_pack().map(|pack| pack.name.clone()) {
            self.status = format!("Pack: {name} (Esc to go back)");
        }
    }

    pub fn back(&mut self) {
        if self.store.nav().panel() == Panel::Detail {
            self.store.nav_mut().back();
            self.status = "Browsing".to_string();
        } else if self.store.nav().focus() == Focus::Packs {
            self.store.nav_mut().set_focus(Focus::Games);
        }
    }

    pub fn add_game(&mut self, name: &str) -> Result<()> {
        let root = self
            .store
            .nav()
            .library()
            .map(|library| library.root.clone())
            .context("no library selected")?;
        let path = file_ops::create_directory(&root, name.trim())?;
        self.log_info(format!("Created game {}", path.display()));
        self.status = format!("Created game {}", name.trim());
        self.refresh_games();
        Ok(())
    }

    /// Creates `<name>.pack` in the selected game's directory.
    pub fn add_pack(&mut self, name: &str) -> Result<PathBuf> {
        let game = self
            .store
            .selected_game()
            .cloned()
            .context("select a game first")?;
        let name = name.trim();
        let suffix = format!(".{PACK_EXTENSION}");
        let stem = name.strip_suffix(suffix.as_str()).unwrap_or(name);
        if stem.trim().is_empty() {
            return Err(FileOpError::InvalidName(name.to_string()).into());
        }
        let path = file_ops::create_empty_file(&game.path, &pack_file_name(stem))?;
        self.log_info(format!("Created pack {}", path.display()));
        self.status = format!("Created pack {}", pack_file_name(stem));
        self.refresh_packs();
        Ok(path)
    }

    /// Applies the settings dialog: renames the directory when the name
    /// changed, then stores the mods folder in the game's sidecar.
    pub fn rename_game(&mut self, id: EntryId, new_name: &str, new_mods_path: &str) -> Result<()> {
        let game = self
            .store
            .view()
            .game(id)
            .cloned()
            .context("game is no longer listed")?;
        let new_name = new_name.trim();
        let mut path = game.path.clone();

        if new_name != game.name {
            let new_path = file_ops::rename(&game.path, new_name)?;
            self.store.rename_game(id, new_name);
            self.store.relocate_game(id, new_path.clone());
            self.log_info(format!("Renamed game {} -> {new_name}", game.name));
            path = new_path;
        }

        let config = GameConfig::new(new_mods_path.trim());
        if game.config.as_ref() != Some(&config) {
            config
                .save(&path)
                .with_context(|| format!("save {}", game_config_path(&path).display()))?;
            self.store.set_game_config(id, config);
            self.log_info(format!("Saved mods folder for {new_name}"));
        }

        self.status = format!("Saved settings for {new_name}");
        let selected = self
            .store
            .nav()
            .selected_game()
            .is_some_and(|selected| selected.id == id);
        if selected && path != game.path {
            self.refresh_packs();
        }
        Ok(())
    }

    pub fn prompt_delete(&mut self, kind: ItemKind) {
        let name = match kind {
            ItemKind::Game => self.store.selected_game().map(|game| game.name.clone()),
            ItemKind::Pack => self.store.selected_pack().map(|pack| pack.name.clone()),
        };
        let Some(name) = name else {
            self.status = format!("No {} selected", kind.label());
            return;
        };
        if !self
            .store
            .nav_mut()
            .open_dialog(PendingDialog::ConfirmDelete(kind))
        {
            return;
        }
        let message = match kind {
            ItemKind::Game => format!("Delete {name}? Its folder and all packs are removed from disk."),
            ItemKind::Pack => format!("Delete {name}? The file is removed from disk."),
        };
        self.open_dialog(Dialog {
            title: format!("Delete {}", kind.label()),
            message,
            yes_label: "Delete".to_string(),
            no_label: "Cancel".to_string(),
            choice: DialogChoice::No,
            kind: DialogKind::Delete { kind },
        });
    }

    /// Removes the selected item from disk, then from the list. A partial
    /// delete leaves the entry listed and rescans.
    pub fn delete_selected(&mut self, kind: ItemKind) -> Result<DeleteOutcome> {
        let target = match kind {
            ItemKind::Game => self
                .store
                .selected_game()
                .map(|game| (game.id, game.name.clone(), game.path.clone())),
            ItemKind::Pack => self
                .store
                .selected_pack()
                .map(|pack| (pack.id, pack.name.clone(), pack.path.clone())),
        };
        let (id, name, path) = target.with_context(|| format!("no {} selected", kind.label()))?;

        let outcome = file_ops::delete_recursively(&path);
        match &outcome {
            DeleteOutcome::Removed => {
                match self.store.remove_item(kind, id) {
                    Some(Removed::Game(game)) => {
                        self.packs_scan_active = None;
                        self.log_info(format!("Deleted game {}", game.path.display()));
                    }
                    Some(Removed::Pack(pack)) => {
                        self.log_info(format!(
                            "Deleted pack {} from {}",
                            pack.path.display(),
                            pack.game.name
                        ));
                    }
                    None => self.log_warn(format!(
                        "Deleted {} {} (already gone from the list)",
                        kind.label(),
                        path.display()
                    )),
                }
                self.clamp_selection();
                self.status = format!("Deleted {name}");
                // A scan already running may have listed the deleted entry.
                match kind {
                    ItemKind::Game if self.games_scan_active.is_some() => self.refresh_games(),
                    ItemKind::Pack if self.packs_scan_active.is_some() => self.refresh_packs(),
                    _ => {}
                }
            }
            DeleteOutcome::Partial(remaining) => {
                for leftover in remaining.iter().take(10) {
                    self.log_warn(format!("Not removed: {}", leftover.display()));
                }
                self.log_warn(format!(
                    "Partially deleted {}: {} path(s) left",
                    path.display(),
                    remaining.len()
                ));
                self.status = format!("{name} only partly deleted");
                self.set_toast(
                    &format!("{name}: {} item(s) could not be removed", remaining.len()),
                    ToastLevel::Warn,
                    Duration::from_secs(5),
                );
                match kind {
                    ItemKind::Game => self.refresh_games(),
                    ItemKind::Pack => self.refresh_packs(),
                }
            }
            DeleteOutcome::Denied(reason) => {
                return Err(anyhow!("{name}: {reason}"));
            }
        }
        Ok(outcome)
    }

    pub fn open_name_input(&mut self, target: NameTarget) {
        let prompt = match target {
            NameTarget::Game => {
                if self.store.nav().library().is_none() {
                    self.status = "Open a library first (press o)".to_string();
                    return;
                }
                "New game".to_string()
            }
            NameTarget::Pack => {
                let Some(game) = self.store.selected_game().map(|game| game.name.clone()) else {
                    self.status = "Select a game first".to_string();
                    return;
                };
                format!("New pack in {game}")
            }
        };
        if !self
            .store
            .nav_mut()
            .open_dialog(PendingDialog::NameInput(target))
        {
            return;
        }
        self.input_mode = InputMode::Editing {
            prompt,
            buffer: String::new(),
            target,
        };
    }

    pub fn submit_name(&mut self, target: NameTarget, value: String) -> Result<()> {
        self.input_mode = InputMode::Normal;
        self.store.nav_mut().close_dialog();
        match target {
            NameTarget::Game => self.add_game(&value),
            NameTarget::Pack => self.add_pack(&value).map(|_| ()),
        }
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.store.nav_mut().close_dialog();
        self.set_toast("Cancelled", ToastLevel::Info, Duration::from_secs(2));
    }

    pub fn open_game_settings(&mut self) {
        let Some(form) = self.store.selected_game().map(SettingsForm::for_game) else {
            self.status = "Select a game first".to_string();
            return;
        };
        if !self.store.nav_mut().open_dialog(PendingDialog::GameSettings) {
            return;
        }
        self.input_mode = InputMode::Settings(form);
    }

    pub fn submit_game_settings(&mut self, form: SettingsForm) -> Result<()> {
        self.input_mode = InputMode::Normal;
        self.store.nav_mut().close_dialog();
        let id = self
            .store
            .selected_game()
            .map(|game| game.id)
            .context("no game selected")?;
        self.rename_game(id, &form.name, &form.mods_path)
    }

    pub fn open_library_browser(&mut self) {
        self.open_path_browser(PathBrowserPurpose::Library);
    }

    pub fn open_mods_browser(&mut self, form: SettingsForm) {
        self.open_path_browser(PathBrowserPurpose::ModsFolder(form));
    }

    fn open_path_browser(&mut self, purpose: PathBrowserPurpose) {
        let current = self.path_browser_start(&purpose);
        let entries = build_path_browser_entries(&current);
        self.status = match &purpose {
            PathBrowserPurpose::Library => "Select library folder".to_string(),
            PathBrowserPurpose::ModsFolder(form) => {
                format!("Select mods folder for {}", form.original_name)
            }
        };
        self.input_mode = InputMode::Browsing(PathBrowser {
            purpose,
            current,
            entries,
            selected: 0,
        });
    }

    fn path_browser_start(&self, purpose: &PathBrowserPurpose) -> PathBuf {
        let home = BaseDirs::new()
            .map(|base| base.home_dir().to_path_buf())
            .unwrap_or_else(|| PathBuf::from("/"));
        let mut candidates = Vec::new();
        match purpose {
            PathBrowserPurpose::Library => {
                if let Some(root) = self.store.nav().library().map(|library| &library.root) {
                    if let Some(parent) = root.parent() {
                        candidates.push(parent.to_path_buf());
                    }
                }
            }
            PathBrowserPurpose::ModsFolder(form) => {
                if !form.mods_path.trim().is_empty() {
                    candidates.push(expand_tilde(&form.mods_path));
                }
            }
        }
        if let Some(last_dir) = self.app_config.last_browser_dir.clone() {
            candidates.push(last_dir);
        }
        candidates
            .into_iter()
            .find(|path| path.is_dir())
            .unwrap_or(home)
    }

    pub fn path_browser_move(&mut self, delta: isize) {
        if let InputMode::Browsing(browser) = &mut self.input_mode {
            let len = browser.entries.len();
            if len == 0 {
                return;
            }
            let next = browser.selected as isize + delta;
            browser.selected = next.clamp(0, len as isize - 1) as usize;
        }
    }

    pub fn path_browser_parent(&mut self) {
        if let InputMode::Browsing(browser) = &mut self.input_mode {
            if let Some(parent) = browser.current.parent().map(Path::to_path_buf) {
                browser.entries = build_path_browser_entries(&parent);
                browser.current = parent;
                browser.selected = 0;
            }
        }
    }

    pub fn path_browser_activate(&mut self) -> Result<()> {
        let InputMode::Browsing(browser) = &mut self.input_mode else {
            return Ok(());
        };
        let Some(entry) = browser.entries.get(browser.selected).cloned() else {
            return Ok(());
        };
        match entry.kind {
            PathBrowserEntryKind::Parent | PathBrowserEntryKind::Dir => {
                browser.entries = build_path_browser_entries(&entry.path);
                browser.current = entry.path;
                browser.selected = 0;
                Ok(())
            }
            PathBrowserEntryKind::Select => {
                let purpose = browser.purpose.clone();
                self.apply_path_browser_selection(purpose, entry.path)
            }
        }
    }

    fn apply_path_browser_selection(
        &mut self,
        purpose: PathBrowserPurpose,
        path: PathBuf,
    ) -> Result<()> {
        self.remember_last_browser_dir(&path);
        self.input_mode = InputMode::Normal;
        match purpose {
            PathBrowserPurpose::Library => self.select_library(path),
            PathBrowserPurpose::ModsFolder(mut form) => {
                form.mods_path = path.display().to_string();
                form.field = SettingsField::ModsFolder;
                self.status = "Mods folder set (Enter to save)".to_string();
                self.input_mode = InputMode::Settings(form);
                Ok(())
            }
        }
    }

    pub fn cancel_path_browser(&mut self) {
        let mode = std::mem::replace(&mut self.input_mode, InputMode::Normal);
        if let InputMode::Browsing(browser) = mode {
            match browser.purpose {
                PathBrowserPurpose::Library => {
                    self.status = if self.store.nav().library().is_some() {
                        "Library unchanged".to_string()
                    } else {
                        "No library selected (press o to open one)".to_string()
                    };
                }
                PathBrowserPurpose::ModsFolder(form) => {
                    self.input_mode = InputMode::Settings(form);
                }
            }
        }
    }

    fn remember_last_browser_dir(&mut self, path: &Path) {
        let dir = path.parent().unwrap_or(path).to_path_buf();
        if dir.is_dir() {
            self.app_config.last_browser_dir = Some(dir);
            let _ = self.app_config.save();
        }
    }

    fn open_dialog(&mut self, dialog: Dialog) {
        self.dialog = Some(dialog);
        self.input_mode = InputMode::Normal;
    }

    pub fn dialog_choice_left(&mut self) {
        self.dialog_set_choice(DialogChoice::Yes);
    }

    pub fn dialog_choice_right(&mut self) {
        self.dialog_set_choice(DialogChoice::No);
    }

    pub fn dialog_set_choice(&mut self, choice: DialogChoice) {
        if let Some(dialog) = &mut self.dialog {
            dialog.choice = choice;
        }
    }

    pub fn dialog_confirm(&mut self) {
        self.store.nav_mut().close_dialog();
        let Some(dialog) = self.dialog.take() else {
            return;
        };

        match dialog.kind {
            DialogKind::Delete { kind } => {
                if dialog.choice != DialogChoice::Yes {
                    self.status = "Delete cancelled".to_string();
                    return;
                }
                match self.delete_selected(kind) {
                    Ok(outcome) if outcome.is_removed() => {
                        let message = self.status.clone();
                        self.set_toast(&message, ToastLevel::Info, Duration::from_secs(2));
                    }
                    Ok(_) => {}
                    Err(err) => self.report_failure("Delete", &err),
                }
            }
        }
    }

    pub fn sorted_games(&self) -> Vec<&Game> {
        let mut games: Vec<&Game> = self.store.view().games().iter().collect();
        games.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));
        games
    }

    pub fn sorted_packs(&self) -> Vec<&Pack> {
        let mut packs: Vec<&Pack> = self.store.view().packs().iter().collect();
        packs.sort_by(|a, b| sort_key(&a.name).cmp(&sort_key(&b.name)));
        packs
    }

    pub fn move_cursor(&mut self, delta: isize) {
        let (cursor, len) = match self.store.nav().focus() {
            Focus::Games => (&mut self.games_cursor, self.store.view().games().len()),
            Focus::Packs => (&mut self.packs_cursor, self.store.view().packs().len()),
        };
        if len == 0 {
            *cursor = 0;
            return;
        }
        let next = *cursor as isize + delta;
        *cursor = next.clamp(0, len as isize - 1) as usize;
    }

    /// Selects the entry under the cursor of the focused list. Choosing a
    /// game moves focus to its packs.
    pub fn activate_cursor(&mut self) {
        if self.select_cursor_item() == Some(ItemKind::Game) {
            self.store.nav_mut().set_focus(Focus::Packs);
        }
    }

    pub fn cursor_item(&self) -> Option<(ItemKind, EntryId)> {
        match self.store.nav().focus() {
            Focus::Games => self
                .sorted_games()
                .get(self.games_cursor)
                .map(|game| (ItemKind::Game, game.id)),
            Focus::Packs => self
                .sorted_packs()
                .get(self.packs_cursor)
                .map(|pack| (ItemKind::Pack, pack.id)),
        }
    }

    /// Makes the entry under the cursor the selection, without the focus
    /// change `activate_cursor` does.
    pub fn select_cursor_item(&mut self) -> Option<ItemKind> {
        let (kind, id) = self.cursor_item()?;
        match kind {
            ItemKind::Game => {
                let already = self
                    .store
                    .nav()
                    .selected_game()
                    .is_some_and(|selected| selected.id == id);
                if !already {
                    self.select_game(id);
                }
            }
            ItemKind::Pack => self.select_pack(id),
        }
        Some(kind)
    }

    pub fn toggle_focus(&mut self) {
        self.store.nav_mut().toggle_focus();
    }

    pub fn clamp_selection(&mut self) {
        let games_len = self.store.view().games().len();
        if games_len == 0 {
            self.games_cursor = 0;
        } else if self.games_cursor >= games_len {
            self.games_cursor = games_len - 1;
        }

        let packs_len = self.store.view().packs().len();
        if packs_len == 0 {
            self.packs_cursor = 0;
        } else if self.packs_cursor >= packs_len {
            self.packs_cursor = packs_len - 1;
        }
    }

    pub fn set_toast(&mut self, message: &str, level: ToastLevel, duration: Duration) {
        self.toast = Some(Toast {
            message: message.to_string(),
            level,
            expires_at: Instant::now() + duration,
        });
    }

    /// Status line, error toast and log entry for a failed action.
    pub fn report_failure(&mut self, action: &str, err: &anyhow::Error) {
        self.status = format!("{action} failed: {err}");
        self.set_toast(
            &format!("{action} failed: {err}"),
            ToastLevel::Error,
            Duration::from_secs(4),
        );
        self.log_error(format!("{action} failed: {err:#}"));
    }

    pub fn scroll_log_up(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_add(lines);
    }

    pub fn scroll_log_down(&mut self, lines: usize) {
        self.log_scroll = self.log_scroll.saturating_sub(lines);
    }

    pub fn log_info(&mut self, message: String) {
        self.push_log(LogLevel::Info, message);
    }

    pub fn log_warn(&mut self, message: String) {
        self.push_log(LogLevel::Warn, message);
    }

    pub fn log_error(&mut self, message: String) {
        self.push_log(LogLevel::Error, message);
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        if self.log_scroll > 0 {
            self.log_scroll = self.log_scroll.saturating_add(1);
        }

        self.logs.push(LogEntry {
            level,
            message: message.clone(),
        });

        if self.logs.len() > LOG_CAPACITY {
            let overflow = self.logs.len() - LOG_CAPACITY;
            self.logs.drain(0..overflow);
            self.log_scroll = self.log_scroll.saturating_sub(overflow);
        }

        let _ = append_log_file(&self.log_path, level, &message);
    }
}

fn sort_key(name: &str) -> (String, &str) {
    (name.to_lowercase(), name)
}

fn build_path_browser_entries(current: &Path) -> Vec<PathBrowserEntry> {
    let mut entries = vec![PathBrowserEntry {
        label: "[ Select this folder ]".to_string(),
        path: current.to_path_buf(),
        kind: PathBrowserEntryKind::Select,
    }];
    if let Some(parent) = current.parent() {
        entries.push(PathBrowserEntry {
            label: "..".to_string(),
            path: parent.to_path_buf(),
            kind: PathBrowserEntryKind::Parent,
        });
    }
    let mut dirs: Vec<PathBrowserEntry> = file_ops::list_subdirectories(current)
        .into_iter()
        .map(|path| PathBrowserEntry {
            label: path
                .file_name()
                .and_then(|name| name.to_str())
                .map(|name| format!("{name}/"))
                .unwrap_or_else(|| path.display().to_string()),
            path,
            kind: PathBrowserEntryKind::Dir,
        })
        .collect();
    dirs.sort_by(|a, b| a.label.to_lowercase().cmp(&b.label.to_lowercase()));
    entries.extend(dirs);
    entries
}

pub(crate) fn expand_tilde(input: &str) -> PathBuf {
    let value = input.trim();
    if let Some(stripped) = value.strip_prefix('~') {
        if let Some(home) = std::env::var_os("HOME") {
            return PathBuf::from(home).join(stripped.trim_start_matches('/'));
        }
    }
    PathBuf::from(value)
}

fn log_level_label(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Info => "INFO",
        LogLevel::Warn => "WARN",
        LogLevel::Error => "ERROR",
    }
}

fn append_log_file(path: &Path, level: LogLevel, message: &str) -> io::Result<()> {
    let label = log_level_label(level);
    let stamp = OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_default();
    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)?;
    writeln!(file, "{stamp} [{label}] {message}")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_app(data_dir: &Path, options: StartupOptions) -> App {
        let config = AppConfig::load_or_create_in(data_dir.to_path_buf()).unwrap();
        App::with_config(config, options).unwrap()
    }

    fn headless(library: Option<PathBuf>) -> StartupOptions {
        StartupOptions {
            mode: StartupMode::Headless,
            library,
            ..StartupOptions::default()
        }
    }

    fn game_id(app: &App, name: &str) -> EntryId {
        app.store
            .view()
            .games()
            .iter()
            .find(|game| game.name == name)
            .map(|game| game.id)
            .unwrap()
    }

    fn pack_id(app: &App, name: &str) -> EntryId {
        app.store
            .view()
            .packs()
            .iter()
            .find(|pack| pack.name == name)
            .map(|pack| pack.id)
            .unwrap()
    }

    #[test]
    fn scan_then_add_pack_end_to_end() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();

        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let games = app.store.view().games();
        assert_eq!(games.len(), 1);
        assert_eq!(games[0].name, "Skyrim");
        assert_eq!(games[0].config, Some(GameConfig::new("")));

        app.select_game(game_id(&app, "Skyrim"));
        app.wait_for_scans();
        assert!(app.store.view().packs().is_empty());

        let path = app.add_pack("quest").unwrap();
        assert!(path.ends_with("quest.pack"));
        app.wait_for_scans();
        let packs = app.store.view().packs();
        assert_eq!(packs.len(), 1);
        assert_eq!(packs[0].name, "quest.pack");
        assert_eq!(packs[0].game.name, "Skyrim");

        let stored = AppConfig::load_or_create_in(tmp.path().join("data")).unwrap();
        assert_eq!(
            stored.library_directory(),
            Some(fs::canonicalize(&library).unwrap().as_path())
        );
    }

    #[test]
    fn adding_existing_game_fails_without_changing_list() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(&library).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library)));
        app.wait_for_scans();

        app.add_game("Skyrim").unwrap();
        app.wait_for_scans();
        assert_eq!(app.store.view().games().len(), 1);

        let err = app.add_game("Skyrim").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FileOpError>(),
            Some(FileOpError::AlreadyExists(_))
        ));
        app.wait_for_scans();
        assert_eq!(app.store.view().games().len(), 1);
    }

    #[test]
    fn deleting_selected_pack_keeps_game_selected() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        let skyrim = library.join("Skyrim");
        fs::create_dir_all(&skyrim).unwrap();
        fs::write(skyrim.join("quest.pack"), "").unwrap();
        fs::write(skyrim.join("other.pack"), "").unwrap();

        let mut app = test_app(&tmp.path().join("data"), headless(Some(library)));
        app.wait_for_scans();
        let game = game_id(&app, "Skyrim");
        app.select_game(game);
        app.wait_for_scans();
        app.select_pack(pack_id(&app, "quest.pack"));
        assert_eq!(app.store.nav().panel(), Panel::Detail);

        let outcome = app.delete_selected(ItemKind::Pack).unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(!skyrim.join("quest.pack").exists());
        assert_eq!(app.store.view().packs().len(), 1);
        assert_eq!(app.store.view().packs()[0].name, "other.pack");
        assert!(app.store.nav().selected_pack().is_none());
        assert_eq!(app.store.nav().selected_game().unwrap().id, game);
        assert_eq!(app.store.nav().panel(), Panel::Browsing);
    }

    #[test]
    fn confirm_dialog_deletes_selected_game() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();
        fs::write(library.join("Skyrim").join("quest.pack"), "").unwrap();
        fs::create_dir_all(library.join("Fallout")).unwrap();

        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        app.select_game(game_id(&app, "Skyrim"));
        app.wait_for_scans();

        app.prompt_delete(ItemKind::Game);
        assert_eq!(
            app.store.nav().pending_dialog(),
            PendingDialog::ConfirmDelete(ItemKind::Game)
        );
        app.dialog_choice_left();
        app.dialog_confirm();

        assert!(!library.join("Skyrim").exists());
        assert_eq!(app.store.view().games().len(), 1);
        assert!(app.store.view().packs().is_empty());
        assert!(app.store.nav().selected_game().is_none());
        assert_eq!(app.store.nav().pending_dialog(), PendingDialog::None);
    }

    #[test]
    fn cancelled_delete_keeps_everything() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        app.select_game(game_id(&app, "Skyrim"));
        app.wait_for_scans();

        app.prompt_delete(ItemKind::Game);
        app.dialog_confirm();
        assert!(library.join("Skyrim").is_dir());
        assert_eq!(app.store.view().games().len(), 1);
        assert!(app.store.nav().selected_game().is_some());
    }

    #[test]
    fn settings_rename_moves_directory_and_saves_sidecar() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Foo")).unwrap();
        fs::write(library.join("Foo").join("a.pack"), "").unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let id = game_id(&app, "Foo");
        app.select_game(id);
        app.wait_for_scans();

        app.open_game_settings();
        let InputMode::Settings(mut form) = app.input_mode.clone() else {
            panic!("settings form not open");
        };
        form.name = "Bar".to_string();
        form.mods_path = "/mods/bar".to_string();
        app.submit_game_settings(form).unwrap();
        app.wait_for_scans();

        assert!(!library.join("Foo").exists());
        let saved = GameConfig::load_or_create(&library.join("Bar")).unwrap();
        assert_eq!(saved.mods_folder_path, "/mods/bar");

        let game = app.store.selected_game().unwrap();
        assert_eq!(game.id, id);
        assert_eq!(game.name, "Bar");
        assert!(game.path.ends_with("Bar"));
        assert_eq!(game.mods_folder(), "/mods/bar");
        assert_eq!(app.store.nav().selected_game().unwrap().name, "Bar");
        assert_eq!(app.store.view().packs().len(), 1);
        assert_eq!(app.store.view().packs()[0].game.name, "Bar");
        assert_eq!(app.store.nav().pending_dialog(), PendingDialog::None);
    }

    #[test]
    fn deleting_pack_right_after_game_rename_removes_moved_file() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Foo")).unwrap();
        fs::write(library.join("Foo").join("quest.pack"), "").unwrap();
        fs::write(library.join("Foo").join("other.pack"), "").unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let id = game_id(&app, "Foo");
        app.select_game(id);
        app.wait_for_scans();
        app.select_pack(pack_id(&app, "quest.pack"));

        app.rename_game(id, "Bar", "").unwrap();
        assert!(app.scans_pending());
        let outcome = app.delete_selected(ItemKind::Pack).unwrap();
        assert_eq!(outcome, DeleteOutcome::Removed);
        assert!(!library.join("Bar").join("quest.pack").exists());
        assert!(library.join("Bar").join("other.pack").exists());

        app.wait_for_scans();
        let names: Vec<&str> = app
            .store
            .view()
            .packs()
            .iter()
            .map(|pack| pack.name.as_str())
            .collect();
        assert_eq!(names, vec!["other.pack"]);
        assert_eq!(app.store.selected_game().unwrap().name, "Bar");
        assert!(app.store.selected_pack().is_none());
    }

    #[test]
    fn changing_only_mods_folder_reaches_pack_detail() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Foo")).unwrap();
        fs::write(library.join("Foo").join("quest.pack"), "").unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let id = game_id(&app, "Foo");
        app.select_game(id);
        app.wait_for_scans();
        app.select_pack(pack_id(&app, "quest.pack"));

        app.rename_game(id, "Foo", "/mods/new").unwrap();
        app.wait_for_scans();

        assert_eq!(app.store.selected_game().unwrap().mods_folder(), "/mods/new");
        let pack = app.store.selected_pack().unwrap();
        assert_eq!(pack.game.mods_folder(), "/mods/new");
        assert_eq!(app.store.nav().panel(), Panel::Detail);
        let saved = GameConfig::load_or_create(&library.join("Foo")).unwrap();
        assert_eq!(saved.mods_folder_path, "/mods/new");
    }

    #[test]
    fn confirm_dialog_follows_navigation_state() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Foo")).unwrap();
        fs::write(library.join("Foo").join("quest.pack"), "").unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        app.select_game(game_id(&app, "Foo"));
        app.wait_for_scans();
        app.select_pack(pack_id(&app, "quest.pack"));

        app.prompt_delete(ItemKind::Pack);
        assert_eq!(
            app.store.nav().pending_dialog(),
            PendingDialog::ConfirmDelete(ItemKind::Pack)
        );
        app.prompt_delete(ItemKind::Game);
        assert_eq!(
            app.dialog.as_ref().map(|dialog| dialog.kind.clone()),
            Some(DialogKind::Delete {
                kind: ItemKind::Pack
            })
        );

        app.dialog_confirm();
        assert_eq!(app.store.nav().pending_dialog(), PendingDialog::None);
        assert!(app.dialog.is_none());
        assert!(library.join("Foo").join("quest.pack").exists());

        app.prompt_delete(ItemKind::Pack);
        app.dialog = None;
        app.dialog_confirm();
        assert_eq!(app.store.nav().pending_dialog(), PendingDialog::None);
    }

    #[test]
    fn dead_scan_worker_does_not_block_waiting() {
        let tmp = tempfile::tempdir().unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(None));
        app.packs_scan_active = Some(7);
        app.scans_in_flight += 1;

        let guard = ScanGuard::new(app.scan_tx.clone(), ItemKind::Pack, 7);
        let worker = thread::spawn(move || {
            let _guard = guard;
            panic!("scan worker died");
        });
        assert!(worker.join().is_err());

        app.wait_for_scans();
        assert!(!app.scans_pending());
        assert_eq!(app.packs_scan_active, None);
        assert!(app
            .logs
            .iter()
            .any(|entry| entry.level == LogLevel::Error && entry.message.contains("#7")));
    }

    #[test]
    fn rename_onto_existing_game_is_refused() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Foo")).unwrap();
        fs::create_dir_all(library.join("Bar")).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let id = game_id(&app, "Foo");

        let err = app.rename_game(id, "Bar", "").unwrap_err();
        assert!(matches!(
            err.downcast_ref::<FileOpError>(),
            Some(FileOpError::AlreadyExists(_))
        ));
        assert_eq!(app.store.view().game(id).unwrap().name, "Foo");
        assert!(library.join("Foo").is_dir());
    }

    #[test]
    fn outdated_scan_results_are_dropped() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();
        let root = app.store.nav().library().unwrap().root.clone();

        app.handle_scan_message(ScanMessage::Games {
            scan_id: 0,
            root,
            scan: GameScan::default(),
        });
        assert_eq!(app.store.view().games().len(), 1);

        let skyrim = game_id(&app, "Skyrim");
        app.select_game(skyrim);
        app.wait_for_scans();
        app.handle_scan_message(ScanMessage::Packs {
            scan_id: app.packs_scan_id,
            game_path: tmp.path().join("elsewhere"),
            result: Ok(Vec::new()),
        });
        assert_eq!(app.store.nav().selected_game().unwrap().id, skyrim);
    }

    #[test]
    fn malformed_sidecar_is_reported_and_skipped() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Good")).unwrap();
        fs::create_dir_all(library.join("Broken")).unwrap();
        fs::write(
            library.join("Broken").join(GAME_CONFIG_FILE),
            "modsFolderPath: [nope\n",
        )
        .unwrap();

        let mut app = test_app(&tmp.path().join("data"), headless(Some(library)));
        app.wait_for_scans();
        assert_eq!(app.store.view().games().len(), 1);
        assert_eq!(app.store.view().games()[0].name, "Good");
        assert!(app.logs.iter().any(|entry| entry.level == LogLevel::Error));
        assert_eq!(app.toast.as_ref().map(|toast| toast.level), Some(ToastLevel::Warn));
    }

    #[test]
    fn intro_then_stored_library_opens() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();
        let data = tmp.path().join("data");
        let mut config = AppConfig::load_or_create_in(data.clone()).unwrap();
        config.set_library_directory(Some(library)).unwrap();

        let mut app = App::with_config(config, StartupOptions::default()).unwrap();
        assert!(app.intro_active());
        assert!(app.store.nav().library().is_none());

        app.skip_intro();
        assert!(!app.intro_active());
        app.wait_for_scans();
        assert_eq!(app.store.nav().library().unwrap().name, "MyLib");
        assert_eq!(app.store.view().games().len(), 1);
    }

    #[test]
    fn missing_library_opens_browser() {
        let tmp = tempfile::tempdir().unwrap();
        let options = StartupOptions {
            no_intro: true,
            ..StartupOptions::default()
        };
        let app = test_app(&tmp.path().join("data"), options);
        assert!(!app.intro_active());
        assert!(matches!(
            app.input_mode,
            InputMode::Browsing(PathBrowser {
                purpose: PathBrowserPurpose::Library,
                ..
            })
        ));
    }

    #[test]
    fn library_browser_selects_folder() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(library.join("Skyrim")).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(None));

        app.open_library_browser();
        if let InputMode::Browsing(browser) = &mut app.input_mode {
            browser.entries = build_path_browser_entries(&library);
            browser.current = library.clone();
            browser.selected = 0;
        }
        app.path_browser_activate().unwrap();
        app.wait_for_scans();

        assert_eq!(app.input_mode, InputMode::Normal);
        assert_eq!(app.store.view().games().len(), 1);
        assert_eq!(app.app_config.last_browser_dir.as_deref(), Some(tmp.path()));
    }

    #[test]
    fn clear_library_forgets_preference() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(&library).unwrap();
        let data = tmp.path().join("data");
        let mut app = test_app(&data, headless(Some(library)));
        app.wait_for_scans();

        app.clear_library().unwrap();
        assert!(app.store.nav().library().is_none());
        let stored = AppConfig::load_or_create_in(data).unwrap();
        assert!(stored.library_directory().is_none());
    }

    #[test]
    fn name_dialog_is_exclusive_and_closes_on_submit() {
        let tmp = tempfile::tempdir().unwrap();
        let library = tmp.path().join("MyLib");
        fs::create_dir_all(&library).unwrap();
        let mut app = test_app(&tmp.path().join("data"), headless(Some(library.clone())));
        app.wait_for_scans();

        app.open_name_input(NameTarget::Game);
        assert_eq!(
            app.store.nav().pending_dialog(),
            PendingDialog::NameInput(NameTarget::Game)
        );
        app.open_game_settings();
        assert!(matches!(app.input_mode, InputMode::Editing { .. }));

        app.submit_name(NameTarget::Game, "Morrowind".to_string())
            .unwrap();
        assert_eq!(app.store.nav().pending_dialog(), PendingDialog::None);
        assert!(library.join("Morrowind").is_dir());
    }

    #[test]
    fn log_file_lines_are_timestamped() {
        let tmp = tempfile::tempdir().unwrap();
        let data = tmp.path().join("data");
        let mut app = test_app(&data, headless(None));
        app.log_warn("disk is slow".to_string());

        let raw = fs::read_to_string(data.join(LOG_FILE)).unwrap();
        let line = raw.lines().last().unwrap();
        assert!(line.ends_with("[WARN] disk is slow"));
        let stamp = line.split(' ').next().unwrap();
        assert!(OffsetDateTime::parse(stamp, &Rfc3339).is_ok());
    }
}
