use crate::{
    app::{
        App, DialogChoice, InputMode, LogLevel, PathBrowser, PathBrowserPurpose, SettingsField,
        SettingsForm, ToastLevel,
    },
    library::{ItemKind, Pack},
    navigation::{Focus, NameTarget, Panel, PendingDialog, Screen, INTRO_DURATION},
};
use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    prelude::*,
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Clear, List, ListItem, ListState, Padding, Paragraph, Wrap},
};
use std::{
    io,
    time::{Duration, Instant},
};
use time::{macros::format_description, OffsetDateTime};

const LOGO: [&str; 5] = [
    "█▀▄▀█ █ █ █   ▀█▀ █ █▀█ ▄▀█ █▀▀ █▄▀",
    "█ ▀ █ █▄█ █▄▄  █  █ █▀▀ █▀█ █▄▄ █ █",
    "",
    "game library & pack organizer",
    "",
];
const LOGO_HOLD: Duration = Duration::from_secs(2);

#[derive(Clone)]
struct Theme {
    accent: Color,
    accent_soft: Color,
    border: Color,
    text: Color,
    muted: Color,
    success: Color,
    warning: Color,
    error: Color,
    header_bg: Color,
    log_bg: Color,
}

impl Theme {
    fn new() -> Self {
        Self {
            accent: Color::Rgb(120, 190, 255),
            accent_soft: Color::Rgb(70, 110, 160),
            border: Color::Rgb(65, 75, 90),
            text: Color::Rgb(220, 230, 240),
            muted: Color::Rgb(135, 145, 155),
            success: Color::Rgb(120, 220, 140),
            warning: Color::Rgb(230, 200, 120),
            error: Color::Rgb(235, 100, 95),
            header_bg: Color::Rgb(22, 28, 36),
            log_bg: Color::Rgb(16, 20, 26),
        }
    }

    fn block(&self, title: String) -> Block<'static> {
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(self.border))
            .title(Span::styled(
                title,
                Style::default()
                    .fg(self.accent)
                    .add_modifier(Modifier::BOLD),
            ))
    }

    fn panel(&self, title: impl Into<String>) -> Block<'static> {
        self.block(title.into()).padding(Padding {
            left: 1,
            right: 1,
            top: 1,
            bottom: 0,
        })
    }

    fn overlay(&self, title: impl Into<String>) -> Block<'static> {
        self.block(title.into())
            .border_style(Style::default().fg(self.accent_soft))
            .style(Style::default().bg(self.header_bg))
            .padding(Padding::horizontal(1))
    }

    fn highlight(&self, active: bool) -> Style {
        if active {
            Style::default()
                .bg(self.accent_soft)
                .fg(Color::Black)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(self.text)
        }
    }
}

pub fn run(app: &mut App) -> Result<()> {
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    let backend = ratatui::backend::CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, app);

    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
    terminal.show_cursor()?;

    result
}

fn run_loop(terminal: &mut Terminal<impl Backend>, app: &mut App) -> Result<()> {
    loop {
        app.tick();
        app.clamp_selection();
        terminal.draw(|frame| draw(frame, app))?;

        if app.should_quit {
            break;
        }

        if event::poll(Duration::from_millis(100))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    handle_key(app, key)?;
                }
            }
        }
    }

    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) -> Result<()> {
    if app.intro_active() {
        app.skip_intro();
        return Ok(());
    }
    if confirm_pending(app) {
        return handle_dialog_mode(app, key);
    }

    let mode = std::mem::replace(&mut app.input_mode, InputMode::Normal);
    match mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing {
            prompt,
            buffer,
            target,
        } => handle_input_mode(app, key, prompt, buffer, target),
        InputMode::Settings(form) => handle_settings_mode(app, key, form),
        InputMode::Browsing(browser) => {
            app.input_mode = InputMode::Browsing(browser);
            handle_browser_mode(app, key)
        }
    }
}

/// The navigation state owns which modal is open; `App::dialog` only holds
/// what the confirm box shows.
fn confirm_pending(app: &App) -> bool {
    matches!(
        app.store.nav().pending_dialog(),
        PendingDialog::ConfirmDelete(_)
    )
}

fn handle_dialog_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Left | KeyCode::Char('h') | KeyCode::Char('H') => {
            app.dialog_choice_left();
        }
        KeyCode::Right | KeyCode::Char('l') | KeyCode::Char('L') | KeyCode::Tab => {
            app.dialog_choice_right();
        }
        KeyCode::Char('y') | KeyCode::Char('Y') => {
            app.dialog_set_choice(DialogChoice::Yes);
        }
        KeyCode::Char('n') | KeyCode::Char('N') => {
            app.dialog_set_choice(DialogChoice::No);
        }
        KeyCode::Enter | KeyCode::Char(' ') => {
            app.dialog_confirm();
        }
        KeyCode::Esc => {
            app.dialog_set_choice(DialogChoice::No);
            app.dialog_confirm();
        }
        _ => {}
    }
    Ok(())
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match (key.code, key.modifiers) {
        (KeyCode::Char('q'), _) | (KeyCode::Char('Q'), _) => {
            app.should_quit = true;
            return Ok(());
        }
        (KeyCode::Char('c'), KeyModifiers::CONTROL) => {
            app.should_quit = true;
            return Ok(());
        }
        (KeyCode::PageUp, _) => app.scroll_log_up(3),
        (KeyCode::PageDown, _) => app.scroll_log_down(3),
        (KeyCode::Char('o'), _) | (KeyCode::Char('O'), _) => app.open_library_browser(),
        (KeyCode::Char('u'), _) | (KeyCode::Char('U'), _) => {
            if let Err(err) = app.clear_library() {
                app.report_failure("Close library", &err);
            }
        }
        _ => {}
    }

    if app.store.nav().panel_visible() {
        handle_browsing_mode(app, key);
    } else {
        handle_detail_mode(app, key);
    }
    Ok(())
}

fn handle_browsing_mode(app: &mut App, key: KeyEvent) {
    let focus = app.store.nav().focus();
    match key.code {
        KeyCode::Tab | KeyCode::BackTab => app.toggle_focus(),
        KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
        KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
        KeyCode::Home => app.move_cursor(isize::MIN / 2),
        KeyCode::End => app.move_cursor(isize::MAX / 2),
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => app.activate_cursor(),
        KeyCode::Esc | KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => {
            if focus == Focus::Packs {
                app.back();
            } else if app.store.nav().selected_game().is_some() {
                app.clear_game();
            }
        }
        KeyCode::Char('a') | KeyCode::Char('A') => match focus {
            Focus::Games => app.open_name_input(NameTarget::Game),
            Focus::Packs => app.open_name_input(NameTarget::Pack),
        },
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
            if let Some(kind) = app.select_cursor_item() {
                app.prompt_delete(kind);
            }
        }
        KeyCode::Char('s') | KeyCode::Char('S') => {
            if focus == Focus::Games {
                app.select_cursor_item();
            }
            app.open_game_settings();
        }
        KeyCode::Char('r') | KeyCode::Char('R') => match focus {
            Focus::Games => app.refresh_games(),
            Focus::Packs => app.refresh_packs(),
        },
        _ => {}
    }
}

fn handle_detail_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Left | KeyCode::Backspace | KeyCode::Char('h') => app.back(),
        KeyCode::Char('d') | KeyCode::Char('D') | KeyCode::Delete => {
            app.prompt_delete(ItemKind::Pack)
        }
        KeyCode::Char('s') | KeyCode::Char('S') => app.open_game_settings(),
        KeyCode::Char('r') | KeyCode::Char('R') => app.refresh_packs(),
        _ => {}
    }
}

fn handle_input_mode(
    app: &mut App,
    key: KeyEvent,
    prompt: String,
    mut buffer: String,
    target: NameTarget,
) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.cancel_input();
            return Ok(());
        }
        KeyCode::Enter => {
            let value = buffer.trim().to_string();
            if value.is_empty() {
                app.cancel_input();
            } else if let Err(err) = app.submit_name(target, value) {
                app.report_failure("Create", &err);
            }
            return Ok(());
        }
        KeyCode::Char(c) => {
            if key.modifiers.contains(KeyModifiers::CONTROL)
                || key.modifiers.contains(KeyModifiers::ALT)
            {
                return Ok(());
            }
            buffer.push(c);
        }
        KeyCode::Backspace => {
            buffer.pop();
        }
        _ => {}
    }

    app.input_mode = InputMode::Editing {
        prompt,
        buffer,
        target,
    };
    Ok(())
}

fn handle_settings_mode(app: &mut App, key: KeyEvent, mut form: SettingsForm) -> Result<()> {
    match key.code {
        KeyCode::Esc => {
            app.cancel_input();
            return Ok(());
        }
        KeyCode::Enter => {
            if form.field == SettingsField::Browse {
                app.open_mods_browser(form);
            } else if let Err(err) = app.submit_game_settings(form) {
                app.report_failure("Save settings", &err);
            }
            return Ok(());
        }
        KeyCode::Tab | KeyCode::Down => form.next_field(),
        KeyCode::BackTab | KeyCode::Up => form.prev_field(),
        KeyCode::Char(c) => {
            if !key.modifiers.contains(KeyModifiers::CONTROL) {
                if let Some(buffer) = form.active_buffer_mut() {
                    buffer.push(c);
                }
            }
        }
        KeyCode::Backspace => {
            if let Some(buffer) = form.active_buffer_mut() {
                buffer.pop();
            }
        }
        _ => {}
    }
    app.input_mode = InputMode::Settings(form);
    Ok(())
}

fn handle_browser_mode(app: &mut App, key: KeyEvent) -> Result<()> {
    match key.code {
        KeyCode::Esc => app.cancel_path_browser(),
        KeyCode::Up | KeyCode::Char('k') => app.path_browser_move(-1),
        KeyCode::Down | KeyCode::Char('j') => app.path_browser_move(1),
        KeyCode::PageUp => app.path_browser_move(-10),
        KeyCode::PageDown => app.path_browser_move(10),
        KeyCode::Backspace | KeyCode::Left | KeyCode::Char('h') => app.path_browser_parent(),
        KeyCode::Enter | KeyCode::Right | KeyCode::Char('l') => {
            if let Err(err) = app.path_browser_activate() {
                app.report_failure("Select folder", &err);
            }
        }
        _ => {}
    }
    Ok(())
}

fn draw(frame: &mut Frame<'_>, app: &App) {
    let theme = Theme::new();
    if let Screen::Intro { started_at } = app.store.nav().screen() {
        draw_intro(frame, &theme, started_at);
        return;
    }

    let area = frame.size();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(10), Constraint::Length(11)])
        .split(area);

    frame.render_widget(header(app, &theme), chunks[0]);

    if app.store.nav().panel_visible() {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(chunks[1]);
        draw_games(frame, app, &theme, columns[0]);
        draw_packs(frame, app, &theme, columns[1]);
    } else {
        draw_detail(frame, app, &theme, chunks[1]);
    }

    let footer_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(4), Constraint::Length(7)])
        .split(chunks[2]);

    let status_block = theme.panel("Status");
    let status_inner = status_block.inner(footer_chunks[0]);
    let footer = Paragraph::new(status_bar_line(app, status_inner.width))
        .style(Style::default().fg(theme.text))
        .block(status_block);
    frame.render_widget(footer, footer_chunks[0]);

    let log_area = footer_chunks[1];
    let log_block = theme.panel("Log").style(Style::default().bg(theme.log_bg));
    let log_inner = log_block.inner(log_area);
    let log_lines = build_log_lines(app, &theme, log_inner.height as usize);
    let log = Paragraph::new(log_lines)
        .style(Style::default().fg(theme.text).bg(theme.log_bg))
        .block(log_block);
    frame.render_widget(log, log_area);

    match &app.input_mode {
        InputMode::Settings(form) => draw_settings(frame, &theme, form),
        InputMode::Browsing(browser) => draw_path_browser(frame, &theme, browser),
        InputMode::Normal | InputMode::Editing { .. } => {}
    }
    if confirm_pending(app) {
        draw_dialog(frame, app, &theme);
    }
    draw_toast(frame, app, &theme, chunks[1]);
}

fn draw_intro(frame: &mut Frame<'_>, theme: &Theme, started_at: Instant) {
    let area = frame.size();
    let elapsed = started_at.elapsed();
    let fade_total = INTRO_DURATION.saturating_sub(LOGO_HOLD).as_secs_f32().max(0.1);
    let fade = elapsed.saturating_sub(LOGO_HOLD).as_secs_f32() / fade_total;
    let color = fade_color(theme.accent, theme.log_bg, fade.clamp(0.0, 1.0));

    let mut lines: Vec<Line> = LOGO
        .iter()
        .map(|line| Line::from(Span::styled(*line, Style::default().fg(color))))
        .collect();
    lines.push(Line::from(Span::styled(
        "press any key",
        Style::default().fg(theme.muted),
    )));

    let height = lines.len() as u16;
    let y = area.y + area.height.saturating_sub(height) / 2;
    let logo_area = Rect::new(area.x, y, area.width, height.min(area.height));
    frame.render_widget(
        Block::default().style(Style::default().bg(theme.log_bg)),
        area,
    );
    frame.render_widget(
        Paragraph::new(lines)
            .alignment(Alignment::Center)
            .style(Style::default().bg(theme.log_bg)),
        logo_area,
    );
}

fn fade_color(from: Color, to: Color, t: f32) -> Color {
    match (from, to) {
        (Color::Rgb(r1, g1, b1), Color::Rgb(r2, g2, b2)) => {
            let mix = |a: u8, b: u8| (a as f32 + (b as f32 - a as f32) * t).round() as u8;
            Color::Rgb(mix(r1, r2), mix(g1, g2), mix(b1, b2))
        }
        _ => from,
    }
}

fn header(app: &App, theme: &Theme) -> Paragraph<'static> {
    let nav = app.store.nav();
    let (library_label, library_style) = match nav.library() {
        Some(library) => (library.name.clone(), Style::default().fg(theme.text)),
        None => ("no library".to_string(), Style::default().fg(theme.warning)),
    };
    let scanning = if app.scans_pending() {
        Span::styled(
            "  scanning...",
            Style::default().fg(theme.warning).add_modifier(Modifier::BOLD),
        )
    } else {
        Span::raw("")
    };
    let root = nav
        .library()
        .map(|library| library.root.display().to_string())
        .unwrap_or_else(|| "press o to open a library folder".to_string());

    Paragraph::new(vec![
        Line::from(vec![
            Span::styled(
                "Multipack",
                Style::default()
                    .fg(theme.accent)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw("  "),
            Span::styled(library_label, library_style),
            Span::raw("   "),
            Span::styled("Games: ", Style::default().fg(theme.muted)),
            Span::styled(
                app.store.view().games().len().to_string(),
                Style::default().fg(theme.text),
            ),
            Span::raw("   "),
            Span::styled("Packs: ", Style::default().fg(theme.muted)),
            Span::styled(
                app.store.view().packs().len().to_string(),
                Style::default().fg(theme.success),
            ),
            scanning,
        ]),
        Line::from(""),
        Line::from(Span::styled(root, Style::default().fg(theme.muted))),
    ])
    .style(Style::default().bg(theme.header_bg))
    .alignment(Alignment::Center)
}

fn draw_games(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let focused = app.store.nav().focus() == Focus::Games;
    let block = theme.panel("Games");
    let games = app.sorted_games();
    if games.is_empty() {
        let message = if app.store.nav().library().is_some() {
            "No games yet. Press a to add one."
        } else {
            "Open a library with o."
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.muted))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = games
        .iter()
        .map(|game| {
            let selected = app.store.nav().is_game_selected(game);
            let marker = if selected { "● " } else { "  " };
            let style = if selected {
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)
            } else {
                Style::default().fg(theme.text)
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.success)),
                Span::styled(game.name.clone(), style),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(theme.highlight(focused))
        .highlight_symbol(if focused { ">" } else { " " });
    let mut state = ListState::default();
    state.select(Some(app.games_cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_packs(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let focused = app.store.nav().focus() == Focus::Packs;
    let title = match app.store.nav().selected_game() {
        Some(game) => format!("Packs: {}", game.name),
        None => "Packs".to_string(),
    };
    let block = theme.panel(title);
    let packs = app.sorted_packs();
    if packs.is_empty() {
        let message = if app.store.nav().selected_game().is_some() {
            "No packs. Press a to create one."
        } else {
            "Select a game to see its packs."
        };
        let empty = Paragraph::new(message)
            .style(Style::default().fg(theme.muted))
            .block(block)
            .alignment(Alignment::Center);
        frame.render_widget(empty, area);
        return;
    }

    let items: Vec<ListItem> = packs
        .iter()
        .map(|pack| {
            let size = pack.size_bytes().map(format_size).unwrap_or_default();
            let marker = if app.store.nav().is_pack_selected(pack) {
                "● "
            } else {
                "  "
            };
            ListItem::new(Line::from(vec![
                Span::styled(marker, Style::default().fg(theme.success)),
                Span::styled(pack.name.clone(), Style::default().fg(theme.text)),
                Span::raw("  "),
                Span::styled(size, Style::default().fg(theme.muted)),
            ]))
        })
        .collect();
    let list = List::new(items)
        .block(block)
        .highlight_style(theme.highlight(focused))
        .highlight_symbol(if focused { ">" } else { " " });
    let mut state = ListState::default();
    state.select(Some(app.packs_cursor));
    frame.render_stateful_widget(list, area, &mut state);
}

fn draw_detail(frame: &mut Frame<'_>, app: &App, theme: &Theme, area: Rect) {
    let block = theme.panel("Pack");
    let Some(pack) = app.store.selected_pack() else {
        let empty = Paragraph::new("No pack selected.")
            .style(Style::default().fg(theme.muted))
            .block(block);
        frame.render_widget(empty, area);
        return;
    };
    let inner = block.inner(area);
    let lines = build_pack_details(pack, theme, inner.width as usize);
    let details = Paragraph::new(lines)
        .style(Style::default().fg(theme.text))
        .block(block)
        .wrap(Wrap { trim: false });
    frame.render_widget(details, area);
}

fn build_pack_details(pack: &Pack, theme: &Theme, width: usize) -> Vec<Line<'static>> {
    let label = |text: &'static str| Span::styled(text, Style::default().fg(theme.muted));
    let value = |text: String| Span::styled(text, Style::default().fg(theme.text));
    let modified = pack
        .modified_at()
        .and_then(|secs| OffsetDateTime::from_unix_timestamp(secs).ok())
        .and_then(|time| {
            time.format(format_description!("[year]-[month]-[day] [hour]:[minute] UTC"))
                .ok()
        })
        .unwrap_or_else(|| "-".to_string());
    let mods_folder = match pack.game.mods_folder() {
        "" => "(not set, press s)".to_string(),
        path => path.to_string(),
    };

    vec![
        Line::from(vec![
            Span::styled("> ", Style::default().fg(theme.muted)),
            Span::styled(
                pack.game.name.clone(),
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
            ),
            Span::styled(" / ", Style::default().fg(theme.muted)),
            Span::styled(
                pack.name.clone(),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            ),
        ]),
        Line::from("─".repeat(width.min(60))),
        Line::from(vec![label("Pack name:   "), value(pack.stem().to_string())]),
        Line::from(vec![label("File:        "), value(pack.path.display().to_string())]),
        Line::from(vec![
            label("Size:        "),
            value(pack.size_bytes().map(format_size).unwrap_or_else(|| "-".to_string())),
        ]),
        Line::from(vec![label("Modified:    "), value(modified)]),
        Line::from(vec![label("Game:        "), value(pack.game.name.clone())]),
        Line::from(vec![label("Mods folder: "), value(mods_folder)]),
        Line::from(""),
        Line::from(Span::styled(
            "Esc back | d delete | s game settings",
            Style::default().fg(theme.muted),
        )),
    ]
}

fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }
    if unit == 0 {
        format!("{bytes} B")
    } else {
        format!("{value:.1} {}", UNITS[unit])
    }
}

fn key_hint(app: &App) -> &'static str {
    let nav = app.store.nav();
    if nav.library().is_none() {
        return "o open library | q quit";
    }
    match (nav.panel(), nav.focus()) {
        (Panel::Detail, _) => "Esc back | d delete | s settings | r refresh | q quit",
        (Panel::Browsing, Focus::Games) => {
            "Enter select | a add | d delete | s settings | r refresh | Tab packs | o/u library"
        }
        (Panel::Browsing, Focus::Packs) => {
            "Enter open | a add | d delete | r refresh | Tab games | Esc back"
        }
    }
}

fn status_bar_line(app: &App, width: u16) -> String {
    let width = width as usize;
    let (left, right) = match &app.input_mode {
        InputMode::Editing { prompt, buffer, .. } => {
            (format!("{prompt}: {buffer}"), "Enter confirm | Esc cancel".to_string())
        }
        InputMode::Settings(_) => (
            format!("Status: {}", app.status),
            "Tab field | Enter save | Esc cancel".to_string(),
        ),
        InputMode::Browsing(_) => (
            format!("Status: {}", app.status),
            "Enter open/select | Backspace up | Esc cancel".to_string(),
        ),
        InputMode::Normal => (format!("Status: {}", app.status), key_hint(app).to_string()),
    };

    align_status(&left, &right, width)
}

/// Left text, then `right` pushed to the last column. Widths count chars,
/// not bytes.
fn align_status(left: &str, right: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }

    let left_len = left.chars().count();
    let right_len = right.chars().count();
    if left_len + right_len + 1 > width {
        let available = width.saturating_sub(left_len + 1);
        let trimmed_right: String = right.chars().take(available).collect();
        return format!("{left} {trimmed_right}");
    }

    let spaces = width - left_len - right_len;
    format!("{left}{}{right}", " ".repeat(spaces))
}

fn build_log_lines(app: &App, theme: &Theme, height: usize) -> Vec<Line<'static>> {
    if height == 0 {
        return Vec::new();
    }

    if app.logs.is_empty() {
        return vec![Line::from(Span::styled(
            "No recent events.",
            Style::default().fg(theme.muted),
        ))];
    }

    let total = app.logs.len();
    let view = height.max(1);
    let max_scroll = total.saturating_sub(view);
    let scroll = app.log_scroll.min(max_scroll);
    let start = total.saturating_sub(view + scroll);
    let end = (start + view).min(total);

    app.logs[start..end]
        .iter()
        .map(|entry| {
            let (label, color) = match entry.level {
                LogLevel::Info => ("[i]", theme.accent),
                LogLevel::Warn => ("[!]", theme.warning),
                LogLevel::Error => ("[x]", theme.error),
            };
            Line::from(vec![
                Span::styled(label, Style::default().fg(color).add_modifier(Modifier::BOLD)),
                Span::raw(" "),
                Span::styled(entry.message.clone(), Style::default().fg(theme.text)),
            ])
        })
        .collect()
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width.saturating_sub(2)).max(1);
    let height = height.min(area.height.saturating_sub(2)).max(1);
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width, height)
}

fn draw_settings(frame: &mut Frame<'_>, theme: &Theme, form: &SettingsForm) {
    let area = frame.size();
    let dialog_area = centered(area, (area.width * 2 / 3).max(50), 11);

    let field_line = |label: &'static str, value: &str, field: SettingsField| {
        let active = form.field == field;
        let cursor = if active { "_" } else { "" };
        Line::from(vec![
            Span::styled(label, Style::default().fg(theme.muted)),
            Span::styled(format!("{value}{cursor}"), theme.highlight(active)),
        ])
    };
    let browse_active = form.field == SettingsField::Browse;
    let lines = vec![
        Line::from(""),
        field_line("Game name:   ", &form.name, SettingsField::Name),
        Line::from(""),
        field_line("Mods folder: ", &form.mods_path, SettingsField::ModsFolder),
        Line::from(""),
        Line::from(vec![
            Span::raw("             "),
            Span::styled(" Browse... ", theme.highlight(browse_active)),
        ]),
        Line::from(""),
        Line::from(Span::styled(
            "Tab next field | Enter save | Esc cancel",
            Style::default().fg(theme.muted),
        )),
    ];

    frame.render_widget(Clear, dialog_area);
    let widget = Paragraph::new(lines)
        .block(theme.overlay(format!("Game settings: {}", form.original_name)))
        .style(Style::default().fg(theme.text));
    frame.render_widget(widget, dialog_area);
}

fn draw_path_browser(frame: &mut Frame<'_>, theme: &Theme, browser: &PathBrowser) {
    let area = frame.size();
    let dialog_area = centered(area, (area.width * 2 / 3).max(50), area.height * 2 / 3);
    let title = match &browser.purpose {
        PathBrowserPurpose::Library => "Select library folder".to_string(),
        PathBrowserPurpose::ModsFolder(form) => format!("Mods folder for {}", form.original_name),
    };

    frame.render_widget(Clear, dialog_area);
    let block = theme.overlay(title);
    let inner = block.inner(dialog_area);
    frame.render_widget(block, dialog_area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(2), Constraint::Min(1)])
        .split(inner);
    let current = Paragraph::new(Line::from(Span::styled(
        browser.current.display().to_string(),
        Style::default().fg(theme.muted),
    )));
    frame.render_widget(current, chunks[0]);

    let items: Vec<ListItem> = browser
        .entries
        .iter()
        .map(|entry| ListItem::new(entry.label.clone()))
        .collect();
    let list = List::new(items)
        .style(Style::default().fg(theme.text))
        .highlight_style(theme.highlight(true))
        .highlight_symbol(">");
    let mut state = ListState::default();
    state.select(Some(browser.selected));
    frame.render_stateful_widget(list, chunks[1], &mut state);
}

fn draw_dialog(frame: &mut Frame<'_>, app: &App, theme: &Theme) {
    let Some(dialog) = &app.dialog else {
        return;
    };

    let area = frame.size();
    let message_lines: Vec<Line> = dialog
        .message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let content_height = message_lines.len().max(1) as u16;
    let height = (content_height + 6).max(7);
    let width = (area.width.saturating_mul(2) / 3).max(34);
    let dialog_area = centered(area, width, height);

    let yes_selected = matches!(dialog.choice, DialogChoice::Yes);
    let yes_style = if yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.error)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };
    let no_style = if !yes_selected {
        Style::default()
            .fg(Color::Black)
            .bg(theme.accent)
            .add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(theme.text)
    };

    let buttons = Line::from(vec![
        Span::raw(" "),
        Span::styled(format!(" {} ", dialog.yes_label), yes_style),
        Span::raw("   "),
        Span::styled(format!(" {} ", dialog.no_label), no_style),
    ]);

    let mut lines = Vec::new();
    lines.push(Line::from(Span::styled(
        dialog.title.clone(),
        Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
    )));
    lines.push(Line::from(""));
    lines.extend(message_lines);
    lines.push(Line::from(""));
    lines.push(buttons);

    frame.render_widget(Clear, dialog_area);
    let dialog_block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.accent_soft))
        .style(Style::default().bg(theme.header_bg));
    let dialog_widget = Paragraph::new(lines)
        .block(dialog_block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true });
    frame.render_widget(dialog_widget, dialog_area);
}

fn mode_toast(app: &App) -> Option<(String, ToastLevel)> {
    if !matches!(app.store.nav().pending_dialog(), PendingDialog::NameInput(_)) {
        return None;
    }
    let InputMode::Editing { buffer, target, .. } = &app.input_mode else {
        return None;
    };
    let name = if buffer.trim().is_empty() {
        "<name>".to_string()
    } else {
        buffer.clone()
    };
    let message = match target {
        NameTarget::Game => format!("New game folder: \"{name}\" | Enter confirm | Esc cancel"),
        NameTarget::Pack => format!("New pack: \"{name}.pack\" | Enter confirm | Esc cancel"),
    };
    Some((message, ToastLevel::Info))
}

fn render_toast(
    frame: &mut Frame<'_>,
    theme: &Theme,
    body_area: Rect,
    message: &str,
    level: ToastLevel,
) {
    let max_width = body_area.width.saturating_sub(4).max(24);
    let max_text = max_width.saturating_sub(4) as usize;
    let mut message: String = message.to_string();
    if message.chars().count() > max_text {
        message = message.chars().take(max_text.saturating_sub(3)).collect();
        message.push_str("...");
    }
    let width = (message.chars().count() as u16 + 4).clamp(24, max_width);
    let x = body_area.x + (body_area.width.saturating_sub(width)) / 2;
    let y = body_area.y + 1;
    let toast_area = Rect::new(x, y, width, 3);

    let border = match level {
        ToastLevel::Info => theme.accent,
        ToastLevel::Warn => theme.warning,
        ToastLevel::Error => theme.error,
    };

    frame.render_widget(Clear, toast_area);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(border))
        .style(Style::default().bg(theme.header_bg));
    let content = Paragraph::new(message)
        .block(block)
        .style(Style::default().fg(theme.text))
        .alignment(Alignment::Center);
    frame.render_widget(content, toast_area);
}

fn draw_toast(frame: &mut Frame<'_>, app: &App, theme: &Theme, body_area: Rect) {
    if let Some((message, level)) = mode_toast(app) {
        render_toast(frame, theme, body_area, &message, level);
        return;
    }

    let Some(toast) = app.toast.as_ref() else {
        return;
    };
    if toast.expires_at <= Instant::now() {
        return;
    }

    render_toast(frame, theme, body_area, &toast.message, toast.level);
}
