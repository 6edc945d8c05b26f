mod app;
mod config;
mod file_ops;
mod library;
mod navigation;
mod scan;
mod store;
mod ui;
mod view_model;

use anyhow::Result;
use app::{StartupMode, StartupOptions};

fn main() -> Result<()> {
    let mut args = std::env::args().skip(1).peekable();
    let mut options = StartupOptions::default();
    let mut list = false;

    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--library" | "-l" => {
                if let Some(path) = args.next() {
                    options.library = Some(app::expand_tilde(&path));
                } else {
                    eprintln!("--library requires a path");
                }
            }
            "--forget-library" => options.forget_library = true,
            "--no-intro" => options.no_intro = true,
            "--list" => list = true,
            "--help" | "-h" => {
                println!("Multipack");
                println!("  --library <path>   Open this library folder and remember it");
                println!("  --forget-library   Clear the remembered library folder");
                println!("  --list             Print games and packs without the TUI");
                println!("  --no-intro         Skip the intro screen");
                return Ok(());
            }
            other => eprintln!("Ignoring unknown argument: {other}"),
        }
    }

    if list {
        options.mode = StartupMode::Headless;
        options.no_intro = true;
        let mut app = app::App::initialize(options)?;
        app.wait_for_scans();
        print_library(&app);
        return Ok(());
    }

    let mut app = app::App::initialize(options)?;
    ui::run(&mut app)
}

fn print_library(app: &app::App) {
    let Some(library) = app.store.nav().library() else {
        println!("{}", app.status);
        return;
    };
    println!("{} ({})", library.name, library.root.display());

    let games = app.sorted_games();
    if games.is_empty() {
        println!("  no games");
    }
    for game in games {
        match game.mods_folder() {
            "" => println!("  {}", game.name),
            mods => println!("  {}  [mods: {mods}]", game.name),
        }
        match scan::scan_packs(game, app.store.view().games()) {
            Ok(packs) => {
                let mut names: Vec<String> = packs.into_iter().map(|pack| pack.name).collect();
                names.sort_by_key(|name| name.to_lowercase());
                for name in names {
                    println!("    {name}");
                }
            }
            Err(err) => println!("    ({err})"),
        }
    }
}
