// SPDX-License-Identifier: MIT
//
// k-menu demo: a boxed fruit picker on the real terminal.
//
// Arrows / Tab move, typing jumps by prefix, Space toggles, Enter or q
// quits and prints the selection.
//
// Usage:
//   cargo run -p k-menu --example menu_demo
//   KURSES_LOG=/tmp/kurses.log RUST_LOG=debug cargo run -p k-menu --example menu_demo
//
// A `kurses.toml` in the working directory overrides session settings.

use std::sync::Mutex;

use k_menu::{Item, Menu, MenuOpts, Request};
use k_term::window::{BOX_HORIZONTAL, BOX_VERTICAL};
use k_term::{Attr, Color, Key, Session, SessionConfig, TtyBackend};
use tracing_subscriber::EnvFilter;

const FRUIT: &[(&str, &str)] = &[
    ("Apple", "crisp"),
    ("Apricot", "soft"),
    ("Banana", "sweet"),
    ("Blueberry", "tiny"),
    ("Cherry", "dark"),
    ("Grape", "seedless"),
    ("Kiwi", "fuzzy"),
    ("Lemon", "sour"),
    ("Mango", "ripe"),
    ("Orange", "juicy"),
    ("Pear", "grainy"),
    ("Plum", "tart"),
];

fn init_logging() {
    let Ok(path) = std::env::var("KURSES_LOG") else {
        return;
    };
    let Ok(file) = std::fs::OpenOptions::new().create(true).append(true).open(path) else {
        return;
    };
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(Mutex::new(file))
        .with_ansi(false)
        .try_init();
}

fn load_config() -> k_term::Result<SessionConfig> {
    match std::fs::read_to_string("kurses.toml") {
        Ok(text) => SessionConfig::from_toml(&text),
        Err(_) => Ok(SessionConfig {
            keypad: true,
            ..SessionConfig::default()
        }),
    }
}

fn run() -> k_term::Result<Vec<String>> {
    let (mut session, root) = Session::initialize_with(TtyBackend::new(), load_config()?)?;
    session.enable_keypad(root, true)?;

    if session.enable_color().is_ok() {
        session.register_color_pair(1, Color::Black, Color::Cyan)?;
        session.register_color_pair(2, Color::Yellow, Color::Default)?;
    }
    let highlight = if session.colors().is_enabled() {
        session.color_pair_attribute(1)
    } else {
        Attr::REVERSE
    };

    let mut menu = Menu::new(FRUIT.iter().map(|(n, d)| Item::new(*n, *d)).collect())?;
    menu.opts_off(MenuOpts::ONE_VALUE)?;
    menu.set_format(8, 1)?;
    menu.set_mark("> ")?;
    menu.set_fore(highlight | Attr::BOLD);

    let (rows, cols) = menu.scale()?;
    let frame = session.new_window(rows + 2, cols + 2, 1, 2)?;
    let inner = session.derived_window(frame, rows, cols, 1, 1)?;
    session.window_mut(frame)?.draw_box(BOX_VERTICAL, BOX_HORIZONTAL)?;
    session
        .window_mut(root)?
        .write_str(0, 0, "Space toggles, q quits", Attr::DIM)?;

    menu.set_window(Some(frame))?;
    menu.set_sub_window(Some(inner))?;
    menu.post(&mut session)?;
    session.stage(root)?;
    session.refresh(frame)?;

    while let Some(key) = session.read_key(frame)? {
        if matches!(key, Key::Enter | Key::Char('q')) {
            break;
        }
        let Some(request) = Request::from_key(key) else {
            continue;
        };
        match menu.drive(request) {
            Ok(()) => {}
            Err(err) if err.is_recoverable() => tracing::debug!(?request, "no match"),
            Err(err) => return Err(err),
        }
        menu.render(&mut session)?;
        session.refresh(frame)?;
    }

    let picked = menu
        .selected()
        .into_iter()
        .filter_map(|i| menu.item(i).map(|item| item.name().to_owned()))
        .collect();
    menu.unpost(&mut session)?;
    session.end()?;
    Ok(picked)
}

fn main() {
    init_logging();
    match run() {
        Ok(picked) if picked.is_empty() => println!("nothing picked"),
        Ok(picked) => println!("picked: {}", picked.join(", ")),
        Err(err) => {
            eprintln!("menu_demo: {err}");
            std::process::exit(1);
        }
    }
}
