// SPDX-License-Identifier: MIT
//
// kurses — a curses-style terminal UI library, written from scratch.
//
// This crate only re-exports the workspace members:
//
//   k-term → cells, colors, windows, screen updates, key input, session
//   k-menu → the menu widget posted onto k-term windows
//
// Layering:
//
//   keys ─▶ Session::read_key ─▶ Request ─▶ Menu::drive
//                                              │
//   terminal ◀─ Screen::update ◀─ Window cells ◀┘ Menu::render

pub use k_menu as menu;
pub use k_term as term;

pub use k_menu::{Item, ItemOpts, Menu, MenuOpts, Request};
pub use k_term::{
    Attr, Backend, Capabilities, Cell, Color, ColorPair, CursorVisibility, Error, InputTimeout,
    Key, Result, Session, SessionConfig, TestBackend, TtyBackend, WindowId, WindowMut,
};
