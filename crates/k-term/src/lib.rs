// SPDX-License-Identifier: MIT
//
// k-term — Terminal core for kurses.
//
// Everything below the widget layer of a curses-style library: styled
// cells, color pairs, windows that share storage with their parents, a
// virtual screen diffed against the physical one, and key decoding.
//
// The physical terminal sits behind the `Backend` trait. `TtyBackend`
// drives a real terminal through termios and ANSI escape sequences;
// `TestBackend` keeps an in-memory grid so the whole library can be
// exercised without a tty.
//
// Typical use:
//
//     let (mut session, root) = Session::initialize(TtyBackend::new())?;
//     session.window_mut(root)?.write_str(0, 0, "hello", Attr::BOLD)?;
//     session.refresh(root)?;
//     let key = session.read_key(root)?;
//     session.end()?;

pub mod ansi;
pub mod backend;
pub mod buffer;
pub mod cell;
pub mod color;
pub mod config;
pub mod diff;
pub mod error;
pub mod input;
pub mod output;
pub mod screen;
pub mod session;
pub mod terminal;
pub mod window;

pub use backend::{Backend, Capabilities, CursorVisibility, Size, TestBackend};
pub use buffer::{FrameBuffer, Rect};
pub use cell::{Attr, Cell};
pub use color::{Color, ColorPair, ColorRegistry};
pub use config::SessionConfig;
pub use error::{Error, Result};
pub use input::Key;
pub use session::Session;
pub use terminal::TtyBackend;
pub use window::{InputTimeout, Window, WindowId, WindowMut};
