// SPDX-License-Identifier: MIT

//! # k-menu — Menu widget for kurses
//!
//! A curses-style menu: a list of selectable items laid out in a grid on a
//! window, with a current item, optional selections, scrolling, and
//! incremental prefix matching.
//!
//! - **[`item`]**: `Item` and its options
//! - **[`menu`]**: `Menu`, the posted/unposted state machine and `drive`
//! - **[`request`]**: `Request` commands and their default key bindings
//! - **[`layout`]**: grid geometry and `scale`
//!
//! A typical loop reads a key, maps it to a request, drives the menu, and
//! redraws:
//!
//! ```no_run
//! # use k_menu::{Item, Menu, Request};
//! # use k_term::{Session, TtyBackend};
//! # fn main() -> k_term::Result<()> {
//! let (mut session, root) = Session::initialize(TtyBackend::new())?;
//! let mut menu = Menu::new(vec![Item::new("Open", ""), Item::new("Quit", "")])?;
//! menu.post(&mut session)?;
//! session.refresh(root)?;
//! while let Some(key) = session.read_key(root)? {
//!     if let Some(request) = Request::from_key(key) {
//!         // NoMatch just means "nothing happened"
//!         if let Err(err) = menu.drive(request) {
//!             if !err.is_recoverable() {
//!                 return Err(err);
//!             }
//!         }
//!         menu.render(&mut session)?;
//!         session.refresh(root)?;
//!     }
//! }
//! menu.unpost(&mut session)?;
//! session.end()
//! # }
//! ```

pub mod item;
pub mod layout;
pub mod menu;
mod render;
pub mod request;

pub use item::{Item, ItemOpts};
pub use layout::Layout;
pub use menu::{Menu, MenuOpts};
pub use request::Request;
