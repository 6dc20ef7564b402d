// SPDX-License-Identifier: MIT

//! Menu items.
//!
//! An [`Item`] is a name with an optional description plus a little state:
//! whether it can be selected, whether it is selected, and whether it is on
//! screen. Items are created detached and become attached when a
//! [`Menu`](crate::menu::Menu) takes ownership of them; the index they get
//! then is their position in that menu.

use bitflags::bitflags;
use k_term::{Error, Result};

bitflags! {
    /// Per-item options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ItemOpts: u8 {
        /// The item can become current and be toggled.
        const SELECTABLE = 1 << 0;
    }
}

impl Default for ItemOpts {
    fn default() -> Self {
        Self::SELECTABLE
    }
}

/// One entry of a menu.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    name: String,
    description: String,
    opts: ItemOpts,
    value: bool,
    visible: bool,
    index: Option<usize>,
}

impl Item {
    /// A detached, selectable, unselected item.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            opts: ItemOpts::default(),
            value: false,
            visible: false,
            index: None,
        }
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    #[must_use]
    pub const fn opts(&self) -> ItemOpts {
        self.opts
    }

    #[must_use]
    pub const fn is_selectable(&self) -> bool {
        self.opts.contains(ItemOpts::SELECTABLE)
    }

    /// Whether the item is selected (its "value").
    #[must_use]
    pub const fn is_selected(&self) -> bool {
        self.value
    }

    /// Whether the item is inside the menu's displayed rows. Always false
    /// for a detached item.
    #[must_use]
    pub const fn is_visible(&self) -> bool {
        self.visible
    }

    /// Position in the owning menu, `None` while detached.
    #[must_use]
    pub const fn index(&self) -> Option<usize> {
        self.index
    }

    #[must_use]
    pub const fn is_attached(&self) -> bool {
        self.index.is_some()
    }

    /// Turn options on. Only detached items can be changed this way; use
    /// [`Menu::set_item_opts`](crate::menu::Menu::set_item_opts) for
    /// attached ones.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the item belongs to a menu.
    pub fn opts_on(&mut self, opts: ItemOpts) -> Result<()> {
        self.ensure_detached()?;
        self.opts |= opts;
        Ok(())
    }

    /// Turn options off. See [`opts_on`](Self::opts_on).
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the item belongs to a menu.
    pub fn opts_off(&mut self, opts: ItemOpts) -> Result<()> {
        self.ensure_detached()?;
        self.opts -= opts;
        Ok(())
    }

    /// Release a detached item.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the item still belongs to a menu.
    pub fn free(self) -> Result<()> {
        self.ensure_detached()
    }

    fn ensure_detached(&self) -> Result<()> {
        match self.index {
            None => Ok(()),
            Some(i) => Err(Error::State(format!(
                "item {:?} is attached to a menu at index {i}",
                self.name
            ))),
        }
    }

    // -----------------------------------------------------------------------
    // Menu-side state changes
    // -----------------------------------------------------------------------

    pub(crate) const fn attach(&mut self, index: usize) {
        self.index = Some(index);
    }

    pub(crate) const fn detach(&mut self) {
        self.index = None;
        self.visible = false;
        self.value = false;
    }

    pub(crate) const fn set_value(&mut self, value: bool) {
        self.value = value;
    }

    pub(crate) const fn set_visible(&mut self, visible: bool) {
        self.visible = visible;
    }

    pub(crate) const fn set_opts(&mut self, opts: ItemOpts) {
        self.opts = opts;
    }
}
