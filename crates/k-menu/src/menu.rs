// SPDX-License-Identifier: MIT

//! The menu state machine.
//!
//! A [`Menu`] owns its items and tracks the current item, the scroll
//! position, the pattern typed so far, and whether it is posted. It moves
//! between two states:
//!
//! ```text
//!   unposted ── post ──▶ posted
//!      ▲                   │
//!      └────── unpost ─────┘
//! ```
//!
//! Shape-changing setters (items, format, mark, options, windows) are only
//! allowed while unposted. [`Menu::drive`] works in either state; a posted
//! menu is redrawn with [`Menu::render`].
//!
//! Whenever any item is selectable, the current item is a selectable one.
//! Navigation skips items that are not.

use bitflags::bitflags;
use k_term::{Attr, Backend, Error, Result, Session, WindowId};

use crate::item::{Item, ItemOpts};
use crate::layout::Layout;
use crate::render;
use crate::request::Request;

bitflags! {
    /// Menu-wide options.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct MenuOpts: u16 {
        /// At most one item is selected; toggling selects the current item
        /// and clears the rest.
        const ONE_VALUE   = 1 << 0;
        /// Show item descriptions after the names.
        const SHOW_DESC   = 1 << 1;
        /// Lay items out row by row instead of column by column.
        const ROW_MAJOR   = 1 << 2;
        /// Pattern matching ignores case.
        const IGNORE_CASE = 1 << 3;
        /// Put the window cursor after the matched prefix.
        const SHOW_MATCH  = 1 << 4;
        /// Stop at the first and last items instead of wrapping.
        const NON_CYCLIC  = 1 << 5;
    }
}

impl Default for MenuOpts {
    fn default() -> Self {
        Self::all() - Self::NON_CYCLIC
    }
}

/// Default visible grid: 16 rows, 1 column.
pub const DEFAULT_FORMAT: (u16, u16) = (16, 1);

/// Default mark shown before the current item.
pub const DEFAULT_MARK: &str = "-";

// ---------------------------------------------------------------------------
// Menu
// ---------------------------------------------------------------------------

/// A list of items shown on a window, with a current item and optional
/// selections.
#[derive(Debug)]
pub struct Menu {
    items: Vec<Item>,
    current: Option<usize>,
    top_row: u16,
    window: Option<WindowId>,
    sub_window: Option<WindowId>,
    /// Where the menu is drawn while posted.
    posted_on: Option<WindowId>,
    opts: MenuOpts,
    mark: String,
    pattern: String,
    format: (u16, u16),
    fore: Attr,
    back: Attr,
    grey: Attr,
    pad: char,
    layout: Layout,
}

impl Menu {
    /// A menu owning `items`, current item the first selectable one.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if any item is already attached to a menu.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        let mut menu = Self {
            items: Vec::new(),
            current: None,
            top_row: 0,
            window: None,
            sub_window: None,
            posted_on: None,
            opts: MenuOpts::default(),
            mark: DEFAULT_MARK.to_owned(),
            pattern: String::new(),
            format: DEFAULT_FORMAT,
            fore: Attr::REVERSE,
            back: Attr::NORMAL,
            grey: Attr::UNDERLINE,
            pad: ' ',
            layout: Layout::default(),
        };
        menu.attach(items)?;
        Ok(menu)
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn items(&self) -> &[Item] {
        &self.items
    }

    #[must_use]
    pub fn item(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    #[must_use]
    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Index of the current item; `None` when the menu is empty.
    #[must_use]
    pub const fn current(&self) -> Option<usize> {
        self.current
    }

    #[must_use]
    pub fn current_item(&self) -> Option<&Item> {
        self.current.and_then(|i| self.items.get(i))
    }

    /// Indices of the selected items, in order.
    #[must_use]
    pub fn selected(&self) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.is_selected())
            .map(|(i, _)| i)
            .collect()
    }

    /// Grid row shown at the top of the window.
    #[must_use]
    pub const fn top_row(&self) -> u16 {
        self.top_row
    }

    #[must_use]
    pub const fn opts(&self) -> MenuOpts {
        self.opts
    }

    #[must_use]
    pub fn mark(&self) -> &str {
        &self.mark
    }

    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    #[must_use]
    pub const fn is_posted(&self) -> bool {
        self.posted_on.is_some()
    }

    /// The `(rows, cols)` grid requested with [`set_format`](Self::set_format).
    #[must_use]
    pub const fn format(&self) -> (u16, u16) {
        self.format
    }

    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    #[must_use]
    pub const fn window(&self) -> Option<WindowId> {
        self.window
    }

    #[must_use]
    pub const fn sub_window(&self) -> Option<WindowId> {
        self.sub_window
    }

    /// Attribute of the current (and, in multi-value menus, selected) items.
    #[must_use]
    pub const fn fore(&self) -> Attr {
        self.fore
    }

    /// Attribute of the other selectable items.
    #[must_use]
    pub const fn back(&self) -> Attr {
        self.back
    }

    /// Attribute of items that cannot be selected.
    #[must_use]
    pub const fn grey(&self) -> Attr {
        self.grey
    }

    /// Character filling the space between name and description.
    #[must_use]
    pub const fn pad(&self) -> char {
        self.pad
    }

    /// Minimum `(rows, cols)` of a window that can show the menu.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if the menu has no items.
    pub fn scale(&self) -> Result<(u16, u16)> {
        if self.items.is_empty() {
            return Err(Error::State("menu has no items".into()));
        }
        Ok(self.layout.scale())
    }

    // -----------------------------------------------------------------------
    // Configuration
    // -----------------------------------------------------------------------

    /// Replace the items, returning the old ones detached.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted, or if a new item is attached
    /// elsewhere. The menu is unchanged on error.
    pub fn set_items(&mut self, items: Vec<Item>) -> Result<Vec<Item>> {
        self.ensure_unposted("change items of")?;
        if let Some(item) = items.iter().find(|i| i.is_attached()) {
            return Err(Error::State(format!(
                "item {:?} is already attached to a menu",
                item.name()
            )));
        }
        let old = self.take_items();
        self.attach(items)?;
        Ok(old)
    }

    /// Detach and return every item, leaving the menu empty.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn free(&mut self) -> Result<Vec<Item>> {
        self.ensure_unposted("free")?;
        let items = self.take_items();
        self.relayout();
        Ok(items)
    }

    /// Set the visible grid; a zero keeps the current value.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn set_format(&mut self, rows: u16, cols: u16) -> Result<()> {
        self.ensure_unposted("format")?;
        if rows > 0 {
            self.format.0 = rows;
        }
        if cols > 0 {
            self.format.1 = cols;
        }
        self.relayout();
        Ok(())
    }

    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn set_mark(&mut self, mark: impl Into<String>) -> Result<()> {
        self.ensure_unposted("change the mark of")?;
        self.mark = mark.into();
        self.relayout();
        Ok(())
    }

    /// Replace the option set.
    ///
    /// Turning ONE_VALUE on clears every selection.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn set_opts(&mut self, opts: MenuOpts) -> Result<()> {
        self.ensure_unposted("change options of")?;
        if opts.contains(MenuOpts::ONE_VALUE) && !self.opts.contains(MenuOpts::ONE_VALUE) {
            self.items.iter_mut().for_each(|i| i.set_value(false));
        }
        self.opts = opts;
        self.relayout();
        Ok(())
    }

    /// # Errors
    ///
    /// As [`set_opts`](Self::set_opts).
    pub fn opts_on(&mut self, opts: MenuOpts) -> Result<()> {
        self.set_opts(self.opts | opts)
    }

    /// # Errors
    ///
    /// As [`set_opts`](Self::set_opts).
    pub fn opts_off(&mut self, opts: MenuOpts) -> Result<()> {
        self.set_opts(self.opts - opts)
    }

    /// Replace an attached item's options. Clearing SELECTABLE also clears
    /// its selection and moves the current item off it.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] for an index past the end.
    pub fn set_item_opts(&mut self, index: usize, opts: ItemOpts) -> Result<()> {
        let len = self.items.len();
        let item = self.items.get_mut(index).ok_or_else(|| index_error(index, len))?;
        item.set_opts(opts);
        if !opts.contains(ItemOpts::SELECTABLE) {
            item.set_value(false);
            if self.current == Some(index) {
                self.current = self.nearest_selectable(index);
                self.sync_top_row();
            }
        } else if self.current.is_none() {
            self.current = Some(index);
            self.sync_top_row();
        }
        Ok(())
    }

    /// Make item `index` current. Clears the pattern.
    ///
    /// # Errors
    ///
    /// [`Error::Range`] for an index past the end; [`Error::State`] for an
    /// item that cannot be selected.
    pub fn set_current(&mut self, index: usize) -> Result<()> {
        let item = self.items.get(index).ok_or_else(|| index_error(index, self.items.len()))?;
        if !item.is_selectable() {
            return Err(Error::State(format!("item {:?} is not selectable", item.name())));
        }
        self.pattern.clear();
        self.move_to(index);
        Ok(())
    }

    /// The frame window. Items are drawn here unless a sub window is set.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn set_window(&mut self, window: Option<WindowId>) -> Result<()> {
        self.ensure_unposted("move")?;
        self.window = window;
        Ok(())
    }

    /// The window items are drawn in.
    ///
    /// # Errors
    ///
    /// [`Error::State`] while posted.
    pub fn set_sub_window(&mut self, window: Option<WindowId>) -> Result<()> {
        self.ensure_unposted("move")?;
        self.sub_window = window;
        Ok(())
    }

    pub const fn set_fore(&mut self, attr: Attr) {
        self.fore = attr;
    }

    pub const fn set_back(&mut self, attr: Attr) {
        self.back = attr;
    }

    pub const fn set_grey(&mut self, attr: Attr) {
        self.grey = attr;
    }

    pub const fn set_pad(&mut self, pad: char) {
        self.pad = pad;
    }

    // -----------------------------------------------------------------------
    // Posting
    // -----------------------------------------------------------------------

    /// Show the menu: on the sub window if set, else the window, else the
    /// session's root window. The caller refreshes.
    ///
    /// # Errors
    ///
    /// - [`Error::State`] if already posted or empty.
    /// - [`Error::Layout`] if the target window is smaller than
    ///   [`scale`](Self::scale).
    /// - Window errors from the session.
    pub fn post<B: Backend>(&mut self, session: &mut Session<B>) -> Result<()> {
        if self.is_posted() {
            return Err(Error::State("menu is already posted".into()));
        }
        let (need_rows, need_cols) = self.scale()?;
        let target = self.target(session);
        let win = session.window(target)?;
        let (have_rows, have_cols) = (win.rows(), win.cols());
        if have_rows < need_rows || have_cols < need_cols {
            return Err(Error::Layout {
                need_rows,
                need_cols,
                have_rows,
                have_cols,
            });
        }

        self.sync_top_row();
        render::draw(self, &mut session.window_mut(target)?)?;
        self.posted_on = Some(target);
        tracing::debug!(%target, items = self.items.len(), "menu posted");
        Ok(())
    }

    /// Take the menu off its window, erasing the area it used.
    ///
    /// # Errors
    ///
    /// [`Error::State`] if not posted; window errors from the session.
    pub fn unpost<B: Backend>(&mut self, session: &mut Session<B>) -> Result<()> {
        let target = self
            .posted_on
            .ok_or_else(|| Error::State("menu is not posted".into()))?;
        let (rows, cols) = self.layout.scale();
        session.window_mut(target)?.erase_region(0, 0, cols, rows);
        self.posted_on = None;
        tracing::debug!(%target, "menu unposted");
        Ok(())
    }

    /// Redraw a posted menu, typically after [`drive`](Self::drive).
    ///
    /// # Errors
    ///
    /// [`Error::State`] if not posted; window errors from the session.
    pub fn render<B: Backend>(&self, session: &mut Session<B>) -> Result<()> {
        let target = self
            .posted_on
            .ok_or_else(|| Error::State("menu is not posted".into()))?;
        render::draw(self, &mut session.window_mut(target)?)
    }

    fn target<B: Backend>(&self, session: &Session<B>) -> WindowId {
        self.sub_window.or(self.window).unwrap_or_else(|| session.root())
    }

    // -----------------------------------------------------------------------
    // Driving
    // -----------------------------------------------------------------------

    /// Apply one request.
    ///
    /// # Errors
    ///
    /// - [`Error::NoMatch`] when a move runs into the end of a non-cyclic
    ///   menu, a scroll has nowhere to go, or a pattern matches nothing.
    ///   Nothing changes in that case.
    /// - [`Error::State`] when toggling an item that cannot be selected, or
    ///   driving an empty menu.
    pub fn drive(&mut self, request: Request) -> Result<()> {
        let Some(current) = self.current else {
            return Err(Error::State("menu has no selectable items".into()));
        };
        tracing::trace!(?request, current, "menu request");

        match request {
            Request::NextItem => self.step_linear(current, true),
            Request::PrevItem => self.step_linear(current, false),
            Request::FirstItem => self.jump(self.items.iter().position(Item::is_selectable)),
            Request::LastItem => self.jump(self.items.iter().rposition(Item::is_selectable)),
            Request::UpItem => self.step_grid(current, Direction::Up),
            Request::DownItem => self.step_grid(current, Direction::Down),
            Request::LeftItem => self.step_grid(current, Direction::Left),
            Request::RightItem => self.step_grid(current, Direction::Right),
            Request::ScrollUpLine => self.scroll_line(false),
            Request::ScrollDownLine => self.scroll_line(true),
            Request::ScrollUpPage => self.scroll_page(false),
            Request::ScrollDownPage => self.scroll_page(true),
            Request::Toggle => self.toggle(current),
            Request::Char(c) => self.append_pattern(current, c),
            Request::BackPattern => self.pattern.pop().map(|_| ()).ok_or(Error::NoMatch),
            Request::ClearPattern => {
                self.pattern.clear();
                Ok(())
            }
            Request::NextMatch => self.next_match(current, true),
            Request::PrevMatch => self.next_match(current, false),
        }
    }

    fn step_linear(&mut self, from: usize, forward: bool) -> Result<()> {
        let n = self.items.len();
        let cyclic = self.is_cyclic();
        let mut index = from;
        for _ in 0..n {
            index = match (forward, index) {
                (true, i) if i + 1 < n => i + 1,
                (true, _) if cyclic => 0,
                (false, 0) if cyclic => n - 1,
                (false, i) if i > 0 => i - 1,
                _ => return Err(Error::NoMatch),
            };
            if self.items[index].is_selectable() {
                self.navigate(index);
                return Ok(());
            }
        }
        Err(Error::NoMatch)
    }

    fn step_grid(&mut self, from: usize, dir: Direction) -> Result<()> {
        let layout = self.layout;
        let cyclic = self.is_cyclic();
        let (mut row, mut col) = layout.position(from);
        let steps = usize::from(layout.rows.max(layout.cols)) + 1;

        for _ in 0..steps {
            (row, col) = match dir {
                Direction::Up if row > 0 => (row - 1, col),
                Direction::Up if cyclic => (layout.rows - 1, col),
                Direction::Down if row + 1 < layout.rows => (row + 1, col),
                Direction::Down if cyclic => (0, col),
                Direction::Left if col > 0 => (row, col - 1),
                Direction::Left if cyclic => (row, layout.cols - 1),
                Direction::Right if col + 1 < layout.cols => (row, col + 1),
                Direction::Right if cyclic => (row, 0),
                _ => return Err(Error::NoMatch),
            };
            // Short last rows and columns leave holes in the grid.
            if let Some(index) = layout.index_at(row, col) {
                if index == from || self.items[index].is_selectable() {
                    self.navigate(index);
                    return Ok(());
                }
            }
        }
        Err(Error::NoMatch)
    }

    fn jump(&mut self, target: Option<usize>) -> Result<()> {
        let index = target.ok_or(Error::NoMatch)?;
        self.navigate(index);
        Ok(())
    }

    fn scroll_line(&mut self, down: bool) -> Result<()> {
        let max_top = self.max_top_row();
        let previous_top = self.top_row;
        self.top_row = match down {
            true if self.top_row < max_top => self.top_row + 1,
            false if self.top_row > 0 => self.top_row - 1,
            _ => return Err(Error::NoMatch),
        };
        if let Err(err) = self.pull_current_into_view() {
            self.top_row = previous_top;
            return Err(err);
        }
        self.pattern.clear();
        Ok(())
    }

    fn scroll_page(&mut self, down: bool) -> Result<()> {
        let max_top = self.max_top_row();
        let page = self.layout.visible_rows.max(1);
        let previous_top = self.top_row;
        self.top_row = match down {
            true if self.top_row < max_top => (self.top_row + page).min(max_top),
            false if self.top_row > 0 => self.top_row.saturating_sub(page),
            _ => return Err(Error::NoMatch),
        };
        // The current item becomes the first selectable one on the new top
        // row, or the nearest displayed one.
        let first_on_top = (0..self.layout.cols)
            .filter_map(|col| self.layout.index_at(self.top_row, col))
            .find(|&i| self.items[i].is_selectable());
        match first_on_top {
            Some(index) => {
                self.current = Some(index);
                self.update_visibility();
            }
            None => {
                if let Err(err) = self.pull_current_into_view() {
                    self.top_row = previous_top;
                    return Err(err);
                }
            }
        }
        self.pattern.clear();
        Ok(())
    }

    fn toggle(&mut self, current: usize) -> Result<()> {
        let item = &self.items[current];
        if !item.is_selectable() {
            return Err(Error::State(format!("item {:?} is not selectable", item.name())));
        }
        if self.opts.contains(MenuOpts::ONE_VALUE) {
            for (i, item) in self.items.iter_mut().enumerate() {
                item.set_value(i == current);
            }
        } else {
            let value = !self.items[current].is_selected();
            self.items[current].set_value(value);
        }
        Ok(())
    }

    fn append_pattern(&mut self, current: usize, c: char) -> Result<()> {
        self.pattern.push(c);
        match self.find_match(current, Search::ForwardInclusive) {
            Some(index) => {
                self.move_to(index);
                Ok(())
            }
            None => {
                self.pattern.pop();
                Err(Error::NoMatch)
            }
        }
    }

    fn next_match(&mut self, current: usize, forward: bool) -> Result<()> {
        if self.pattern.is_empty() {
            return self.step_linear(current, forward);
        }
        let search = if forward { Search::Forward } else { Search::Backward };
        let index = self.find_match(current, search).ok_or(Error::NoMatch)?;
        self.move_to(index);
        Ok(())
    }

    /// First selectable item at or after/before `from` whose name starts
    /// with the pattern.
    fn find_match(&self, from: usize, search: Search) -> Option<usize> {
        let n = self.items.len();
        let cyclic = self.is_cyclic();
        let mut candidates: Box<dyn Iterator<Item = usize>> = match search {
            Search::ForwardInclusive => {
                let wrap = if cyclic { 0..from } else { 0..0 };
                Box::new((from..n).chain(wrap))
            }
            Search::Forward => {
                let wrap = if cyclic { 0..from + 1 } else { 0..0 };
                Box::new((from + 1..n).chain(wrap))
            }
            Search::Backward => {
                let wrap = if cyclic { from..n } else { 0..0 };
                Box::new((0..from).rev().chain(wrap.rev()))
            }
        };
        candidates.find(|&i| self.items[i].is_selectable() && self.matches(&self.items[i]))
    }

    fn matches(&self, item: &Item) -> bool {
        if self.opts.contains(MenuOpts::IGNORE_CASE) {
            item.name()
                .to_lowercase()
                .starts_with(&self.pattern.to_lowercase())
        } else {
            item.name().starts_with(&self.pattern)
        }
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn attach(&mut self, mut items: Vec<Item>) -> Result<()> {
        if let Some(item) = items.iter().find(|i| i.is_attached()) {
            return Err(Error::State(format!(
                "item {:?} is already attached to a menu",
                item.name()
            )));
        }
        for (i, item) in items.iter_mut().enumerate() {
            item.attach(i);
        }
        self.items = items;
        self.pattern.clear();
        self.top_row = 0;
        self.current = self.items.iter().position(Item::is_selectable);
        self.relayout();
        Ok(())
    }

    fn take_items(&mut self) -> Vec<Item> {
        let mut items = std::mem::take(&mut self.items);
        items.iter_mut().for_each(Item::detach);
        self.current = None;
        self.top_row = 0;
        self.pattern.clear();
        items
    }

    fn relayout(&mut self) {
        self.layout = Layout::compute(
            &self.items,
            self.format,
            &self.mark,
            self.opts.contains(MenuOpts::ROW_MAJOR),
            self.opts.contains(MenuOpts::SHOW_DESC),
        );
        self.top_row = self.top_row.min(self.max_top_row());
        self.sync_top_row();
    }

    const fn is_cyclic(&self) -> bool {
        !self.opts.contains(MenuOpts::NON_CYCLIC)
    }

    const fn max_top_row(&self) -> u16 {
        self.layout.rows.saturating_sub(self.layout.visible_rows)
    }

    /// Move by position: clears the pattern.
    fn navigate(&mut self, index: usize) {
        self.pattern.clear();
        self.move_to(index);
    }

    fn move_to(&mut self, index: usize) {
        self.current = Some(index);
        self.sync_top_row();
    }

    /// Scroll just enough to show the current item.
    fn sync_top_row(&mut self) {
        if let Some(current) = self.current {
            let (row, _) = self.layout.position(current);
            let visible = self.layout.visible_rows.max(1);
            if row < self.top_row {
                self.top_row = row;
            } else if row >= self.top_row + visible {
                self.top_row = row + 1 - visible;
            }
        }
        self.update_visibility();
    }

    /// After a scroll, move the current item onto a displayed row.
    ///
    /// `NoMatch` when no displayed row holds a selectable item; nothing is
    /// changed then.
    fn pull_current_into_view(&mut self) -> Result<()> {
        let Some(current) = self.current else {
            self.update_visibility();
            return Ok(());
        };
        let (row, col) = self.layout.position(current);
        let last_visible = self.top_row + self.layout.visible_rows.max(1) - 1;
        let target_row = row.clamp(self.top_row, last_visible);
        if target_row != row {
            let index = self
                .layout
                .index_at(target_row, col)
                .or_else(|| (0..col).rev().find_map(|c| self.layout.index_at(target_row, c)))
                .ok_or(Error::NoMatch)?;
            self.current = Some(self.nearest_displayed_selectable(index).ok_or(Error::NoMatch)?);
        }
        self.update_visibility();
        Ok(())
    }

    /// `index` if selectable, else the closest selectable item after it,
    /// else the closest before it.
    fn nearest_selectable(&self, index: usize) -> Option<usize> {
        (index..self.items.len())
            .chain((0..index).rev())
            .find(|&i| self.items[i].is_selectable())
    }

    /// Like [`Self::nearest_selectable`], limited to the displayed rows.
    fn nearest_displayed_selectable(&self, index: usize) -> Option<usize> {
        let top = self.top_row;
        let bottom = top.saturating_add(self.layout.visible_rows.max(1));
        (index..self.items.len())
            .chain((0..index).rev())
            .filter(|&i| (top..bottom).contains(&self.layout.position(i).0))
            .find(|&i| self.items[i].is_selectable())
    }

    fn update_visibility(&mut self) {
        let top = self.top_row;
        let bottom = top.saturating_add(self.layout.visible_rows);
        let layout = self.layout;
        for (i, item) in self.items.iter_mut().enumerate() {
            let (row, _) = layout.position(i);
            item.set_visible(row >= top && row < bottom);
        }
    }

    fn ensure_unposted(&self, action: &str) -> Result<()> {
        if self.is_posted() {
            Err(Error::State(format!("cannot {action} a posted menu")))
        } else {
            Ok(())
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Direction {
    Up,
    Down,
    Left,
    Right,
}

#[derive(Debug, Clone, Copy)]
enum Search {
    ForwardInclusive,
    Forward,
    Backward,
}

fn index_error(index: usize, len: usize) -> Error {
    Error::Range {
        what: "item index",
        value: u32::try_from(index).unwrap_or(u32::MAX),
        limit: u32::try_from(len).unwrap_or(u32::MAX),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn menu(names: &[&str]) -> Menu {
        Menu::new(names.iter().map(|n| Item::new(*n, "")).collect()).unwrap()
    }

    fn non_cyclic(names: &[&str]) -> Menu {
        let mut m = menu(names);
        m.opts_on(MenuOpts::NON_CYCLIC).unwrap();
        m
    }

    // -- construction -------------------------------------------------------

    #[test]
    fn new_attaches_items_in_order() {
        let m = menu(&["A", "B", "C"]);
        assert_eq!(m.item_count(), 3);
        assert_eq!(m.current(), Some(0));
        assert!(m.items().iter().enumerate().all(|(i, it)| it.index() == Some(i)));
        assert!(m.items().iter().all(Item::is_visible));
    }

    #[test]
    fn empty_menu_has_no_current() {
        let mut m = Menu::new(Vec::new()).unwrap();
        assert_eq!(m.current(), None);
        assert!(matches!(m.scale(), Err(Error::State(_))));
        assert!(matches!(m.drive(Request::NextItem), Err(Error::State(_))));
    }

    #[test]
    fn attached_item_cannot_join_another_menu() {
        let m = menu(&["A"]);
        let stolen = m.items()[0].clone();
        assert!(matches!(Menu::new(vec![stolen]), Err(Error::State(_))));
    }

    #[test]
    fn default_options() {
        let m = menu(&["A"]);
        assert_eq!(m.opts(), MenuOpts::all() - MenuOpts::NON_CYCLIC);
        assert_eq!(m.mark(), "-");
        assert_eq!(m.format(), (16, 1));
        assert_eq!(m.fore(), Attr::REVERSE);
        assert_eq!(m.back(), Attr::NORMAL);
        assert_eq!(m.grey(), Attr::UNDERLINE);
        assert_eq!(m.pad(), ' ');
    }

    #[test]
    fn free_detaches_items() {
        let mut m = menu(&["A", "B"]);
        let items = m.free().unwrap();
        assert_eq!(m.item_count(), 0);
        assert_eq!(m.current(), None);
        assert!(items.iter().all(|i| !i.is_attached()));
        assert!(items.into_iter().all(|i| i.free().is_ok()));
    }

    #[test]
    fn set_items_returns_old_items_detached() {
        let mut m = menu(&["A", "B"]);
        let old = m.set_items(vec![Item::new("X", ""), Item::new("Y", "")]).unwrap();
        assert_eq!(old.len(), 2);
        assert!(old.iter().all(|i| !i.is_attached()));
        assert_eq!(m.current_item().map(Item::name), Some("X"));
    }

    // -- linear navigation --------------------------------------------------

    #[test]
    fn next_wraps_when_cyclic() {
        let mut m = menu(&["A", "B", "C"]);
        m.drive(Request::NextItem).unwrap();
        assert_eq!(m.current(), Some(1));
        m.drive(Request::NextItem).unwrap();
        m.drive(Request::NextItem).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn next_stops_at_end_when_non_cyclic() {
        let mut m = non_cyclic(&["A", "B", "C"]);
        m.drive(Request::LastItem).unwrap();
        assert!(matches!(m.drive(Request::NextItem), Err(Error::NoMatch)));
        assert_eq!(m.current(), Some(2));
        m.drive(Request::FirstItem).unwrap();
        assert!(matches!(m.drive(Request::PrevItem), Err(Error::NoMatch)));
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn navigation_skips_unselectable_items() {
        let mut m = menu(&["A", "B", "C"]);
        m.set_item_opts(1, ItemOpts::empty()).unwrap();
        m.drive(Request::NextItem).unwrap();
        assert_eq!(m.current(), Some(2));
        m.drive(Request::PrevItem).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn first_and_last_pick_selectable_items() {
        let mut m = menu(&["A", "B", "C", "D"]);
        m.set_item_opts(0, ItemOpts::empty()).unwrap();
        m.set_item_opts(3, ItemOpts::empty()).unwrap();
        m.drive(Request::LastItem).unwrap();
        assert_eq!(m.current(), Some(2));
        m.drive(Request::FirstItem).unwrap();
        assert_eq!(m.current(), Some(1));
    }

    #[test]
    fn unselecting_current_moves_it() {
        let mut m = menu(&["A", "B"]);
        m.set_item_opts(0, ItemOpts::empty()).unwrap();
        assert_eq!(m.current(), Some(1));
    }

    // -- grid navigation ----------------------------------------------------

    #[test]
    fn grid_moves_in_row_major_layout() {
        // A B C
        // D E
        let mut m = menu(&["A", "B", "C", "D", "E"]);
        m.set_format(16, 3).unwrap();
        m.drive(Request::DownItem).unwrap();
        assert_eq!(m.current(), Some(3));
        m.drive(Request::RightItem).unwrap();
        assert_eq!(m.current(), Some(4));
        m.drive(Request::UpItem).unwrap();
        assert_eq!(m.current(), Some(1));
        m.drive(Request::LeftItem).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn grid_wraps_over_holes() {
        let mut m = menu(&["A", "B", "C", "D", "E"]);
        m.set_format(16, 3).unwrap();
        m.set_current(2).unwrap();
        // below C is a hole; wrapping lands back on row 0
        m.drive(Request::DownItem).unwrap();
        assert_eq!(m.current(), Some(2));
        m.drive(Request::RightItem).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn grid_boundary_non_cyclic() {
        let mut m = non_cyclic(&["A", "B"]);
        assert!(matches!(m.drive(Request::UpItem), Err(Error::NoMatch)));
        assert!(matches!(m.drive(Request::LeftItem), Err(Error::NoMatch)));
        m.drive(Request::DownItem).unwrap();
        assert_eq!(m.current(), Some(1));
    }

    #[test]
    fn column_major_down_is_next_in_column() {
        let mut m = menu(&["A", "B", "C", "D"]);
        m.opts_off(MenuOpts::ROW_MAJOR).unwrap();
        m.set_format(2, 0).unwrap();
        m.drive(Request::RightItem).unwrap();
        assert_eq!(m.current(), Some(2));
        m.drive(Request::DownItem).unwrap();
        assert_eq!(m.current(), Some(3));
    }

    // -- scrolling ----------------------------------------------------------

    fn tall() -> Menu {
        let names: Vec<String> = (0..10).map(|i| format!("item{i}")).collect();
        let mut m = Menu::new(names.iter().map(|n| Item::new(n.as_str(), "")).collect()).unwrap();
        m.set_format(3, 1).unwrap();
        m
    }

    #[test]
    fn moving_past_bottom_scrolls() {
        let mut m = tall();
        for _ in 0..3 {
            m.drive(Request::NextItem).unwrap();
        }
        assert_eq!(m.current(), Some(3));
        assert_eq!(m.top_row(), 1);
        assert!(!m.items()[0].is_visible());
        assert!(m.items()[3].is_visible());
    }

    #[test]
    fn scroll_line_drags_current_along() {
        let mut m = tall();
        m.drive(Request::ScrollDownLine).unwrap();
        assert_eq!(m.top_row(), 1);
        assert_eq!(m.current(), Some(1));
        assert!(matches!(m.drive(Request::ScrollUpLine), Ok(())));
        assert!(matches!(m.drive(Request::ScrollUpLine), Err(Error::NoMatch)));
    }

    #[test]
    fn scroll_page_moves_to_new_top_row() {
        let mut m = tall();
        m.drive(Request::ScrollDownPage).unwrap();
        assert_eq!(m.top_row(), 3);
        assert_eq!(m.current(), Some(3));
        m.drive(Request::ScrollDownPage).unwrap();
        m.drive(Request::ScrollDownPage).unwrap();
        assert_eq!(m.top_row(), 7);
        assert!(matches!(m.drive(Request::ScrollDownPage), Err(Error::NoMatch)));
        m.drive(Request::ScrollUpPage).unwrap();
        assert_eq!(m.top_row(), 4);
    }

    #[test]
    fn scroll_line_keeps_current_on_screen() {
        let mut m = tall();
        for i in 1..=2 {
            m.set_item_opts(i, ItemOpts::empty()).unwrap();
        }
        m.drive(Request::ScrollDownLine).unwrap();
        assert_eq!(m.top_row(), 1);
        assert_eq!(m.current(), Some(3));
        assert!(m.current_item().is_some_and(Item::is_visible));
    }

    #[test]
    fn scroll_line_without_selectable_rows_is_refused() {
        let mut m = tall();
        for i in 1..=3 {
            m.set_item_opts(i, ItemOpts::empty()).unwrap();
        }
        let err = m.drive(Request::ScrollDownLine).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(m.top_row(), 0);
        assert_eq!(m.current(), Some(0));
        assert!(m.current_item().is_some_and(Item::is_visible));
    }

    #[test]
    fn scroll_page_skips_unselectable_top_row() {
        let mut m = tall();
        for i in 3..=5 {
            m.set_item_opts(i, ItemOpts::empty()).unwrap();
        }
        let err = m.drive(Request::ScrollDownPage).unwrap_err();
        assert!(err.is_recoverable());
        assert_eq!(m.top_row(), 0);
        assert_eq!(m.current(), Some(0));
        assert!(m.current_item().is_some_and(Item::is_visible));
    }

    // -- toggling -----------------------------------------------------------

    #[test]
    fn one_value_toggle_is_exclusive() {
        let mut m = menu(&["A", "B", "C"]);
        m.drive(Request::Toggle).unwrap();
        m.drive(Request::NextItem).unwrap();
        m.drive(Request::Toggle).unwrap();
        assert_eq!(m.selected(), vec![1]);
    }

    #[test]
    fn multi_value_toggle_flips_current() {
        let mut m = menu(&["A", "B", "C"]);
        m.opts_off(MenuOpts::ONE_VALUE).unwrap();
        m.drive(Request::Toggle).unwrap();
        m.drive(Request::NextItem).unwrap();
        m.drive(Request::Toggle).unwrap();
        assert_eq!(m.selected(), vec![0, 1]);
        m.drive(Request::Toggle).unwrap();
        assert_eq!(m.selected(), vec![0]);
    }

    #[test]
    fn enabling_one_value_clears_selections() {
        let mut m = menu(&["A", "B"]);
        m.opts_off(MenuOpts::ONE_VALUE).unwrap();
        m.drive(Request::Toggle).unwrap();
        m.opts_on(MenuOpts::ONE_VALUE).unwrap();
        assert!(m.selected().is_empty());
    }

    #[test]
    fn set_current_rejects_unselectable() {
        let mut m = menu(&["A", "B"]);
        m.set_item_opts(1, ItemOpts::empty()).unwrap();
        assert!(matches!(m.set_current(1), Err(Error::State(_))));
        assert!(matches!(m.set_current(9), Err(Error::Range { .. })));
    }

    // -- patterns -----------------------------------------------------------

    #[test]
    fn pattern_walk_cyclic() {
        let mut m = menu(&["Apple", "Apricot", "Banana"]);
        m.drive(Request::Char('A')).unwrap();
        m.drive(Request::Char('p')).unwrap();
        assert_eq!(m.current(), Some(0));
        assert_eq!(m.pattern(), "Ap");
        m.drive(Request::NextMatch).unwrap();
        assert_eq!(m.current(), Some(1));
        m.drive(Request::NextMatch).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn pattern_walk_non_cyclic() {
        let mut m = non_cyclic(&["Apple", "Apricot", "Banana"]);
        m.drive(Request::Char('A')).unwrap();
        m.drive(Request::Char('p')).unwrap();
        m.drive(Request::NextMatch).unwrap();
        assert_eq!(m.current(), Some(1));
        assert!(matches!(m.drive(Request::NextMatch), Err(Error::NoMatch)));
        assert_eq!(m.current(), Some(1));
        m.drive(Request::PrevMatch).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    #[test]
    fn failed_char_leaves_pattern_and_current() {
        let mut m = menu(&["Apple", "Banana"]);
        m.drive(Request::Char('B')).unwrap();
        assert_eq!(m.current(), Some(1));
        assert!(matches!(m.drive(Request::Char('x')), Err(Error::NoMatch)));
        assert_eq!(m.pattern(), "B");
        assert_eq!(m.current(), Some(1));
    }

    #[test]
    fn ignore_case_governs_matching() {
        let mut m = menu(&["apple", "Banana"]);
        m.drive(Request::Char('b')).unwrap();
        assert_eq!(m.current(), Some(1));

        m.drive(Request::ClearPattern).unwrap();
        m.opts_off(MenuOpts::IGNORE_CASE).unwrap();
        m.set_current(0).unwrap();
        assert!(matches!(m.drive(Request::Char('b')), Err(Error::NoMatch)));
    }

    #[test]
    fn back_pattern_and_clear() {
        let mut m = menu(&["Apple"]);
        assert!(matches!(m.drive(Request::BackPattern), Err(Error::NoMatch)));
        m.drive(Request::Char('A')).unwrap();
        m.drive(Request::Char('p')).unwrap();
        m.drive(Request::BackPattern).unwrap();
        assert_eq!(m.pattern(), "A");
        m.drive(Request::ClearPattern).unwrap();
        assert_eq!(m.pattern(), "");
    }

    #[test]
    fn navigation_clears_pattern() {
        let mut m = menu(&["Apple", "Apricot"]);
        m.drive(Request::Char('A')).unwrap();
        m.drive(Request::NextItem).unwrap();
        assert_eq!(m.pattern(), "");
    }

    #[test]
    fn empty_pattern_match_moves_like_next() {
        let mut m = menu(&["A", "B"]);
        m.drive(Request::NextMatch).unwrap();
        assert_eq!(m.current(), Some(1));
        m.drive(Request::PrevMatch).unwrap();
        assert_eq!(m.current(), Some(0));
    }

    // -- format -------------------------------------------------------------

    #[test]
    fn set_format_zero_keeps_value() {
        let mut m = menu(&["A", "B", "C"]);
        m.set_format(0, 3).unwrap();
        assert_eq!(m.format(), (16, 3));
        assert_eq!(m.scale().unwrap(), (1, 3 * 2 + 2));
        m.set_format(2, 0).unwrap();
        assert_eq!(m.format(), (2, 3));
    }
}
