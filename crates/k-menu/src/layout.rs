// SPDX-License-Identifier: MIT

//! Menu geometry.
//!
//! Items sit in a grid. Row-major menus use `min(format cols, n)` columns
//! and as many rows as that takes; column-major menus fill
//! `min(format rows, n)` rows per column and add columns as needed. Only
//! `min(format rows, grid rows)` rows are displayed at once; the rest are
//! reached by scrolling.
//!
//! Every item occupies the same width:
//!
//! ```text
//!   mark | name column | ' ' description column
//! ```
//!
//! with one blank cell between grid columns. The description column exists
//! only with SHOW_DESC and when some item has a non-empty description.
//! Widths are display widths (unicode-width), not byte or char counts.

use unicode_width::UnicodeWidthStr;

use crate::item::Item;

/// Cells between adjacent grid columns.
pub const COLUMN_GAP: u16 = 1;

/// Grid shape and item widths for one menu configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Layout {
    /// Number of items laid out.
    pub count: usize,
    /// Grid rows, displayed or not.
    pub rows: u16,
    /// Grid columns.
    pub cols: u16,
    /// Rows shown at once.
    pub visible_rows: u16,
    pub row_major: bool,
    pub mark_width: u16,
    pub name_width: u16,
    /// Zero unless descriptions are shown and some item has one.
    pub desc_width: u16,
    /// Width of one item, mark included.
    pub item_width: u16,
}

impl Layout {
    /// Lay out `items` for a `format` of `(rows, cols)`.
    #[must_use]
    pub fn compute(
        items: &[Item],
        format: (u16, u16),
        mark: &str,
        row_major: bool,
        show_desc: bool,
    ) -> Self {
        let count = items.len();
        if count == 0 {
            return Self {
                row_major,
                ..Self::default()
            };
        }
        let n = clamp_u16(count);
        let (format_rows, format_cols) = (format.0.max(1), format.1.max(1));

        let (rows, cols) = if row_major {
            let cols = format_cols.min(n);
            (n.div_ceil(cols), cols)
        } else {
            let rows = format_rows.min(n);
            (rows, n.div_ceil(rows))
        };

        let mark_width = display_width(mark);
        let name_width = items.iter().map(|i| display_width(i.name())).max().unwrap_or(0);
        let desc_width = if show_desc {
            items
                .iter()
                .map(|i| display_width(i.description()))
                .max()
                .unwrap_or(0)
        } else {
            0
        };
        let item_width = mark_width
            .saturating_add(name_width)
            .saturating_add(if desc_width > 0 { desc_width.saturating_add(1) } else { 0 });

        Self {
            count,
            rows,
            cols,
            visible_rows: format_rows.min(rows),
            row_major,
            mark_width,
            name_width,
            desc_width,
            item_width,
        }
    }

    /// Minimum `(rows, cols)` of a window that shows the menu.
    #[must_use]
    pub const fn scale(&self) -> (u16, u16) {
        if self.cols == 0 {
            return (0, 0);
        }
        let gaps = (self.cols - 1).saturating_mul(COLUMN_GAP);
        (
            self.visible_rows,
            self.item_width.saturating_mul(self.cols).saturating_add(gaps),
        )
    }

    /// Grid `(row, col)` of item `index`.
    #[must_use]
    pub fn position(&self, index: usize) -> (u16, u16) {
        if self.row_major {
            let cols = usize::from(self.cols.max(1));
            (clamp_u16(index / cols), clamp_u16(index % cols))
        } else {
            let rows = usize::from(self.rows.max(1));
            (clamp_u16(index % rows), clamp_u16(index / rows))
        }
    }

    /// Item at grid `(row, col)`, if that cell holds one.
    #[must_use]
    pub fn index_at(&self, row: u16, col: u16) -> Option<usize> {
        if row >= self.rows || col >= self.cols {
            return None;
        }
        let index = if self.row_major {
            usize::from(row) * usize::from(self.cols) + usize::from(col)
        } else {
            usize::from(col) * usize::from(self.rows) + usize::from(row)
        };
        (index < self.count).then_some(index)
    }

    /// Window column where grid column `col` starts.
    #[must_use]
    pub const fn column_x(&self, col: u16) -> u16 {
        col.saturating_mul(self.item_width.saturating_add(COLUMN_GAP))
    }
}

/// Display width of `s` in cells, saturated to `u16`.
#[must_use]
pub fn display_width(s: &str) -> u16 {
    clamp_u16(s.width())
}

fn clamp_u16(n: usize) -> u16 {
    u16::try_from(n).unwrap_or(u16::MAX)
}
