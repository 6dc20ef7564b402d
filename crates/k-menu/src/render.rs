// SPDX-License-Identifier: MIT

//! Drawing a menu onto a window.
//!
//! Each displayed item becomes one run of cells:
//!
//! ```text
//!   [mark][name, padded][pad][description, padded]
//! ```
//!
//! The mark column shows the mark on the current item in one-value menus
//! and on every selected item in multi-value menus; elsewhere it is blank.

use k_term::{Attr, Result, WindowMut};

use crate::layout::display_width;
use crate::menu::{Menu, MenuOpts};

/// Paint the displayed rows of `menu` at the window's top-left corner and
/// park the window cursor on the current item.
pub(crate) fn draw(menu: &Menu, win: &mut WindowMut<'_>) -> Result<()> {
    let layout = menu.layout();
    let (rows, cols) = layout.scale();
    win.erase_region(0, 0, cols, rows);

    let one_value = menu.opts().contains(MenuOpts::ONE_VALUE);
    let top = menu.top_row();

    for (index, item) in menu.items().iter().enumerate() {
        if !item.is_visible() {
            continue;
        }
        let (row, col) = layout.position(index);
        let is_current = menu.current() == Some(index);
        let marked = if one_value { is_current } else { item.is_selected() };
        let attrs = item_attrs(menu, index);

        let mut text = String::new();
        if marked {
            text.push_str(menu.mark());
        } else {
            pad_to(&mut text, "", layout.mark_width, ' ');
        }
        pad_to(&mut text, item.name(), layout.name_width, menu.pad());
        if layout.desc_width > 0 {
            text.push(menu.pad());
            pad_to(&mut text, item.description(), layout.desc_width, menu.pad());
        }

        win.write_str(layout.column_x(col), row - top, &text, attrs)?;
    }

    if let Some(current) = menu.current() {
        let (row, col) = layout.position(current);
        let mut x = layout.column_x(col).saturating_add(layout.mark_width);
        if menu.opts().contains(MenuOpts::SHOW_MATCH) {
            x = x.saturating_add(display_width(menu.pattern()));
        }
        let max_x = win.window().cols().saturating_sub(1);
        win.move_cursor(x.min(max_x), row.saturating_sub(top))?;
    }
    Ok(())
}

/// grey for unselectable items, fore for the current item (and selected
/// items in multi-value menus), back for the rest.
fn item_attrs(menu: &Menu, index: usize) -> Attr {
    let Some(item) = menu.item(index) else {
        return menu.back();
    };
    let multi = !menu.opts().contains(MenuOpts::ONE_VALUE);
    if !item.is_selectable() {
        menu.grey()
    } else if menu.current() == Some(index) || (multi && item.is_selected()) {
        menu.fore()
    } else {
        menu.back()
    }
}

fn pad_to(out: &mut String, text: &str, width: u16, pad: char) {
    out.push_str(text);
    let used = display_width(text);
    out.extend(std::iter::repeat_n(pad, usize::from(width.saturating_sub(used))));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::{Item, ItemOpts};
    use crate::request::Request;
    use k_term::{Session, TestBackend};
    use pretty_assertions::assert_eq;

    fn setup(names: &[(&str, &str)]) -> (Session<TestBackend>, k_term::WindowId, Menu) {
        let (session, root) = Session::initialize(TestBackend::new(20, 4)).unwrap();
        let items = names.iter().map(|(n, d)| Item::new(*n, *d)).collect();
        (session, root, Menu::new(items).unwrap())
    }

    #[test]
    fn current_item_gets_mark_and_fore() {
        let (mut s, root, menu) = setup(&[("One", ""), ("Two", "")]);
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();

        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), "-One                ");
        assert_eq!(win.row_text(1), " Two                ");
        assert_eq!(win.cell(1, 0).map(|c| c.attrs), Some(Attr::REVERSE));
        assert_eq!(win.cell(1, 1).map(|c| c.attrs), Some(Attr::NORMAL));
        assert_eq!(win.cursor(), (1, 0));
    }

    #[test]
    fn descriptions_follow_padded_names() {
        let (mut s, root, mut menu) = setup(&[("Open", "file"), ("Quit", "bye")]);
        menu.set_pad('.');
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();

        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), "-Open.file          ");
        assert_eq!(win.row_text(1), " Quit.bye.          ");
    }

    #[test]
    fn empty_descriptions_leave_no_pad_cell() {
        let (mut s, root, mut menu) = setup(&[("One", ""), ("Two", "")]);
        menu.set_pad('.');
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();

        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), "-One                ");
        assert_eq!(win.row_text(1), " Two                ");
    }

    #[test]
    fn unselectable_items_are_grey() {
        let (mut s, root, mut menu) = setup(&[("A", ""), ("B", "")]);
        menu.set_item_opts(1, ItemOpts::empty()).unwrap();
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();
        let win = s.window(root).unwrap();
        assert_eq!(win.cell(1, 1).map(|c| c.attrs), Some(Attr::UNDERLINE));
    }

    #[test]
    fn multi_value_marks_selected_items() {
        let (mut s, root, mut menu) = setup(&[("A", ""), ("B", ""), ("C", "")]);
        menu.opts_off(MenuOpts::ONE_VALUE).unwrap();
        menu.drive(Request::NextItem).unwrap();
        menu.drive(Request::NextItem).unwrap();
        menu.drive(Request::Toggle).unwrap();
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();

        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), " A                  ");
        assert_eq!(win.row_text(2), "-C                  ");
    }

    #[test]
    fn show_match_puts_cursor_after_prefix() {
        let (mut s, root, mut menu) = setup(&[("Apple", ""), ("Banana", "")]);
        menu.drive(Request::Char('B')).unwrap();
        menu.drive(Request::Char('a')).unwrap();
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();
        assert_eq!(s.window(root).unwrap().cursor(), (3, 1));
    }

    #[test]
    fn scrolled_menu_draws_from_top_row() {
        let (mut s, root, mut menu) = setup(&[("a", ""), ("b", ""), ("c", ""), ("d", "")]);
        menu.set_format(2, 1).unwrap();
        menu.drive(Request::LastItem).unwrap();
        draw(&menu, &mut s.window_mut(root).unwrap()).unwrap();

        let win = s.window(root).unwrap();
        assert_eq!(win.row_text(0), " c                  ");
        assert_eq!(win.row_text(1), "-d                  ");
        assert_eq!(win.row_text(2), "                    ");
    }
}
