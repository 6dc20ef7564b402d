// SPDX-License-Identifier: MIT

//! Menu requests: the commands [`Menu::drive`](crate::menu::Menu::drive)
//! understands, and the default key bindings for them.

use k_term::Key;

/// One menu command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Request {
    /// Next item in list order.
    NextItem,
    /// Previous item in list order.
    PrevItem,
    FirstItem,
    LastItem,
    /// One row up in the grid.
    UpItem,
    /// One row down in the grid.
    DownItem,
    /// One column left in the grid.
    LeftItem,
    /// One column right in the grid.
    RightItem,
    /// Scroll the display up one row.
    ScrollUpLine,
    /// Scroll the display down one row.
    ScrollDownLine,
    ScrollUpPage,
    ScrollDownPage,
    /// Select or deselect the current item.
    Toggle,
    /// Append a character to the pattern and jump to the first match.
    Char(char),
    /// Drop the last pattern character.
    BackPattern,
    ClearPattern,
    /// Next item matching the pattern, or the next item if the pattern is
    /// empty.
    NextMatch,
    /// Previous item matching the pattern, or the previous item if the
    /// pattern is empty.
    PrevMatch,
}

impl Request {
    /// The request a key maps to, if any.
    ///
    /// | Key | Request |
    /// |-----|---------|
    /// | arrows | up/down/left/right item |
    /// | PageUp / PageDown | scroll a page |
    /// | Home / End | first / last item |
    /// | Tab / Shift+Tab | next / previous item |
    /// | Space | toggle |
    /// | Backspace | drop a pattern character |
    /// | Ctrl-N / Ctrl-P | next / previous match |
    /// | Ctrl-U | clear the pattern |
    /// | Ctrl-E / Ctrl-Y | scroll a line down / up |
    /// | other printable | pattern character |
    #[must_use]
    pub const fn from_key(key: Key) -> Option<Self> {
        Some(match key {
            Key::Up => Self::UpItem,
            Key::Down => Self::DownItem,
            Key::Left => Self::LeftItem,
            Key::Right => Self::RightItem,
            Key::PageUp => Self::ScrollUpPage,
            Key::PageDown => Self::ScrollDownPage,
            Key::Home => Self::FirstItem,
            Key::End => Self::LastItem,
            Key::Tab => Self::NextItem,
            Key::BackTab => Self::PrevItem,
            Key::Char(' ') => Self::Toggle,
            Key::Backspace | Key::Byte(0x7F) => Self::BackPattern,
            Key::Ctrl('n') => Self::NextMatch,
            Key::Ctrl('p') => Self::PrevMatch,
            Key::Ctrl('u') => Self::ClearPattern,
            Key::Ctrl('e') => Self::ScrollDownLine,
            Key::Ctrl('y') => Self::ScrollUpLine,
            Key::Char(c) => Self::Char(c),
            _ => return None,
        })
    }

    /// Whether the request moves the current item by position (and so
    /// clears the pattern).
    #[must_use]
    pub const fn is_navigation(self) -> bool {
        matches!(
            self,
            Self::NextItem
                | Self::PrevItem
                | Self::FirstItem
                | Self::LastItem
                | Self::UpItem
                | Self::DownItem
                | Self::LeftItem
                | Self::RightItem
                | Self::ScrollUpLine
                | Self::ScrollDownLine
                | Self::ScrollUpPage
                | Self::ScrollDownPage
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keys_map_to_requests() {
        assert_eq!(Request::from_key(Key::Down), Some(Request::DownItem));
        assert_eq!(Request::from_key(Key::Home), Some(Request::FirstItem));
        assert_eq!(Request::from_key(Key::PageDown), Some(Request::ScrollDownPage));
        assert_eq!(Request::from_key(Key::Char(' ')), Some(Request::Toggle));
        assert_eq!(Request::from_key(Key::Char('b')), Some(Request::Char('b')));
        assert_eq!(Request::from_key(Key::Backspace), Some(Request::BackPattern));
        assert_eq!(Request::from_key(Key::Ctrl('n')), Some(Request::NextMatch));
    }

    #[test]
    fn unbound_keys_map_to_nothing() {
        assert_eq!(Request::from_key(Key::Enter), None);
        assert_eq!(Request::from_key(Key::Escape), None);
        assert_eq!(Request::from_key(Key::F(5)), None);
    }

    #[test]
    fn navigation_classification() {
        assert!(Request::DownItem.is_navigation());
        assert!(Request::ScrollUpPage.is_navigation());
        assert!(!Request::Toggle.is_navigation());
        assert!(!Request::Char('x').is_navigation());
        assert!(!Request::NextMatch.is_navigation());
    }
}
