// SPDX-License-Identifier: MIT
//
// Session configuration.
//
// Everything a session decides at startup: terminal modes and input
// timing. All fields have defaults, so a TOML document only needs the
// keys it wants to change:
//
//     escape_delay_ms = 50
//     cursor = "hidden"
//     keypad = true

use std::time::Duration;

use serde::Deserialize;

use crate::backend::CursorVisibility;
use crate::error::Result;

/// Startup settings for a [`Session`](crate::session::Session).
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    /// How long a lone ESC byte waits for the rest of an escape sequence
    /// before it is reported as the Escape key.
    pub escape_delay_ms: u64,

    /// Echo printable keys at the window cursor as they are read.
    pub echo: bool,

    /// Deliver keys immediately instead of line by line.
    pub cbreak: bool,

    /// Cursor visibility set on initialization.
    pub cursor: CursorVisibility,

    /// Draw on the alternate screen and restore the original on exit.
    pub alternate_screen: bool,

    /// Keypad decoding for newly created windows.
    pub keypad: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            escape_delay_ms: 25,
            echo: false,
            cbreak: true,
            cursor: CursorVisibility::Normal,
            alternate_screen: true,
            keypad: false,
        }
    }
}

impl SessionConfig {
    /// Parse a TOML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// [`Error::Config`](crate::error::Error::Config) for malformed TOML,
    /// unknown keys, or values of the wrong type.
    pub fn from_toml(source: &str) -> Result<Self> {
        Ok(toml::from_str(source)?)
    }

    /// The escape delay as a `Duration`.
    #[inline]
    #[must_use]
    pub const fn escape_delay(&self) -> Duration {
        Duration::from_millis(self.escape_delay_ms)
    }
}
