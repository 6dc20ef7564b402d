// SPDX-License-Identifier: MIT
//
// Error kinds shared by every layer of kurses.
//
// Each variant names a *category* of failure rather than the call that
// produced it, so callers can branch on the kind: geometry violations,
// lifecycle misuse, terminal failures, unsupported features, bad numeric
// parameters, insufficient space, and the one expected outcome of normal
// operation: a pattern search that found nothing.

use std::io;

use thiserror::Error;

/// Every failure a kurses operation can report.
#[derive(Debug, Error)]
pub enum Error {
    /// A window or buffer could not be created with the requested shape.
    #[error("allocation failed: {0}")]
    Allocation(String),

    /// A position or region falls outside the window (or parent) it
    /// must live in.
    #[error("out of bounds: {0}")]
    Bounds(String),

    /// The operation is not valid in the current lifecycle state:
    /// double delete, posting a posted menu, use after `end()`, …
    #[error("invalid state: {0}")]
    State(String),

    /// The terminal backend failed or refused an operation.
    #[error("terminal driver: {context}")]
    Driver {
        context: String,
        #[source]
        source: Option<io::Error>,
    },

    /// The terminal lacks a feature the caller asked for.
    #[error("terminal does not support {0}")]
    Capability(&'static str),

    /// A numeric parameter lies outside its valid domain.
    #[error("{what} {value} out of range (limit {limit})")]
    Range {
        what: &'static str,
        value: u32,
        limit: u32,
    },

    /// The target window is too small for the content.
    #[error("need {need_rows}x{need_cols} cells, window has {have_rows}x{have_cols}")]
    Layout {
        need_rows: u16,
        need_cols: u16,
        have_rows: u16,
        have_cols: u16,
    },

    /// A pattern search or boundary move found nothing. Recoverable.
    #[error("no matching item")]
    NoMatch,

    /// A configuration document could not be parsed.
    #[error("invalid configuration: {0}")]
    Config(#[from] toml::de::Error),
}

/// Result alias used throughout kurses.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// A driver error wrapping an I/O failure.
    pub(crate) fn io(context: impl Into<String>, source: io::Error) -> Self {
        Self::Driver {
            context: context.into(),
            source: Some(source),
        }
    }

    /// A driver error with no underlying I/O cause.
    pub(crate) fn driver(context: impl Into<String>) -> Self {
        Self::Driver {
            context: context.into(),
            source: None,
        }
    }

    /// Whether this is the expected, non-exceptional outcome of a search.
    ///
    /// Only [`Error::NoMatch`] qualifies: callers typically beep or ignore
    /// it and keep going.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NoMatch)
    }
}
