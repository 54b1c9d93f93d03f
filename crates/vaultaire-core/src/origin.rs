//! Origin Names
//!
//! An origin is the tenant namespace every object label is prefixed with.
//! Raw names arrive from clients and can contain anything, so they are
//! tidied before use: non-ASCII and non-printable bytes are dropped along
//! with `_` (the label field separator), the result is right-padded with
//! `:` to ten bytes and then truncated to ten.

use std::fmt;

/// Maximum length of a tidied origin name in bytes.
pub const ORIGIN_LEN: usize = 10;

/// A tidied tenant namespace identifier, at most [`ORIGIN_LEN`] bytes.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Origin(String);

impl Origin {
    /// Sanitize a raw client-supplied name into an origin.
    pub fn tidy(raw: &str) -> Origin {
        let mut name: String = raw
            .chars()
            .filter(|&c| c.is_ascii() && !c.is_ascii_control() && c != '_')
            .collect();

        while name.len() < ORIGIN_LEN {
            name.push(':');
        }
        name.truncate(ORIGIN_LEN);

        Origin(name)
    }

    /// Tidy an origin delivered as raw bytes off the wire.
    pub fn from_wire(raw: &[u8]) -> Origin {
        Origin::tidy(&String::from_utf8_lossy(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
