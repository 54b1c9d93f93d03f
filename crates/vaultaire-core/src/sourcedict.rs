//! Source Dictionaries
//!
//! A source dict describes a metric source as a canonical sorted mapping of
//! text keys to text values (`hostname -> web01`, `metric -> cpu`, ...).
//!
//! ## Wire Encoding
//!
//! The byte encoding is the sorted pairs joined as `key:value,key:value`.
//! Because `:` and `,` are the pair separators they are rejected in keys
//! and values when the dict is built, so every dict has exactly one
//! encoding and encode/decode round-trip losslessly.
//!
//! ## Hash Identity
//!
//! A dict is identified by `base62(SHA1(encoding))`, zero-padded to 27
//! digits with the `0-9A-Za-z` alphabet. 62^27 exceeds 2^160, so the full
//! digest always fits.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use sha1::{Digest, Sha1};

use crate::error::{Error, Result};

const BASE62_ALPHABET: &[u8; 62] =
    b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Number of base-62 digits in a source dict hash identity.
pub const HASH_ID_LEN: usize = 27;

/// Canonical sorted `text -> text` description of a metric source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceDict {
    pairs: BTreeMap<String, String>,
}

impl SourceDict {
    pub fn new() -> SourceDict {
        SourceDict::default()
    }

    /// Build a dict from key/value pairs. Later duplicates of a key win.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<SourceDict>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut dict = SourceDict::new();
        for (k, v) in pairs {
            dict.insert(k.into(), v.into())?;
        }
        Ok(dict)
    }

    /// Insert a pair, replacing any existing value for the key.
    ///
    /// Keys and values must not contain the `:` and `,` separators.
    pub fn insert(&mut self, key: String, value: String) -> Result<()> {
        for text in [&key, &value] {
            if text.contains(':') || text.contains(',') {
                return Err(Error::InvalidSourceDict(format!(
                    "separator in {:?}",
                    text
                )));
            }
        }
        self.pairs.insert(key, value);
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.get(key).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// The canonical byte encoding: sorted `key:value` pairs joined by `,`.
    pub fn encode(&self) -> Bytes {
        let encoded = self
            .pairs
            .iter()
            .map(|(k, v)| format!("{}:{}", k, v))
            .collect::<Vec<_>>()
            .join(",");
        Bytes::from(encoded)
    }

    /// Parse a canonical encoding back into a dict.
    pub fn decode(raw: &[u8]) -> Result<SourceDict> {
        let text = std::str::from_utf8(raw)
            .map_err(|e| Error::InvalidSourceDict(e.to_string()))?;

        let mut dict = SourceDict::new();
        if text.is_empty() {
            return Ok(dict);
        }

        for pair in text.split(',') {
            let (key, value) = pair.split_once(':').ok_or_else(|| {
                Error::InvalidSourceDict(format!("pair without separator: {:?}", pair))
            })?;
            dict.insert(key.to_string(), value.to_string())?;
        }
        Ok(dict)
    }

    /// 27-digit base-62 SHA1 of the canonical encoding.
    pub fn hash_id(&self) -> String {
        let digest = Sha1::digest(self.encode());
        to_base62(digest.as_slice())
    }
}

impl fmt::Display for SourceDict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.encode()))
    }
}

/// Render a big-endian byte string in base 62, left-padded to
/// [`HASH_ID_LEN`] digits.
fn to_base62(digest: &[u8]) -> String {
    let mut num = digest.to_vec();
    let mut out: Vec<char> = Vec::with_capacity(HASH_ID_LEN);

    while num.iter().any(|&b| b != 0) {
        // long division of the big-endian number by 62
        let mut rem: u32 = 0;
        for byte in num.iter_mut() {
            let acc = (rem << 8) | u32::from(*byte);
            *byte = (acc / 62) as u8;
            rem = acc % 62;
        }
        out.push(BASE62_ALPHABET[rem as usize] as char);
    }

    while out.len() < HASH_ID_LEN {
        out.push('0');
    }
    out.reverse();
    out.into_iter().collect()
}
