//! Internal KV Store
//!
//! A small address-keyed store over the same pool, used for origin-scoped
//! bookkeeping such as the source-dict registry. Each address owns a pair
//! of objects shaped like a one-point bucket:
//!
//! - the simple object holds a single 24-byte marker record
//!   `(address, 0, 0)`;
//! - the extended object holds the value as `u64 len ‖ bytes`.
//!
//! Unlike point buckets the internal store is mutable: a write replaces
//! both objects, so the latest write for an address is the one any later
//! read or enumeration sees.

use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};
use tracing::debug;
use vaultaire_core::frame::{put_vault_prefix, read_vault_prefix, VAULT_PREFIX_LEN};
use vaultaire_core::point::encode_simple_record;
use vaultaire_core::{label, Address, Lane, Origin};
use vaultaire_pool::Pool;

use crate::error::{Error, Result};

/// Address-keyed bookkeeping store for one pool.
pub struct InternalStore {
    pool: Arc<dyn Pool>,
}

impl InternalStore {
    pub fn new(pool: Arc<dyn Pool>) -> InternalStore {
        InternalStore { pool }
    }

    /// Store `value` under `(origin, address)`, replacing any previous
    /// value.
    pub async fn write_to(&self, origin: &Origin, address: Address, value: &[u8]) -> Result<()> {
        let marker = encode_simple_record(address, 0, 0);
        self.pool
            .write_full(&label::internal_label(origin, address, Lane::Simple), &marker)
            .await?;

        let mut framed = BytesMut::with_capacity(VAULT_PREFIX_LEN + value.len());
        put_vault_prefix(&mut framed, value.len());
        framed.put_slice(value);
        self.pool
            .write_full(
                &label::internal_label(origin, address, Lane::Extended),
                &framed,
            )
            .await?;

        debug!(origin = %origin, address = %address, len = value.len(), "internal write");
        Ok(())
    }

    /// Fetch the value stored under `(origin, address)`, if any.
    pub async fn read_from(&self, origin: &Origin, address: Address) -> Result<Option<Bytes>> {
        let object = self
            .pool
            .read_full(&label::internal_label(origin, address, Lane::Extended))
            .await?;
        match object {
            Some(raw) => Ok(Some(unframe(&raw)?)),
            None => Ok(None),
        }
    }

    /// Every live `(address, value)` pair under the origin, in address
    /// order.
    pub async fn enumerate_origin(&self, origin: &Origin) -> Result<Vec<(Address, Bytes)>> {
        let prefix = label::internal_prefix(origin);
        let mut entries = Vec::new();

        for object_label in self.pool.list(&prefix).await? {
            let Some(address) = parse_internal_label(&prefix, &object_label) else {
                continue;
            };
            if let Some(raw) = self.pool.read_full(&object_label).await? {
                entries.push((address, unframe(&raw)?));
            }
        }

        entries.sort_by_key(|&(address, _)| address);
        Ok(entries)
    }
}

/// Strip the length prefix off an internal extended object.
fn unframe(raw: &[u8]) -> Result<Bytes> {
    let len = read_vault_prefix(raw, 0)? as usize;
    let body = &raw[VAULT_PREFIX_LEN..];
    if len > body.len() {
        return Err(Error::Codec(vaultaire_core::Error::Truncated {
            needed: VAULT_PREFIX_LEN + len,
            have: raw.len(),
        }));
    }
    Ok(Bytes::copy_from_slice(&body[..len]))
}

/// Pull the address out of an internal extended object label; the simple
/// markers and anything unparseable are skipped.
fn parse_internal_label(prefix: &str, object_label: &str) -> Option<Address> {
    let rest = object_label.strip_prefix(prefix)?;
    let digits = rest.get(..20)?;
    if !rest.ends_with("_extended") {
        return None;
    }
    digits.parse::<u64>().ok().map(Address)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_internal_label_extended() {
        let origin = Origin::tidy("PONY");
        let prefix = label::internal_prefix(&origin);
        let object = label::internal_label(&origin, Address(128), Lane::Extended);
        assert_eq!(parse_internal_label(&prefix, &object), Some(Address(128)));
    }

    #[test]
    fn test_parse_internal_label_skips_simple_marker() {
        let origin = Origin::tidy("PONY");
        let prefix = label::internal_prefix(&origin);
        let object = label::internal_label(&origin, Address(128), Lane::Simple);
        assert_eq!(parse_internal_label(&prefix, &object), None);
    }

    #[test]
    fn test_unframe() {
        let mut framed = BytesMut::new();
        put_vault_prefix(&mut framed, 3);
        framed.put_slice(b"Hai");
        assert_eq!(&unframe(&framed).unwrap()[..], b"Hai");
    }

    #[test]
    fn test_unframe_short_body_fails() {
        let mut framed = BytesMut::new();
        put_vault_prefix(&mut framed, 10);
        framed.put_slice(b"Hai");
        assert!(unframe(&framed).is_err());
    }
}
