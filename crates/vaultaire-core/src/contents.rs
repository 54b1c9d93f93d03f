//! Contents Operation Codec
//!
//! Client messages to the contents (source index) service. Every frame
//! starts with a little-endian `u64` op code:
//!
//! | Code | Operation            | Body                                  |
//! |------|----------------------|---------------------------------------|
//! | 0x0  | `ContentsListRequest`| none                                  |
//! | 0x1  | `GenerateNewAddress` | none                                  |
//! | 0x2  | `UpdateSourceTag`    | `u64 addr ‖ u64 dict_len ‖ dict`      |
//! | 0x3  | `RemoveSourceTag`    | same as 0x2                           |
//!
//! Anything else, including a frame whose length doesn't match its op
//! code, fails with "Illegal op code". A malformed inner dict propagates
//! the source-dict codec's own error.

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::{Error, Result};
use crate::sourcedict::SourceDict;
use crate::types::Address;

const OP_LIST: u64 = 0x0;
const OP_GENERATE: u64 = 0x1;
const OP_UPDATE: u64 = 0x2;
const OP_REMOVE: u64 = 0x3;

/// A decoded contents-service request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentsOperation {
    ContentsListRequest,
    GenerateNewAddress,
    UpdateSourceTag { address: Address, dict: SourceDict },
    RemoveSourceTag { address: Address, dict: SourceDict },
}

impl ContentsOperation {
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::new();
        match self {
            ContentsOperation::ContentsListRequest => buf.put_u64_le(OP_LIST),
            ContentsOperation::GenerateNewAddress => buf.put_u64_le(OP_GENERATE),
            ContentsOperation::UpdateSourceTag { address, dict } => {
                encode_tagged(&mut buf, OP_UPDATE, *address, dict)
            }
            ContentsOperation::RemoveSourceTag { address, dict } => {
                encode_tagged(&mut buf, OP_REMOVE, *address, dict)
            }
        }
        buf.freeze()
    }

    pub fn decode(frame: &[u8]) -> Result<ContentsOperation> {
        if frame.len() < 8 {
            return Err(Error::IllegalOpCode);
        }

        let op = (&frame[0..8]).get_u64_le();
        match op {
            OP_LIST | OP_GENERATE => {
                if frame.len() != 8 {
                    return Err(Error::IllegalOpCode);
                }
                Ok(if op == OP_LIST {
                    ContentsOperation::ContentsListRequest
                } else {
                    ContentsOperation::GenerateNewAddress
                })
            }
            OP_UPDATE | OP_REMOVE => {
                let (address, dict) = decode_tagged(&frame[8..])?;
                Ok(if op == OP_UPDATE {
                    ContentsOperation::UpdateSourceTag { address, dict }
                } else {
                    ContentsOperation::RemoveSourceTag { address, dict }
                })
            }
            _ => Err(Error::IllegalOpCode),
        }
    }
}

fn encode_tagged(buf: &mut BytesMut, op: u64, address: Address, dict: &SourceDict) {
    let encoded = dict.encode();
    buf.put_u64_le(op);
    buf.put_u64_le(address.0);
    buf.put_u64_le(encoded.len() as u64);
    buf.put_slice(&encoded);
}

fn decode_tagged(body: &[u8]) -> Result<(Address, SourceDict)> {
    if body.len() < 16 {
        return Err(Error::Truncated {
            needed: 16,
            have: body.len(),
        });
    }

    let address = Address((&body[0..8]).get_u64_le());
    let dict_len = (&body[8..16]).get_u64_le();
    let dict_bytes = &body[16..];

    if dict_len != dict_bytes.len() as u64 {
        // shorter than promised is truncation, longer is an illegal frame
        if dict_len > dict_bytes.len() as u64 {
            return Err(Error::Truncated {
                needed: dict_len as usize,
                have: dict_bytes.len(),
            });
        }
        return Err(Error::IllegalOpCode);
    }

    Ok((address, SourceDict::decode(dict_bytes)?))
}
