//! Dispatch wire format
//!
//! One message: the payload request announcing new content to a cache
//! peer. It is both the wire message of the request protocol and the
//! voucher presented to the transfer engine's authorization check.

use std::fmt;

use cid::Cid;
use serde::{Deserialize, Serialize};

use crate::transfer::Voucher;

/// Base protocol for dispatch. Advertised once per region, suffixed with
/// the region name.
pub const DISPATCH_PROTOCOL: &str = "/myel/supply/dispatch/1.0";

/// Voucher type identifier distinguishing dispatch vouchers from others
/// multiplexed on the same transfer engine.
pub const DISPATCH_VOUCHER_TYPE: &str = "DispatchRequestVoucher";

/// Describes the content a cache peer should pull.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchRequest {
    /// Root of the payload DAG.
    pub payload_cid: Cid,
    /// Advertised payload size in bytes.
    pub size: u64,
}

#[derive(Serialize, Deserialize)]
struct RequestWire {
    payload_cid: Vec<u8>,
    size: u64,
}

impl DispatchRequest {
    /// Encode to the canonical binary form. Round-trips through
    /// [`DispatchRequest::from_bytes`] unchanged.
    pub fn to_bytes(&self) -> Vec<u8> {
        let wire = RequestWire {
            payload_cid: self.payload_cid.to_bytes(),
            size: self.size,
        };
        postcard::to_allocvec(&wire).expect("serialization should not fail")
    }

    /// Decode from the canonical binary form.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        let wire: RequestWire =
            postcard::from_bytes(bytes).map_err(|e| DecodeError::InvalidPayload(e.to_string()))?;
        let payload_cid = Cid::try_from(wire.payload_cid.as_slice())
            .map_err(|e| DecodeError::InvalidCid(e.to_string()))?;
        Ok(DispatchRequest {
            payload_cid,
            size: wire.size,
        })
    }

    /// Wrap as a transfer voucher.
    pub fn to_voucher(&self) -> Voucher {
        Voucher::new(DISPATCH_VOUCHER_TYPE, self.to_bytes())
    }

    /// Unwrap from a transfer voucher. Returns `None` when the voucher is
    /// of a different type or its payload does not decode.
    pub fn from_voucher(voucher: &Voucher) -> Option<Self> {
        if voucher.type_id() != DISPATCH_VOUCHER_TYPE {
            return None;
        }
        DispatchRequest::from_bytes(voucher.payload()).ok()
    }
}

/// Error decoding a dispatch request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    /// The message body did not parse.
    InvalidPayload(String),
    /// The embedded content identifier is malformed.
    InvalidCid(String),
}

impl fmt::Display for DecodeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodeError::InvalidPayload(e) => write!(f, "invalid payload: {}", e),
            DecodeError::InvalidCid(e) => write!(f, "invalid cid: {}", e),
        }
    }
}

impl std::error::Error for DecodeError {}
