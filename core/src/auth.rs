//! Pull authorization
//!
//! Per-payload allow-list consulted by the transfer engine on every inbound
//! request. Dispatch writes grants, transport callback threads read them,
//! so every operation holds the table mutex. Grants are additive and live
//! until process shutdown; no expiry in this layer.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use cid::Cid;
use libp2p_identity::PeerId;

use crate::transfer::{TransferValidator, ValidationError, Voucher};

/// Authorization table for payload pulls.
#[derive(Default)]
pub struct Validator {
    auth: Mutex<HashMap<Cid, HashSet<PeerId>>>,
}

impl Validator {
    pub fn new() -> Self {
        Validator::default()
    }

    /// Grant `peer` the right to pull `cid` and every link below it. The
    /// per-CID set is created lazily on first grant.
    pub fn authorize(&self, cid: &Cid, peer: &PeerId) {
        let mut auth = self.auth.lock().unwrap();
        auth.entry(*cid).or_default().insert(*peer);
    }
}

impl TransferValidator for Validator {
    /// This layer never accepts pushed content.
    fn validate_push(
        &self,
        _sender: &PeerId,
        _voucher: &Voucher,
        _base: &Cid,
    ) -> Result<(), ValidationError> {
        Err(ValidationError::PushesRejected)
    }

    fn validate_pull(
        &self,
        receiver: &PeerId,
        _voucher: &Voucher,
        base: &Cid,
    ) -> Result<(), ValidationError> {
        let auth = self.auth.lock().unwrap();
        let set = auth.get(base).ok_or(ValidationError::UnknownCid)?;
        if !set.contains(receiver) {
            return Err(ValidationError::NotAuthorized);
        }
        Ok(())
    }
}
