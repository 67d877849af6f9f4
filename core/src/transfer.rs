//! Bulk-transfer manager seam
//!
//! The supply layer drives an external DAG-transfer engine but never walks
//! graphs itself. The engine surface it depends on:
//! - voucher-type registration with a validator consulted on every request
//! - transport-configurer registration for per-channel store routing
//! - event subscription with an unsubscribe handle
//! - opening pull channels
//!
//! Events arrive on arbitrary engine threads; everything registered here
//! must be thread-safe.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use cid::Cid;
use libp2p_identity::PeerId;

use crate::store::BlockStore;

/// A typed opaque token identifying and authorizing a transfer. The payload
/// is the encoded request message of the owning layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Voucher {
    type_id: String,
    payload: Vec<u8>,
}

impl Voucher {
    pub fn new(type_id: impl Into<String>, payload: Vec<u8>) -> Self {
        Voucher {
            type_id: type_id.into(),
            payload,
        }
    }

    pub fn type_id(&self) -> &str {
        &self.type_id
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

/// Identifies one transfer channel between two peers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChannelId {
    /// Peer that opened the channel.
    pub initiator: PeerId,
    /// Peer that accepted it.
    pub responder: PeerId,
    /// Engine-assigned counter, unique per initiator.
    pub id: u64,
}

/// Lifecycle status of a transfer channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransferStatus {
    Requested,
    Ongoing,
    Completed,
    Failed,
}

/// What an event notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventCode {
    Open,
    Progress,
    Complete,
    Error,
}

/// A single engine event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferEvent {
    pub code: EventCode,
}

/// Snapshot of a channel at event time.
#[derive(Debug, Clone)]
pub struct ChannelState {
    pub channel_id: ChannelId,
    pub status: TransferStatus,
    /// Root CID of the payload moving on this channel.
    pub base_cid: Cid,
    /// Peer the data flows from.
    pub sender: PeerId,
    /// Peer the data flows to.
    pub recipient: PeerId,
}

/// Which links of a payload DAG a transfer walks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Selector {
    /// Every link, unbounded recursion, edges revisited recursively. The
    /// only selector the supply layer uses.
    AllLinks,
}

/// Callback consulted when a transfer request carrying a registered voucher
/// type arrives.
pub trait TransferValidator: Send + Sync {
    fn validate_push(
        &self,
        sender: &PeerId,
        voucher: &Voucher,
        base: &Cid,
    ) -> Result<(), ValidationError>;

    fn validate_pull(
        &self,
        receiver: &PeerId,
        voucher: &Voucher,
        base: &Cid,
    ) -> Result<(), ValidationError>;
}

/// Validation outcomes surfaced to the remote peer as a refused transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    /// No authorization entry exists for the requested CID.
    UnknownCid,
    /// An entry exists but does not contain the requesting peer.
    NotAuthorized,
    /// Pushes are categorically refused by this layer.
    PushesRejected,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::UnknownCid => write!(f, "unknown CID"),
            ValidationError::NotAuthorized => write!(f, "not authorized"),
            ValidationError::PushesRejected => write!(f, "no pushes accepted"),
        }
    }
}

impl std::error::Error for ValidationError {}

/// Optional store-routing capability of a transport.
pub trait StoreConfigurableTransport: Send + Sync {
    /// Route all block reads and writes of `channel` through `store`.
    fn use_store(&self, channel: &ChannelId, store: Arc<dyn BlockStore>)
        -> Result<(), TransferError>;
}

/// The transport backing a channel, as handed to configurer callbacks.
pub trait Transport: Send + Sync {
    /// Downcast to the store-routing capability, when supported.
    fn as_store_configurable(&self) -> Option<&dyn StoreConfigurableTransport> {
        None
    }
}

/// Callback invoked by the engine when a channel for a registered voucher
/// type starts.
pub type TransportConfigurer = Arc<dyn Fn(&ChannelId, &Voucher, &dyn Transport) + Send + Sync>;

/// Callback invoked for every engine event.
pub type EventHandler = Box<dyn Fn(&TransferEvent, &ChannelState) + Send + Sync>;

/// Handle detaching an event subscription. Detaches on `unsubscribe` or on
/// drop, whichever comes first.
pub struct Subscription(Option<Box<dyn FnOnce() + Send + Sync>>);

impl Subscription {
    pub fn new(detach: impl FnOnce() + Send + Sync + 'static) -> Self {
        Subscription(Some(Box::new(detach)))
    }

    pub fn unsubscribe(mut self) {
        if let Some(detach) = self.0.take() {
            detach();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(detach) = self.0.take() {
            detach();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("attached", &self.0.is_some())
            .finish()
    }
}

/// The bulk-transfer engine surface the supply layer depends on.
#[async_trait]
pub trait TransferManager: Send + Sync + 'static {
    /// Register the validator consulted for vouchers of `voucher_type`.
    fn register_voucher_type(&self, voucher_type: &str, validator: Arc<dyn TransferValidator>);

    /// Register the configurer invoked when a channel carrying a voucher of
    /// `voucher_type` starts.
    fn register_transport_configurer(&self, voucher_type: &str, configurer: TransportConfigurer);

    /// Subscribe to engine events. The handler is called from engine
    /// threads until the returned subscription is dropped.
    fn subscribe(&self, handler: EventHandler) -> Subscription;

    /// Ask the engine to pull `root` from `peer`, presenting `voucher` for
    /// authorization on the remote side.
    async fn open_pull_channel(
        &self,
        peer: PeerId,
        voucher: Voucher,
        root: Cid,
        selector: Selector,
    ) -> Result<ChannelId, TransferError>;
}

/// Errors from the transfer engine.
#[derive(Debug)]
pub enum TransferError {
    /// The channel could not be opened or was torn down.
    Channel(String),
}

impl fmt::Display for TransferError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransferError::Channel(e) => write!(f, "transfer channel error: {}", e),
        }
    }
}

impl std::error::Error for TransferError {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;

    #[test]
    fn test_subscription_detaches_on_drop() {
        static DETACHED: AtomicBool = AtomicBool::new(false);
        let sub = Subscription::new(|| DETACHED.store(true, Ordering::SeqCst));
        assert!(!DETACHED.load(Ordering::SeqCst));
        drop(sub);
        assert!(DETACHED.load(Ordering::SeqCst));
    }

    #[test]
    fn test_subscription_unsubscribe_runs_once() {
        let count = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let c = count.clone();
        let sub = Subscription::new(move || {
            c.fetch_add(1, Ordering::SeqCst);
        });
        sub.unsubscribe();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_validation_error_display() {
        assert_eq!(ValidationError::UnknownCid.to_string(), "unknown CID");
        assert_eq!(ValidationError::NotAuthorized.to_string(), "not authorized");
        assert_eq!(
            ValidationError::PushesRejected.to_string(),
            "no pushes accepted"
        );
    }

    #[test]
    fn test_voucher_accessors() {
        let v = Voucher::new("TestVoucher", vec![1, 2, 3]);
        assert_eq!(v.type_id(), "TestVoucher");
        assert_eq!(v.payload(), &[1, 2, 3]);
    }
}
