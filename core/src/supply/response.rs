//! Dispatch response handle
//!
//! Surfaces per-recipient completion records as the transfer engine
//! reports them. The event subscription established at dispatch time lives
//! inside the handle: closing or dropping the response detaches it, so a
//! response can never outlive its controller's wiring.

use cid::Cid;
use libp2p_identity::PeerId;
use tokio::sync::mpsc;

use crate::transfer::Subscription;

/// Records that `provider` now caches the payload rooted at `payload_cid`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderRecord {
    pub provider: PeerId,
    pub payload_cid: Cid,
}

/// Async collection of confirmations from transfers to cache providers,
/// plus the number of peers messaged.
pub struct DispatchResponse {
    records: mpsc::Receiver<ProviderRecord>,
    subscription: Option<Subscription>,
    count: usize,
}

impl DispatchResponse {
    pub(crate) fn new(
        records: mpsc::Receiver<ProviderRecord>,
        subscription: Subscription,
        count: usize,
    ) -> Self {
        DispatchResponse {
            records,
            subscription: Some(subscription),
            count,
        }
    }

    /// How many peers the dispatch targeted. A ceiling on the records this
    /// response can yield, not a delivery guarantee.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Wait for the next completion record. Returns `None` once the
    /// response is closed and drained. Callers bound the wait with their
    /// own timeout or by dropping the future.
    pub async fn next(&mut self) -> Option<ProviderRecord> {
        self.records.recv().await
    }

    /// Stop listening for confirmations. Detaches the event subscription
    /// and closes the record channel; completions reported afterwards are
    /// dropped. Already-buffered records remain readable via `next`.
    pub fn close(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.records.close();
    }
}
