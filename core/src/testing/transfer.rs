//! Test transfer manager
//!
//! Records the channels the supply layer asks for and replays engine
//! events. Events are delivered from a dedicated thread, like a real
//! engine's callback thread: a subscriber blocking in its handler
//! backpressures delivery rather than the publisher.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex, Weak};

use async_trait::async_trait;
use cid::Cid;
use libp2p_identity::PeerId;

use crate::store::BlockStore;
use crate::transfer::{
    ChannelId, ChannelState, EventCode, EventHandler, Selector, StoreConfigurableTransport,
    Subscription, TransferError, TransferEvent, TransferManager, TransferStatus, TransferValidator,
    Transport, TransportConfigurer, ValidationError, Voucher,
};

/// A pull channel the supply layer opened.
#[derive(Clone)]
pub struct OpenedPull {
    /// Peer the payload is pulled from.
    pub peer: PeerId,
    pub voucher: Voucher,
    pub root: Cid,
    pub selector: Selector,
    pub channel: ChannelId,
}

type SharedHandler = Arc<dyn Fn(&TransferEvent, &ChannelState) + Send + Sync>;

#[derive(Default)]
struct Shared {
    subscribers: Mutex<HashMap<u64, SharedHandler>>,
    validators: Mutex<HashMap<String, Arc<dyn TransferValidator>>>,
    configurers: Mutex<HashMap<String, TransportConfigurer>>,
    pulls: Mutex<Vec<OpenedPull>>,
}

enum Job {
    Event(TransferEvent, ChannelState),
    Barrier(mpsc::Sender<()>),
}

/// In-memory transfer engine for tests.
pub struct TestTransferManager {
    local: PeerId,
    shared: Arc<Shared>,
    jobs: Mutex<mpsc::Sender<Job>>,
    next_subscriber: AtomicU64,
    next_channel: AtomicU64,
}

impl TestTransferManager {
    pub fn new(local: PeerId) -> Arc<Self> {
        let shared = Arc::new(Shared::default());
        let (jobs, queue) = mpsc::channel::<Job>();

        // Delivery thread; exits when the manager (the only sender) drops.
        let subscribers = shared.clone();
        std::thread::spawn(move || {
            for job in queue {
                match job {
                    Job::Event(event, state) => {
                        let handlers: Vec<SharedHandler> = subscribers
                            .subscribers
                            .lock()
                            .unwrap()
                            .values()
                            .cloned()
                            .collect();
                        for handler in handlers {
                            handler(&event, &state);
                        }
                    }
                    Job::Barrier(ack) => {
                        let _ = ack.send(());
                    }
                }
            }
        });

        Arc::new(TestTransferManager {
            local,
            shared,
            jobs: Mutex::new(jobs),
            next_subscriber: AtomicU64::new(0),
            next_channel: AtomicU64::new(0),
        })
    }

    /// Deliver an event to all current subscribers, asynchronously.
    pub fn publish(&self, event: TransferEvent, state: ChannelState) {
        self.jobs
            .lock()
            .unwrap()
            .send(Job::Event(event, state))
            .expect("delivery thread stopped");
    }

    /// An outbound transfer to `recipient` finished.
    pub fn publish_completed(&self, recipient: PeerId, base: Cid) {
        let state = ChannelState {
            channel_id: self.fresh_channel(recipient),
            status: TransferStatus::Completed,
            base_cid: base,
            sender: self.local,
            recipient,
        };
        self.publish(TransferEvent { code: EventCode::Complete }, state);
    }

    /// A transfer towards `recipient` failed.
    pub fn publish_error(&self, recipient: PeerId, base: Cid) {
        let state = ChannelState {
            channel_id: self.fresh_channel(recipient),
            status: TransferStatus::Failed,
            base_cid: base,
            sender: self.local,
            recipient,
        };
        self.publish(TransferEvent { code: EventCode::Error }, state);
    }

    /// Block until every event published so far has been delivered.
    pub fn flush(&self) {
        let (ack, done) = mpsc::channel();
        self.jobs
            .lock()
            .unwrap()
            .send(Job::Barrier(ack))
            .expect("delivery thread stopped");
        done.recv().expect("delivery thread stopped");
    }

    /// Pull channels opened so far.
    pub fn pulls(&self) -> Vec<OpenedPull> {
        self.shared.pulls.lock().unwrap().clone()
    }

    /// Run the registered validator for the voucher's type, as the engine
    /// would on an inbound pull request.
    pub fn validate_pull(
        &self,
        receiver: &PeerId,
        voucher: &Voucher,
        base: &Cid,
    ) -> Result<(), ValidationError> {
        self.validator_for(voucher).validate_pull(receiver, voucher, base)
    }

    /// Run the registered validator for the voucher's type, as the engine
    /// would on an inbound push request.
    pub fn validate_push(
        &self,
        sender: &PeerId,
        voucher: &Voucher,
        base: &Cid,
    ) -> Result<(), ValidationError> {
        self.validator_for(voucher).validate_push(sender, voucher, base)
    }

    /// Run the registered transport configurer for the voucher's type, as
    /// the engine would when a channel starts.
    pub fn configure(&self, channel: &ChannelId, voucher: &Voucher, transport: &dyn Transport) {
        let configurer = self
            .shared
            .configurers
            .lock()
            .unwrap()
            .get(voucher.type_id())
            .cloned();
        if let Some(configurer) = configurer {
            configurer(channel, voucher, transport);
        }
    }

    fn validator_for(&self, voucher: &Voucher) -> Arc<dyn TransferValidator> {
        self.shared
            .validators
            .lock()
            .unwrap()
            .get(voucher.type_id())
            .cloned()
            .expect("no validator registered for voucher type")
    }

    fn fresh_channel(&self, responder: PeerId) -> ChannelId {
        ChannelId {
            initiator: self.local,
            responder,
            id: self.next_channel.fetch_add(1, Ordering::SeqCst) + 1,
        }
    }
}

#[async_trait]
impl TransferManager for TestTransferManager {
    fn register_voucher_type(&self, voucher_type: &str, validator: Arc<dyn TransferValidator>) {
        self.shared
            .validators
            .lock()
            .unwrap()
            .insert(voucher_type.to_string(), validator);
    }

    fn register_transport_configurer(&self, voucher_type: &str, configurer: TransportConfigurer) {
        self.shared
            .configurers
            .lock()
            .unwrap()
            .insert(voucher_type.to_string(), configurer);
    }

    fn subscribe(&self, handler: EventHandler) -> Subscription {
        let id = self.next_subscriber.fetch_add(1, Ordering::SeqCst);
        self.shared
            .subscribers
            .lock()
            .unwrap()
            .insert(id, Arc::from(handler));

        let weak: Weak<Shared> = Arc::downgrade(&self.shared);
        Subscription::new(move || {
            if let Some(shared) = weak.upgrade() {
                shared.subscribers.lock().unwrap().remove(&id);
            }
        })
    }

    async fn open_pull_channel(
        &self,
        peer: PeerId,
        voucher: Voucher,
        root: Cid,
        selector: Selector,
    ) -> Result<ChannelId, TransferError> {
        let channel = self.fresh_channel(peer);
        self.shared.pulls.lock().unwrap().push(OpenedPull {
            peer,
            voucher,
            root,
            selector,
            channel: channel.clone(),
        });
        Ok(channel)
    }
}

/// Transport with the per-channel store routing capability, recording what
/// was routed where.
#[derive(Default)]
pub struct RoutingTransport {
    routed: Mutex<HashMap<ChannelId, Arc<dyn BlockStore>>>,
}

impl RoutingTransport {
    pub fn new() -> Self {
        RoutingTransport::default()
    }

    /// The store routed for `channel`, if any.
    pub fn routed_store(&self, channel: &ChannelId) -> Option<Arc<dyn BlockStore>> {
        self.routed.lock().unwrap().get(channel).cloned()
    }
}

impl Transport for RoutingTransport {
    fn as_store_configurable(&self) -> Option<&dyn StoreConfigurableTransport> {
        Some(self)
    }
}

impl StoreConfigurableTransport for RoutingTransport {
    fn use_store(
        &self,
        channel: &ChannelId,
        store: Arc<dyn BlockStore>,
    ) -> Result<(), TransferError> {
        self.routed.lock().unwrap().insert(channel.clone(), store);
        Ok(())
    }
}

/// Transport without any store routing capability.
pub struct PlainTransport;

impl Transport for PlainTransport {}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use super::*;
    use crate::testing::payload_cid;

    #[tokio::test]
    async fn test_events_reach_subscribers_until_unsubscribed() {
        let manager = TestTransferManager::new(PeerId::random());
        let seen = Arc::new(AtomicUsize::new(0));

        let counter = seen.clone();
        let subscription = manager.subscribe(Box::new(move |_event, _state| {
            counter.fetch_add(1, Ordering::SeqCst);
        }));

        manager.publish_completed(PeerId::random(), payload_cid(b"evt"));
        manager.flush();
        assert_eq!(seen.load(Ordering::SeqCst), 1);

        subscription.unsubscribe();
        manager.publish_completed(PeerId::random(), payload_cid(b"evt"));
        manager.flush();
        assert_eq!(seen.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_slow_subscriber_backpressures_delivery() {
        let manager = TestTransferManager::new(PeerId::random());
        let _subscription = manager.subscribe(Box::new(move |_event, _state| {
            std::thread::sleep(Duration::from_millis(50));
        }));

        // Publishing never blocks the caller; delivery happens in order on
        // the delivery thread.
        let start = std::time::Instant::now();
        manager.publish_completed(PeerId::random(), payload_cid(b"slow"));
        manager.publish_completed(PeerId::random(), payload_cid(b"slow"));
        assert!(start.elapsed() < Duration::from_millis(40));

        manager.flush();
        assert!(start.elapsed() >= Duration::from_millis(100));
    }

    #[tokio::test]
    async fn test_open_pull_channel_is_recorded() {
        let local = PeerId::random();
        let manager = TestTransferManager::new(local);
        let remote = PeerId::random();
        let root = payload_cid(b"recorded");

        let channel = manager
            .open_pull_channel(
                remote,
                Voucher::new("TestVoucher", vec![]),
                root,
                Selector::AllLinks,
            )
            .await
            .unwrap();

        let pulls = manager.pulls();
        assert_eq!(pulls.len(), 1);
        assert_eq!(pulls[0].peer, remote);
        assert_eq!(pulls[0].root, root);
        assert_eq!(pulls[0].channel, channel);
        assert_eq!(channel.initiator, local);
        assert_eq!(channel.responder, remote);
    }
}
