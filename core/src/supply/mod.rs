//! Supply controller
//!
//! Keeps track of the content this node holds and pushes it to eligible
//! cache peers:
//! - `dispatch` fans a payload request out to up to [`MAX_RECEIVER_COUNT`]
//!   connected peers speaking one of our region protocols, authorizes them,
//!   and surfaces per-recipient completions through the returned response
//! - the inbound handler accepts requests from other dispatchers and pulls
//!   their payloads into freshly allocated block stores
//! - the content index ties every payload to its owning store so transfer
//!   channels for distinct payloads never share storage

mod handler;
mod response;

pub use self::response::{DispatchResponse, ProviderRecord};

use std::fmt;
use std::sync::Arc;

use cid::Cid;
use libp2p_identity::PeerId;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::auth::Validator;
use crate::data::KeyValueStore;
use crate::host::PeerHost;
use crate::index::{ContentIndex, ContentRecord, IndexError};
use crate::network::protocol::{DispatchRequest, DISPATCH_VOUCHER_TYPE};
use crate::network::RequestNetwork;
use crate::regions::{self, Region};
use crate::store::{BlockStore, MultiStore, StoreError, StoreId};
use crate::transfer::{EventCode, TransferManager, TransferStatus};

use self::handler::{store_routing_configurer, RequestHandler};

/// Maximum number of peers one dispatch addresses. Compile-time fixed;
/// there is no operator knob to raise it.
pub const MAX_RECEIVER_COUNT: usize = 7;

/// The content-supply controller.
pub struct Supply {
    host: Arc<dyn PeerHost>,
    transfer: Arc<dyn TransferManager>,
    multistore: Arc<dyn MultiStore>,
    network: Arc<RequestNetwork>,
    index: Arc<ContentIndex>,
    validator: Arc<Validator>,
    regions: Vec<Region>,
    _cleanup: crate::transfer::Subscription,
}

impl Supply {
    /// Wire the supply subsystem onto its collaborators: registers the
    /// dispatch voucher type and its validator, the per-channel store
    /// configurer, the inbound request handler, and a background watch
    /// that drops index entries for inbound transfers that fail.
    pub fn new(
        host: Arc<dyn PeerHost>,
        transfer: Arc<dyn TransferManager>,
        kv: Arc<dyn KeyValueStore>,
        multistore: Arc<dyn MultiStore>,
        regions: Vec<Region>,
    ) -> Self {
        let index = Arc::new(ContentIndex::new(kv));
        let validator = Arc::new(Validator::new());
        let network = Arc::new(RequestNetwork::new(host.clone(), &regions));

        transfer.register_voucher_type(DISPATCH_VOUCHER_TYPE, validator.clone());
        transfer.register_transport_configurer(
            DISPATCH_VOUCHER_TYPE,
            store_routing_configurer(index.clone(), multistore.clone()),
        );
        network.set_receiver(Arc::new(RequestHandler {
            index: index.clone(),
            multistore: multistore.clone(),
            transfer: transfer.clone(),
        }));

        // Inbound transfers we initiated receiving can fail long after the
        // request stream is gone; their speculative index entries must go
        // with them.
        let cleanup = {
            let index = index.clone();
            let local = host.local_peer();
            transfer.subscribe(Box::new(move |event, state| {
                if event.code == EventCode::Error && state.recipient == local {
                    if let Err(e) = index.remove(&state.base_cid) {
                        warn!(error = %e, cid = %state.base_cid, "failed to drop failed transfer from index");
                    }
                }
            }))
        };

        Supply {
            host,
            transfer,
            multistore,
            network,
            index,
            validator,
            regions,
            _cleanup: cleanup,
        }
    }

    /// Record a locally held payload and the store that owns it.
    pub fn register(&self, cid: &Cid, store_id: StoreId) -> Result<(), SupplyError> {
        self.index.put(cid, &ContentRecord::for_store(store_id))?;
        Ok(())
    }

    /// Push `request` to connected peers until enough have been addressed.
    ///
    /// Selects up to [`MAX_RECEIVER_COUNT`] protocol-compatible peers,
    /// authorizes each to pull the payload, and writes the one-shot request
    /// to each on a fresh stream. Per-peer send failures are logged and
    /// swallowed; the response's count reflects peers targeted, not peers
    /// reached. Fails with [`SupplyError::NoPeers`] when nobody qualifies.
    pub async fn dispatch(&self, request: DispatchRequest) -> Result<DispatchResponse, SupplyError> {
        let (tx, rx) = mpsc::channel(MAX_RECEIVER_COUNT);

        // Subscribe before selecting receivers so no completion for this
        // dispatch can slip past. A slow consumer backpressures the engine's
        // event thread; records for a closed response are dropped.
        let payload_cid = request.payload_cid;
        let subscription = self.transfer.subscribe(Box::new(move |_event, state| {
            if state.status != TransferStatus::Completed || state.base_cid != payload_cid {
                return;
            }
            let record = ProviderRecord {
                provider: state.recipient,
                payload_cid: state.base_cid,
            };
            let _ = tx.blocking_send(record);
        }));

        let receivers = self.select_receivers()?;
        for peer in &receivers {
            self.validator.authorize(&request.payload_cid, peer);
        }
        let count = receivers.len();
        self.send_all(&request, &receivers).await;

        debug!(cid = %request.payload_cid, peers = count, "dispatched payload request");
        Ok(DispatchResponse::new(rx, subscription, count))
    }

    /// Connected peers that advertise at least one of our region protocols,
    /// minus ourselves, truncated to the receiver ceiling. Ordering follows
    /// the host's connection iteration order.
    fn select_receivers(&self) -> Result<Vec<PeerId>, SupplyError> {
        let local = self.host.local_peer();
        let mut peers = Vec::new();
        for peer in self.host.connections() {
            if peer == local {
                continue;
            }
            if self
                .host
                .supported_protocols(&peer, self.network.protocols())
                .is_empty()
            {
                continue;
            }
            peers.push(peer);
        }

        if peers.is_empty() {
            return Err(SupplyError::NoPeers);
        }
        peers.truncate(MAX_RECEIVER_COUNT);
        Ok(peers)
    }

    /// Best-effort fan-out: one stream, one write, one close per peer.
    /// A failure for one peer never affects the others.
    async fn send_all(&self, request: &DispatchRequest, peers: &[PeerId]) {
        for peer in peers {
            let mut stream = match self.network.new_request_stream(peer).await {
                Ok(stream) => stream,
                Err(e) => {
                    warn!(peer = %peer, error = %e, "failed to open request stream");
                    continue;
                }
            };
            // The stream is closed whether or not the write went through.
            if let Err(e) = stream.write_request(request).await {
                warn!(peer = %peer, error = %e, "failed to write dispatch request");
            }
            if let Err(e) = stream.close().await {
                debug!(peer = %peer, error = %e, "failed to close request stream");
            }
        }
    }

    /// The store identifier owning `cid`'s payload.
    pub fn store_id(&self, cid: &Cid) -> Result<StoreId, SupplyError> {
        Ok(self.index.store_id(cid)?)
    }

    /// The block store holding `cid`'s payload.
    pub fn store_for(&self, cid: &Cid) -> Result<Arc<dyn BlockStore>, SupplyError> {
        let store_id = self.index.store_id(cid)?;
        Ok(self.multistore.get(store_id)?)
    }

    /// Drop all content linked to `root` by deleting its store, then remove
    /// the index entry. The two go together: an index entry must never
    /// point at a destroyed store.
    pub fn remove_content(&self, root: &Cid) -> Result<(), SupplyError> {
        let store_id = self.index.store_id(root)?;
        self.multistore.delete(store_id)?;
        self.index.remove(root)?;
        Ok(())
    }

    /// Storage miners known across the regions this node participates in.
    pub fn list_miners(&self) -> Vec<String> {
        regions::list_miners(&self.regions)
    }

    /// The regions this node participates in.
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }
}

/// Errors from supply operations.
#[derive(Debug)]
pub enum SupplyError {
    /// Dispatch found zero eligible receivers.
    NoPeers,
    /// Content index failure.
    Index(IndexError),
    /// Multi-store failure.
    Store(StoreError),
}

impl fmt::Display for SupplyError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SupplyError::NoPeers => write!(f, "no peers available for supply"),
            SupplyError::Index(e) => write!(f, "index error: {}", e),
            SupplyError::Store(e) => write!(f, "store error: {}", e),
        }
    }
}

impl std::error::Error for SupplyError {}

impl From<IndexError> for SupplyError {
    fn from(e: IndexError) -> Self {
        SupplyError::Index(e)
    }
}

impl From<StoreError> for SupplyError {
    fn from(e: StoreError) -> Self {
        SupplyError::Store(e)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;
    use std::pin::Pin;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};
    use std::time::Duration;

    use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};

    use super::handler::RequestHandler;
    use super::*;
    use crate::data::MemoryKv;
    use crate::network::{RequestReceiver, RequestStream};
    use crate::testing::network::TestNet;
    use crate::testing::store::MemoryMultiStore;
    use crate::testing::transfer::{PlainTransport, RoutingTransport, TestTransferManager};
    use crate::testing::{payload_cid, wait_until, TestNode};
    use crate::transfer::{ChannelId, ValidationError};

    const WAIT: Duration = Duration::from_secs(2);

    fn request(seed: &[u8], size: u64) -> DispatchRequest {
        DispatchRequest {
            payload_cid: payload_cid(seed),
            size,
        }
    }

    fn channel_between(initiator: PeerId, responder: PeerId) -> ChannelId {
        ChannelId {
            initiator,
            responder,
            id: 1,
        }
    }

    /// Pipe end that records whether the handler shut it down.
    struct TrackingStream {
        inner: tokio::io::DuplexStream,
        closed: Arc<AtomicBool>,
    }

    impl AsyncRead for TrackingStream {
        fn poll_read(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &mut ReadBuf<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_read(cx, buf)
        }
    }

    impl AsyncWrite for TrackingStream {
        fn poll_write(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Pin::new(&mut self.inner).poll_write(cx, buf)
        }

        fn poll_flush(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            Pin::new(&mut self.inner).poll_flush(cx)
        }

        fn poll_shutdown(
            mut self: Pin<&mut Self>,
            cx: &mut Context<'_>,
        ) -> Poll<std::io::Result<()>> {
            self.closed.store(true, Ordering::SeqCst);
            Pin::new(&mut self.inner).poll_shutdown(cx)
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_happy_fan_out() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);
        let caches: Vec<TestNode> = (0..3).map(|_| TestNode::new(&net, &["Global"])).collect();
        for cache in &caches {
            net.connect(&a.peer(), &cache.peer());
        }

        let req = request(b"happy-fan-out", 100);
        let mut response = a.supply.dispatch(req).await.unwrap();
        assert_eq!(response.count(), 3);

        // Every cache receives exactly one request and starts pulling the
        // payload from us into a fresh store.
        for cache in &caches {
            let transfer = cache.transfer.clone();
            assert!(wait_until(WAIT, || transfer.pulls().len() == 1).await);
            let pulls = cache.transfer.pulls();
            assert_eq!(pulls[0].peer, a.peer());
            assert_eq!(pulls[0].root, req.payload_cid);

            let store_id = cache.supply.store_id(&req.payload_cid).unwrap();
            assert!(cache.multistore.contains(store_id));
        }

        // The transfer engine confirms each recipient; the response
        // surfaces one provider record per cache.
        for cache in &caches {
            a.transfer.publish_completed(cache.peer(), req.payload_cid);
        }
        let mut providers = HashSet::new();
        for _ in 0..3 {
            let record = tokio::time::timeout(WAIT, response.next())
                .await
                .unwrap()
                .unwrap();
            assert_eq!(record.payload_cid, req.payload_cid);
            providers.insert(record.provider);
        }
        let expected: HashSet<PeerId> = caches.iter().map(|c| c.peer()).collect();
        assert_eq!(providers, expected);

        response.close();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_dispatch_without_peers_fails() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);

        let result = a.supply.dispatch(request(b"alone", 1)).await;
        assert!(matches!(result, Err(SupplyError::NoPeers)));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_fan_out_is_capped() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);
        let caches: Vec<TestNode> = (0..10).map(|_| TestNode::new(&net, &["Global"])).collect();
        for cache in &caches {
            net.connect(&a.peer(), &cache.peer());
        }

        let req = request(b"capped", 64);
        let response = a.supply.dispatch(req).await.unwrap();
        assert_eq!(response.count(), MAX_RECEIVER_COUNT);

        // The first seven connections are addressed, the rest receive
        // nothing and are never authorized.
        let selected = &caches[..MAX_RECEIVER_COUNT];
        let skipped = &caches[MAX_RECEIVER_COUNT..];

        for cache in selected {
            let transfer = cache.transfer.clone();
            assert!(wait_until(WAIT, || transfer.pulls().len() == 1).await);
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
        for cache in skipped {
            assert!(cache.transfer.pulls().is_empty());
        }

        let voucher = req.to_voucher();
        for cache in selected {
            assert!(a
                .transfer
                .validate_pull(&cache.peer(), &voucher, &req.payload_cid)
                .is_ok());
        }
        for cache in skipped {
            assert_eq!(
                a.transfer
                    .validate_pull(&cache.peer(), &voucher, &req.payload_cid),
                Err(ValidationError::NotAuthorized)
            );
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_region_mismatch_excludes_peer() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Europe"]);
        let b = TestNode::new(&net, &["Asia"]);
        net.connect(&a.peer(), &b.peer());

        let result = a.supply.dispatch(request(b"regions", 1)).await;
        assert!(matches!(result, Err(SupplyError::NoPeers)));
        assert!(b.transfer.pulls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shared_region_is_enough() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Europe", "Asia"]);
        let b = TestNode::new(&net, &["Asia", "Oceania"]);
        net.connect(&a.peer(), &b.peer());

        let response = a.supply.dispatch(request(b"overlap", 1)).await.unwrap();
        assert_eq!(response.count(), 1);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_pull_authorization_roundtrip() {
        let net = TestNet::new();
        let r = TestNode::new(&net, &["Global"]);
        let p = TestNode::new(&net, &["Global"]);
        net.connect(&r.peer(), &p.peer());

        let req = request(b"authorized-pull", 2048);
        let _response = r.supply.dispatch(req).await.unwrap();

        let p_transfer = p.transfer.clone();
        assert!(wait_until(WAIT, || p_transfer.pulls().len() == 1).await);
        let voucher = req.to_voucher();

        // On the dispatcher, the addressed peer validates; a stranger does
        // not; pushes never do.
        assert!(r
            .transfer
            .validate_pull(&p.peer(), &voucher, &req.payload_cid)
            .is_ok());
        let stranger = PeerId::random();
        assert_eq!(
            r.transfer
                .validate_pull(&stranger, &voucher, &req.payload_cid),
            Err(ValidationError::NotAuthorized)
        );
        assert_eq!(
            r.transfer.validate_push(&p.peer(), &voucher, &req.payload_cid),
            Err(ValidationError::PushesRejected)
        );

        // The provider granted nobody anything for a payload it merely
        // receives: a pull against it reports the CID as unknown.
        assert_eq!(
            p.transfer
                .validate_pull(&stranger, &voucher, &req.payload_cid),
            Err(ValidationError::UnknownCid)
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_failed_inbound_transfer_is_dropped_from_index() {
        let net = TestNet::new();
        let r = TestNode::new(&net, &["Global"]);
        let p = TestNode::new(&net, &["Global"]);
        net.connect(&r.peer(), &p.peer());

        let req = request(b"failed-pull", 512);
        let _response = r.supply.dispatch(req).await.unwrap();

        let p_transfer = p.transfer.clone();
        assert!(wait_until(WAIT, || p_transfer.pulls().len() == 1).await);
        assert!(p.supply.store_id(&req.payload_cid).is_ok());

        // The pull fails; the provider's speculative index entry goes away.
        p.transfer.publish_error(p.peer(), req.payload_cid);
        p.transfer.flush();
        assert!(matches!(
            p.supply.store_id(&req.payload_cid),
            Err(SupplyError::Index(IndexError::NotFound))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_error_event_for_other_recipient_is_ignored() {
        let net = TestNet::new();
        let r = TestNode::new(&net, &["Global"]);
        let p = TestNode::new(&net, &["Global"]);
        net.connect(&r.peer(), &p.peer());

        let req = request(b"other-error", 512);
        let _response = r.supply.dispatch(req).await.unwrap();
        let p_transfer = p.transfer.clone();
        assert!(wait_until(WAIT, || p_transfer.pulls().len() == 1).await);

        // An error whose recipient is somebody else leaves the index alone.
        p.transfer.publish_error(PeerId::random(), req.payload_cid);
        p.transfer.flush();
        assert!(p.supply.store_id(&req.payload_cid).is_ok());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_completions_for_other_payloads_are_ignored() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);
        let b = TestNode::new(&net, &["Global"]);
        net.connect(&a.peer(), &b.peer());

        let req = request(b"mine", 32);
        let mut response = a.supply.dispatch(req).await.unwrap();

        a.transfer.publish_completed(b.peer(), payload_cid(b"not-mine"));
        a.transfer.publish_completed(b.peer(), req.payload_cid);

        let record = tokio::time::timeout(WAIT, response.next())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(record.payload_cid, req.payload_cid);
        assert_eq!(record.provider, b.peer());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_closed_response_drops_later_completions() {
        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);
        let b = TestNode::new(&net, &["Global"]);
        net.connect(&a.peer(), &b.peer());

        let req = request(b"closed", 32);
        let mut response = a.supply.dispatch(req).await.unwrap();
        response.close();

        a.transfer.publish_completed(b.peer(), req.payload_cid);
        a.transfer.flush();
        assert_eq!(response.next().await, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_register_and_resolve_store() {
        let net = TestNet::new();
        let node = TestNode::new(&net, &["Global"]);

        let cid = payload_cid(b"registered");
        let store_id = node.multistore.next_id();
        node.supply.register(&cid, store_id).unwrap();

        assert_eq!(node.supply.store_id(&cid).unwrap(), store_id);

        // The resolved handle is the same store the multi-store vends.
        let store = node.supply.store_for(&cid).unwrap();
        let block = payload_cid(b"block");
        store.put(block, b"block-data".to_vec()).unwrap();
        let direct = node.multistore.get(store_id).unwrap();
        assert_eq!(direct.get(&block).unwrap().unwrap(), b"block-data");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_remove_content_drops_store_and_record() {
        let net = TestNet::new();
        let node = TestNode::new(&net, &["Global"]);

        let cid = payload_cid(b"removable");
        let store_id = node.multistore.next_id();
        node.supply.register(&cid, store_id).unwrap();

        node.supply.remove_content(&cid).unwrap();
        assert!(!node.multistore.contains(store_id));
        assert!(matches!(
            node.supply.store_id(&cid),
            Err(SupplyError::Index(IndexError::NotFound))
        ));

        // Removing unknown content fails on the index lookup.
        assert!(matches!(
            node.supply.remove_content(&payload_cid(b"unknown")),
            Err(SupplyError::Index(IndexError::NotFound))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transport_configurer_routes_channel_store() {
        let net = TestNet::new();
        let node = TestNode::new(&net, &["Global"]);

        let req = request(b"routed", 4096);
        let store_id = node.multistore.next_id();
        node.supply.register(&req.payload_cid, store_id).unwrap();

        let transport = RoutingTransport::new();
        let channel = channel_between(node.peer(), PeerId::random());
        node.transfer
            .configure(&channel, &req.to_voucher(), &transport);

        let routed = transport.routed_store(&channel).unwrap();
        let block = payload_cid(b"routed-block");
        routed.put(block, b"chunk".to_vec()).unwrap();
        let direct = node.multistore.get(store_id).unwrap();
        assert_eq!(direct.get(&block).unwrap().unwrap(), b"chunk");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_transport_configurer_ignores_foreign_vouchers() {
        let net = TestNet::new();
        let node = TestNode::new(&net, &["Global"]);

        let req = request(b"foreign-voucher", 1);
        let store_id = node.multistore.next_id();
        node.supply.register(&req.payload_cid, store_id).unwrap();

        let transport = RoutingTransport::new();
        let channel = channel_between(node.peer(), PeerId::random());
        let foreign = crate::transfer::Voucher::new("SomeOtherVoucher", req.to_bytes());
        node.transfer.configure(&channel, &foreign, &transport);
        assert!(transport.routed_store(&channel).is_none());

        // A transport without store routing is left to its defaults.
        node.transfer
            .configure(&channel, &req.to_voucher(), &PlainTransport);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_inbound_garbage_leaves_no_trace() {
        use tokio::io::AsyncWriteExt;

        let net = TestNet::new();
        let a = TestNode::new(&net, &["Global"]);
        let b = TestNode::new(&net, &["Global"]);
        net.connect(&a.peer(), &b.peer());

        let protocols = crate::regions::region_protocols(
            crate::network::protocol::DISPATCH_PROTOCOL,
            a.supply.regions(),
        );
        let mut stream = a.host.open_stream(&b.peer(), &protocols).await.unwrap();
        stream.write_all(&[0xde, 0xad, 0xbe, 0xef]).await.unwrap();
        stream.shutdown().await.unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(b.transfer.pulls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_decode_failure_still_closes_stream() {
        use tokio::io::AsyncWriteExt;

        let transfer = TestTransferManager::new(PeerId::random());
        let handler = RequestHandler {
            index: Arc::new(ContentIndex::new(Arc::new(MemoryKv::new()))),
            multistore: Arc::new(MemoryMultiStore::new()),
            transfer: transfer.clone(),
        };

        let (mut client, server) = tokio::io::duplex(4096);
        let closed = Arc::new(AtomicBool::new(false));
        let tracked = TrackingStream {
            inner: server,
            closed: closed.clone(),
        };

        // A frame length far beyond the request bound; the read fails
        // before any body arrives.
        client.write_all(&u32::MAX.to_be_bytes()).await.unwrap();

        handler
            .handle_request(RequestStream::new(PeerId::random(), Box::new(tracked)))
            .await;

        assert!(closed.load(Ordering::SeqCst));
        assert!(transfer.pulls().is_empty());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_list_miners_delegates_to_regions() {
        let net = TestNet::new();
        let node = TestNode::new(&net, &["Global", "Asia"]);
        assert_eq!(
            node.supply.list_miners(),
            crate::regions::global().storage_miners
        );
    }
}
