//! Testing utilities
//!
//! In-process stand-ins for the supply layer's collaborators, so nodes can
//! be exercised without a real network or transfer engine:
//! - `network`: simulated peer host wired over in-memory duplex streams
//! - `transfer`: transfer manager that records pulls and replays events
//! - `store`: in-memory multi-store and block stores
//!
//! # Example
//!
//! ```ignore
//! let net = TestNet::new();
//! let a = TestNode::new(&net, &["Global"]);
//! let b = TestNode::new(&net, &["Global"]);
//! net.connect(&a.peer(), &b.peer());
//!
//! let response = a.supply.dispatch(request).await?;
//! ```

pub mod network;
pub mod store;
pub mod transfer;

use std::sync::Arc;
use std::time::Duration;

use cid::Cid;
use libp2p_identity::PeerId;
use multihash::Multihash;

use crate::data::MemoryKv;
use crate::host::PeerHost;
use crate::regions::parse_regions;
use crate::supply::Supply;

use self::network::{TestHost, TestNet};
use self::store::MemoryMultiStore;
use self::transfer::TestTransferManager;

/// Raw multicodec, for test payloads addressed by their bytes.
const RAW_CODEC: u64 = 0x55;
/// BLAKE3 multihash code.
const BLAKE3_CODE: u64 = 0x1e;

/// Deterministic content identifier for a test payload.
pub fn payload_cid(seed: &[u8]) -> Cid {
    let digest = blake3::hash(seed);
    let hash = Multihash::<64>::wrap(BLAKE3_CODE, digest.as_bytes()).expect("digest fits");
    Cid::new_v1(RAW_CODEC, hash)
}

/// Poll `cond` until it holds or `timeout` elapses.
pub async fn wait_until(timeout: Duration, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if cond() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    cond()
}

/// A full supply node over in-memory collaborators.
pub struct TestNode {
    pub host: Arc<TestHost>,
    pub transfer: Arc<TestTransferManager>,
    pub multistore: Arc<MemoryMultiStore>,
    pub kv: Arc<MemoryKv>,
    pub supply: Supply,
}

impl TestNode {
    /// Create a node on `net` participating in the named regions.
    pub fn new(net: &TestNet, region_names: &[&str]) -> TestNode {
        let host = net.add_host();
        let transfer = TestTransferManager::new(host.local_peer());
        let multistore = Arc::new(MemoryMultiStore::new());
        let kv = Arc::new(MemoryKv::new());
        let supply = Supply::new(
            host.clone(),
            transfer.clone(),
            kv.clone(),
            multistore.clone(),
            parse_regions(region_names),
        );
        TestNode {
            host,
            transfer,
            multistore,
            kv,
            supply,
        }
    }

    /// This node's peer identity.
    pub fn peer(&self) -> PeerId {
        self.host.local_peer()
    }
}
