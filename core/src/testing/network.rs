//! Test network - simulates a peer host
//!
//! Routes streams between hosts over in-memory duplex pipes, without real
//! network connections. Protocol support mirrors a peer store: a peer
//! "advertises" exactly the protocols it has registered handlers for.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use libp2p_identity::PeerId;

use crate::host::{BoxStream, HostError, PeerHost, ProtocolId, StreamHandler};

/// Buffer size of the in-memory stream pipe.
const PIPE_CAPACITY: usize = 64 * 1024;

#[derive(Default)]
struct NodeEntry {
    handlers: HashMap<ProtocolId, StreamHandler>,
    /// Connected peers, in connect order. Hosts iterate this order.
    connected: Vec<PeerId>,
}

#[derive(Default)]
struct NetInner {
    nodes: HashMap<PeerId, NodeEntry>,
}

/// A simulated network of peer hosts.
#[derive(Clone, Default)]
pub struct TestNet {
    inner: Arc<Mutex<NetInner>>,
}

impl TestNet {
    pub fn new() -> Self {
        TestNet::default()
    }

    /// Add a host with a fresh random identity.
    pub fn add_host(&self) -> Arc<TestHost> {
        let local = PeerId::random();
        self.inner
            .lock()
            .unwrap()
            .nodes
            .insert(local, NodeEntry::default());
        Arc::new(TestHost {
            net: self.clone(),
            local,
        })
    }

    /// Establish a connection both ways.
    pub fn connect(&self, a: &PeerId, b: &PeerId) {
        let mut inner = self.inner.lock().unwrap();
        inner
            .nodes
            .get_mut(a)
            .expect("unknown peer")
            .connected
            .push(*b);
        inner
            .nodes
            .get_mut(b)
            .expect("unknown peer")
            .connected
            .push(*a);
    }
}

/// One host on a [`TestNet`].
pub struct TestHost {
    net: TestNet,
    local: PeerId,
}

#[async_trait]
impl PeerHost for TestHost {
    fn local_peer(&self) -> PeerId {
        self.local
    }

    fn connections(&self) -> Vec<PeerId> {
        let inner = self.net.inner.lock().unwrap();
        inner
            .nodes
            .get(&self.local)
            .map(|entry| entry.connected.clone())
            .unwrap_or_default()
    }

    fn supported_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Vec<ProtocolId> {
        let inner = self.net.inner.lock().unwrap();
        match inner.nodes.get(peer) {
            Some(entry) => protocols
                .iter()
                .filter(|p| entry.handlers.contains_key(p))
                .cloned()
                .collect(),
            None => Vec::new(),
        }
    }

    async fn open_stream(
        &self,
        peer: &PeerId,
        protocols: &[ProtocolId],
    ) -> Result<BoxStream, HostError> {
        // First offered protocol the destination handles wins.
        let handler = {
            let inner = self.net.inner.lock().unwrap();
            let entry = inner
                .nodes
                .get(peer)
                .ok_or_else(|| HostError::PeerUnreachable(peer.to_string()))?;
            protocols
                .iter()
                .find_map(|p| entry.handlers.get(p).cloned())
                .ok_or(HostError::UnsupportedProtocols)?
        };

        let (client, server) = tokio::io::duplex(PIPE_CAPACITY);
        handler(self.local, Box::new(server));
        Ok(Box::new(client))
    }

    fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler) {
        let mut inner = self.net.inner.lock().unwrap();
        inner
            .nodes
            .get_mut(&self.local)
            .expect("host removed from network")
            .handlers
            .insert(protocol, handler);
    }
}
