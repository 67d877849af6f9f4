//! Peer host seam
//!
//! The supply layer does not own a transport. It talks to the peer host
//! through this interface:
//! - enumerate current connections
//! - query which of our protocols a peer advertises
//! - open outbound streams and register inbound stream handlers
//!
//! Production hosts adapt their networking stack to this trait; tests use
//! the in-memory host in `testing::network`.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use libp2p_identity::PeerId;
use tokio::io::{AsyncRead, AsyncWrite};

/// A region-scoped protocol identifier, e.g. `/myel/supply/dispatch/1.0/Europe`.
///
/// Two nodes are part of the same subnet iff they advertise a byte-identical
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProtocolId(String);

impl ProtocolId {
    pub fn new(id: impl Into<String>) -> Self {
        ProtocolId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProtocolId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProtocolId {
    fn from(s: &str) -> Self {
        ProtocolId(s.to_string())
    }
}

/// Raw bidirectional byte stream as vended by the host.
pub trait StreamIo: AsyncRead + AsyncWrite + Send + Unpin {}

impl<T: AsyncRead + AsyncWrite + Send + Unpin> StreamIo for T {}

/// Boxed stream handed across the host boundary.
pub type BoxStream = Box<dyn StreamIo>;

/// Callback invoked for each inbound stream on a registered protocol.
///
/// Receives the remote peer identity and the raw stream. Handlers are
/// invoked from within the host's async runtime and may spawn tasks.
pub type StreamHandler = Arc<dyn Fn(PeerId, BoxStream) + Send + Sync>;

/// The peer host surface the supply layer depends on.
#[async_trait]
pub trait PeerHost: Send + Sync + 'static {
    /// Identity of the local node.
    fn local_peer(&self) -> PeerId;

    /// Peers with a currently live connection, in the host's own iteration
    /// order. Callers must not depend on the ordering.
    fn connections(&self) -> Vec<PeerId>;

    /// Subset of `protocols` the given peer is known to advertise.
    fn supported_protocols(&self, peer: &PeerId, protocols: &[ProtocolId]) -> Vec<ProtocolId>;

    /// Open a new stream to `peer`, negotiating any of `protocols`. The host
    /// selects the first mutually supported identifier.
    async fn open_stream(&self, peer: &PeerId, protocols: &[ProtocolId])
        -> Result<BoxStream, HostError>;

    /// Register `handler` for inbound streams on `protocol`.
    fn set_stream_handler(&self, protocol: ProtocolId, handler: StreamHandler);
}

/// Errors surfaced by the peer host.
#[derive(Debug)]
pub enum HostError {
    /// Destination peer is unknown or unreachable.
    PeerUnreachable(String),
    /// Destination advertises none of the offered protocols.
    UnsupportedProtocols,
    /// The stream failed while opening or negotiating.
    Stream(String),
}

impl fmt::Display for HostError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostError::PeerUnreachable(p) => write!(f, "peer unreachable: {}", p),
            HostError::UnsupportedProtocols => write!(f, "no mutually supported protocol"),
            HostError::Stream(e) => write!(f, "stream error: {}", e),
        }
    }
}

impl std::error::Error for HostError {}
