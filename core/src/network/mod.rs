//! Request network
//!
//! Exposes one region-suffixed protocol per configured region on the peer
//! host, accepts inbound request streams and hands them to a pluggable
//! receiver, and mints outbound request streams. Each stream carries
//! exactly one request: the writer closes after one write, the reader
//! reads one message and is done.

pub mod protocol;

use std::fmt;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use libp2p_identity::PeerId;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufReader};
use tracing::warn;

use crate::host::{BoxStream, HostError, PeerHost, ProtocolId, StreamHandler};
use crate::regions::{region_protocols, Region};
use self::protocol::{DispatchRequest, DISPATCH_PROTOCOL};

/// Read buffer for inbound request streams. The fixed request framing fits
/// comfortably; a larger buffer changes nothing semantically.
pub const REQUEST_READ_BUFFER: usize = 16;

/// Upper bound on a request frame. Real requests are tens of bytes.
const MAX_REQUEST_FRAME: u32 = 512;

/// One request per stream, length-prefixed.
pub struct RequestStream {
    remote: PeerId,
    io: BufReader<BoxStream>,
}

impl RequestStream {
    pub(crate) fn new(remote: PeerId, stream: BoxStream) -> Self {
        RequestStream {
            remote,
            io: BufReader::with_capacity(REQUEST_READ_BUFFER, stream),
        }
    }

    /// Identity of the peer on the other end.
    pub fn remote_peer(&self) -> PeerId {
        self.remote
    }

    /// Read the single request off this stream.
    pub async fn read_request(&mut self) -> Result<DispatchRequest, NetworkError> {
        let mut len_buf = [0u8; 4];
        self.io.read_exact(&mut len_buf).await?;
        let len = u32::from_be_bytes(len_buf);
        if len > MAX_REQUEST_FRAME {
            return Err(NetworkError::Oversized(len));
        }
        let mut body = vec![0u8; len as usize];
        self.io.read_exact(&mut body).await?;
        DispatchRequest::from_bytes(&body).map_err(|e| NetworkError::Decode(e.to_string()))
    }

    /// Write the single request onto this stream.
    pub async fn write_request(&mut self, request: &DispatchRequest) -> Result<(), NetworkError> {
        let body = request.to_bytes();
        self.io
            .write_all(&(body.len() as u32).to_be_bytes())
            .await?;
        self.io.write_all(&body).await?;
        self.io.flush().await?;
        Ok(())
    }

    /// Flush and close the stream.
    pub async fn close(mut self) -> Result<(), NetworkError> {
        self.io.shutdown().await?;
        Ok(())
    }
}

/// Handles inbound request streams.
#[async_trait]
pub trait RequestReceiver: Send + Sync + 'static {
    async fn handle_request(&self, stream: RequestStream);
}

/// Region-scoped messaging for content supply.
pub struct RequestNetwork {
    host: Arc<dyn PeerHost>,
    protocols: Vec<ProtocolId>,
    receiver: Arc<Mutex<Option<Arc<dyn RequestReceiver>>>>,
}

impl RequestNetwork {
    /// Computes the protocol identifier list once from the region set.
    pub fn new(host: Arc<dyn PeerHost>, regions: &[Region]) -> Self {
        RequestNetwork {
            host,
            protocols: region_protocols(DISPATCH_PROTOCOL, regions),
            receiver: Arc::new(Mutex::new(None)),
        }
    }

    /// The protocol identifiers this node advertises.
    pub fn protocols(&self) -> &[ProtocolId] {
        &self.protocols
    }

    /// Register `receiver` and install a stream handler for every region
    /// protocol. Needs to be called once; re-registration replaces the
    /// receiver for all protocols.
    pub fn set_receiver(&self, receiver: Arc<dyn RequestReceiver>) {
        *self.receiver.lock().unwrap() = Some(receiver);
        for proto in &self.protocols {
            let slot = self.receiver.clone();
            let handler: StreamHandler = Arc::new(move |remote: PeerId, stream: BoxStream| {
                let receiver = slot.lock().unwrap().clone();
                match receiver {
                    Some(receiver) => {
                        let stream = RequestStream::new(remote, stream);
                        tokio::spawn(async move {
                            receiver.handle_request(stream).await;
                        });
                    }
                    None => {
                        // Abortive close; nothing read.
                        warn!(peer = %remote, "inbound request stream with no receiver set");
                        drop(stream);
                    }
                }
            });
            self.host.set_stream_handler(proto.clone(), handler);
        }
    }

    /// Open a one-shot request stream to `dest`, negotiating any of our
    /// region protocols.
    pub async fn new_request_stream(&self, dest: &PeerId) -> Result<RequestStream, NetworkError> {
        let stream = self.host.open_stream(dest, &self.protocols).await?;
        Ok(RequestStream::new(*dest, stream))
    }
}

/// Errors from the request network.
#[derive(Debug)]
pub enum NetworkError {
    /// Inbound request did not parse.
    Decode(String),
    /// Frame length exceeds the request bound.
    Oversized(u32),
    /// Stream I/O failed.
    Io(String),
    /// The host could not provide a stream.
    Host(HostError),
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NetworkError::Decode(e) => write!(f, "failed to decode request: {}", e),
            NetworkError::Oversized(len) => write!(f, "request frame too large: {} bytes", len),
            NetworkError::Io(e) => write!(f, "stream io error: {}", e),
            NetworkError::Host(e) => write!(f, "host error: {}", e),
        }
    }
}

impl std::error::Error for NetworkError {}

impl From<std::io::Error> for NetworkError {
    fn from(e: std::io::Error) -> Self {
        NetworkError::Io(e.to_string())
    }
}

impl From<HostError> for NetworkError {
    fn from(e: HostError) -> Self {
        NetworkError::Host(e)
    }
}
