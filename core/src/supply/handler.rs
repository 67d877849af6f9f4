//! Provider-side request handling
//!
//! When a dispatch request arrives, the handler allocates a fresh block
//! store, indexes the payload under it, and asks the transfer engine to
//! pull the DAG from the sender. The transport configurer is the other
//! half of that story: when the engine starts a channel carrying one of
//! our vouchers, it routes that channel's block traffic into the payload's
//! own store.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::index::{ContentIndex, ContentRecord, LABEL_SIZE};
use crate::network::protocol::DispatchRequest;
use crate::network::{RequestReceiver, RequestStream};
use crate::store::MultiStore;
use crate::transfer::{Selector, TransferManager, TransportConfigurer};

/// Pulls the payload from the sender upon receiving a dispatch request.
pub(crate) struct RequestHandler {
    pub(crate) index: Arc<ContentIndex>,
    pub(crate) multistore: Arc<dyn MultiStore>,
    pub(crate) transfer: Arc<dyn TransferManager>,
}

#[async_trait]
impl RequestReceiver for RequestHandler {
    async fn handle_request(&self, mut stream: RequestStream) {
        let request = match stream.read_request().await {
            Ok(request) => request,
            Err(e) => {
                debug!(error = %e, "failed to read dispatch request");
                if let Err(e) = stream.close().await {
                    debug!(error = %e, "failed to close request stream");
                }
                return;
            }
        };

        // A fresh store for the incoming blocks. The transport configurer
        // picks it up from the index when the pull channel starts.
        let store_id = self.multistore.next_id();
        let record =
            ContentRecord::for_store(store_id).with_label(LABEL_SIZE, request.size.to_string());
        if let Err(e) = self.index.put(&request.payload_cid, &record) {
            debug!(error = %e, cid = %request.payload_cid, "failed to index incoming payload");
            return;
        }

        let sender = stream.remote_peer();
        if let Err(e) = self
            .transfer
            .open_pull_channel(
                sender,
                request.to_voucher(),
                request.payload_cid,
                Selector::AllLinks,
            )
            .await
        {
            // The index entry stays; the error-event subscription removes
            // it when the failed transfer reports back.
            warn!(error = %e, cid = %request.payload_cid, "failed to open pull channel");
        }

        if let Err(e) = stream.close().await {
            debug!(error = %e, "failed to close request stream");
        }
    }
}

/// Builds the configurer that routes a channel's block reads and writes
/// through the store owning the channel's payload. Vouchers of other types
/// and transports without store routing are left alone.
pub(crate) fn store_routing_configurer(
    index: Arc<ContentIndex>,
    multistore: Arc<dyn MultiStore>,
) -> TransportConfigurer {
    Arc::new(move |channel, voucher, transport| {
        let request = match DispatchRequest::from_voucher(voucher) {
            Some(request) => request,
            None => return,
        };
        let configurable = match transport.as_store_configurable() {
            Some(configurable) => configurable,
            None => return,
        };
        let store_id = match index.store_id(&request.payload_cid) {
            Ok(store_id) => store_id,
            Err(e) => {
                warn!(error = %e, cid = %request.payload_cid, "failed to resolve store for channel");
                return;
            }
        };
        let store = match multistore.get(store_id) {
            Ok(store) => store,
            Err(e) => {
                warn!(error = %e, store = %store_id, "failed to open store for channel");
                return;
            }
        };
        if let Err(e) = configurable.use_store(channel, store) {
            warn!(error = %e, cid = %request.payload_cid, "failed to configure channel store");
        }
    })
}
