//! Freighter Core
//!
//! Content-supply core of a peer-to-peer content distribution node. A node
//! holding a payload (a content-addressed DAG) pushes it to a bounded set
//! of cache peers in its regions; only peers a node invited can pull from
//! it, and every concurrent inbound transfer lands in its own isolated
//! block store.
//!
//! # Module Structure
//!
//! - `supply/`: the dispatch controller - fan-out, responses, inbound
//!   handling, per-channel store routing
//! - `network/`: region-scoped request protocol and wire format
//! - `regions`: region presets, protocol derivation, miner lists
//! - `index`: payload CID -> owning block store, persisted
//! - `auth`: per-payload pull authorization
//! - `host`, `store`, `transfer`, `data`: seams to the peer host, the
//!   multi-store, the bulk-transfer engine and the key-value store
//! - `testing`: in-memory collaborators for exercising full nodes
//!
//! # Quick Start
//!
//! ```ignore
//! use freighter_core::{parse_regions, DispatchRequest, Supply};
//!
//! let supply = Supply::new(host, transfer, kv, multistore, parse_regions(&["Global"]));
//! supply.register(&root, store_id)?;
//!
//! let mut response = supply.dispatch(DispatchRequest { payload_cid: root, size }).await?;
//! while let Some(record) = response.next().await {
//!     println!("{} now cached by {}", record.payload_cid, record.provider);
//! }
//! ```

pub mod auth;
pub mod data;
pub mod host;
pub mod index;
pub mod network;
pub mod regions;
pub mod store;
pub mod supply;
pub mod testing;
pub mod transfer;

// Re-export the main API types for convenience
pub use auth::Validator;
pub use host::{PeerHost, ProtocolId};
pub use index::{ContentIndex, ContentRecord};
pub use network::protocol::{DispatchRequest, DISPATCH_PROTOCOL, DISPATCH_VOUCHER_TYPE};
pub use network::RequestNetwork;
pub use regions::{list_miners, parse_regions, region_protocols, Region, RegionCode};
pub use store::{BlockStore, MultiStore, StoreId};
pub use supply::{DispatchResponse, ProviderRecord, Supply, SupplyError, MAX_RECEIVER_COUNT};
pub use transfer::{Selector, TransferManager, Voucher};
