//! `exchange-client` — a TCP client for a binary market-data feed with
//! sequence-gap recovery.
//!
//! # Architecture
//!
//! ```text
//!  ┌──────────────────┐  stream-all / resend   ┌──────────────────┐
//!  │  ExchangeClient  │───────────────────────▶│  Exchange server │
//!  │  (orchestrator)  │◀───────────────────────│  (17-byte frames)│
//!  └───┬──────────────┘    byte stream         └──────────────────┘
//!      │
//!      ├── StreamDecoder  (reassembles fixed-size records from chunks)
//!      ├── PacketStore    (accumulated packets + gap detection)
//!      ├── Connection     (TCP session: connect / idle timeout / close)
//!      └── persist::save  (sorted JSON artifact)
//! ```
//!
//! The client runs one session at a time: it streams the full packet feed
//! until the server closes the transport, computes which sequence numbers
//! never arrived, reconnects, and re-requests each missing sequence serially
//! before writing the completed set to disk.
//!
//! Each module has a single responsibility:
//! - [`packet`]     — wire format (request encoding, record decoding)
//! - [`store`]      — packet accumulation and missing-sequence computation
//! - [`state`]      — session finite-state-machine types
//! - [`connection`] — TCP session lifecycle (thin async wrapper)
//! - [`client`]     — streaming + gap-fill orchestration
//! - [`persist`]    — JSON artifact output

pub mod client;
pub mod connection;
pub mod packet;
pub mod persist;
pub mod state;
pub mod store;

pub use client::{ClientConfig, ClientError, ExchangeClient};
pub use connection::{ConnError, Connection, SessionEvent};
pub use packet::{Packet, PacketError, Side, StreamDecoder};
pub use store::PacketStore;
