//! Wire-format definitions for the exchange protocol.
//!
//! This module is responsible for:
//! - Encoding the two outbound request frames (stream-all, resend).
//! - Decoding fixed-size inbound packet records.
//! - Reassembling records from an arbitrarily chunked TCP byte stream via
//!   [`StreamDecoder`].
//!
//! No I/O happens here — this is pure data transformation.
//!
//! # Wire format
//!
//! All multi-byte integers are **big-endian**.  Inbound records are exactly
//! [`PACKET_SIZE`] = 17 bytes, packed back-to-back with no delimiter:
//!
//! ```text
//!  0       4   5           9          13          17
//! +--------+---+-----------+-----------+-----------+
//! | symbol | s | quantity  |   price   | sequence  |
//! | ASCII  |B/S| i32 (BE)  | i32 (BE)  | i32 (BE)  |
//! +--------+---+-----------+-----------+-----------+
//! ```
//!
//! Outbound requests are 2 bytes: `[call_type, arg]`.
//! `call_type = 1` requests the full stream (arg ignored, zero by
//! convention); `call_type = 2` requests a resend of sequence `arg`.

use serde::{Deserialize, Serialize};

/// Byte length of one inbound packet record on the wire.
pub const PACKET_SIZE: usize = 17;

/// Request opcode: stream every packet the server has.
pub const CALL_STREAM_ALL: u8 = 1;

/// Request opcode: resend one packet by sequence number.
pub const CALL_RESEND: u8 = 2;

// Byte offsets of each field within a serialised record.
const OFF_SYMBOL: usize = 0;
const OFF_SIDE: usize = 4;
const OFF_QUANTITY: usize = 5;
const OFF_PRICE: usize = 9;
const OFF_SEQUENCE: usize = 13;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

/// Errors that can arise when encoding requests or decoding records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// A resend was requested for a sequence number wider than the one-byte
    /// wire field can carry.
    SequenceOutOfRange(u32),
    /// The side byte was neither `'B'` nor `'S'`.
    InvalidSide(u8),
    /// The symbol field contained non-ASCII bytes.
    InvalidSymbol([u8; 4]),
    /// The sequence field was zero or negative.
    NonPositiveSequence(i32),
}

impl std::fmt::Display for PacketError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PacketError::SequenceOutOfRange(seq) => {
                write!(f, "sequence {seq} does not fit the one-byte resend field (max 255)")
            }
            PacketError::InvalidSide(b) => write!(f, "side byte 0x{b:02x} is not 'B' or 'S'"),
            PacketError::InvalidSymbol(bytes) => {
                write!(f, "symbol field {bytes:02x?} is not printable ASCII")
            }
            PacketError::NonPositiveSequence(seq) => {
                write!(f, "sequence {seq} is not positive")
            }
        }
    }
}

impl std::error::Error for PacketError {}

// ---------------------------------------------------------------------------
// Outbound requests
// ---------------------------------------------------------------------------

/// Encode the "stream all packets" request.  Always `[1, 0]`.
pub fn encode_stream_all() -> [u8; 2] {
    [CALL_STREAM_ALL, 0]
}

/// Encode a resend request for `seq`.
///
/// The wire format carries the sequence in a single unsigned byte, which
/// caps addressable sequence numbers at 255.  That is a protocol limitation,
/// not a client choice: integrators extending the protocol should widen this
/// field to the full 32 bits the inbound records already use.
pub fn encode_resend(seq: u32) -> Result<[u8; 2], PacketError> {
    let arg = u8::try_from(seq).map_err(|_| PacketError::SequenceOutOfRange(seq))?;
    Ok([CALL_RESEND, arg])
}

// ---------------------------------------------------------------------------
// Packet
// ---------------------------------------------------------------------------

/// Buy/sell indicator, wire-encoded as ASCII `'B'` / `'S'`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    #[serde(rename = "B")]
    Buy,
    #[serde(rename = "S")]
    Sell,
}

impl Side {
    fn from_wire(byte: u8) -> Result<Self, PacketError> {
        match byte {
            b'B' => Ok(Side::Buy),
            b'S' => Ok(Side::Sell),
            other => Err(PacketError::InvalidSide(other)),
        }
    }
}

/// One decoded price-update record.  Immutable once decoded.
///
/// Serialises with the artifact field names downstream consumers expect
/// (`buySellIndicator` for the side).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Packet {
    /// 4-character ASCII instrument code.
    pub symbol: String,
    /// Buy or sell.
    #[serde(rename = "buySellIndicator")]
    pub side: Side,
    pub quantity: i32,
    pub price: i32,
    /// Positive, unique within a completed run.
    pub sequence: i32,
}

impl Packet {
    /// Parse one record from exactly [`PACKET_SIZE`] bytes.
    ///
    /// Returns [`Err`] if the side byte, symbol, or sequence fails
    /// validation.  Field offsets are fixed; see the module docs.
    pub fn decode(buf: &[u8; PACKET_SIZE]) -> Result<Self, PacketError> {
        let mut symbol_bytes = [0u8; 4];
        symbol_bytes.copy_from_slice(&buf[OFF_SYMBOL..OFF_SYMBOL + 4]);
        if !symbol_bytes.iter().all(|b| b.is_ascii() && !b.is_ascii_control()) {
            return Err(PacketError::InvalidSymbol(symbol_bytes));
        }

        let side = Side::from_wire(buf[OFF_SIDE])?;
        let quantity = i32::from_be_bytes(buf[OFF_QUANTITY..OFF_QUANTITY + 4].try_into().unwrap());
        let price = i32::from_be_bytes(buf[OFF_PRICE..OFF_PRICE + 4].try_into().unwrap());
        let sequence =
            i32::from_be_bytes(buf[OFF_SEQUENCE..OFF_SEQUENCE + 4].try_into().unwrap());
        if sequence <= 0 {
            return Err(PacketError::NonPositiveSequence(sequence));
        }

        Ok(Packet {
            // Validated as ASCII above.
            symbol: String::from_utf8_lossy(&symbol_bytes).into_owned(),
            side,
            quantity,
            price,
            sequence,
        })
    }
}

// ---------------------------------------------------------------------------
// StreamDecoder
// ---------------------------------------------------------------------------

/// Reassembles whole records from an arbitrarily chunked byte stream.
///
/// TCP does not preserve message boundaries: a single read may deliver half a
/// record, three and a half records, or one byte.  The decoder consumes only
/// complete [`PACKET_SIZE`]-byte records and retains any trailing partial
/// bytes until the next chunk arrives.
///
/// A record that fails validation is dropped with a diagnostic and decoding
/// continues with the next record — one bad record never aborts the stream.
#[derive(Debug, Default)]
pub struct StreamDecoder {
    pending: Vec<u8>,
}

impl StreamDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed `chunk` into the decoder and return every complete, valid record
    /// it can now produce.
    pub fn extend(&mut self, chunk: &[u8]) -> Vec<Packet> {
        self.pending.extend_from_slice(chunk);

        let whole = self.pending.len() / PACKET_SIZE;
        let mut packets = Vec::with_capacity(whole);
        for record in self.pending[..whole * PACKET_SIZE].chunks_exact(PACKET_SIZE) {
            let record: &[u8; PACKET_SIZE] = record.try_into().unwrap();
            match Packet::decode(record) {
                Ok(pkt) => packets.push(pkt),
                Err(e) => log::warn!("dropping malformed record: {e}"),
            }
        }
        self.pending.drain(..whole * PACKET_SIZE);
        packets
    }

    /// Number of buffered bytes awaiting the rest of a record.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
