//! Streaming and gap-fill orchestration.
//!
//! [`ExchangeClient`] drives the session FSM through two phases:
//!
//! 1. **Streaming** — connect, send the stream-all request, decode inbound
//!    chunks into the [`PacketStore`] until the server closes the transport.
//! 2. **Gap-fill** — if sequences are missing, reconnect and re-request each
//!    one **in ascending order, strictly serially**.  The protocol carries no
//!    correlation identifier, so a second request must never be in flight
//!    before the first response is fully consumed; response-to-request
//!    correlation is guaranteed by program order alone.
//!
//! Errors inside the gap-fill loop are localized to the offending sequence:
//! each sequence gets a bounded retry budget (reconnecting when the session
//! died), and a sequence that exhausts its budget is recorded and skipped so
//! the remaining resends still run.  The run only succeeds when every gap
//! was filled — a partial set is surfaced as [`ClientError::Unrecovered`],
//! never silently persisted.

use std::time::Duration;

use thiserror::Error;

use crate::connection::{ConnError, Connection, SessionEvent};
use crate::packet::{encode_resend, encode_stream_all, Packet, PacketError, StreamDecoder};
use crate::state::SessionState;
use crate::store::PacketStore;

/// Attempts per missing sequence before it is declared unrecoverable.
const RESEND_ATTEMPTS: u32 = 3;

/// Errors that terminate a run.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Could not establish (or re-establish) the TCP session.
    #[error(transparent)]
    Connection(#[from] ConnError),
    /// A resend request could not be encoded (sequence wider than the
    /// one-byte wire field).
    #[error("cannot request resend: {0}")]
    Encode(#[from] PacketError),
    /// One or more sequences could not be recovered within the retry budget.
    #[error("unrecovered sequences after {RESEND_ATTEMPTS} attempts each: {sequences:?}")]
    Unrecovered { sequences: Vec<i32> },
}

/// Run configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub host: String,
    pub port: u16,
    /// Session is treated as closed after this long with no inbound data.
    pub idle_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 3000,
            idle_timeout: Duration::from_secs(30),
        }
    }
}

/// Orchestrates one complete stream-and-recover run.
pub struct ExchangeClient {
    config: ClientConfig,
    state: SessionState,
    store: PacketStore,
}

impl ExchangeClient {
    pub fn new(config: ClientConfig) -> Self {
        Self {
            config,
            state: SessionState::Disconnected,
            store: PacketStore::new(),
        }
    }

    /// Current FSM state (observable for diagnostics and tests).
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Execute the full run and return the gap-free packet set, sorted
    /// ascending by sequence.
    ///
    /// All structures live for exactly one run; the client is consumed.
    pub async fn run(mut self) -> Result<Vec<Packet>, ClientError> {
        let mut conn = self.connect().await?;
        self.transition(SessionState::Streaming);
        self.stream_all(&mut conn).await?;

        self.transition(SessionState::GapAnalysis);
        let missing = self.store.missing_sequences();
        log::info!(
            "stream complete: {} packets, {} missing sequence(s) {:?}",
            self.store.len(),
            missing.len(),
            missing
        );

        if !missing.is_empty() {
            let mut conn = self.connect().await?;
            self.transition(SessionState::ResendLoop);
            let unrecovered = self.fill_gaps(&mut conn, &missing).await?;
            if !unrecovered.is_empty() {
                self.transition(SessionState::Done);
                return Err(ClientError::Unrecovered {
                    sequences: unrecovered,
                });
            }
        }

        self.transition(SessionState::Done);
        Ok(self.store.into_sorted())
    }

    /// Open a session, moving the FSM through `Connecting`.
    async fn connect(&mut self) -> Result<Connection, ClientError> {
        self.transition(SessionState::Connecting);
        let conn = Connection::connect(
            &self.config.host,
            self.config.port,
            self.config.idle_timeout,
        )
        .await?;
        Ok(conn)
    }

    /// Streaming phase: request everything, decode until the peer closes.
    async fn stream_all(&mut self, conn: &mut Connection) -> Result<(), ClientError> {
        conn.send(&encode_stream_all()).await?;
        let mut decoder = StreamDecoder::new();

        loop {
            match conn.next_event().await? {
                SessionEvent::Data(chunk) => {
                    for packet in decoder.extend(&chunk) {
                        self.store.add(packet);
                    }
                }
                SessionEvent::Closed => {
                    if decoder.pending() > 0 {
                        log::warn!(
                            "stream ended with {} trailing byte(s) of a partial record",
                            decoder.pending()
                        );
                    }
                    return Ok(());
                }
            }
        }
    }

    /// Gap-fill phase: request each missing sequence serially, in order.
    ///
    /// Returns the sequences that stayed missing after their retry budget.
    /// The passed-in connection is replaced whenever a session dies
    /// mid-request.
    async fn fill_gaps(
        &mut self,
        conn: &mut Connection,
        missing: &[i32],
    ) -> Result<Vec<i32>, ClientError> {
        let mut unrecovered = Vec::new();

        for &seq in missing {
            // Sequence numbers are validated positive at decode time, so the
            // cast is safe; widths beyond the one-byte resend field are a
            // protocol limit surfaced as an encode error.
            let request = encode_resend(seq as u32)?;

            let mut recovered = false;
            for attempt in 1..=RESEND_ATTEMPTS {
                match self.request_one(conn, seq, request).await {
                    Ok(()) => {
                        recovered = true;
                        break;
                    }
                    Err(ResendFailure::SessionDead(e)) => {
                        log::warn!("resend of {seq} failed (attempt {attempt}): {e}; reconnecting");
                        *conn = self.connect().await?;
                        self.transition(SessionState::ResendLoop);
                    }
                    Err(ResendFailure::BadResponse(reason)) => {
                        log::warn!("resend of {seq} got no usable response (attempt {attempt}): {reason}");
                    }
                }
            }

            if !recovered {
                log::error!("sequence {seq} unrecovered after {RESEND_ATTEMPTS} attempts");
                unrecovered.push(seq);
            }
        }

        Ok(unrecovered)
    }

    /// One resend exchange: write the request, then read events until the
    /// decoder produces the packet (a response may be split across reads).
    async fn request_one(
        &mut self,
        conn: &mut Connection,
        seq: i32,
        request: [u8; 2],
    ) -> Result<(), ResendFailure> {
        conn.send(&request)
            .await
            .map_err(ResendFailure::SessionDead)?;

        // Fresh decoder per exchange: exactly one record is expected, and a
        // stale partial from a failed attempt must not bleed into this one.
        let mut decoder = StreamDecoder::new();
        loop {
            match conn
                .next_event()
                .await
                .map_err(ResendFailure::SessionDead)?
            {
                SessionEvent::Data(chunk) => {
                    let mut packets = decoder.extend(&chunk);
                    if packets.is_empty() {
                        continue; // partial record so far, keep reading
                    }
                    let packet = packets.remove(0);
                    if packet.sequence != seq {
                        return Err(ResendFailure::BadResponse(format!(
                            "expected sequence {seq}, got {}",
                            packet.sequence
                        )));
                    }
                    log::info!("recovered missing sequence {seq}");
                    self.store.add(packet);
                    return Ok(());
                }
                SessionEvent::Closed => {
                    return Err(ResendFailure::SessionDead(ConnError::Io(
                        std::io::Error::new(
                            std::io::ErrorKind::UnexpectedEof,
                            "session closed before resend response",
                        ),
                    )))
                }
            }
        }
    }

    /// Move to `next`, logging the edge.  Illegal transitions are a logic
    /// error in this module, hence the debug assertion.
    fn transition(&mut self, next: SessionState) {
        debug_assert!(
            self.state.can_transition(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        log::debug!("state: {} -> {}", self.state, next);
        self.state = next;
    }
}

/// Why one resend attempt failed — decides between reconnect and plain retry.
enum ResendFailure {
    /// The transport died (write failure, close, or idle timeout).
    SessionDead(ConnError),
    /// The session is alive but the response was unusable (malformed record
    /// or a sequence other than the requested one).
    BadResponse(String),
}
