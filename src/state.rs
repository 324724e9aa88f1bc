//! Session finite-state machine (FSM) types.
//!
//! The run progresses through a fixed sequence of states; transitions are
//! driven by [`crate::client::ExchangeClient`], not here.  Keeping the state
//! types in their own module makes the lifecycle explicit and testable
//! without a live transport.
//!
//! ```text
//!  Disconnected ──connect──▶ Connecting ──▶ Streaming
//!                                              │ peer close / idle timeout
//!                                              ▼
//!        Done ◀── ResendLoop ◀──gaps──── GapAnalysis
//!          ▲                                   │
//!          └───────────── no gaps ─────────────┘
//! ```

/// All possible states of the session FSM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionState {
    /// No session exists; initial state, and the state after any close.
    #[default]
    Disconnected,
    /// TCP connect in flight.
    Connecting,
    /// Stream-all request sent; decoding inbound records until the peer
    /// closes the transport.
    Streaming,
    /// Transport closed; computing the missing-sequence set.
    GapAnalysis,
    /// Reconnected; serially re-requesting each missing sequence.
    ResendLoop,
    /// Full packet set assembled (or the run failed terminally).
    Done,
}

impl SessionState {
    /// `true` when `next` is a legal successor of `self`.
    ///
    /// `Connecting` can be re-entered from `GapAnalysis` (the reconnect
    /// before the resend loop) and from `ResendLoop` (recovery after the
    /// session dies mid-resend).
    pub fn can_transition(self, next: SessionState) -> bool {
        use SessionState::*;
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Streaming)
                | (Connecting, ResendLoop)
                | (Streaming, GapAnalysis)
                | (GapAnalysis, Connecting)
                | (GapAnalysis, Done)
                | (ResendLoop, Connecting)
                | (ResendLoop, Done)
        )
    }
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use SessionState::*;

    #[test]
    fn initial_state_is_disconnected() {
        assert_eq!(SessionState::default(), Disconnected);
    }

    #[test]
    fn happy_path_transitions_are_legal() {
        assert!(Disconnected.can_transition(Connecting));
        assert!(Connecting.can_transition(Streaming));
        assert!(Streaming.can_transition(GapAnalysis));
        assert!(GapAnalysis.can_transition(Connecting));
        assert!(Connecting.can_transition(ResendLoop));
        assert!(ResendLoop.can_transition(Done));
    }

    #[test]
    fn gapless_run_skips_resend_loop() {
        assert!(GapAnalysis.can_transition(Done));
    }

    #[test]
    fn resend_loop_can_reconnect() {
        assert!(ResendLoop.can_transition(Connecting));
    }

    #[test]
    fn illegal_transitions_rejected() {
        assert!(!Disconnected.can_transition(Streaming));
        assert!(!Streaming.can_transition(ResendLoop));
        assert!(!Done.can_transition(Connecting));
        assert!(!GapAnalysis.can_transition(Streaming));
    }
}
