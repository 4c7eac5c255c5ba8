//! Request/Response Correlator
//!
//! The transport hands back reply bodies without saying which request they
//! answer. Each dispatch is stamped with a sequence number and the reply must
//! present the same number; anything else is stale and rejected.

use crate::error::SessionError;
use ipcam_protocol::ResponseKind;
use tracing::{debug, warn};

/// Identity of a dispatched request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RequestTicket {
    /// Monotonically increasing per session, starting at 1
    pub seq: u64,
    /// Parser branch for the reply
    pub kind: ResponseKind,
}

/// Correlator state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CorrelatorState {
    /// Nothing outstanding
    #[default]
    Idle,
    /// One request outstanding
    Awaiting(RequestTicket),
}

/// Single-slot correlator for one camera session
#[derive(Debug, Default)]
pub struct Correlator {
    state: CorrelatorState,
    last_seq: u64,
    superseded: u64,
}

impl Correlator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a dispatch. An outstanding expectation is replaced.
    pub fn dispatch(&mut self, kind: ResponseKind) -> RequestTicket {
        self.last_seq += 1;
        let ticket = RequestTicket {
            seq: self.last_seq,
            kind,
        };

        if let CorrelatorState::Awaiting(previous) = self.state {
            self.superseded += 1;
            warn!(
                "Request {} ({}) superseded by {} before its reply arrived",
                previous.seq, previous.kind, ticket.seq
            );
        }

        debug!("Awaiting reply {} ({})", ticket.seq, kind);
        self.state = CorrelatorState::Awaiting(ticket);
        ticket
    }

    /// Accept the reply for `seq` and return to idle.
    ///
    /// A reply for any other sequence number leaves the state untouched.
    pub fn complete(&mut self, seq: u64) -> Result<ResponseKind, SessionError> {
        match self.state {
            CorrelatorState::Awaiting(ticket) if ticket.seq == seq => {
                self.state = CorrelatorState::Idle;
                Ok(ticket.kind)
            }
            CorrelatorState::Awaiting(ticket) => Err(SessionError::StaleResponse {
                seq,
                awaiting: Some(ticket.seq),
            }),
            CorrelatorState::Idle => Err(SessionError::StaleResponse {
                seq,
                awaiting: None,
            }),
        }
    }

    /// Drop the expectation for `seq` (transport timeout or failure).
    ///
    /// Returns false when `seq` is no longer the outstanding request.
    pub fn cancel(&mut self, seq: u64) -> bool {
        match self.state {
            CorrelatorState::Awaiting(ticket) if ticket.seq == seq => {
                self.state = CorrelatorState::Idle;
                true
            }
            _ => false,
        }
    }

    pub fn state(&self) -> CorrelatorState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == CorrelatorState::Idle
    }

    /// Number of expectations overwritten by a newer dispatch
    pub fn superseded_count(&self) -> u64 {
        self.superseded
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dispatch_then_complete() {
        let mut correlator = Correlator::new();
        assert!(correlator.is_idle());

        let ticket = correlator.dispatch(ResponseKind::MotionDetection);
        assert_eq!(ticket.seq, 1);
        assert_eq!(correlator.state(), CorrelatorState::Awaiting(ticket));

        assert_eq!(correlator.complete(ticket.seq).unwrap(), ResponseKind::MotionDetection);
        assert!(correlator.is_idle());
    }

    #[test]
    fn test_sequential_requests_never_cross() {
        let mut correlator = Correlator::new();

        let a = correlator.dispatch(ResponseKind::AudioAlarm);
        assert_eq!(correlator.complete(a.seq).unwrap(), ResponseKind::AudioAlarm);

        let b = correlator.dispatch(ResponseKind::PirSensor);
        assert_ne!(a.seq, b.seq);
        assert_eq!(correlator.complete(b.seq).unwrap(), ResponseKind::PirSensor);

        // A's reply arriving again must not be parsed as anything
        assert!(matches!(
            correlator.complete(a.seq),
            Err(SessionError::StaleResponse { awaiting: None, .. })
        ));
    }

    #[test]
    fn test_overlap_rejects_late_reply() {
        let mut correlator = Correlator::new();

        let a = correlator.dispatch(ResponseKind::AudioAlarm);
        let b = correlator.dispatch(ResponseKind::TextOverlay);
        assert_eq!(correlator.superseded_count(), 1);

        match correlator.complete(a.seq) {
            Err(SessionError::StaleResponse { seq, awaiting }) => {
                assert_eq!(seq, a.seq);
                assert_eq!(awaiting, Some(b.seq));
            }
            other => panic!("expected stale response, got {:?}", other),
        }
        // B is still awaited
        assert_eq!(correlator.complete(b.seq).unwrap(), ResponseKind::TextOverlay);
    }

    #[test]
    fn test_cancel_only_current() {
        let mut correlator = Correlator::new();
        let a = correlator.dispatch(ResponseKind::Ack);
        let b = correlator.dispatch(ResponseKind::Ack);

        assert!(!correlator.cancel(a.seq));
        assert!(!correlator.is_idle());
        assert!(correlator.cancel(b.seq));
        assert!(correlator.is_idle());
        assert!(!correlator.cancel(b.seq));
    }
}
