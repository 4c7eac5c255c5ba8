//! IP Camera Sessions
//!
//! Per-camera runtime around the vendor adapters: correlates replies with
//! the request that produced them, cycles low-priority polls, and delivers
//! parsed events to an [`EventSink`] owned by the caller.

mod correlator;
mod error;
mod scheduler;
mod session;
mod sink;
mod transport;

pub use correlator::{Correlator, CorrelatorState, RequestTicket};
pub use error::SessionError;
pub use scheduler::{PollConfig, PollCycle, Poller};
pub use session::{CameraSession, DEFAULT_RESPONSE_TIMEOUT_MS};
pub use sink::{deliver, AlarmDebounce, ChannelStateStore, EventSink};
pub use transport::Transport;
