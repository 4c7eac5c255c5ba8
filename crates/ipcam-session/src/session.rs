//! Camera Session
//!
//! Binds one camera's configuration to its vendor adapter and correlator.
//! Request dispatch and reply delivery for the same session serialize on the
//! correlator lock; push callbacks never take it.

use crate::correlator::{Correlator, CorrelatorState, RequestTicket};
use crate::error::SessionError;
use crate::sink::{deliver, EventSink};
use crate::transport::Transport;
use ipcam_protocol::{
    AlarmEvent, CameraAdapter, CapabilityCommand, CommandPlan, PlanStep, RequestDescriptor,
    SessionConfig, Vendor,
};
use metrics::counter;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Default time to wait for a reply
pub const DEFAULT_RESPONSE_TIMEOUT_MS: u64 = 4000;

/// State for one camera
pub struct CameraSession {
    id: Uuid,
    config: SessionConfig,
    adapter: &'static dyn CameraAdapter,
    correlator: Mutex<Correlator>,
    response_timeout: Duration,
}

impl CameraSession {
    /// Create a session for the configured vendor
    pub fn new(config: SessionConfig) -> Self {
        let id = Uuid::new_v4();
        info!("Creating {} camera session {}", config.vendor, id);
        Self {
            id,
            adapter: config.vendor.adapter(),
            config,
            correlator: Mutex::new(Correlator::new()),
            response_timeout: Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS),
        }
    }

    /// Set how long to wait for a reply before giving up on it
    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = timeout;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn vendor(&self) -> Vendor {
        self.config.vendor
    }

    /// Current correlator state
    pub async fn state(&self) -> CorrelatorState {
        self.correlator.lock().await.state()
    }

    /// Build the request plan for a command without sending anything
    pub fn plan(&self, command: &CapabilityCommand) -> Result<CommandPlan, SessionError> {
        Ok(self.adapter.build_requests(command, &self.config)?)
    }

    /// Requests to cycle through when nothing more urgent is due
    pub fn low_priority_requests(&self) -> Vec<RequestDescriptor> {
        self.adapter.low_priority_requests(&self.config)
    }

    /// Record that `request` is about to be sent
    pub async fn begin_request(&self, request: &RequestDescriptor) -> RequestTicket {
        counter!("ipcam_requests_dispatched_total", "vendor" => self.vendor().as_str())
            .increment(1);
        let mut correlator = self.correlator.lock().await;
        let superseded = correlator.superseded_count();
        let ticket = correlator.dispatch(request.expects);
        if correlator.superseded_count() > superseded {
            counter!("ipcam_superseded_requests_total", "vendor" => self.vendor().as_str())
                .increment(1);
        }
        ticket
    }

    /// Requests whose reply never arrived before the next dispatch
    pub async fn superseded_requests(&self) -> u64 {
        self.correlator.lock().await.superseded_count()
    }

    /// Deliver the reply for `seq`; returns the number of events delivered.
    ///
    /// Stale replies are rejected without being parsed.
    pub async fn complete_request<S: EventSink + ?Sized>(
        &self,
        seq: u64,
        body: &str,
        sink: &S,
    ) -> Result<usize, SessionError> {
        let kind = match self.correlator.lock().await.complete(seq) {
            Ok(kind) => kind,
            Err(e) => {
                counter!("ipcam_stale_responses_total", "vendor" => self.vendor().as_str())
                    .increment(1);
                warn!("Session {}: dropping reply: {}", self.id, e);
                return Err(e);
            }
        };

        let parsed = self.adapter.parse_response(kind, body);
        for event in &parsed.events {
            deliver(sink, event);
        }
        if parsed.close_connection {
            sink.request_connection_close();
        }
        counter!("ipcam_responses_completed_total", "vendor" => self.vendor().as_str())
            .increment(1);
        debug!("Reply {} ({}) produced {} events", seq, kind, parsed.events.len());
        Ok(parsed.events.len())
    }

    /// Give up on `seq`; the next poll cycle will ask again
    pub async fn cancel_request(&self, seq: u64) -> bool {
        self.correlator.lock().await.cancel(seq)
    }

    /// Send one request and deliver its reply
    pub async fn send<T, S>(
        &self,
        request: &RequestDescriptor,
        transport: &T,
        sink: &S,
    ) -> Result<usize, SessionError>
    where
        T: Transport + ?Sized,
        S: EventSink + ?Sized,
    {
        self.send_with_timeout(request, self.response_timeout, transport, sink)
            .await
    }

    /// Like [`send`](Self::send), waiting at most `timeout` for the reply
    pub async fn send_with_timeout<T, S>(
        &self,
        request: &RequestDescriptor,
        timeout: Duration,
        transport: &T,
        sink: &S,
    ) -> Result<usize, SessionError>
    where
        T: Transport + ?Sized,
        S: EventSink + ?Sized,
    {
        let ticket = self.begin_request(request).await;

        let body = match tokio::time::timeout(timeout, transport.send_request(&request.path))
        .await
        {
            Ok(Ok(body)) => body,
            Ok(Err(e)) => {
                self.cancel_request(ticket.seq).await;
                return Err(e);
            }
            Err(_) => {
                self.cancel_request(ticket.seq).await;
                counter!("ipcam_response_timeouts_total", "vendor" => self.vendor().as_str())
                    .increment(1);
                return Err(SessionError::Timeout(timeout.as_millis() as u64));
            }
        };

        self.complete_request(ticket.seq, &body, sink).await
    }

    /// Execute a command: apply assumptions and send requests in plan order.
    ///
    /// Returns the number of events delivered, assumptions included. The
    /// first failing request aborts the remaining steps.
    pub async fn execute<T, S>(
        &self,
        command: &CapabilityCommand,
        transport: &T,
        sink: &S,
    ) -> Result<usize, SessionError>
    where
        T: Transport + ?Sized,
        S: EventSink + ?Sized,
    {
        let plan = self.plan(command)?;
        if plan.is_empty() {
            debug!("Session {}: nothing to send for {:?}", self.id, command);
            return Ok(0);
        }

        let mut delivered = 0;
        for step in &plan.steps {
            match step {
                PlanStep::Assume(event) => {
                    sink.apply_state_event(event);
                    delivered += 1;
                }
                PlanStep::Request(request) => {
                    delivered += self.send(request, transport, sink).await?;
                }
            }
        }
        Ok(delivered)
    }

    /// Decode a push callback and signal its alarm
    pub fn handle_push<S: EventSink + ?Sized>(&self, path: &str, sink: &S) -> Option<AlarmEvent> {
        let alarm = self.adapter.decode_push(path);
        let outcome = if alarm.is_some() { "alarm" } else { "ignored" };
        counter!(
            "ipcam_push_callbacks_total",
            "vendor" => self.vendor().as_str(),
            "outcome" => outcome
        )
        .increment(1);

        if let Some(alarm) = &alarm {
            sink.signal_alarm(alarm);
        }
        alarm
    }
}
