//! Low-Priority Poll Scheduler
//!
//! Cycles through a vendor's auxiliary state requests one per tick.

use crate::error::SessionError;
use crate::session::{CameraSession, DEFAULT_RESPONSE_TIMEOUT_MS};
use crate::sink::EventSink;
use crate::transport::Transport;
use ipcam_protocol::RequestDescriptor;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

/// Configuration for the poll scheduler
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PollConfig {
    /// Time between low-priority requests in milliseconds
    pub tick_interval_ms: u64,
    /// Time to wait for each reply in milliseconds
    pub response_timeout_ms: u64,
    /// Consecutive failures before a warning is logged
    pub max_failures: u8,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 2000,
            response_timeout_ms: DEFAULT_RESPONSE_TIMEOUT_MS,
            max_failures: 3,
        }
    }
}

impl PollConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn response_timeout(&self) -> Duration {
        Duration::from_millis(self.response_timeout_ms)
    }
}

/// Restartable cyclic cursor over a fixed request list
#[derive(Debug, Clone)]
pub struct PollCycle {
    requests: Vec<RequestDescriptor>,
    position: usize,
}

impl PollCycle {
    pub fn new(requests: Vec<RequestDescriptor>) -> Self {
        Self {
            requests,
            position: 0,
        }
    }

    /// Next request, wrapping around at the end
    pub fn next_request(&mut self) -> Option<&RequestDescriptor> {
        if self.requests.is_empty() {
            return None;
        }
        let index = self.position % self.requests.len();
        self.position = (index + 1) % self.requests.len();
        self.requests.get(index)
    }

    /// Start again from the first request
    pub fn reset(&mut self) {
        self.position = 0;
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }
}

/// Drives a session's low-priority polling
pub struct Poller {
    config: PollConfig,
    cycle: PollCycle,
    failures: u8,
}

impl Poller {
    /// Create a poller over the session's low-priority requests
    pub fn new(session: &CameraSession, config: PollConfig) -> Self {
        let cycle = PollCycle::new(session.low_priority_requests());
        info!(
            "Poller for session {} created with {} requests",
            session.id(),
            cycle.len()
        );
        Self {
            config,
            cycle,
            failures: 0,
        }
    }

    /// Send the next request in the cycle.
    ///
    /// A failed or timed-out poll is skipped; the cycle moves on regardless.
    pub async fn poll_once<T, S>(
        &mut self,
        session: &CameraSession,
        transport: &T,
        sink: &S,
    ) -> Result<usize, SessionError>
    where
        T: Transport + ?Sized,
        S: EventSink + ?Sized,
    {
        let request = match self.cycle.next_request() {
            Some(request) => request.clone(),
            None => return Ok(0),
        };
        debug!("Polling {}", request.path);

        match session
            .send_with_timeout(&request, self.config.response_timeout(), transport, sink)
            .await
        {
            Ok(events) => {
                self.failures = 0;
                Ok(events)
            }
            Err(e) => {
                self.failures = self.failures.saturating_add(1);
                warn!("Poll {} failed (attempt {}): {}", request.path, self.failures, e);
                if self.failures >= self.config.max_failures {
                    warn!("Camera session {} keeps failing low-priority polls", session.id());
                }
                Err(e)
            }
        }
    }

    /// Poll until `shutdown` becomes true
    pub async fn run<T, S>(
        &mut self,
        session: &CameraSession,
        transport: &T,
        sink: &S,
        mut shutdown: watch::Receiver<bool>,
    ) -> Result<(), SessionError>
    where
        T: Transport + ?Sized,
        S: EventSink + ?Sized,
    {
        if self.cycle.is_empty() {
            info!("No low-priority requests for session {}", session.id());
            return Ok(());
        }
        info!("Starting poller for session {}", session.id());

        let mut ticker = tokio::time::interval(self.config.tick_interval());
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    // Errors are already logged; the next tick carries on
                    let _ = self.poll_once(session, transport, sink).await;
                }
            }
        }

        info!("Poller for session {} stopped", session.id());
        Ok(())
    }

    /// Consecutive failed polls
    pub fn failures(&self) -> u8 {
        self.failures
    }

    pub fn request_count(&self) -> usize {
        self.cycle.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sink::ChannelStateStore;
    use async_trait::async_trait;
    use ipcam_protocol::{Channel, ChannelValue, ResponseKind, SessionConfig, Vendor};
    use std::sync::Mutex;

    /// Answers every INSTAR poll with a fixed set of variables
    #[derive(Default)]
    struct InstarCamera {
        sent: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Transport for InstarCamera {
        async fn send_request(&self, path: &str) -> Result<String, SessionError> {
            self.sent.lock().unwrap().push(path.to_string());
            if path.contains("getioattr") {
                return Err(SessionError::Transport("connection reset".to_string()));
            }
            Ok("var aa_enable=\"1\";\r\nvar aa_value=\"40\";\r\nvar m1_enable=\"0\";\r\n\
                var infraredstat=\"auto\";\r\nvar show_1=\"1\";\r\nvar name_1=\"Yard\";\r\n\
                var pir_enable=\"1\";\r\n"
                .to_string())
        }
    }

    /// Never answers
    struct SilentCamera;

    #[async_trait]
    impl Transport for SilentCamera {
        async fn send_request(&self, _path: &str) -> Result<String, SessionError> {
            std::future::pending::<Result<String, SessionError>>().await
        }
    }

    #[test]
    fn test_cycle_wraps() {
        let mut cycle = PollCycle::new(vec![
            RequestDescriptor::new("/a", ResponseKind::Ack),
            RequestDescriptor::new("/b", ResponseKind::Ack),
        ]);
        let order: Vec<_> = (0..5)
            .map(|_| cycle.next_request().unwrap().path.clone())
            .collect();
        assert_eq!(order, ["/a", "/b", "/a", "/b", "/a"]);

        cycle.reset();
        assert_eq!(cycle.next_request().unwrap().path, "/a");
    }

    #[test]
    fn test_empty_cycle() {
        let mut cycle = PollCycle::new(Vec::new());
        assert!(cycle.next_request().is_none());
    }

    #[tokio::test]
    async fn test_full_instar_cycle() {
        let session = CameraSession::new(SessionConfig::new(Vendor::Instar, "", ""));
        let camera = InstarCamera::default();
        let sink = ChannelStateStore::new();
        let mut poller = Poller::new(&session, PollConfig::default());
        assert_eq!(poller.request_count(), 6);

        for _ in 0..5 {
            poller.poll_once(&session, &camera, &sink).await.unwrap();
        }
        assert!(poller.poll_once(&session, &camera, &sink).await.is_err());
        assert_eq!(poller.failures(), 1);

        assert_eq!(sink.get(Channel::EnableAudioAlarm), Some(ChannelValue::ON));
        assert_eq!(sink.get(Channel::EnableMotionAlarm), Some(ChannelValue::OFF));
        assert_eq!(sink.get(Channel::AutoLed), Some(ChannelValue::ON));
        assert_eq!(
            sink.get(Channel::TextOverlay),
            Some(ChannelValue::Text("Yard".to_string()))
        );
        assert_eq!(sink.get(Channel::EnablePirAlarm), Some(ChannelValue::ON));
        assert_eq!(sink.get(Channel::EnableExternalAlarmInput), None);

        // Wrapped back to the first request, failure counter resets
        poller.poll_once(&session, &camera, &sink).await.unwrap();
        assert_eq!(poller.failures(), 0);
        let sent = camera.sent.lock().unwrap().clone();
        assert_eq!(sent.first(), sent.last());
    }

    #[tokio::test(start_paused = true)]
    async fn test_poll_uses_configured_timeout() {
        let session = CameraSession::new(SessionConfig::new(Vendor::Instar, "", ""));
        let sink = ChannelStateStore::new();
        let mut poller = Poller::new(
            &session,
            PollConfig {
                response_timeout_ms: 100,
                ..Default::default()
            },
        );

        let started = tokio::time::Instant::now();
        let result = poller.poll_once(&session, &SilentCamera, &sink).await;
        assert!(matches!(result, Err(SessionError::Timeout(100))), "{:?}", result);
        assert!(started.elapsed() < Duration::from_millis(DEFAULT_RESPONSE_TIMEOUT_MS));
        assert_eq!(poller.failures(), 1);
        assert_eq!(session.state().await, crate::correlator::CorrelatorState::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let session = CameraSession::new(SessionConfig::new(Vendor::Foscam, "admin", "pw"));
        let camera = InstarCamera::default();
        let sink = ChannelStateStore::new();
        let mut poller = Poller::new(
            &session,
            PollConfig {
                tick_interval_ms: 100,
                ..Default::default()
            },
        );
        let (tx, rx) = watch::channel(false);

        let stopper = async {
            tokio::time::sleep(Duration::from_millis(350)).await;
            tx.send(true).unwrap();
        };
        let (result, _) = tokio::join!(poller.run(&session, &camera, &sink, rx), stopper);

        assert!(result.is_ok());
        let sent = camera.sent.lock().unwrap().len();
        assert!((3..=5).contains(&sent), "sent {}", sent);
    }
}
