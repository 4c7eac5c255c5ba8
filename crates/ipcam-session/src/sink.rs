//! Event Sink
//!
//! The runtime that owns channel state implements [`EventSink`]. Parsers
//! never touch it directly; the session delivers their events here.

use ipcam_protocol::{AdapterEvent, AlarmEvent, Channel, ChannelValue, DebounceGroup, StateEvent};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// Receiver of normalized events
pub trait EventSink: Send + Sync {
    /// Set a channel's state
    fn apply_state_event(&self, event: &StateEvent);

    /// An alarm fired
    fn signal_alarm(&self, alarm: &AlarmEvent);

    /// Clear the first-alarm / update-snapshot flags for a group
    fn reset_alarm_debounce(&self, group: DebounceGroup);

    /// The vendor finished its reply; the connection can be closed
    fn request_connection_close(&self);
}

/// Forward one parser event to the sink
pub fn deliver<S: EventSink + ?Sized>(sink: &S, event: &AdapterEvent) {
    match event {
        AdapterEvent::State(state) => sink.apply_state_event(state),
        AdapterEvent::Alarm(alarm) => sink.signal_alarm(alarm),
        AdapterEvent::ResetDebounce { group } => sink.reset_alarm_debounce(*group),
    }
}

/// Caller-owned alarm debounce flags
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AlarmDebounce {
    /// An alarm in this group already fired since the last reset
    pub first_alarm: bool,
    /// A fresh snapshot should be taken
    pub update_snapshot: bool,
}

#[derive(Debug, Default)]
struct StoreInner {
    channels: HashMap<Channel, ChannelValue>,
    debounce: HashMap<DebounceGroup, AlarmDebounce>,
    alarm_count: u64,
    close_requests: u64,
}

/// In-memory [`EventSink`] that keeps the latest value per channel
#[derive(Debug, Default)]
pub struct ChannelStateStore {
    inner: Mutex<StoreInner>,
}

impl ChannelStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, StoreInner> {
        // A panic while holding the lock leaves plain data behind; keep using it
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Latest value of a channel
    pub fn get(&self, channel: Channel) -> Option<ChannelValue> {
        self.lock().channels.get(&channel).cloned()
    }

    /// Debounce flags for a group
    pub fn debounce(&self, group: DebounceGroup) -> AlarmDebounce {
        self.lock().debounce.get(&group).copied().unwrap_or_default()
    }

    /// All known channel values, sorted by channel id
    pub fn snapshot(&self) -> Vec<(Channel, ChannelValue)> {
        let mut values: Vec<_> = self
            .lock()
            .channels
            .iter()
            .map(|(c, v)| (*c, v.clone()))
            .collect();
        values.sort_by_key(|(c, _)| c.id());
        values
    }

    /// Alarms signalled so far
    pub fn alarm_count(&self) -> u64 {
        self.lock().alarm_count
    }

    /// Connection close requests received so far
    pub fn close_requests(&self) -> u64 {
        self.lock().close_requests
    }
}

impl EventSink for ChannelStateStore {
    fn apply_state_event(&self, event: &StateEvent) {
        debug!("{} -> {}", event.channel, event.value);
        self.lock().channels.insert(event.channel, event.value.clone());
    }

    fn signal_alarm(&self, alarm: &AlarmEvent) {
        let mut inner = self.lock();
        inner.channels.insert(alarm.channel(), ChannelValue::ON);
        inner.alarm_count += 1;

        let flags = inner.debounce.entry(alarm.kind.debounce_group()).or_default();
        if !flags.first_alarm {
            info!("First {:?} alarm at {}", alarm.kind, alarm.occurred_at);
        }
        flags.first_alarm = true;
        flags.update_snapshot = true;
    }

    fn reset_alarm_debounce(&self, group: DebounceGroup) {
        self.lock().debounce.insert(group, AlarmDebounce::default());
    }

    fn request_connection_close(&self) {
        self.lock().close_requests += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ipcam_protocol::AlarmKind;

    #[test]
    fn test_alarm_sets_channel_and_flags() {
        let store = ChannelStateStore::new();
        store.signal_alarm(&AlarmEvent::now(AlarmKind::Pir));

        assert_eq!(store.get(Channel::PirAlarm), Some(ChannelValue::ON));
        // PIR shares the motion flags
        let flags = store.debounce(DebounceGroup::Motion);
        assert!(flags.first_alarm && flags.update_snapshot);
        assert_eq!(store.debounce(DebounceGroup::Audio), AlarmDebounce::default());
        assert_eq!(store.alarm_count(), 1);
    }

    #[test]
    fn test_reset_clears_flags() {
        let store = ChannelStateStore::new();
        store.signal_alarm(&AlarmEvent::now(AlarmKind::Audio));
        deliver(&store, &AdapterEvent::ResetDebounce { group: DebounceGroup::Audio });
        assert_eq!(store.debounce(DebounceGroup::Audio), AlarmDebounce::default());
    }

    #[test]
    fn test_snapshot_sorted() {
        let store = ChannelStateStore::new();
        store.apply_state_event(&StateEvent::new(Channel::EnablePirAlarm, ChannelValue::ON));
        store.apply_state_event(&StateEvent::new(Channel::AutoLed, ChannelValue::OFF));
        let channels: Vec<_> = store.snapshot().into_iter().map(|(c, _)| c).collect();
        assert_eq!(channels, [Channel::AutoLed, Channel::EnablePirAlarm]);
    }
}
