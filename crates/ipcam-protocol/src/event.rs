//! Normalized Events
//!
//! What parsers and push decoders hand back to the caller. The caller owns
//! channel state and the alarm debounce flags; events only describe changes.

use crate::capability::{Channel, ChannelValue};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A channel state update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEvent {
    pub channel: Channel,
    pub value: ChannelValue,
}

impl StateEvent {
    pub fn new(channel: Channel, value: ChannelValue) -> Self {
        Self { channel, value }
    }
}

/// Alarm channels a camera can fire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlarmKind {
    Motion,
    Audio,
    Pir,
}

impl AlarmKind {
    /// Channel that reports the fired state
    pub fn channel(&self) -> Channel {
        match self {
            AlarmKind::Motion => Channel::MotionAlarm,
            AlarmKind::Audio => Channel::AudioAlarm,
            AlarmKind::Pir => Channel::PirAlarm,
        }
    }

    /// Debounce flags this alarm shares with the caller
    pub fn debounce_group(&self) -> DebounceGroup {
        match self {
            AlarmKind::Motion | AlarmKind::Pir => DebounceGroup::Motion,
            AlarmKind::Audio => DebounceGroup::Audio,
        }
    }
}

/// Caller-owned "first alarm" / "update snapshot" flag pairs.
///
/// PIR shares the motion pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DebounceGroup {
    Motion,
    Audio,
}

/// An alarm occurrence
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmEvent {
    pub kind: AlarmKind,
    pub occurred_at: DateTime<Utc>,
}

impl AlarmEvent {
    /// Alarm that occurred now
    pub fn now(kind: AlarmKind) -> Self {
        Self {
            kind,
            occurred_at: Utc::now(),
        }
    }

    pub fn channel(&self) -> Channel {
        self.kind.channel()
    }
}

/// Anything a response parser can ask the caller to do
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum AdapterEvent {
    /// Set a channel's state
    State(StateEvent),
    /// An alarm fired
    Alarm(AlarmEvent),
    /// Clear the caller's debounce flags for a group
    ResetDebounce { group: DebounceGroup },
}

/// Result of parsing one response body
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedResponse {
    /// Events in discovery order
    pub events: Vec<AdapterEvent>,
    /// The vendor signalled end of transmission; the transport should close
    pub close_connection: bool,
}

impl ParsedResponse {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn state(&mut self, channel: Channel, value: ChannelValue) {
        self.events
            .push(AdapterEvent::State(StateEvent::new(channel, value)));
    }

    pub fn alarm(&mut self, kind: AlarmKind) {
        self.events.push(AdapterEvent::Alarm(AlarmEvent::now(kind)));
    }

    pub fn reset_debounce(&mut self, group: DebounceGroup) {
        self.events.push(AdapterEvent::ResetDebounce { group });
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    /// State updates only, in order
    pub fn state_events(&self) -> Vec<&StateEvent> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AdapterEvent::State(s) => Some(s),
                _ => None,
            })
            .collect()
    }

    /// Alarm kinds only, in order
    pub fn alarms(&self) -> Vec<AlarmKind> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AdapterEvent::Alarm(a) => Some(a.kind),
                _ => None,
            })
            .collect()
    }

    /// Debounce groups reset by this response
    pub fn debounce_resets(&self) -> Vec<DebounceGroup> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AdapterEvent::ResetDebounce { group } => Some(*group),
                _ => None,
            })
            .collect()
    }
}
