//! Outgoing Request Descriptors
//!
//! A capability command becomes a [`CommandPlan`]: an ordered list of HTTP
//! GET paths interleaved with local state assumptions. The order is part of
//! each vendor's contract and must be preserved by whoever executes the plan.

use crate::capability::{Channel, ChannelValue};
use crate::error::AdapterError;
use crate::event::StateEvent;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Which parser branch must handle the reply to a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ResponseKind {
    /// Reply carries no state of interest (set commands, user override URLs)
    Ack,
    /// Foscam `getDevState`: motion, sound and LED markers
    DeviceState,
    /// Foscam `getAudioAlarmConfig`: enable flag and sensitivity
    AudioAlarmConfig,
    /// Instar `getinfrared`
    InfraredConfig,
    /// Instar `getoverlayattr` for region 1
    TextOverlay,
    /// Instar `getmdattr`
    MotionDetection,
    /// Instar `getaudioalarmattr`
    AudioAlarm,
    /// Instar `getpirattr`
    PirSensor,
    /// Instar `getioattr`
    ExternalAlarmInput,
}

impl ResponseKind {
    pub const ALL: [ResponseKind; 9] = [
        ResponseKind::Ack,
        ResponseKind::DeviceState,
        ResponseKind::AudioAlarmConfig,
        ResponseKind::InfraredConfig,
        ResponseKind::TextOverlay,
        ResponseKind::MotionDetection,
        ResponseKind::AudioAlarm,
        ResponseKind::PirSensor,
        ResponseKind::ExternalAlarmInput,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ResponseKind::Ack => "ack",
            ResponseKind::DeviceState => "device-state",
            ResponseKind::AudioAlarmConfig => "audio-alarm-config",
            ResponseKind::InfraredConfig => "infrared-config",
            ResponseKind::TextOverlay => "text-overlay",
            ResponseKind::MotionDetection => "motion-detection",
            ResponseKind::AudioAlarm => "audio-alarm",
            ResponseKind::PirSensor => "pir-sensor",
            ResponseKind::ExternalAlarmInput => "external-alarm-input",
        }
    }
}

impl fmt::Display for ResponseKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResponseKind {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResponseKind::ALL
            .iter()
            .copied()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| AdapterError::UnknownResponseKind(s.to_string()))
    }
}

/// One HTTP GET to issue against the camera
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestDescriptor {
    /// Path and query, credentials already embedded where the vendor needs them
    pub path: String,
    /// Parser branch for the reply
    pub expects: ResponseKind,
}

impl RequestDescriptor {
    pub fn new(path: impl Into<String>, expects: ResponseKind) -> Self {
        Self {
            path: path.into(),
            expects,
        }
    }

    /// A request whose reply is ignored
    pub fn ack(path: impl Into<String>) -> Self {
        Self::new(path, ResponseKind::Ack)
    }
}

/// One step of a command plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "lowercase")]
pub enum PlanStep {
    /// Send this request and wait for its reply
    Request(RequestDescriptor),
    /// Apply this state locally before the camera confirms it
    Assume(StateEvent),
}

/// Ordered output of a request builder
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandPlan {
    pub steps: Vec<PlanStep>,
}

impl CommandPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan consisting of a single request
    pub fn single(request: RequestDescriptor) -> Self {
        Self::new().request(request)
    }

    /// Append a request
    pub fn request(mut self, request: RequestDescriptor) -> Self {
        self.steps.push(PlanStep::Request(request));
        self
    }

    /// Append a local state assumption
    pub fn assume(mut self, channel: Channel, value: ChannelValue) -> Self {
        self.steps.push(PlanStep::Assume(StateEvent::new(channel, value)));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Requests in issue order
    pub fn requests(&self) -> impl Iterator<Item = &RequestDescriptor> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Request(r) => Some(r),
            PlanStep::Assume(_) => None,
        })
    }

    /// Local assumptions in application order
    pub fn assumptions(&self) -> impl Iterator<Item = &StateEvent> {
        self.steps.iter().filter_map(|step| match step {
            PlanStep::Assume(e) => Some(e),
            PlanStep::Request(_) => None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_response_kind_names_parse_back() {
        for kind in ResponseKind::ALL {
            assert_eq!(kind.as_str().parse::<ResponseKind>().unwrap(), kind);
        }
        assert!("snapshot".parse::<ResponseKind>().is_err());
    }

    #[test]
    fn test_plan_preserves_interleaving() {
        let plan = CommandPlan::new()
            .request(RequestDescriptor::ack("/a"))
            .assume(Channel::AutoLed, ChannelValue::OFF)
            .request(RequestDescriptor::ack("/b"));

        assert_eq!(plan.len(), 3);
        let paths: Vec<_> = plan.requests().map(|r| r.path.as_str()).collect();
        assert_eq!(paths, ["/a", "/b"]);
        assert_eq!(plan.assumptions().count(), 1);
        assert!(matches!(plan.steps[1], PlanStep::Assume(_)));
    }
}
