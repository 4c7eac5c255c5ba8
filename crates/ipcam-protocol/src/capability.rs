//! Capability Model
//!
//! The vendor-neutral vocabulary: channels, their values, and the commands
//! that can be issued against them.

use crate::error::AdapterError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Normalized camera channels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Channel {
    /// Motion detection armed
    EnableMotionAlarm,
    /// Motion alarm fired
    MotionAlarm,
    /// Audio detection armed
    EnableAudioAlarm,
    /// Audio alarm fired
    AudioAlarm,
    /// Audio alarm sensitivity (percent)
    #[serde(rename = "thresholdAudioAlarm")]
    AudioThreshold,
    /// Infrared LED forced on/off
    #[serde(rename = "enableLED")]
    EnableLed,
    /// Infrared LED in automatic mode
    #[serde(rename = "autoLED")]
    AutoLed,
    /// On-screen text overlay
    TextOverlay,
    /// PIR sensor armed
    EnablePirAlarm,
    /// PIR alarm fired
    PirAlarm,
    /// External alarm input armed
    EnableExternalAlarmInput,
}

impl Channel {
    /// All channels, in declaration order
    pub const ALL: [Channel; 11] = [
        Channel::EnableMotionAlarm,
        Channel::MotionAlarm,
        Channel::EnableAudioAlarm,
        Channel::AudioAlarm,
        Channel::AudioThreshold,
        Channel::EnableLed,
        Channel::AutoLed,
        Channel::TextOverlay,
        Channel::EnablePirAlarm,
        Channel::PirAlarm,
        Channel::EnableExternalAlarmInput,
    ];

    /// Get the channel id used by the event bus
    pub fn id(&self) -> &'static str {
        match self {
            Channel::EnableMotionAlarm => "enableMotionAlarm",
            Channel::MotionAlarm => "motionAlarm",
            Channel::EnableAudioAlarm => "enableAudioAlarm",
            Channel::AudioAlarm => "audioAlarm",
            Channel::AudioThreshold => "thresholdAudioAlarm",
            Channel::EnableLed => "enableLED",
            Channel::AutoLed => "autoLED",
            Channel::TextOverlay => "textOverlay",
            Channel::EnablePirAlarm => "enablePirAlarm",
            Channel::PirAlarm => "pirAlarm",
            Channel::EnableExternalAlarmInput => "enableExternalAlarmInput",
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for Channel {
    type Err = AdapterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Channel::ALL
            .iter()
            .copied()
            .find(|c| c.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| AdapterError::UnknownChannel(s.to_string()))
    }
}

/// A percentage in 0..=100
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Percent(u8);

impl Percent {
    pub const MIN: Percent = Percent(0);
    pub const MAX: Percent = Percent(100);

    /// Round half-up and clamp into 0..=100; NaN and infinities are rejected
    pub fn from_f64(value: f64) -> Result<Self, AdapterError> {
        if !value.is_finite() {
            return Err(AdapterError::InvalidCommand(format!(
                "percent value {} is not a finite number",
                value
            )));
        }
        let rounded = (value + 0.5).floor().clamp(0.0, 100.0);
        Ok(Percent(rounded as u8))
    }

    /// Clamp an integer into 0..=100
    pub fn saturating(value: u32) -> Self {
        Percent(value.min(100) as u8)
    }

    pub fn value(&self) -> u8 {
        self.0
    }
}

impl fmt::Display for Percent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Three-level sensitivity used by firmwares without a raw threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdBucket {
    /// 0
    Disabled,
    /// 1..=33
    Low,
    /// 34..=66
    Medium,
    /// 67..=100
    High,
}

impl ThresholdBucket {
    /// Bucket a percentage
    pub fn from_percent(percent: Percent) -> Self {
        match percent.value() {
            0 => ThresholdBucket::Disabled,
            1..=33 => ThresholdBucket::Low,
            34..=66 => ThresholdBucket::Medium,
            _ => ThresholdBucket::High,
        }
    }

    /// Bucket a raw command value (round half-up, then clamp)
    pub fn from_value(value: f64) -> Result<Self, AdapterError> {
        Percent::from_f64(value).map(Self::from_percent)
    }

    /// Upper boundary of the bucket's range
    pub fn boundary(&self) -> Percent {
        match self {
            ThresholdBucket::Disabled => Percent(0),
            ThresholdBucket::Low => Percent(33),
            ThresholdBucket::Medium => Percent(66),
            ThresholdBucket::High => Percent(100),
        }
    }

    /// Percentage reported back to the state sink for this bucket.
    ///
    /// Re-bucketing the reported value yields the same bucket. A plain 0/50/100
    /// reading of Foscam's three sensitivity levels would report Low as 0,
    /// which is the Disabled bucket, so Low reports its upper boundary, 33.
    pub fn reported_percent(&self) -> Percent {
        match self {
            ThresholdBucket::Disabled => Percent(0),
            ThresholdBucket::Low => Percent(33),
            ThresholdBucket::Medium => Percent(50),
            ThresholdBucket::High => Percent(100),
        }
    }
}

/// Value carried by a channel state update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ChannelValue {
    OnOff(bool),
    Percent(Percent),
    Text(String),
    /// State is unknown until the camera reports it again
    Undef,
}

impl ChannelValue {
    pub const ON: ChannelValue = ChannelValue::OnOff(true);
    pub const OFF: ChannelValue = ChannelValue::OnOff(false);
}

impl fmt::Display for ChannelValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelValue::OnOff(true) => f.write_str("ON"),
            ChannelValue::OnOff(false) => f.write_str("OFF"),
            ChannelValue::Percent(p) => write!(f, "{}", p),
            ChannelValue::Text(t) => f.write_str(t),
            ChannelValue::Undef => f.write_str("UNDEF"),
        }
    }
}

/// A vendor-neutral command addressed to one channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum CapabilityCommand {
    MotionAlarmEnable(bool),
    AudioAlarmEnable(bool),
    /// Raw threshold as received; validated when requests are built
    AudioThreshold(f64),
    InfraredLed(bool),
    InfraredAutoLed(bool),
    TextOverlay(String),
    PirAlarmEnable(bool),
    ExternalAlarmEnable(bool),
    /// Ask the camera to report the channel's current state
    Refresh(Channel),
}

/// Text form of the refresh command on the event bus
pub const REFRESH: &str = "REFRESH";

impl CapabilityCommand {
    /// Channel the command addresses
    pub fn channel(&self) -> Channel {
        match self {
            CapabilityCommand::MotionAlarmEnable(_) => Channel::EnableMotionAlarm,
            CapabilityCommand::AudioAlarmEnable(_) => Channel::EnableAudioAlarm,
            CapabilityCommand::AudioThreshold(_) => Channel::AudioThreshold,
            CapabilityCommand::InfraredLed(_) => Channel::EnableLed,
            CapabilityCommand::InfraredAutoLed(_) => Channel::AutoLed,
            CapabilityCommand::TextOverlay(_) => Channel::TextOverlay,
            CapabilityCommand::PirAlarmEnable(_) => Channel::EnablePirAlarm,
            CapabilityCommand::ExternalAlarmEnable(_) => Channel::EnableExternalAlarmInput,
            CapabilityCommand::Refresh(channel) => *channel,
        }
    }

    /// Build a command from its event-bus text form
    pub fn from_text(channel: Channel, text: &str) -> Result<Self, AdapterError> {
        if text == REFRESH {
            return Ok(CapabilityCommand::Refresh(channel));
        }
        let command = match channel {
            Channel::EnableMotionAlarm => CapabilityCommand::MotionAlarmEnable(parse_on_off(text)?),
            Channel::EnableAudioAlarm => CapabilityCommand::AudioAlarmEnable(parse_on_off(text)?),
            Channel::AudioThreshold => {
                let value = text.trim().parse::<f64>().map_err(|_| {
                    AdapterError::InvalidCommand(format!("threshold {:?} is not a number", text))
                })?;
                CapabilityCommand::AudioThreshold(value)
            }
            Channel::EnableLed => CapabilityCommand::InfraredLed(parse_on_off(text)?),
            Channel::AutoLed => CapabilityCommand::InfraredAutoLed(parse_on_off(text)?),
            Channel::TextOverlay => CapabilityCommand::TextOverlay(text.to_string()),
            Channel::EnablePirAlarm => CapabilityCommand::PirAlarmEnable(parse_on_off(text)?),
            Channel::EnableExternalAlarmInput => {
                CapabilityCommand::ExternalAlarmEnable(parse_on_off(text)?)
            }
            Channel::MotionAlarm | Channel::AudioAlarm | Channel::PirAlarm => {
                return Err(AdapterError::InvalidCommand(format!(
                    "{} is read-only and only accepts {}",
                    channel, REFRESH
                )))
            }
        };
        Ok(command)
    }
}

fn parse_on_off(text: &str) -> Result<bool, AdapterError> {
    match text.trim() {
        "ON" | "1" => Ok(true),
        "OFF" | "0" => Ok(false),
        other => Err(AdapterError::InvalidCommand(format!(
            "expected ON/OFF, got {:?}",
            other
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_threshold_bucket_edges() {
        let cases = [
            (0.0, ThresholdBucket::Disabled),
            (1.0, ThresholdBucket::Low),
            (33.0, ThresholdBucket::Low),
            (34.0, ThresholdBucket::Medium),
            (66.0, ThresholdBucket::Medium),
            (67.0, ThresholdBucket::High),
            (100.0, ThresholdBucket::High),
        ];
        for (value, expected) in cases {
            assert_eq!(ThresholdBucket::from_value(value).unwrap(), expected, "value {}", value);
        }
    }

    #[test]
    fn test_threshold_round_half_up() {
        assert_eq!(ThresholdBucket::from_value(0.4).unwrap(), ThresholdBucket::Disabled);
        assert_eq!(ThresholdBucket::from_value(0.5).unwrap(), ThresholdBucket::Low);
        assert_eq!(ThresholdBucket::from_value(33.5).unwrap(), ThresholdBucket::Medium);
        assert_eq!(ThresholdBucket::from_value(66.49).unwrap(), ThresholdBucket::Medium);
    }

    #[test]
    fn test_threshold_rejects_nan() {
        assert!(matches!(
            ThresholdBucket::from_value(f64::NAN),
            Err(AdapterError::InvalidCommand(_))
        ));
        assert!(ThresholdBucket::from_value(f64::INFINITY).is_err());
    }

    #[test]
    fn test_percent_clamps() {
        assert_eq!(Percent::from_f64(-12.0).unwrap(), Percent::MIN);
        assert_eq!(Percent::from_f64(250.0).unwrap(), Percent::MAX);
        assert_eq!(Percent::saturating(400), Percent::MAX);
    }

    #[test]
    fn test_bucket_boundaries_are_fixed_points() {
        for bucket in [
            ThresholdBucket::Disabled,
            ThresholdBucket::Low,
            ThresholdBucket::Medium,
            ThresholdBucket::High,
        ] {
            assert_eq!(ThresholdBucket::from_percent(bucket.boundary()), bucket);
            assert_eq!(ThresholdBucket::from_percent(bucket.reported_percent()), bucket);
        }
    }

    #[test]
    fn test_channel_ids_parse_back() {
        for channel in Channel::ALL {
            assert_eq!(channel.id().parse::<Channel>().unwrap(), channel);
        }
        assert!("zoom".parse::<Channel>().is_err());
    }

    #[test]
    fn test_command_from_text() {
        assert_eq!(
            CapabilityCommand::from_text(Channel::EnableMotionAlarm, "ON").unwrap(),
            CapabilityCommand::MotionAlarmEnable(true)
        );
        assert_eq!(
            CapabilityCommand::from_text(Channel::EnableLed, "0").unwrap(),
            CapabilityCommand::InfraredLed(false)
        );
        assert_eq!(
            CapabilityCommand::from_text(Channel::AudioThreshold, "42.5").unwrap(),
            CapabilityCommand::AudioThreshold(42.5)
        );
        assert!(CapabilityCommand::from_text(Channel::EnablePirAlarm, "maybe").is_err());
        assert!(CapabilityCommand::from_text(Channel::MotionAlarm, "ON").is_err());
    }

    #[test]
    fn test_refresh_compares_by_value() {
        // Built at runtime so it is a distinct allocation from the constant
        let text: String = ["REF", "RESH"].concat();
        assert_eq!(
            CapabilityCommand::from_text(Channel::MotionAlarm, &text).unwrap(),
            CapabilityCommand::Refresh(Channel::MotionAlarm)
        );
    }

    proptest! {
        #[test]
        fn prop_bucketing_is_deterministic(v in 0.0f64..=100.0) {
            let first = ThresholdBucket::from_value(v).unwrap();
            prop_assert_eq!(first, ThresholdBucket::from_value(v).unwrap());
            prop_assert_eq!(ThresholdBucket::from_percent(first.boundary()), first);
        }

        #[test]
        fn prop_bucketing_is_monotonic(a in 0u32..=100, b in 0u32..=100) {
            let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
            let rank = |bucket: ThresholdBucket| bucket.boundary().value();
            prop_assert!(
                rank(ThresholdBucket::from_percent(Percent::saturating(lo)))
                    <= rank(ThresholdBucket::from_percent(Percent::saturating(hi)))
            );
        }
    }
}
