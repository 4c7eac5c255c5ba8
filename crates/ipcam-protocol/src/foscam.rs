//! Foscam CGIProxy dialect
//!
//! Every request carries `usr`/`pwd` in the query. Replies are XML wrapped in
//! `<CGI_Result>`; the closing tag tells the transport it can drop the
//! connection. Alarms are only seen by polling `getDevState`.

use crate::capability::{CapabilityCommand, Channel, ChannelValue, ThresholdBucket};
use crate::config::SessionConfig;
use crate::error::AdapterError;
use crate::event::{AlarmEvent, AlarmKind, ParsedResponse};
use crate::marker::tag_value;
use crate::request::{CommandPlan, RequestDescriptor, ResponseKind};
use crate::vendor::{CameraAdapter, Vendor};
use tracing::{debug, trace};

const CGI_PATH: &str = "/cgi-bin/CGIProxy.fcgi?cmd=";

/// End-of-transmission marker
const END_OF_RESULT: &str = "</CGI_Result>";

/// Foscam adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct Foscam;

impl Foscam {
    fn cgi(&self, cmd: &str, config: &SessionConfig) -> String {
        format!(
            "{}{}&usr={}&pwd={}",
            CGI_PATH, cmd, config.username, config.password
        )
    }

    fn ack(&self, cmd: &str, config: &SessionConfig) -> RequestDescriptor {
        RequestDescriptor::ack(self.cgi(cmd, config))
    }

    fn refresh(&self, channel: Channel, config: &SessionConfig) -> CommandPlan {
        match channel {
            Channel::AudioThreshold | Channel::EnableAudioAlarm => CommandPlan::single(
                RequestDescriptor::new(
                    self.cgi("getAudioAlarmConfig", config),
                    ResponseKind::AudioAlarmConfig,
                ),
            ),
            Channel::EnableMotionAlarm => CommandPlan::single(RequestDescriptor::new(
                self.cgi("getDevState", config),
                ResponseKind::DeviceState,
            )),
            _ => CommandPlan::new(),
        }
    }

    fn parse_device_state(&self, body: &str, out: &mut ParsedResponse) {
        match tag_value(body, "motionDetectAlarm") {
            Some("0") => out.state(Channel::EnableMotionAlarm, ChannelValue::OFF),
            Some(code @ ("1" | "2")) => {
                alarm_armed(out, code == "2", Channel::EnableMotionAlarm, AlarmKind::Motion)
            }
            other => trace!("motionDetectAlarm skipped: {:?}", other),
        }

        match tag_value(body, "soundAlarm") {
            Some("0") => {
                out.state(Channel::EnableAudioAlarm, ChannelValue::OFF);
                out.state(Channel::AudioAlarm, ChannelValue::OFF);
            }
            Some(code @ ("1" | "2")) => {
                alarm_armed(out, code == "2", Channel::EnableAudioAlarm, AlarmKind::Audio)
            }
            other => trace!("soundAlarm skipped: {:?}", other),
        }

        match tag_value(body, "infraLedState") {
            Some("0") => out.state(Channel::EnableLed, ChannelValue::OFF),
            Some("1") => out.state(Channel::EnableLed, ChannelValue::ON),
            other => trace!("infraLedState skipped: {:?}", other),
        }
    }

    fn parse_audio_config(&self, body: &str, out: &mut ParsedResponse) {
        match tag_value(body, "isEnable") {
            Some("0") => {
                out.state(Channel::EnableAudioAlarm, ChannelValue::OFF);
                out.state(
                    Channel::AudioThreshold,
                    ChannelValue::Percent(ThresholdBucket::Disabled.reported_percent()),
                );
                return;
            }
            Some("1") => out.state(Channel::EnableAudioAlarm, ChannelValue::ON),
            other => trace!("isEnable skipped: {:?}", other),
        }

        let bucket = match tag_value(body, "sensitivity") {
            Some("0") => ThresholdBucket::Low,
            Some("1") => ThresholdBucket::Medium,
            Some("2") => ThresholdBucket::High,
            other => {
                trace!("sensitivity skipped: {:?}", other);
                return;
            }
        };
        out.state(
            Channel::AudioThreshold,
            ChannelValue::Percent(bucket.reported_percent()),
        );
    }
}

/// `1` = armed and quiet, `2` = armed and fired
fn alarm_armed(out: &mut ParsedResponse, fired: bool, enable: Channel, kind: AlarmKind) {
    out.state(enable, ChannelValue::ON);
    if fired {
        out.alarm(kind);
    } else {
        out.state(kind.channel(), ChannelValue::OFF);
        out.reset_debounce(kind.debounce_group());
    }
}

impl CameraAdapter for Foscam {
    fn vendor(&self) -> Vendor {
        Vendor::Foscam
    }

    fn build_requests(
        &self,
        command: &CapabilityCommand,
        config: &SessionConfig,
    ) -> Result<CommandPlan, AdapterError> {
        let plan = match command {
            CapabilityCommand::Refresh(channel) => self.refresh(*channel, config),

            // Manual LED control only sticks once auto mode is off
            CapabilityCommand::InfraredLed(on) => CommandPlan::new()
                .request(self.ack("setInfraLedConfig&mode=1", config))
                .assume(Channel::AutoLed, ChannelValue::OFF)
                .request(self.ack(
                    if *on { "openInfraLed" } else { "closeInfraLed" },
                    config,
                )),

            CapabilityCommand::InfraredAutoLed(true) => CommandPlan::new()
                .assume(Channel::EnableLed, ChannelValue::Undef)
                .request(self.ack("setInfraLedConfig&mode=0", config)),
            CapabilityCommand::InfraredAutoLed(false) => {
                CommandPlan::single(self.ack("setInfraLedConfig&mode=1", config))
            }

            CapabilityCommand::AudioThreshold(value) => {
                let cmd = match ThresholdBucket::from_value(*value)? {
                    ThresholdBucket::Disabled => "setAudioAlarmConfig&isEnable=0",
                    ThresholdBucket::Low => "setAudioAlarmConfig&isEnable=1&sensitivity=0",
                    ThresholdBucket::Medium => "setAudioAlarmConfig&isEnable=1&sensitivity=1",
                    ThresholdBucket::High => "setAudioAlarmConfig&isEnable=1&sensitivity=2",
                };
                CommandPlan::single(self.ack(cmd, config))
            }

            CapabilityCommand::AudioAlarmEnable(true) => match config.audio_override() {
                Some(url) => CommandPlan::single(RequestDescriptor::ack(url)),
                None => CommandPlan::single(self.ack("setAudioAlarmConfig&isEnable=1", config)),
            },
            CapabilityCommand::AudioAlarmEnable(false) => {
                CommandPlan::single(self.ack("setAudioAlarmConfig&isEnable=0", config))
            }

            CapabilityCommand::MotionAlarmEnable(true) => match config.motion_override() {
                Some(url) => CommandPlan::single(RequestDescriptor::ack(url)),
                None => CommandPlan::new()
                    .request(self.ack("setMotionDetectConfig&isEnable=1", config))
                    .request(self.ack("setMotionDetectConfig1&isEnable=1", config)),
            },
            CapabilityCommand::MotionAlarmEnable(false) => CommandPlan::new()
                .request(self.ack("setMotionDetectConfig&isEnable=0", config))
                .request(self.ack("setMotionDetectConfig1&isEnable=0", config)),

            CapabilityCommand::TextOverlay(_)
            | CapabilityCommand::PirAlarmEnable(_)
            | CapabilityCommand::ExternalAlarmEnable(_) => {
                debug!("Foscam has no request for {}", command.channel());
                CommandPlan::new()
            }
        };
        Ok(plan)
    }

    fn parse_response(&self, kind: ResponseKind, body: &str) -> ParsedResponse {
        if body.is_empty() {
            return ParsedResponse::empty();
        }
        trace!("Foscam {} reply: {}", kind, body);

        let mut out = ParsedResponse::empty();
        match kind {
            ResponseKind::DeviceState => self.parse_device_state(body, &mut out),
            ResponseKind::AudioAlarmConfig => self.parse_audio_config(body, &mut out),
            _ => {}
        }

        if body.contains(END_OF_RESULT) {
            debug!("End of Foscam result, asking transport to close the connection");
            out.close_connection = true;
        }
        out
    }

    fn decode_push(&self, path: &str) -> Option<AlarmEvent> {
        debug!("Foscam does not push alarms, ignoring callback {}", path);
        None
    }

    fn low_priority_requests(&self, config: &SessionConfig) -> Vec<RequestDescriptor> {
        vec![RequestDescriptor::new(
            self.cgi("getDevState", config),
            ResponseKind::DeviceState,
        )]
    }
}
