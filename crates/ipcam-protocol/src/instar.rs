//! INSTAR (hi3510) dialect
//!
//! Requests rely on an already authenticated session, so no credentials are
//! embedded. Replies are `var name="value";` lines with no end marker, and
//! each reply is only understood through the request that produced it.
//! Alarms arrive as HTTP callbacks to `/instar?&active=N`.

use crate::capability::{CapabilityCommand, Channel, ChannelValue, Percent};
use crate::config::SessionConfig;
use crate::error::AdapterError;
use crate::event::{AlarmEvent, AlarmKind, DebounceGroup, ParsedResponse};
use crate::marker::{quoted_value, var_flag};
use crate::request::{CommandPlan, RequestDescriptor, ResponseKind};
use crate::vendor::{CameraAdapter, Vendor};
use tracing::{debug, info, trace, warn};

/// Callback path the camera is told to hit
const PUSH_PATH: &str = "/instar";

const AUDIO_ALARM_ATTR: &str = "/cgi-bin/hi3510/param.cgi?cmd=setaudioalarmattr";
const MOTION_AREAS: u8 = 4;

/// INSTAR adapter
#[derive(Debug, Clone, Copy, Default)]
pub struct Instar;

/// Percent-encode overlay text. Only RFC 3986 unreserved characters
/// (`A-Z a-z 0-9 - . _ ~`) pass through; space becomes `%20`.
pub fn encode_overlay_text(text: &str) -> Result<String, AdapterError> {
    if let Some(c) = text.chars().find(|c| c.is_control()) {
        return Err(AdapterError::EncodingFailure {
            text: text.to_string(),
            reason: format!("control character U+{:04X} cannot be shown", c as u32),
        });
    }
    Ok(urlencoding::encode(text).into_owned())
}

fn switch(path: &str, on: bool) -> RequestDescriptor {
    RequestDescriptor::ack(format!("{}{}", path, if on { 1 } else { 0 }))
}

fn motion_areas(on: bool) -> RequestDescriptor {
    let enable = if on { 1 } else { 0 };
    let chained: Vec<String> = (1..=MOTION_AREAS)
        .map(|area| format!("cmd=setmdattr&-enable={}&-name={}", enable, area))
        .collect();
    RequestDescriptor::ack(format!("/cgi-bin/hi3510/param.cgi?{}", chained.join("&")))
}

fn register_alarm_server(host: &str, port: u16) -> RequestDescriptor {
    RequestDescriptor::ack(format!(
        "/param.cgi?cmd=setmdalarm&-aname=server2&-switch=on&cmd=setalarmserverattr&-as_index=3\
         &-as_server={}&-as_port={}&-as_path={}\
         &-as_queryattr1=&-as_queryval1=&-as_queryattr2=&-as_queryval2=&-as_queryattr3=&-as_queryval3=\
         &-as_activequery=1&-as_auth=0&-as_query1=0&-as_query2=0&-as_query3=0",
        host, port, PUSH_PATH
    ))
}

/// Map an `active=N` code to its alarm. Codes 1-4 are sent by the camera
/// but carry nothing we track.
fn alarm_for_code(code: u32) -> Option<AlarmKind> {
    match code {
        5 => Some(AlarmKind::Pir),
        6 => Some(AlarmKind::Audio),
        7..=10 => Some(AlarmKind::Motion),
        _ => None,
    }
}

fn reset_fired(out: &mut ParsedResponse, channel: Channel, group: DebounceGroup) {
    out.state(channel, ChannelValue::OFF);
    out.reset_debounce(group);
}

impl Instar {
    fn refresh(&self, channel: Channel, config: &SessionConfig) -> CommandPlan {
        match (channel, config.push_target()) {
            (Channel::MotionAlarm, Some(server)) => {
                info!("Setting up the alarm server in the camera: {}:{}", server.host, server.port);
                CommandPlan::single(register_alarm_server(&server.host, server.port))
            }
            _ => CommandPlan::new(),
        }
    }
}

impl CameraAdapter for Instar {
    fn vendor(&self) -> Vendor {
        Vendor::Instar
    }

    fn build_requests(
        &self,
        command: &CapabilityCommand,
        config: &SessionConfig,
    ) -> Result<CommandPlan, AdapterError> {
        let plan = match command {
            CapabilityCommand::Refresh(channel) => self.refresh(*channel, config),

            CapabilityCommand::AudioThreshold(value) => {
                let percent = Percent::from_f64(*value)?;
                if percent == Percent::MIN {
                    CommandPlan::single(switch(&format!("{}&-aa_enable=", AUDIO_ALARM_ATTR), false))
                } else {
                    CommandPlan::new()
                        .request(switch(&format!("{}&-aa_enable=", AUDIO_ALARM_ATTR), true))
                        .request(RequestDescriptor::ack(format!(
                            "{}&-aa_enable=1&-aa_value={}",
                            AUDIO_ALARM_ATTR, percent
                        )))
                }
            }
            CapabilityCommand::AudioAlarmEnable(on) => {
                CommandPlan::single(switch(&format!("{}&-aa_enable=", AUDIO_ALARM_ATTR), *on))
            }
            CapabilityCommand::MotionAlarmEnable(on) => CommandPlan::single(motion_areas(*on)),

            CapabilityCommand::TextOverlay(text) if text.is_empty() => CommandPlan::single(
                RequestDescriptor::ack("/param.cgi?cmd=setoverlayattr&-region=1&-show=0"),
            ),
            CapabilityCommand::TextOverlay(text) => {
                let encoded = encode_overlay_text(text).map_err(|e| {
                    warn!("Overlay left unchanged: {}", e);
                    e
                })?;
                CommandPlan::single(RequestDescriptor::ack(format!(
                    "/param.cgi?cmd=setoverlayattr&-region=1&-show=1&-name={}",
                    encoded
                )))
            }

            CapabilityCommand::InfraredAutoLed(on) => CommandPlan::single(RequestDescriptor::ack(
                format!(
                    "/param.cgi?cmd=setinfrared&-infraredstat={}",
                    if *on { "auto" } else { "close" }
                ),
            )),
            CapabilityCommand::PirAlarmEnable(on) => {
                CommandPlan::single(switch("/param.cgi?cmd=setpirattr&-pir_enable=", *on))
            }
            CapabilityCommand::ExternalAlarmEnable(on) => {
                CommandPlan::single(switch("/param.cgi?cmd=setioattr&-io_enable=", *on))
            }

            CapabilityCommand::InfraredLed(_) => {
                debug!("INSTAR has no request for {}", command.channel());
                CommandPlan::new()
            }
        };
        Ok(plan)
    }

    fn parse_response(&self, kind: ResponseKind, body: &str) -> ParsedResponse {
        if body.is_empty() {
            return ParsedResponse::empty();
        }
        trace!("INSTAR {} reply: {}", kind, body);

        let mut out = ParsedResponse::empty();
        match kind {
            ResponseKind::InfraredConfig => match quoted_value(body, "var infraredstat=\"") {
                Some(mode) => out.state(Channel::AutoLed, ChannelValue::OnOff(mode == "auto")),
                None => trace!("infraredstat skipped"),
            },
            ResponseKind::TextOverlay => {
                if body.contains("var show_1=\"0\"") {
                    out.state(Channel::TextOverlay, ChannelValue::Text(String::new()));
                } else if let Some(name) = quoted_value(body, "var name_1=\"") {
                    out.state(Channel::TextOverlay, ChannelValue::Text(name.to_string()));
                } else {
                    trace!("name_1 skipped");
                }
            }
            ResponseKind::MotionDetection => match var_flag(body, "m1_enable") {
                Some(on) => {
                    out.state(Channel::EnableMotionAlarm, ChannelValue::OnOff(on));
                    reset_fired(&mut out, Channel::MotionAlarm, DebounceGroup::Motion);
                }
                None => trace!("m1_enable skipped"),
            },
            ResponseKind::AudioAlarm => match var_flag(body, "aa_enable") {
                Some(true) => {
                    out.state(Channel::EnableAudioAlarm, ChannelValue::ON);
                    match quoted_value(body, "var aa_value=\"").map(|v| v.trim().parse::<u32>()) {
                        Some(Ok(value)) => {
                            debug!("Threshold is changing to {}", value);
                            out.state(
                                Channel::AudioThreshold,
                                ChannelValue::Percent(Percent::saturating(value)),
                            );
                        }
                        other => trace!("aa_value skipped: {:?}", other),
                    }
                    reset_fired(&mut out, Channel::AudioAlarm, DebounceGroup::Audio);
                }
                Some(false) => {
                    out.state(Channel::EnableAudioAlarm, ChannelValue::OFF);
                    reset_fired(&mut out, Channel::AudioAlarm, DebounceGroup::Audio);
                }
                None => trace!("aa_enable skipped"),
            },
            ResponseKind::PirSensor => match var_flag(body, "pir_enable") {
                Some(on) => {
                    out.state(Channel::EnablePirAlarm, ChannelValue::OnOff(on));
                    reset_fired(&mut out, Channel::PirAlarm, DebounceGroup::Motion);
                }
                None => trace!("pir_enable skipped"),
            },
            ResponseKind::ExternalAlarmInput => match var_flag(body, "io_enable") {
                Some(on) => out.state(Channel::EnableExternalAlarmInput, ChannelValue::OnOff(on)),
                None => trace!("io_enable skipped"),
            },
            ResponseKind::Ack | ResponseKind::DeviceState | ResponseKind::AudioAlarmConfig => {}
        }
        out
    }

    fn decode_push(&self, path: &str) -> Option<AlarmEvent> {
        let (route, query) = path.split_once('?')?;
        if route != PUSH_PATH {
            debug!("Ignoring callback to unknown path {}", path);
            return None;
        }
        let code = query
            .split('&')
            .find_map(|pair| pair.strip_prefix("active="))
            .and_then(|v| v.parse::<u32>().ok());

        match code.and_then(alarm_for_code) {
            Some(kind) => {
                debug!("Alarm has been triggered: {} ({:?})", path, kind);
                Some(AlarmEvent::now(kind))
            }
            None => {
                debug!("Callback {} carries no alarm we track", path);
                None
            }
        }
    }

    fn low_priority_requests(&self, _config: &SessionConfig) -> Vec<RequestDescriptor> {
        vec![
            RequestDescriptor::new(
                "/cgi-bin/hi3510/param.cgi?cmd=getaudioalarmattr",
                ResponseKind::AudioAlarm,
            ),
            RequestDescriptor::new(
                "/cgi-bin/hi3510/param.cgi?cmd=getmdattr",
                ResponseKind::MotionDetection,
            ),
            RequestDescriptor::new("/param.cgi?cmd=getinfrared", ResponseKind::InfraredConfig),
            RequestDescriptor::new(
                "/param.cgi?cmd=getoverlayattr&-region=1",
                ResponseKind::TextOverlay,
            ),
            RequestDescriptor::new("/param.cgi?cmd=getpirattr", ResponseKind::PirSensor),
            RequestDescriptor::new("/param.cgi?cmd=getioattr", ResponseKind::ExternalAlarmInput),
        ]
    }
}
