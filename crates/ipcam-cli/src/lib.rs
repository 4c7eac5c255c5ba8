//! IP Camera Adapter CLI
//!
//! Offline front end over the vendor adapters: shows the requests a command
//! would issue, parses captured replies, and decodes push callback paths.

use anyhow::{Context, Result};
use ipcam_protocol::{
    AlarmEvent, CapabilityCommand, Channel, CommandPlan, ParsedResponse, RequestDescriptor,
    ResponseKind, SessionConfig,
};
use ipcam_session::{CameraSession, ChannelStateStore, PollConfig};
use serde::Deserialize;
use std::path::Path;
use tracing::{info, warn, Level};
use tracing_subscriber::FmtSubscriber;

/// Environment variable prefix for settings overrides
pub const ENV_PREFIX: &str = "IPCAM";

/// Application settings
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Camera to talk to
    pub camera: SessionConfig,
    /// Low-priority polling
    #[serde(default)]
    pub poll: PollConfig,
}

/// Load settings from an optional TOML file, overlaid by `IPCAM_*` variables
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let mut builder = config::Config::builder();
    if let Some(path) = path {
        builder = builder.add_source(config::File::from(path));
    }
    let settings = builder
        .add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        )
        .build()
        .context("reading settings")?
        .try_deserialize::<Settings>()
        .context("invalid settings")?;

    info!("Loaded settings for a {} camera", settings.camera.vendor);
    Ok(settings)
}

impl Settings {
    /// Session for the configured camera, waiting `poll.response_timeout_ms` per reply
    pub fn session(&self) -> CameraSession {
        CameraSession::new(self.camera.clone()).with_response_timeout(self.poll.response_timeout())
    }
}

/// Requests and local assumptions for a command given in event-bus text form
pub fn plan(settings: &Settings, channel: &str, value: &str) -> Result<CommandPlan> {
    let channel: Channel = channel.parse()?;
    let command = CapabilityCommand::from_text(channel, value)?;
    let plan = settings.session().plan(&command).map_err(|e| {
        warn!("Command {:?} dropped: {}", command, e);
        e
    })?;
    Ok(plan)
}

/// Parse a captured reply as if it answered a request of `kind`
pub fn parse(settings: &Settings, kind: &str, body: &str) -> Result<ParsedResponse> {
    let kind: ResponseKind = kind.parse()?;
    Ok(settings.camera.vendor.adapter().parse_response(kind, body))
}

/// Decode a push callback path
pub fn push(settings: &Settings, path: &str) -> Option<AlarmEvent> {
    settings.session().handle_push(path, &ChannelStateStore::new())
}

/// The vendor's low-priority poll list
pub fn poll_list(settings: &Settings) -> Vec<RequestDescriptor> {
    settings.session().low_priority_requests()
}

/// Initialize logging. Output goes to stderr so stdout stays parseable.
pub fn init_logging(verbose: bool) -> Result<()> {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .with_writer(std::io::stderr)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("Failed to set tracing subscriber")
}
