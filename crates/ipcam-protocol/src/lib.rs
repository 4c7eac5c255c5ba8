//! IP Camera Vendor Protocols
//!
//! This crate translates vendor-neutral capability commands into the HTTP
//! GET paths a camera firmware understands, parses the firmware's loosely
//! structured replies back into normalized channel updates, and decodes
//! alarm callbacks pushed by the camera. It performs no I/O.

mod capability;
mod config;
mod error;
mod event;
mod foscam;
mod instar;
mod marker;
mod request;
mod vendor;

pub use capability::{CapabilityCommand, Channel, ChannelValue, Percent, ThresholdBucket, REFRESH};
pub use config::{PushServerConfig, SessionConfig};
pub use error::AdapterError;
pub use event::{AdapterEvent, AlarmEvent, AlarmKind, DebounceGroup, ParsedResponse, StateEvent};
pub use foscam::Foscam;
pub use instar::{encode_overlay_text, Instar};
pub use request::{CommandPlan, PlanStep, RequestDescriptor, ResponseKind};
pub use vendor::{CameraAdapter, Vendor};
