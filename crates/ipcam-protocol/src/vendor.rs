//! Vendor Dialects
//!
//! Every supported firmware implements [`CameraAdapter`]. Adapters are
//! stateless; everything they need arrives as arguments.

use crate::capability::CapabilityCommand;
use crate::config::SessionConfig;
use crate::error::AdapterError;
use crate::event::{AlarmEvent, ParsedResponse};
use crate::foscam::Foscam;
use crate::instar::Instar;
use crate::request::{CommandPlan, RequestDescriptor, ResponseKind};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Contract shared by all vendor dialects
pub trait CameraAdapter: Send + Sync {
    /// Dialect implemented by this adapter
    fn vendor(&self) -> Vendor;

    /// Translate a command into an ordered request plan.
    ///
    /// Commands the firmware has no equivalent for yield an empty plan.
    fn build_requests(
        &self,
        command: &CapabilityCommand,
        config: &SessionConfig,
    ) -> Result<CommandPlan, AdapterError>;

    /// Parse a reply to a request that expected `kind`
    fn parse_response(&self, kind: ResponseKind, body: &str) -> ParsedResponse;

    /// Decode an inbound alarm callback path
    fn decode_push(&self, path: &str) -> Option<AlarmEvent>;

    /// Requests an external scheduler cycles through when idle
    fn low_priority_requests(&self, config: &SessionConfig) -> Vec<RequestDescriptor>;
}

/// Supported firmware dialects
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Vendor {
    /// CGIProxy.fcgi, XML replies, credentials in every query
    Foscam,
    /// param.cgi, JavaScript variable replies, alarm push callbacks
    Instar,
}

static FOSCAM: Foscam = Foscam;
static INSTAR: Instar = Instar;

impl Vendor {
    /// Get the adapter for this dialect
    pub fn adapter(&self) -> &'static dyn CameraAdapter {
        match self {
            Vendor::Foscam => &FOSCAM,
            Vendor::Instar => &INSTAR,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Vendor::Foscam => "foscam",
            Vendor::Instar => "instar",
        }
    }
}

impl fmt::Display for Vendor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_adapter_dispatch() {
        assert_eq!(Vendor::Foscam.adapter().vendor(), Vendor::Foscam);
        assert_eq!(Vendor::Instar.adapter().vendor(), Vendor::Instar);
    }
}
