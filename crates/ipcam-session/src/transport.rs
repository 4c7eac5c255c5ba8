//! HTTP transport boundary

use crate::error::SessionError;
use async_trait::async_trait;

/// Issues GET requests against one camera
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send `path` and resolve with the raw reply body
    async fn send_request(&self, path: &str) -> Result<String, SessionError>;
}
