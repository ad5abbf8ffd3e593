//! Email task handler.

use async_trait::async_trait;
use hollow_common::AppResult;
use hollow_core::{EmailPayload, EmailService};
use tracing::info;

use super::TaskHandler;

/// Sends the email described by an `email:send` task.
#[derive(Clone)]
pub struct EmailHandler {
    service: EmailService,
}

impl EmailHandler {
    /// Create a new email handler.
    #[must_use]
    pub const fn new(service: EmailService) -> Self {
        Self { service }
    }
}

#[async_trait]
impl TaskHandler for EmailHandler {
    async fn handle(&self, payload: &[u8]) -> AppResult<()> {
        let payload: EmailPayload = serde_json::from_slice(payload)?;
        info!(recipient = %payload.recipient, "Sending email");
        self.service.deliver(&payload).await
    }
}
