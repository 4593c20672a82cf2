//! Outbound mail seam.
//!
//! Password-reset delivery goes through this trait so the transport can be
//! swapped without touching the auth flow. The default implementation writes
//! to the log, which is what development and the test suite use.

use async_trait::async_trait;

use crate::errors::ServiceError;

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ServiceError>;
}

/// Logs the message instead of delivering it.
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, recipient: &str, subject: &str, body: &str) -> Result<(), ServiceError> {
        tracing::info!(
            recipient = %recipient,
            subject = %subject,
            body = %body,
            "outbound mail (log transport)"
        );
        Ok(())
    }
}
