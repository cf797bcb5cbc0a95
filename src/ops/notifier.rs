//! Holder notifications.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use super::dividends::ShareHolder;

/// A notification could not be delivered.
#[derive(Debug, Error)]
#[error("notification to {recipient} failed: {message}")]
pub struct NotifyError {
    /// Recipient contact.
    pub recipient: String,
    /// Delivery error.
    pub message: String,
}

/// Delivers dividend notices to shareholders (e-mail in production).
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Tell `holder` that `amount` lamports were paid.
    async fn notify_dividend(&self, holder: &ShareHolder, amount: u64) -> Result<(), NotifyError>;
}

/// Logs notices instead of sending them.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingNotifier;

#[async_trait]
impl Notifier for TracingNotifier {
    async fn notify_dividend(&self, holder: &ShareHolder, amount: u64) -> Result<(), NotifyError> {
        info!(
            email = %holder.email,
            address = %holder.address,
            amount,
            "dividend notice for {} {}",
            holder.name,
            holder.surname
        );
        Ok(())
    }
}
