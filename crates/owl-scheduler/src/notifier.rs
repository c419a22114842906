use async_trait::async_trait;
use thiserror::Error;

/// Errors a notifier can report back to the scheduler.
///
/// Any error means the reminder was not delivered: the scheduler leaves the
/// record due and retries on the next tick.
#[derive(Debug, Error)]
pub enum NotifyError {
    /// The message could not be delivered to the destination channel.
    #[error("Send failed: {0}")]
    SendFailed(String),

    /// Delivery exceeded its allowed time budget. Raised by the scheduler
    /// when a dispatch overruns its configured bound.
    #[error("Delivery timed out after {ms}ms")]
    Timeout { ms: u64 },
}

/// Capability the scheduler calls to deliver a fired reminder.
///
/// Implementations must be `Send + Sync` so the engine can hold one behind an
/// `Arc` and call it from its background task.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver `content` to `channel_id`.
    ///
    /// Must distinguish failure from success: the scheduler only advances a
    /// reminder after a successful send.
    async fn send(&self, channel_id: &str, content: &str) -> Result<(), NotifyError>;
}
