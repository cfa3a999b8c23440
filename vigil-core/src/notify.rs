//! Outbound passcode delivery.
//!
//! Delivery is fire-and-forget: a failing sink must never fail the issuing
//! operation, so the trait returns nothing and implementations log their own
//! errors.

use async_trait::async_trait;

use crate::otp::{OtpChannel, OtpPurpose};

#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    /// Deliver `code` to `destination` (an email address or mobile number,
    /// depending on `channel`). Best-effort.
    async fn deliver(
        &self,
        destination: &str,
        code: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
    );
}

/// Sink that writes codes to the log instead of sending them. The default
/// for demos and tests; real deployments plug in an email/SMS gateway.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

#[async_trait]
impl NotificationSink for TracingNotifier {
    async fn deliver(
        &self,
        destination: &str,
        code: &str,
        purpose: OtpPurpose,
        channel: OtpChannel,
    ) {
        tracing::info!(
            destination = destination,
            code = code,
            purpose = %purpose,
            channel = %channel,
            "one-time passcode issued"
        );
    }
}
