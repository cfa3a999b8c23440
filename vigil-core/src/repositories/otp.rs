//! Repository trait for one-time passcode challenges.

use async_trait::async_trait;

use crate::{
    Error,
    account::AccountId,
    otp::{OtpChallenge, OtpPurpose},
};

/// Storage operations for OTP challenges, keyed by (account, purpose).
///
/// The key admits at most one challenge: `upsert` replaces any prior record
/// for the same pair. Read-modify-write atomicity across `find`/`upsert`/
/// `delete` is the *service's* responsibility (per-key lock); the repository
/// only guarantees each single call is atomic.
#[async_trait]
pub trait OtpRepository: Send + Sync + 'static {
    /// Create or replace the active challenge for (account, purpose).
    async fn upsert(&self, challenge: OtpChallenge) -> Result<(), Error>;

    async fn find(
        &self,
        account_id: &AccountId,
        purpose: OtpPurpose,
    ) -> Result<Option<OtpChallenge>, Error>;

    /// Remove the active challenge, if any. Idempotent.
    async fn delete(&self, account_id: &AccountId, purpose: OtpPurpose) -> Result<(), Error>;
}
