//! One-time passcode service.
//!
//! Issues, verifies, resends, and expires challenges per (account, purpose)
//! pair. All three operations serialize per key, so a concurrent `verify`
//! cannot race an `issue` into validating a stale code, and two concurrent
//! `verify` calls for the same challenge cannot both succeed.

use std::sync::Arc;

use chrono::Duration;

use crate::{
    Error,
    account::AccountId,
    clock::Clock,
    error::OtpError,
    lock::KeyedLock,
    otp::{OtpChallenge, OtpChannel, OtpPurpose, generate_code},
    repositories::{OtpRepository, OtpRepositoryProvider},
};

#[derive(Debug, Clone)]
pub struct OtpConfig {
    /// How long a code stays valid after issuance.
    pub ttl: Duration,
    /// Wrong submissions tolerated before the challenge is discarded.
    pub max_attempts: u32,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::minutes(5),
            max_attempts: 5,
        }
    }
}

pub struct OtpService<R: OtpRepositoryProvider> {
    repositories: Arc<R>,
    clock: Arc<dyn Clock>,
    config: OtpConfig,
    locks: KeyedLock<(AccountId, OtpPurpose)>,
}

impl<R: OtpRepositoryProvider> OtpService<R> {
    pub fn new(repositories: Arc<R>, clock: Arc<dyn Clock>, config: OtpConfig) -> Self {
        Self {
            repositories,
            clock,
            config,
            locks: KeyedLock::new(),
        }
    }

    /// Create the active challenge for (account, purpose), superseding any
    /// prior one. Returns the challenge so the caller can route delivery;
    /// the code never leaves the caller's process through this crate.
    pub async fn issue(
        &self,
        account_id: &AccountId,
        purpose: OtpPurpose,
        channel: OtpChannel,
    ) -> Result<OtpChallenge, Error> {
        let _guard = self.locks.acquire((account_id.clone(), purpose)).await;
        self.issue_locked(account_id, purpose, channel).await
    }

    /// Verify a submitted code against the active challenge.
    ///
    /// Returns the consumed challenge on success. Failure semantics:
    /// - no active challenge → [`OtpError::NotFound`]
    /// - attempt counter already at the limit → challenge discarded,
    ///   [`OtpError::AttemptsExceeded`]
    /// - past expiry → challenge discarded, [`OtpError::Expired`] (even if
    ///   the code matches)
    /// - code mismatch → counter incremented, [`OtpError::Mismatch`] with
    ///   the remaining attempts
    pub async fn verify(
        &self,
        account_id: &AccountId,
        purpose: OtpPurpose,
        submitted_code: &str,
    ) -> Result<OtpChallenge, Error> {
        let _guard = self.locks.acquire((account_id.clone(), purpose)).await;

        let repo = self.repositories.otp();
        let Some(mut challenge) = repo.find(account_id, purpose).await? else {
            return Err(OtpError::NotFound.into());
        };

        if challenge.attempts >= self.config.max_attempts {
            repo.delete(account_id, purpose).await?;
            return Err(OtpError::AttemptsExceeded.into());
        }

        if challenge.is_expired(self.clock.now()) {
            repo.delete(account_id, purpose).await?;
            return Err(OtpError::Expired.into());
        }

        if challenge.code != submitted_code {
            challenge.attempts += 1;
            let remaining = self.config.max_attempts - challenge.attempts;
            repo.upsert(challenge).await?;
            return Err(OtpError::Mismatch {
                remaining_attempts: remaining,
            }
            .into());
        }

        repo.delete(account_id, purpose).await?;
        Ok(challenge)
    }

    /// Replace the active challenge with a fresh code and reset attempts,
    /// reusing the previously chosen channel (email if none was recorded).
    pub async fn resend(
        &self,
        account_id: &AccountId,
        purpose: OtpPurpose,
    ) -> Result<OtpChallenge, Error> {
        let _guard = self.locks.acquire((account_id.clone(), purpose)).await;

        let channel = self
            .repositories
            .otp()
            .find(account_id, purpose)
            .await?
            .map(|c| c.channel)
            .unwrap_or(OtpChannel::Email);

        self.issue_locked(account_id, purpose, channel).await
    }

    async fn issue_locked(
        &self,
        account_id: &AccountId,
        purpose: OtpPurpose,
        channel: OtpChannel,
    ) -> Result<OtpChallenge, Error> {
        let now = self.clock.now();
        let challenge = OtpChallenge {
            account_id: account_id.clone(),
            purpose,
            code: generate_code(),
            channel,
            issued_at: now,
            expires_at: now + self.config.ttl,
            attempts: 0,
        };

        self.repositories.otp().upsert(challenge.clone()).await?;
        Ok(challenge)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockOtpRepository {
        challenges: Mutex<HashMap<(AccountId, OtpPurpose), OtpChallenge>>,
    }

    impl MockOtpRepository {
        fn new() -> Self {
            Self {
                challenges: Mutex::new(HashMap::new()),
            }
        }
    }

    #[async_trait]
    impl OtpRepository for MockOtpRepository {
        async fn upsert(&self, challenge: OtpChallenge) -> Result<(), Error> {
            self.challenges
                .lock()
                .unwrap()
                .insert((challenge.account_id.clone(), challenge.purpose), challenge);
            Ok(())
        }

        async fn find(
            &self,
            account_id: &AccountId,
            purpose: OtpPurpose,
        ) -> Result<Option<OtpChallenge>, Error> {
            Ok(self
                .challenges
                .lock()
                .unwrap()
                .get(&(account_id.clone(), purpose))
                .cloned())
        }

        async fn delete(&self, account_id: &AccountId, purpose: OtpPurpose) -> Result<(), Error> {
            self.challenges
                .lock()
                .unwrap()
                .remove(&(account_id.clone(), purpose));
            Ok(())
        }
    }

    struct MockProvider {
        otp: MockOtpRepository,
    }

    impl OtpRepositoryProvider for MockProvider {
        type OtpRepo = MockOtpRepository;

        fn otp(&self) -> &Self::OtpRepo {
            &self.otp
        }
    }

    struct TestClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl TestClock {
        fn new() -> Self {
            Self {
                now: Mutex::new(Utc::now()),
            }
        }

        fn advance(&self, by: Duration) {
            let mut now = self.now.lock().unwrap();
            *now += by;
        }
    }

    impl Clock for TestClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock().unwrap()
        }
    }

    fn service() -> (OtpService<MockProvider>, Arc<TestClock>) {
        let provider = Arc::new(MockProvider {
            otp: MockOtpRepository::new(),
        });
        let clock = Arc::new(TestClock::new());
        (
            OtpService::new(provider, clock.clone(), OtpConfig::default()),
            clock,
        )
    }

    #[tokio::test]
    async fn test_issue_then_verify_succeeds_once() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let challenge = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();

        let verified = service
            .verify(&account, OtpPurpose::Login, &challenge.code)
            .await
            .unwrap();
        assert_eq!(verified.channel, OtpChannel::Email);

        // Same code again: the challenge is gone.
        let result = service
            .verify(&account, OtpPurpose::Login, &challenge.code)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Otp(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_issue_supersedes_prior_challenge() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let first = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();
        let second = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Mobile)
            .await
            .unwrap();

        if first.code != second.code {
            let result = service.verify(&account, OtpPurpose::Login, &first.code).await;
            assert!(matches!(
                result.unwrap_err(),
                Error::Otp(OtpError::Mismatch { .. })
            ));
        }
        service
            .verify(&account, OtpPurpose::Login, &second.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_purposes_are_independent() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let registration = service
            .issue(&account, OtpPurpose::Registration, OtpChannel::Both)
            .await
            .unwrap();
        let login = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();

        service
            .verify(&account, OtpPurpose::Registration, &registration.code)
            .await
            .unwrap();
        service
            .verify(&account, OtpPurpose::Login, &login.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_code_counts_down_then_exhausts() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let challenge = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();
        let wrong = if challenge.code == "000000" {
            "000001"
        } else {
            "000000"
        };

        for expected_remaining in (0..5).rev() {
            let result = service.verify(&account, OtpPurpose::Login, wrong).await;
            match result.unwrap_err() {
                Error::Otp(OtpError::Mismatch { remaining_attempts }) => {
                    assert_eq!(remaining_attempts, expected_remaining);
                }
                e => panic!("Expected Mismatch, got {e:?}"),
            }
        }

        // Sixth wrong attempt: counter is at the limit, challenge discarded.
        let result = service.verify(&account, OtpPurpose::Login, wrong).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Otp(OtpError::AttemptsExceeded)
        ));

        // Even the correct code is now useless.
        let result = service
            .verify(&account, OtpPurpose::Login, &challenge.code)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Otp(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_expired_challenge_is_discarded() {
        let (service, clock) = service();
        let account = AccountId::new_random();

        let challenge = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();

        clock.advance(Duration::minutes(5) + Duration::seconds(1));

        // Correct code, but past expiry.
        let result = service
            .verify(&account, OtpPurpose::Login, &challenge.code)
            .await;
        assert!(matches!(result.unwrap_err(), Error::Otp(OtpError::Expired)));

        // The discard happened: a retry sees no challenge at all.
        let result = service
            .verify(&account, OtpPurpose::Login, &challenge.code)
            .await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Otp(OtpError::NotFound)
        ));
    }

    #[tokio::test]
    async fn test_resend_reuses_channel_and_resets_attempts() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let challenge = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Mobile)
            .await
            .unwrap();
        let wrong = if challenge.code == "000000" {
            "000001"
        } else {
            "000000"
        };
        let _ = service.verify(&account, OtpPurpose::Login, wrong).await;
        let _ = service.verify(&account, OtpPurpose::Login, wrong).await;

        let reissued = service.resend(&account, OtpPurpose::Login).await.unwrap();
        assert_eq!(reissued.channel, OtpChannel::Mobile);
        assert_eq!(reissued.attempts, 0);

        service
            .verify(&account, OtpPurpose::Login, &reissued.code)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_resend_without_prior_challenge_defaults_to_email() {
        let (service, _clock) = service();
        let account = AccountId::new_random();

        let reissued = service.resend(&account, OtpPurpose::Login).await.unwrap();
        assert_eq!(reissued.channel, OtpChannel::Email);
    }

    #[tokio::test]
    async fn test_concurrent_verifies_admit_exactly_one() {
        let (service, _clock) = service();
        let service = Arc::new(service);
        let account = AccountId::new_random();

        let challenge = service
            .issue(&account, OtpPurpose::Login, OtpChannel::Email)
            .await
            .unwrap();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let account = account.clone();
            let code = challenge.code.clone();
            handles.push(tokio::spawn(async move {
                service.verify(&account, OtpPurpose::Login, &code).await
            }));
        }

        let mut successes = 0;
        for handle in handles {
            if handle.await.unwrap().is_ok() {
                successes += 1;
            }
        }
        assert_eq!(successes, 1);
    }
}
