use async_trait::async_trait;
use dashmap::DashMap;
use vigil_core::{
    AccountId, Error, OtpChallenge, OtpPurpose,
    repositories::OtpRepository,
};

/// One challenge per (account, purpose) key. The map key itself enforces the
/// at-most-one invariant; upsert replaces in place.
pub struct MemoryOtpRepository {
    challenges: DashMap<(AccountId, OtpPurpose), OtpChallenge>,
}

impl MemoryOtpRepository {
    pub fn new() -> Self {
        Self {
            challenges: DashMap::new(),
        }
    }
}

impl Default for MemoryOtpRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl OtpRepository for MemoryOtpRepository {
    async fn upsert(&self, challenge: OtpChallenge) -> Result<(), Error> {
        self.challenges
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
            .get(&(account_id.clone(), purpose))
            .map(|c| c.clone()))
    }

    async fn delete(&self, account_id: &AccountId, purpose: OtpPurpose) -> Result<(), Error> {
        self.challenges.remove(&(account_id.clone(), purpose));
        Ok(())
    }
}
