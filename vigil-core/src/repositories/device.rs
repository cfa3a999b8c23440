//! Repository trait for device records.

use async_trait::async_trait;

use crate::{
    Error,
    account::AccountId,
    device::{Device, DeviceId, NewDevice},
};

/// Storage operations for devices.
///
/// One row exists per unique (account, fingerprint) pair. `create_if_absent`
/// must be atomic (unique constraint or per-key lock): two concurrent first
/// sightings of the same pair yield exactly one stored row.
#[async_trait]
pub trait DeviceRepository: Send + Sync + 'static {
    /// Insert a device if no row exists for its (account, fingerprint) pair.
    /// Returns the stored device and whether a creation occurred.
    async fn create_if_absent(&self, device: NewDevice) -> Result<(Device, bool), Error>;

    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, Error>;

    async fn find_by_fingerprint(
        &self,
        account_id: &AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, Error>;

    /// Replace the stored device. Fails with `StorageError::NotFound` if the
    /// device no longer exists.
    async fn update(&self, device: &Device) -> Result<Device, Error>;

    async fn delete(&self, id: &DeviceId) -> Result<(), Error>;

    async fn list(&self) -> Result<Vec<Device>, Error>;

    async fn list_for_account(&self, account_id: &AccountId) -> Result<Vec<Device>, Error>;
}
