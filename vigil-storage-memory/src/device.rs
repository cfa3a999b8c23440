use async_trait::async_trait;
use dashmap::{DashMap, mapref::entry::Entry};
use vigil_core::{
    AccountId, Device, DeviceId, Error,
    device::NewDevice,
    error::StorageError,
    repositories::DeviceRepository,
};

/// Devices keyed by id, with a unique (account, fingerprint) index.
///
/// Lock order: fingerprint index before the device map. `create_if_absent`
/// holds the index entry across the device insert, which is what makes two
/// concurrent first sightings collapse to a single row.
pub struct MemoryDeviceRepository {
    devices: DashMap<DeviceId, Device>,
    by_fingerprint: DashMap<(AccountId, String), DeviceId>,
}

impl MemoryDeviceRepository {
    pub fn new() -> Self {
        Self {
            devices: DashMap::new(),
            by_fingerprint: DashMap::new(),
        }
    }
}

impl Default for MemoryDeviceRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceRepository for MemoryDeviceRepository {
    async fn create_if_absent(&self, device: NewDevice) -> Result<(Device, bool), Error> {
        let key = (device.account_id.clone(), device.fingerprint.clone());
        match self.by_fingerprint.entry(key) {
            Entry::Occupied(entry) => {
                let id = entry.get().clone();
                drop(entry);
                let existing = self
                    .devices
                    .get(&id)
                    .map(|d| d.clone())
                    .ok_or(Error::Storage(StorageError::NotFound))?;
                Ok((existing, false))
            }
            Entry::Vacant(entry) => {
                let device = device.into_device();
                self.devices.insert(device.id.clone(), device.clone());
                entry.insert(device.id.clone());
                Ok((device, true))
            }
        }
    }

    async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, Error> {
        Ok(self.devices.get(id).map(|d| d.clone()))
    }

    async fn find_by_fingerprint(
        &self,
        account_id: &AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, Error> {
        let key = (account_id.clone(), fingerprint.to_string());
        let Some(id) = self.by_fingerprint.get(&key).map(|id| id.clone()) else {
            return Ok(None);
        };
        Ok(self.devices.get(&id).map(|d| d.clone()))
    }

    async fn update(&self, device: &Device) -> Result<Device, Error> {
        if !self.devices.contains_key(&device.id) {
            return Err(Error::Storage(StorageError::NotFound));
        }
        self.devices.insert(device.id.clone(), device.clone());
        Ok(device.clone())
    }

    async fn delete(&self, id: &DeviceId) -> Result<(), Error> {
        let Some(device) = self.devices.get(id).map(|d| d.clone()) else {
            return Ok(());
        };
        self.by_fingerprint
            .remove(&(device.account_id.clone(), device.fingerprint.clone()));
        self.devices.remove(id);
        Ok(())
    }

    async fn list(&self) -> Result<Vec<Device>, Error> {
        Ok(self.devices.iter().map(|d| d.clone()).collect())
    }

    async fn list_for_account(&self, account_id: &AccountId) -> Result<Vec<Device>, Error> {
        Ok(self
            .devices
            .iter()
            .filter(|d| &d.account_id == account_id)
            .map(|d| d.clone())
            .collect())
    }
}
