//! Device registry service.
//!
//! Tracks one record per (account, fingerprint) pair. Registration is
//! insert-if-absent so concurrent first sightings of a device collapse to a
//! single row and a single NEW_DEVICE audit event.

use std::sync::Arc;

use crate::{
    Error,
    account::{Account, AccountId},
    audit::{Actor, AuditAction, AuditEvent, AuditOutcome},
    clock::Clock,
    device::{Device, DeviceAttestation, DeviceId, NewDevice},
    error::StorageError,
    repositories::{
        AuditRepository, AuditRepositoryProvider, DeviceRepository, DeviceRepositoryProvider,
    },
    signals::{ClientInfo, SignalSource},
};

pub struct DeviceService<R: DeviceRepositoryProvider + AuditRepositoryProvider> {
    repositories: Arc<R>,
    signals: Arc<dyn SignalSource>,
    clock: Arc<dyn Clock>,
}

impl<R: DeviceRepositoryProvider + AuditRepositoryProvider> DeviceService<R> {
    pub fn new(
        repositories: Arc<R>,
        signals: Arc<dyn SignalSource>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            repositories,
            signals,
            clock,
        }
    }

    /// Look up the device for this account/fingerprint pair, if registered.
    pub async fn resolve(
        &self,
        account_id: &AccountId,
        fingerprint: &str,
    ) -> Result<Option<Device>, Error> {
        self.repositories
            .device()
            .find_by_fingerprint(account_id, fingerprint)
            .await
    }

    /// Register the attested device if this is the first sighting of its
    /// fingerprint for the account. Emits a NEW_DEVICE audit event exactly
    /// once, keyed off whether the insert actually happened. The posture is
    /// captured at creation and not re-sampled on later sightings.
    pub async fn register_if_absent(
        &self,
        account: &Account,
        client: &ClientInfo,
        attestation: &DeviceAttestation,
    ) -> Result<(Device, bool), Error> {
        let new_device = NewDevice {
            account_id: account.id.clone(),
            fingerprint: attestation.fingerprint.clone(),
            user_agent: client.user_agent.clone(),
            os: client.os.clone(),
            browser: client.browser.clone(),
            posture: attestation.posture,
            first_seen_at: self.clock.now(),
        };

        let (device, created) = self
            .repositories
            .device()
            .create_if_absent(new_device)
            .await?;

        if created {
            let origin = self.signals.current_origin().await;
            self.repositories
                .audit()
                .append(
                    AuditEvent::builder()
                        .timestamp(self.clock.now())
                        .account_id(account.id.clone())
                        .email(account.email.clone())
                        .action(AuditAction::NewDevice)
                        .details(format!(
                            "New device detected: {} on {}",
                            device.browser, device.os
                        ))
                        .ip(origin.ip.clone())
                        .location(origin.location())
                        .outcome(AuditOutcome::Success)
                        .build()?,
                )
                .await?;
            tracing::info!(
                account_id = %account.id,
                device_id = %device.id,
                fingerprint = %device.fingerprint,
                "registered new device"
            );
        }

        Ok((device, created))
    }

    /// Mark a device as approved by `actor`.
    pub async fn approve(&self, actor: &Actor, device_id: &DeviceId) -> Result<Device, Error> {
        let mut device = self
            .repositories
            .device()
            .find_by_id(device_id)
            .await?
            .ok_or(Error::Storage(StorageError::NotFound))?;

        device.approved = true;
        device.approved_by = Some(actor.account_id.clone());
        let device = self.repositories.device().update(&device).await?;

        self.record_admin_event(
            actor,
            AuditAction::DeviceApproved,
            format!("Device {device_id} approved"),
        )
        .await?;

        Ok(device)
    }

    /// Deny a device by deleting its record outright.
    ///
    /// Denial is destructive, not a persisted "denied" state: a device that
    /// re-registers after denial is treated as brand-new and re-evaluated.
    pub async fn deny(&self, actor: &Actor, device_id: &DeviceId) -> Result<(), Error> {
        self.repositories.device().delete(device_id).await?;

        self.record_admin_event(
            actor,
            AuditAction::DeviceDenied,
            format!("Device {device_id} removed"),
        )
        .await?;

        Ok(())
    }

    /// Record that a user asked for their current device to be approved.
    pub async fn request_approval(&self, account: &Account, device: &Device) -> Result<(), Error> {
        let origin = self.signals.current_origin().await;
        self.repositories
            .audit()
            .append(
                AuditEvent::builder()
                    .timestamp(self.clock.now())
                    .account_id(account.id.clone())
                    .email(account.email.clone())
                    .action(AuditAction::DeviceApprovalRequested)
                    .details(format!("{}/{}", device.browser, device.os))
                    .ip(origin.ip.clone())
                    .location(origin.location())
                    .outcome(AuditOutcome::Success)
                    .build()?,
            )
            .await?;
        Ok(())
    }

    pub async fn list(&self) -> Result<Vec<Device>, Error> {
        self.repositories.device().list().await
    }

    pub async fn list_for_account(&self, account_id: &AccountId) -> Result<Vec<Device>, Error> {
        self.repositories.device().list_for_account(account_id).await
    }

    async fn record_admin_event(
        &self,
        actor: &Actor,
        action: AuditAction,
        details: String,
    ) -> Result<(), Error> {
        let origin = self.signals.current_origin().await;
        self.repositories
            .audit()
            .append(
                AuditEvent::builder()
                    .timestamp(self.clock.now())
                    .account_id(actor.account_id.clone())
                    .email(actor.email.clone())
                    .action(action)
                    .details(details)
                    .ip(origin.ip.clone())
                    .location(origin.location())
                    .outcome(AuditOutcome::Success)
                    .build()?,
            )
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        account::AccountStatus,
        clock::SystemClock,
        device::DevicePosture,
        signals::StaticSignalSource,
    };
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct MockDeviceRepository {
        devices: Mutex<HashMap<DeviceId, Device>>,
    }

    #[async_trait]
    impl DeviceRepository for MockDeviceRepository {
        async fn create_if_absent(&self, device: NewDevice) -> Result<(Device, bool), Error> {
            let mut devices = self.devices.lock().unwrap();
            if let Some(existing) = devices.values().find(|d| {
                d.account_id == device.account_id && d.fingerprint == device.fingerprint
            }) {
                return Ok((existing.clone(), false));
            }
            let device = device.into_device();
            devices.insert(device.id.clone(), device.clone());
            Ok((device, true))
        }

        async fn find_by_id(&self, id: &DeviceId) -> Result<Option<Device>, Error> {
            Ok(self.devices.lock().unwrap().get(id).cloned())
        }

        async fn find_by_fingerprint(
            &self,
            account_id: &AccountId,
            fingerprint: &str,
        ) -> Result<Option<Device>, Error> {
            Ok(self
                .devices
                .lock()
                .unwrap()
                .values()
                .find(|d| &d.account_id == account_id && d.fingerprint == fingerprint)
                .cloned())
        }

        async fn update(&self, device: &Device) -> Result<Device, Error> {
            let mut devices = self.devices.lock().unwrap();
            if !devices.contains_key(&device.id) {
                return Err(Error::Storage(StorageError::NotFound));
            }
            devices.insert(device.id.clone(), device.clone());
            Ok(device.clone())
        }

        async fn delete(&self, id: &DeviceId) -> Result<(), Error> {
            self.devices.lock().unwrap().remove(id);
            Ok(())
        }

        async fn list(&self) -> Result<Vec<Device>, Error> {
            Ok(self.devices.lock().unwrap().values().cloned().collect())
        }

        async fn list_for_account(&self, account_id: &AccountId) -> Result<Vec<Device>, Error> {
            Ok(self
                .devices
                .lock()
                .unwrap()
                .values()
                .filter(|d| &d.account_id == account_id)
                .cloned()
                .collect())
        }
    }

    struct MockAuditRepository {
        events: Mutex<Vec<AuditEvent>>,
    }

    #[async_trait]
    impl AuditRepository for MockAuditRepository {
        async fn append(&self, event: AuditEvent) -> Result<(), Error> {
            self.events.lock().unwrap().push(event);
            Ok(())
        }

        async fn recent(&self, limit: usize) -> Result<Vec<AuditEvent>, Error> {
            let events = self.events.lock().unwrap();
            Ok(events.iter().rev().take(limit).cloned().collect())
        }

        async fn recent_for_account(
            &self,
            account_id: &AccountId,
            limit: usize,
        ) -> Result<Vec<AuditEvent>, Error> {
            let events = self.events.lock().unwrap();
            Ok(events
                .iter()
                .rev()
                .filter(|e| e.account_id.as_ref() == Some(account_id))
                .take(limit)
                .cloned()
                .collect())
        }
    }

    struct MockProvider {
        devices: MockDeviceRepository,
        audit: MockAuditRepository,
    }

    impl MockProvider {
        fn new() -> Self {
            Self {
                devices: MockDeviceRepository {
                    devices: Mutex::new(HashMap::new()),
                },
                audit: MockAuditRepository {
                    events: Mutex::new(Vec::new()),
                },
            }
        }
    }

    impl DeviceRepositoryProvider for MockProvider {
        type DeviceRepo = MockDeviceRepository;

        fn device(&self) -> &Self::DeviceRepo {
            &self.devices
        }
    }

    impl AuditRepositoryProvider for MockProvider {
        type AuditRepo = MockAuditRepository;

        fn audit(&self) -> &Self::AuditRepo {
            &self.audit
        }
    }

    fn test_account() -> Account {
        let mut account = Account::builder()
            .full_name("Test User".to_string())
            .email("test@example.com".to_string())
            .mobile("+1234567890".to_string())
            .build()
            .unwrap();
        account.status = AccountStatus::Active;
        account
    }

    fn service(provider: Arc<MockProvider>) -> DeviceService<MockProvider> {
        DeviceService::new(
            provider,
            Arc::new(StaticSignalSource::default()),
            Arc::new(SystemClock),
        )
    }

    fn attestation() -> DeviceAttestation {
        DeviceAttestation {
            fingerprint: "fp_test".to_string(),
            posture: DevicePosture::healthy(),
        }
    }

    #[tokio::test]
    async fn test_register_if_absent_creates_once() {
        let provider = Arc::new(MockProvider::new());
        let service = service(provider.clone());
        let account = test_account();
        let client = ClientInfo::from_user_agent("Mozilla/5.0 (X11; Linux x86_64) Firefox/121.0");

        let (device, created) = service
            .register_if_absent(&account, &client, &attestation())
            .await
            .unwrap();
        assert!(created);
        assert!(!device.approved);
        assert_eq!(device.os, "Linux");
        assert_eq!(device.browser, "Firefox");

        let (again, created) = service
            .register_if_absent(&account, &client, &attestation())
            .await
            .unwrap();
        assert!(!created);
        assert_eq!(again.id, device.id);

        // Exactly one NEW_DEVICE event.
        let events = provider.audit.events.lock().unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].action, AuditAction::NewDevice);
        assert_eq!(events[0].details, "New device detected: Firefox on Linux");
    }

    #[tokio::test]
    async fn test_approve_records_approver() {
        let provider = Arc::new(MockProvider::new());
        let service = service(provider.clone());
        let account = test_account();
        let client = ClientInfo::unknown();

        let (device, _) = service
            .register_if_absent(&account, &client, &attestation())
            .await
            .unwrap();

        let admin = Actor {
            account_id: AccountId::new_random(),
            email: "admin@example.com".to_string(),
        };
        let approved = service.approve(&admin, &device.id).await.unwrap();
        assert!(approved.approved);
        assert_eq!(approved.approved_by, Some(admin.account_id.clone()));

        let events = provider.audit.events.lock().unwrap();
        assert_eq!(events.last().unwrap().action, AuditAction::DeviceApproved);
    }

    #[tokio::test]
    async fn test_deny_deletes_record() {
        let provider = Arc::new(MockProvider::new());
        let service = service(provider.clone());
        let account = test_account();
        let client = ClientInfo::unknown();

        let (device, _) = service
            .register_if_absent(&account, &client, &attestation())
            .await
            .unwrap();

        let admin = Actor {
            account_id: AccountId::new_random(),
            email: "admin@example.com".to_string(),
        };
        service.deny(&admin, &device.id).await.unwrap();

        // Destructive: the fingerprint resolves to nothing afterwards.
        let resolved = service.resolve(&account.id, "fp_test").await.unwrap();
        assert!(resolved.is_none());

        // A re-registration is treated as brand-new.
        let (_, created) = service
            .register_if_absent(&account, &client, &attestation())
            .await
            .unwrap();
        assert!(created);
    }

    #[tokio::test]
    async fn test_concurrent_first_sightings_audit_once() {
        let provider = Arc::new(MockProvider::new());
        let service = Arc::new(service(provider.clone()));
        let account = test_account();

        let mut handles = Vec::new();
        for _ in 0..8 {
            let service = service.clone();
            let account = account.clone();
            handles.push(tokio::spawn(async move {
                service
                    .register_if_absent(&account, &ClientInfo::unknown(), &attestation())
                    .await
            }));
        }

        let mut created = 0;
        for handle in handles {
            let (_, was_created) = handle.await.unwrap().unwrap();
            if was_created {
                created += 1;
            }
        }
        assert_eq!(created, 1);

        let events = provider.audit.events.lock().unwrap();
        let new_device_events = events
            .iter()
            .filter(|e| e.action == AuditAction::NewDevice)
            .count();
        assert_eq!(new_device_events, 1);
    }

    #[tokio::test]
    async fn test_approve_missing_device_fails() {
        let provider = Arc::new(MockProvider::new());
        let service = service(provider);
        let admin = Actor {
            account_id: AccountId::new_random(),
            email: "admin@example.com".to_string(),
        };

        let result = service.approve(&admin, &DeviceId::new_random()).await;
        assert!(matches!(
            result.unwrap_err(),
            Error::Storage(StorageError::NotFound)
        ));
    }
}
