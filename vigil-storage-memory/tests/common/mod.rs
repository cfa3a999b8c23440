//! Shared fixtures for the end-to-end flow tests: a settable clock, a
//! capturing notification sink, and a fully wired engine over MemoryStorage.

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use vigil_core::{
    AuthConfig, AuthService, Clock, ClientInfo, DeviceAttestation, DevicePosture, NetworkOrigin,
    NotificationSink, OtpChannel, OtpPurpose, StaticSignalSource,
};
use vigil_storage_memory::MemoryStorage;

pub struct TestClock {
    now: Mutex<DateTime<Utc>>,
}

impl TestClock {
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Mutex::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap();
        *now += by;
    }
}

impl Clock for TestClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock().unwrap()
    }
}

/// Notification sink that records deliveries instead of sending them.
#[derive(Default)]
pub struct CapturingNotifier {
    pub deliveries: Mutex<Vec<(String, String)>>,
}

impl CapturingNotifier {
    pub fn last_code(&self) -> String {
        self.deliveries
            .lock()
            .unwrap()
            .last()
            .map(|(_, code)| code.clone())
            .expect("no passcode was delivered")
    }

    pub fn delivery_count(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl NotificationSink for CapturingNotifier {
    async fn deliver(
        &self,
        destination: &str,
        code: &str,
        _purpose: OtpPurpose,
        _channel: OtpChannel,
    ) {
        self.deliveries
            .lock()
            .unwrap()
            .push((destination.to_string(), code.to_string()));
    }
}

pub struct TestHarness {
    pub auth: AuthService<MemoryStorage>,
    pub storage: Arc<MemoryStorage>,
    pub notifier: Arc<CapturingNotifier>,
    pub clock: Arc<TestClock>,
}

/// A benign origin: known ISP, low-risk country, working hours.
pub fn clean_origin() -> NetworkOrigin {
    NetworkOrigin {
        ip: "203.0.113.7".to_string(),
        country: "United States".to_string(),
        city: "Boston".to_string(),
        region: "MA".to_string(),
        isp: "Comcast".to_string(),
        timezone: "America/New_York".to_string(),
        lat: 42.36,
        lon: -71.06,
    }
}

/// An origin that should trip the geographic and ISP risk terms.
pub fn risky_origin() -> NetworkOrigin {
    NetworkOrigin {
        ip: "198.51.100.23".to_string(),
        country: "Russia".to_string(),
        city: "Moscow".to_string(),
        region: String::new(),
        isp: "SomeVPN Hosting".to_string(),
        timezone: "Europe/Moscow".to_string(),
        lat: 55.75,
        lon: 37.62,
    }
}

pub fn healthy_attestation(fingerprint: &str) -> DeviceAttestation {
    DeviceAttestation {
        fingerprint: fingerprint.to_string(),
        posture: DevicePosture::healthy(),
    }
}

/// 14:00 UTC on a Monday, inside working hours, so the off-hours term
/// contributes nothing unless a test moves the clock.
pub fn start_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 6, 2, 14, 0, 0).unwrap()
}

pub fn harness(origin: NetworkOrigin) -> TestHarness {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();

    let storage = Arc::new(MemoryStorage::new());
    let notifier = Arc::new(CapturingNotifier::default());
    let clock = Arc::new(TestClock::new(start_time()));
    let client = ClientInfo::from_user_agent(
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) Chrome/120.0 Safari/537.36",
    );

    let auth = AuthService::new(
        storage.clone(),
        Arc::new(StaticSignalSource::new(origin, client)),
        notifier.clone(),
        clock.clone(),
        AuthConfig::default(),
    );

    TestHarness {
        auth,
        storage,
        notifier,
        clock,
    }
}
