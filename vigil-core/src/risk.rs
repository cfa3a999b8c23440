//! Risk scoring.
//!
//! A pure, deterministic mapping from a [`SignalSnapshot`] to an integer
//! score in `[0, 100]`. Contributions are additive and independent: every
//! applicable term always adds, with no early exit, and the sum is clamped
//! to 100.

use chrono::Timelike;

use crate::signals::SignalSnapshot;

/// Countries whose origin adds a fixed geographic risk term.
pub const HIGH_RISK_COUNTRIES: [&str; 5] = ["Russia", "China", "North Korea", "Iran", "Syria"];

/// Case-insensitive substrings marking an ISP/org as an anonymizing or
/// hosting provider.
pub const SUSPICIOUS_ISP_MARKERS: [&str; 4] = ["tor", "vpn", "proxy", "hosting"];

pub fn is_high_risk_country(country: &str) -> bool {
    HIGH_RISK_COUNTRIES.contains(&country)
}

pub fn is_suspicious_isp(isp: &str) -> bool {
    let isp = isp.to_lowercase();
    SUSPICIOUS_ISP_MARKERS.iter().any(|m| isp.contains(m))
}

/// Compute the risk score for one attempt.
///
/// | signal | contribution |
/// |---|---|
/// | high-risk country | +30 |
/// | failed attempts | +min(attempts * 10, 30) |
/// | device not approved | +15 |
/// | OS not updated | +8 |
/// | no antivirus | +10 |
/// | disk not encrypted | +7 |
/// | screen lock disabled | +5 |
/// | hour < 6 or > 22 | +10 |
/// | suspicious ISP | +15 |
pub fn risk_score(signals: &SignalSnapshot) -> u8 {
    let mut score: u32 = 0;

    if is_high_risk_country(&signals.origin.country) {
        score += 30;
    }

    score += (signals.failed_attempts * 10).min(30);

    if !signals.device_approved {
        score += 15;
    }

    if !signals.posture.os_updated {
        score += 8;
    }
    if !signals.posture.antivirus_present {
        score += 10;
    }
    if !signals.posture.disk_encrypted {
        score += 7;
    }
    if !signals.posture.screen_lock_enabled {
        score += 5;
    }

    let hour = signals.login_time.hour();
    if hour < 6 || hour > 22 {
        score += 10;
    }

    if is_suspicious_isp(&signals.origin.isp) {
        score += 15;
    }

    score.min(100) as u8
}
