//! Policy evaluation.
//!
//! Maps a risk score to a three-way decision and derives the human-readable
//! reason list. Reasons are checked independently of which scoring terms
//! fired, so the list may be non-empty even when the decision is allow.

use serde::{Deserialize, Serialize};

use crate::{
    risk::{is_high_risk_country, is_suspicious_isp, risk_score},
    signals::SignalSnapshot,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyDecision {
    Allow,
    StepUpMfa,
    Block,
}

impl std::fmt::Display for PolicyDecision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PolicyDecision::Allow => write!(f, "ALLOW"),
            PolicyDecision::StepUpMfa => write!(f, "STEP_UP_MFA"),
            PolicyDecision::Block => write!(f, "BLOCK"),
        }
    }
}

/// Outcome of one policy evaluation, including the signal snapshot that
/// produced it. Ephemeral, but callers may persist the last result alongside
/// session state for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyResult {
    pub decision: PolicyDecision,
    pub risk_score: u8,
    pub reasons: Vec<String>,
    pub signals: SignalSnapshot,
}

/// Map a score to a decision: `..=30` allow, `31..=60` step-up, `61..` block.
pub fn decide(score: u8) -> PolicyDecision {
    if score <= 30 {
        PolicyDecision::Allow
    } else if score <= 60 {
        PolicyDecision::StepUpMfa
    } else {
        PolicyDecision::Block
    }
}

/// Score the snapshot, decide, and derive reasons.
pub fn evaluate(signals: SignalSnapshot) -> PolicyResult {
    let score = risk_score(&signals);
    let decision = decide(score);

    let mut reasons = Vec::new();
    if score > 60 {
        reasons.push("Risk score exceeds threshold".to_string());
    }
    if !signals.device_approved {
        reasons.push("Device not approved".to_string());
    }
    if signals.failed_attempts > 2 {
        reasons.push("Multiple failed login attempts".to_string());
    }
    if !signals.posture.antivirus_present {
        reasons.push("No antivirus detected".to_string());
    }
    if !signals.posture.disk_encrypted {
        reasons.push("Disk not encrypted".to_string());
    }
    if is_high_risk_country(&signals.origin.country) {
        reasons.push("High-risk location".to_string());
    }
    if is_suspicious_isp(&signals.origin.isp) {
        reasons.push("Suspicious ISP/VPN detected".to_string());
    }

    PolicyResult {
        decision,
        risk_score: score,
        reasons,
        signals,
    }
}
