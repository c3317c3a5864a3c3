//! Free-trial eligibility.
//!
//! Evaluates signals that were gathered elsewhere (stored fraud-check
//! records, device fingerprints). Unknown signals, and failures while
//! gathering them, allow the trial.

use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Prior-trial signals for a signup. `None` means the signal is unknown.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrialSignals {
    #[serde(default)]
    pub email_used_trial: Option<bool>,
    #[serde(default)]
    pub device_used_trial: Option<bool>,
    #[serde(default)]
    pub ip_used_trial: Option<bool>,
}

/// Which signal blocked a trial.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DenyReason {
    EmailUsedTrial,
    DeviceUsedTrial,
    IpUsedTrial,
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DenyReason::EmailUsedTrial => write!(f, "a trial was already used with this email"),
            DenyReason::DeviceUsedTrial => write!(f, "a trial was already used on this device"),
            DenyReason::IpUsedTrial => {
                write!(f, "a trial was already used from this network address")
            }
        }
    }
}

/// Outcome of a trial eligibility check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "decision", content = "reason", rename_all = "lowercase")]
pub enum TrialDecision {
    Allow,
    Deny(DenyReason),
}

impl TrialDecision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, TrialDecision::Allow)
    }
}

/// Decide from gathered signals. Checks email, then device, then IP.
pub fn evaluate_trial(signals: &TrialSignals) -> TrialDecision {
    let checks = [
        (signals.email_used_trial, DenyReason::EmailUsedTrial),
        (signals.device_used_trial, DenyReason::DeviceUsedTrial),
        (signals.ip_used_trial, DenyReason::IpUsedTrial),
    ];

    for (signal, reason) in checks {
        if signal == Some(true) {
            info!("Trial denied: {}", reason);
            return TrialDecision::Deny(reason);
        }
    }

    if checks.iter().any(|(signal, _)| signal.is_none()) {
        info!("Trial allowed with incomplete signals: {:?}", signals);
    }
    TrialDecision::Allow
}

/// Decide from the result of gathering signals.
///
/// A failed gathering step allows the trial.
// TODO: fail-open is pending product review; switch to a manual-review
// decision here if the policy changes.
pub fn evaluate_trial_outcome<E: fmt::Display>(gathered: Result<TrialSignals, E>) -> TrialDecision {
    match gathered {
        Ok(signals) => evaluate_trial(&signals),
        Err(e) => {
            warn!("Trial signal check failed, allowing trial: {}", e);
            TrialDecision::Allow
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_signals_allow() {
        let signals = TrialSignals {
            email_used_trial: Some(false),
            device_used_trial: Some(false),
            ip_used_trial: Some(false),
        };
        assert_eq!(evaluate_trial(&signals), TrialDecision::Allow);
    }

    #[test]
    fn test_any_prior_use_denies() {
        let signals = TrialSignals {
            ip_used_trial: Some(true),
            ..TrialSignals::default()
        };
        assert_eq!(
            evaluate_trial(&signals),
            TrialDecision::Deny(DenyReason::IpUsedTrial)
        );
    }

    #[test]
    fn test_email_reason_takes_precedence() {
        let signals = TrialSignals {
            email_used_trial: Some(true),
            device_used_trial: Some(true),
            ip_used_trial: Some(true),
        };
        assert_eq!(
            evaluate_trial(&signals),
            TrialDecision::Deny(DenyReason::EmailUsedTrial)
        );
    }

    #[test]
    fn test_unknown_signals_fail_open() {
        assert!(evaluate_trial(&TrialSignals::default()).is_allowed());
    }

    #[test]
    fn test_gathering_error_fails_open() {
        let gathered: Result<TrialSignals, String> = Err("store offline".to_string());
        assert_eq!(evaluate_trial_outcome(gathered), TrialDecision::Allow);

        let gathered: Result<TrialSignals, String> = Ok(TrialSignals {
            device_used_trial: Some(true),
            ..TrialSignals::default()
        });
        assert_eq!(
            evaluate_trial_outcome(gathered),
            TrialDecision::Deny(DenyReason::DeviceUsedTrial)
        );
    }

    #[test]
    fn test_signals_from_partial_json() {
        let signals: TrialSignals = serde_json::from_str(r#"{"email_used_trial": false}"#).unwrap();
        assert_eq!(signals.email_used_trial, Some(false));
        assert_eq!(signals.ip_used_trial, None);
    }
}
