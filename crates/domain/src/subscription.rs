use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::DomainError;

/// Notification preference of a user for a section or a comment thread.
///
/// `Default` is never stored: it marks the absence of an override and only
/// takes part in resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionStatus {
    Default,
    Off,
    Immediate,
    #[serde(rename = "digests")]
    DailyDigest,
}

impl SubscriptionStatus {
    /// Storage code. `Default` has none.
    pub fn code(&self) -> Option<i64> {
        match self {
            SubscriptionStatus::Default => None,
            SubscriptionStatus::Off => Some(0),
            SubscriptionStatus::Immediate => Some(1),
            SubscriptionStatus::DailyDigest => Some(2),
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(SubscriptionStatus::Off),
            1 => Some(SubscriptionStatus::Immediate),
            2 => Some(SubscriptionStatus::DailyDigest),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionStatus::Default => "default",
            SubscriptionStatus::Off => "off",
            SubscriptionStatus::Immediate => "immediate",
            SubscriptionStatus::DailyDigest => "digests",
        }
    }

    /// Users with this status receive notifications.
    pub fn notifies(&self) -> bool {
        matches!(
            self,
            SubscriptionStatus::Immediate | SubscriptionStatus::DailyDigest
        )
    }
}

impl FromStr for SubscriptionStatus {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "default" => Ok(SubscriptionStatus::Default),
            "off" => Ok(SubscriptionStatus::Off),
            "immediate" => Ok(SubscriptionStatus::Immediate),
            "digests" => Ok(SubscriptionStatus::DailyDigest),
            other => Err(DomainError::InvalidSubscription(other.to_string())),
        }
    }
}

impl fmt::Display for SubscriptionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_and_formats_the_same_names() {
        for status in [
            SubscriptionStatus::Default,
            SubscriptionStatus::Off,
            SubscriptionStatus::Immediate,
            SubscriptionStatus::DailyDigest,
        ] {
            assert_eq!(status.as_str().parse::<SubscriptionStatus>().unwrap(), status);
        }
        assert!("weekly".parse::<SubscriptionStatus>().is_err());
    }

    #[test]
    fn default_has_no_storage_code() {
        assert_eq!(SubscriptionStatus::Default.code(), None);
        assert_eq!(SubscriptionStatus::from_code(2), Some(SubscriptionStatus::DailyDigest));
        assert_eq!(SubscriptionStatus::from_code(-1), None);
    }
}
