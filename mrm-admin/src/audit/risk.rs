//! Risk classification for audited actions
//!
//! Action types are free-form strings such as `"delete_royalty"` or
//! `"update_contract"`. Each maps onto a closed [`ActionKind`], and each kind
//! onto a fixed [`RiskLevel`]. An explicit override always wins.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Coarse compliance classification, ordered from least to most severe
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskLevel::Low => "low",
            RiskLevel::Medium => "medium",
            RiskLevel::High => "high",
            RiskLevel::Critical => "critical",
        }
    }

    /// High and critical entries surface in the high-risk review queue
    pub fn is_high_risk(&self) -> bool {
        *self >= RiskLevel::High
    }
}

impl fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RiskLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(RiskLevel::Low),
            "medium" => Ok(RiskLevel::Medium),
            "high" => Ok(RiskLevel::High),
            "critical" => Ok(RiskLevel::Critical),
            other => Err(format!("unknown risk level '{}'", other)),
        }
    }
}

/// What an action does to the resource it touches
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionKind {
    Create,
    Update,
    Delete,
    Export,
    Import,
    Read,
}

/// Keyword table, checked in order. Destructive keywords come first so
/// `"delete_and_recreate"` is a delete.
const KIND_KEYWORDS: [(&str, ActionKind); 5] = [
    ("delete", ActionKind::Delete),
    ("update", ActionKind::Update),
    ("create", ActionKind::Create),
    ("export", ActionKind::Export),
    ("import", ActionKind::Import),
];

impl ActionKind {
    /// Classify a free-form action type; anything unrecognised is a read
    pub fn from_action_type(action_type: &str) -> Self {
        let lowered = action_type.to_ascii_lowercase();
        KIND_KEYWORDS
            .iter()
            .find(|(keyword, _)| lowered.contains(keyword))
            .map(|(_, kind)| *kind)
            .unwrap_or(ActionKind::Read)
    }

    pub fn risk_level(&self) -> RiskLevel {
        match self {
            ActionKind::Delete => RiskLevel::High,
            ActionKind::Create | ActionKind::Update | ActionKind::Export | ActionKind::Import => {
                RiskLevel::Medium
            }
            ActionKind::Read => RiskLevel::Low,
        }
    }
}

/// Resolve the risk level recorded for an action
pub fn classify(action_type: &str, override_level: Option<RiskLevel>) -> RiskLevel {
    override_level.unwrap_or_else(|| ActionKind::from_action_type(action_type).risk_level())
}

/// Risk level for a failed action: at least medium
pub fn escalate_for_failure(level: RiskLevel) -> RiskLevel {
    level.max(RiskLevel::Medium)
}
