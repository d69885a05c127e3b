//! Resolution queue types
//!
//! A `ResolutionItem` is one ambiguous cross-reference (a bank counterparty
//! string, a proposed payment split) waiting for either automatic or human
//! resolution. Items are unique per `(kind, source_entity)` so the same
//! free-text value is never queued twice.

use crate::{Error, Result};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of cross-reference a resolution item represents
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionKind {
    /// Assign a bank counterparty string to a customer
    CustomerMatch,
    /// Split a payment across team members
    EngineerSplit,
}

impl ResolutionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionKind::CustomerMatch => "customer_match",
            ResolutionKind::EngineerSplit => "engineer_split",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "customer_match" => Ok(ResolutionKind::CustomerMatch),
            "engineer_split" => Ok(ResolutionKind::EngineerSplit),
            other => Err(Error::Validation(format!(
                "Unknown resolution kind: {}",
                other
            ))),
        }
    }
}

/// Resolution item status
///
/// One-way state machine: `pending` moves to exactly one of the other three
/// states and never back. `auto_resolved` is reached only at creation time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    Pending,
    AutoResolved,
    Confirmed,
    Rejected,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResolutionStatus::Pending => "pending",
            ResolutionStatus::AutoResolved => "auto_resolved",
            ResolutionStatus::Confirmed => "confirmed",
            ResolutionStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ResolutionStatus::Pending),
            "auto_resolved" => Ok(ResolutionStatus::AutoResolved),
            "confirmed" => Ok(ResolutionStatus::Confirmed),
            "rejected" => Ok(ResolutionStatus::Rejected),
            other => Err(Error::Validation(format!(
                "Unknown resolution status: {}",
                other
            ))),
        }
    }

    /// Terminal states admit no further transitions
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ResolutionStatus::Pending)
    }
}

/// Interface through which a human decision was submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Channel {
    Dashboard,
    Voice,
    Cli,
    Chat,
}

impl Channel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Dashboard => "dashboard",
            Channel::Voice => "voice",
            Channel::Cli => "cli",
            Channel::Chat => "chat",
        }
    }
}

/// `resolved_via` value recorded for automatic resolution
pub const RESOLVED_VIA_SYSTEM: &str = "system";

/// What the reviewer (or the system) decided
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    /// Accept the suggested match
    Approve,
    /// Discard the suggestion; the item stays resolved as rejected
    Reject,
    /// Leave the item pending for a later pass
    Skip,
    /// Resolve with an explicitly supplied target instead of the suggestion
    Manual,
}

/// A resolution decision submitted through any channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Decision {
    pub action: DecisionAction,
    /// Target customer for `customer_match` (defaults to the suggestion on approve)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<Uuid>,
    /// Explicit bank-statement name to record instead of the raw source entity
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_name: Option<String>,
    /// Per-member amounts for `engineer_split`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub engineer_splits: Option<Vec<EngineerSplit>>,
}

/// One team member's share of a split payment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineerSplit {
    pub team_member_id: Uuid,
    pub amount: f64,
}

/// Best-guess match attached to a resolution item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuggestedMatch {
    pub id: Uuid,
    pub label: String,
    pub confidence: i64,
    pub matched_on: String,
}

/// Kind-specific payload carried by a resolution item
///
/// Stored as a tagged JSON column; each kind has exactly one shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ResolutionContext {
    CustomerMatch {
        amount: f64,
        posted_at: NaiveDate,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        memo: Option<String>,
    },
    EngineerSplit {
        transaction_ids: Vec<Uuid>,
        total_amount: f64,
    },
}

/// A queued ambiguous cross-reference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionItem {
    pub id: Uuid,
    pub kind: ResolutionKind,
    pub source_entity: String,
    pub suggested_match: Option<SuggestedMatch>,
    pub confidence: i64,
    pub context: Option<ResolutionContext>,
    pub status: ResolutionStatus,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_via: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_round_trip() {
        for kind in [ResolutionKind::CustomerMatch, ResolutionKind::EngineerSplit] {
            assert_eq!(ResolutionKind::parse(kind.as_str()).unwrap(), kind);
        }
        assert!(ResolutionKind::parse("vendor_match").is_err());
    }

    #[test]
    fn test_status_terminality() {
        assert!(!ResolutionStatus::Pending.is_terminal());
        assert!(ResolutionStatus::AutoResolved.is_terminal());
        assert!(ResolutionStatus::Confirmed.is_terminal());
        assert!(ResolutionStatus::Rejected.is_terminal());
    }

    #[test]
    fn test_context_tagged_serialization() {
        let ctx = ResolutionContext::EngineerSplit {
            transaction_ids: vec![Uuid::new_v4()],
            total_amount: 4200.0,
        };
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"kind\":\"engineer_split\""));

        let back: ResolutionContext = serde_json::from_str(&json).unwrap();
        match back {
            ResolutionContext::EngineerSplit { total_amount, .. } => {
                assert_eq!(total_amount, 4200.0)
            }
            _ => panic!("wrong variant"),
        }
    }
}
