//! System proposals and rules
//!
//! A proposal is a staged, not-yet-active rule inferred from a human's
//! resolution decision. Once approved it becomes a `SystemRule`, which
//! matchers read as additional input (vendor patterns, domain mappings,
//! suppressions) or which applies a one-time side effect (aliases).

use crate::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Category of a proposal / rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalKind {
    /// A free-text name always means this customer
    Alias,
    /// A counterparty substring maps to a vendor category
    VendorPattern,
    /// A meeting domain maps to a classification
    DomainMapping,
    /// Never suggest this (source, target) pairing again
    Suppression,
}

impl ProposalKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalKind::Alias => "alias",
            ProposalKind::VendorPattern => "vendor_pattern",
            ProposalKind::DomainMapping => "domain_mapping",
            ProposalKind::Suppression => "suppression",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "alias" => Ok(ProposalKind::Alias),
            "vendor_pattern" => Ok(ProposalKind::VendorPattern),
            "domain_mapping" => Ok(ProposalKind::DomainMapping),
            "suppression" => Ok(ProposalKind::Suppression),
            other => Err(Error::Validation(format!(
                "Unknown proposal kind: {}",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalStatus::Pending => "pending",
            ProposalStatus::Approved => "approved",
            ProposalStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self> {
        match s {
            "pending" => Ok(ProposalStatus::Pending),
            "approved" => Ok(ProposalStatus::Approved),
            "rejected" => Ok(ProposalStatus::Rejected),
            other => Err(Error::Validation(format!(
                "Unknown proposal status: {}",
                other
            ))),
        }
    }
}

/// How a meeting domain is classified
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeetingKind {
    /// Company-internal meeting
    Internal,
    /// Meeting with an existing customer
    Client,
    /// Prospect / sales meeting
    Sales,
    /// Not business-relevant (consumer mail domains etc.)
    Ignore,
}

impl MeetingKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MeetingKind::Internal => "internal",
            MeetingKind::Client => "client",
            MeetingKind::Sales => "sales",
            MeetingKind::Ignore => "ignore",
        }
    }
}

/// Structured rule body, one shape per proposal kind
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ProposalPayload {
    Alias {
        customer_id: Uuid,
        alias: String,
    },
    VendorPattern {
        pattern: String,
        category: String,
    },
    DomainMapping {
        domain: String,
        meeting_kind: MeetingKind,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        customer_id: Option<Uuid>,
    },
    Suppression {
        source_entity: String,
        target_id: Uuid,
        target_label: String,
    },
}

/// A staged, unapproved rule awaiting human review
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemProposal {
    pub id: Uuid,
    pub kind: ProposalKind,
    pub description: String,
    /// Structured justification: what triggered the proposal
    pub evidence: serde_json::Value,
    pub payload: ProposalPayload,
    /// Normalized dedup key; at most one pending proposal per (kind, pattern)
    pub pattern: String,
    pub status: ProposalStatus,
    pub source_item_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

/// An approved, active rule created from an approved proposal
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SystemRule {
    pub id: Uuid,
    pub kind: ProposalKind,
    pub payload: ProposalPayload,
    pub active: bool,
    pub source_proposal_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_tagged_serialization() {
        let payload = ProposalPayload::Suppression {
            source_entity: "ACME GLOBAL LLC".to_string(),
            target_id: Uuid::new_v4(),
            target_label: "Acme Corp".to_string(),
        };
        let json = serde_json::to_string(&payload).unwrap();
        assert!(json.contains("\"kind\":\"suppression\""));

        let back: ProposalPayload = serde_json::from_str(&json).unwrap();
        assert!(matches!(back, ProposalPayload::Suppression { .. }));
    }

    #[test]
    fn test_kind_round_trip() {
        for kind in [
            ProposalKind::Alias,
            ProposalKind::VendorPattern,
            ProposalKind::DomainMapping,
            ProposalKind::Suppression,
        ] {
            assert_eq!(ProposalKind::parse(kind.as_str()).unwrap(), kind);
        }
    }
}
