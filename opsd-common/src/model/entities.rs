//! Read-only snapshots of canonical entities used as matcher input
//!
//! Matchers never mutate these; canonical records change only through the
//! side-effect appliers and proposal approval, always inside the same
//! transaction as the resolution or proposal driving the change.

use super::proposal::MeetingKind;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Customer snapshot for the matching candidate pool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchableCustomer {
    pub id: Uuid,
    pub name: String,
    /// Name as it appears on bank statements, once learned
    pub bank_name: Option<String>,
    /// Alternate free-text identifiers learned over time
    pub aliases: Vec<String>,
    pub email_domain: Option<String>,
    /// Name used in the sales spreadsheet
    pub sheet_name: Option<String>,
}

/// Team member snapshot for split attribution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchableTeamMember {
    pub id: Uuid,
    pub name: String,
}

/// Active vendor categorization rule, projected from `system_rules`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorRule {
    pub id: Uuid,
    pub pattern: String,
    pub category: String,
}

/// Active suppression rule: never suggest `target_id` for `source_entity`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionRule {
    pub source_entity: String,
    pub target_id: Uuid,
}

/// Explicit domain classification, projected from `system_rules`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DomainMapping {
    pub domain: String,
    pub meeting_kind: MeetingKind,
    pub customer_id: Option<Uuid>,
}
