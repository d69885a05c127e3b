//! Fuzzy matching between free-text identifiers and canonical entities
//!
//! Matchers are pure: they take one free-text value plus a candidate pool
//! and return ranked results with provenance. Anything at or below the
//! confidence floor is noise and is omitted entirely, not ranked low.

pub mod customer;
pub mod domain;
pub mod similarity;
pub mod vendor;

pub use customer::{match_customer, match_sheet_customer};
pub use domain::{classify_domain, DomainClassification};
pub use vendor::{categorize_vendor, VendorMatch};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Results at or below this confidence are dropped from matcher output
pub const MIN_MATCH_CONFIDENCE: i64 = 30;

/// Which matching strategy produced a result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchStrategy {
    /// Counterparty contained in (or containing) the learned bank name
    BankName,
    /// Counterparty contained in a learned alias
    Alias,
    /// Blended fuzzy score against the display name
    NameFuzzy,
    /// Blended fuzzy score against the spreadsheet name
    SheetNameFuzzy,
    /// Exact spreadsheet-name match
    SheetNameExact,
    /// Exact display-name match
    NameExact,
    /// Exact alias match
    AliasExact,
}

impl MatchStrategy {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStrategy::BankName => "bank_name",
            MatchStrategy::Alias => "alias",
            MatchStrategy::NameFuzzy => "name_fuzzy",
            MatchStrategy::SheetNameFuzzy => "sheet_name_fuzzy",
            MatchStrategy::SheetNameExact => "sheet_name_exact",
            MatchStrategy::NameExact => "name_exact",
            MatchStrategy::AliasExact => "alias_exact",
        }
    }
}

/// One ranked match candidate
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResult {
    pub id: Uuid,
    pub label: String,
    pub confidence: i64,
    pub matched_on: MatchStrategy,
}

impl From<&MatchResult> for opsd_common::model::SuggestedMatch {
    fn from(m: &MatchResult) -> Self {
        Self {
            id: m.id,
            label: m.label.clone(),
            confidence: m.confidence,
            matched_on: m.matched_on.as_str().to_string(),
        }
    }
}

/// Sort descending by confidence; ties break on label for determinism
pub(crate) fn rank(mut results: Vec<MatchResult>) -> Vec<MatchResult> {
    results.retain(|r| r.confidence > MIN_MATCH_CONFIDENCE);
    results.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.label.cmp(&b.label))
    });
    results
}
