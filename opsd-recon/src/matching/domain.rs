//! Meeting domain classification
//!
//! Decides whether a calendar attendee domain is internal, an existing
//! client, a sales prospect, or noise. Explicit mappings (human-approved
//! rules) always win; the heuristics below them are ordered by decreasing
//! certainty. An unknown external domain defaults to `sales` at a
//! confidence low enough that it always lands in front of a human.

use super::similarity::fold;
use opsd_common::model::{DomainMapping, MatchableCustomer, MeetingKind};
use serde::Serialize;
use uuid::Uuid;

/// Generic consumer mail providers; meetings from these carry no signal
pub const NON_BUSINESS_DOMAINS: &[&str] = &[
    "gmail.com",
    "google.com",
    "googlemail.com",
    "yahoo.com",
    "hotmail.com",
    "outlook.com",
    "live.com",
    "msn.com",
    "aol.com",
    "icloud.com",
    "me.com",
    "protonmail.com",
    "proton.me",
    "gmx.com",
];

const MAPPING_CONFIDENCE: i64 = 100;
const INTERNAL_CONFIDENCE: i64 = 95;
const NON_BUSINESS_CONFIDENCE: i64 = 90;
const CUSTOMER_NAME_CONFIDENCE: i64 = 85;
/// Low enough that an unknown domain is never auto-resolved
const DEFAULT_SALES_CONFIDENCE: i64 = 50;

/// Domain classification result
#[derive(Debug, Clone, Serialize)]
pub struct DomainClassification {
    pub meeting_kind: MeetingKind,
    pub customer_id: Option<Uuid>,
    pub confidence: i64,
    pub matched_on: &'static str,
}

/// Classify a meeting domain
///
/// Returns `None` only for an empty domain; anything else classifies, if
/// nothing better than the sales-prospect default.
pub fn classify_domain(
    domain: &str,
    company_domain: &str,
    customers: &[MatchableCustomer],
    mappings: &[DomainMapping],
) -> Option<DomainClassification> {
    let domain = fold(domain);
    if domain.is_empty() {
        return None;
    }

    if let Some(mapping) = mappings.iter().find(|m| fold(&m.domain) == domain) {
        return Some(DomainClassification {
            meeting_kind: mapping.meeting_kind,
            customer_id: mapping.customer_id,
            confidence: MAPPING_CONFIDENCE,
            matched_on: "mapping",
        });
    }

    if !company_domain.trim().is_empty() && domain == fold(company_domain) {
        return Some(DomainClassification {
            meeting_kind: MeetingKind::Internal,
            customer_id: None,
            confidence: INTERNAL_CONFIDENCE,
            matched_on: "company_domain",
        });
    }

    if NON_BUSINESS_DOMAINS.contains(&domain.as_str()) {
        return Some(DomainClassification {
            meeting_kind: MeetingKind::Ignore,
            customer_id: None,
            confidence: NON_BUSINESS_CONFIDENCE,
            matched_on: "non_business",
        });
    }

    // Heuristic: strip the TLD and look for the base token in a customer
    // display name ("nourihealth.com" -> "nourihealth")
    let base = domain.split('.').next().unwrap_or("");
    if !base.is_empty() {
        for customer in customers {
            let name = fold(&customer.name);
            let squashed: String = name.chars().filter(|c| !c.is_whitespace()).collect();
            if name.split_whitespace().any(|token| token == base) || squashed == base {
                return Some(DomainClassification {
                    meeting_kind: MeetingKind::Client,
                    customer_id: Some(customer.id),
                    confidence: CUSTOMER_NAME_CONFIDENCE,
                    matched_on: "customer_name",
                });
            }
        }
    }

    Some(DomainClassification {
        meeting_kind: MeetingKind::Sales,
        customer_id: None,
        confidence: DEFAULT_SALES_CONFIDENCE,
        matched_on: "default",
    })
}
