//! Vendor categorization
//!
//! Configured vendor-pattern rules (learned through the proposal workflow)
//! take precedence; a small keyword heuristic catches the common payroll
//! and software platforms when no rule exists yet.

use super::similarity::fold;
use opsd_common::model::VendorRule;
use serde::Serialize;
use uuid::Uuid;

/// Confidence carried by a configured pattern rule
const PATTERN_RULE_CONFIDENCE: i64 = 95;
/// Confidence of the keyword fallback
const KEYWORD_CONFIDENCE: i64 = 70;

/// Payroll/contractor platforms; spend here is engineering labor
const LABOR_KEYWORDS: &[&str] = &["gusto", "deel", "rippling", "justworks", "remote.com", "payroll"];

/// Software platforms
const SOFTWARE_KEYWORDS: &[&str] = &[
    "amazon web services",
    "aws",
    "google cloud",
    "microsoft",
    "github",
    "atlassian",
    "slack",
    "notion",
    "figma",
    "zoom",
    "datadog",
    "openai",
];

pub const CATEGORY_LABOR: &str = "labor";
pub const CATEGORY_SOFTWARE: &str = "software";

/// One vendor categorization candidate
#[derive(Debug, Clone, Serialize)]
pub struct VendorMatch {
    pub category: String,
    /// Set when a configured rule matched, for provenance
    pub rule_id: Option<Uuid>,
    pub confidence: i64,
    pub matched_on: &'static str,
}

/// Categorize a vendor counterparty string
///
/// Empty result when neither a rule nor a keyword matches.
pub fn categorize_vendor(counterparty: &str, rules: &[VendorRule]) -> Vec<VendorMatch> {
    let folded = fold(counterparty);
    if folded.is_empty() {
        return Vec::new();
    }

    let mut results: Vec<VendorMatch> = rules
        .iter()
        .filter(|rule| {
            let pattern = fold(&rule.pattern);
            !pattern.is_empty() && folded.contains(&pattern)
        })
        .map(|rule| VendorMatch {
            category: rule.category.clone(),
            rule_id: Some(rule.id),
            confidence: PATTERN_RULE_CONFIDENCE,
            matched_on: "pattern_rule",
        })
        .collect();

    if results.is_empty() {
        if LABOR_KEYWORDS.iter().any(|k| folded.contains(k)) {
            results.push(VendorMatch {
                category: CATEGORY_LABOR.to_string(),
                rule_id: None,
                confidence: KEYWORD_CONFIDENCE,
                matched_on: "keyword",
            });
        } else if SOFTWARE_KEYWORDS.iter().any(|k| folded.contains(k)) {
            results.push(VendorMatch {
                category: CATEGORY_SOFTWARE.to_string(),
                rule_id: None,
                confidence: KEYWORD_CONFIDENCE,
                matched_on: "keyword",
            });
        }
    }

    results.sort_by(|a, b| {
        b.confidence
            .cmp(&a.confidence)
            .then_with(|| a.category.cmp(&b.category))
    });
    results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rule(pattern: &str, category: &str) -> VendorRule {
        VendorRule {
            id: Uuid::new_v4(),
            pattern: pattern.to_string(),
            category: category.to_string(),
        }
    }

    #[test]
    fn test_pattern_rule_first() {
        let rules = vec![rule("amazon web services", "software")];

        let results = categorize_vendor("Amazon Web Services Monthly", &rules);
        assert_eq!(results[0].category, "software");
        assert_eq!(results[0].confidence, 95);
        assert_eq!(results[0].rule_id, Some(rules[0].id));
        assert_eq!(results[0].matched_on, "pattern_rule");
    }

    #[test]
    fn test_keyword_fallback_labor() {
        let results = categorize_vendor("GUSTO PAYROLL 8821", &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].category, CATEGORY_LABOR);
        assert_eq!(results[0].confidence, 70);
        assert!(results[0].rule_id.is_none());
    }

    #[test]
    fn test_keyword_fallback_software() {
        let results = categorize_vendor("GITHUB INC", &[]);
        assert_eq!(results[0].category, CATEGORY_SOFTWARE);
        assert_eq!(results[0].confidence, 70);
    }

    #[test]
    fn test_rule_beats_keyword() {
        let rules = vec![rule("github", "devtools")];
        let results = categorize_vendor("GITHUB INC", &rules);
        assert_eq!(results[0].category, "devtools");
        assert_eq!(results[0].confidence, 95);
    }

    #[test]
    fn test_no_match_is_empty() {
        assert!(categorize_vendor("UNKNOWN VENDOR 42", &[]).is_empty());
        assert!(categorize_vendor("", &[]).is_empty());
    }
}
