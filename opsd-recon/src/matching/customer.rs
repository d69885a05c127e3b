//! Customer matching
//!
//! Two entry points against the same candidate pool: `match_customer` for
//! bank counterparty strings and `match_sheet_customer` for sales
//! spreadsheet names. The spreadsheet variant trusts exact identifiers
//! first (the sheet name is the most authoritative identifier for that
//! source) and only then falls back to the shared fuzzy ladder.

use super::similarity::{
    blended_confidence, edit_distance_score, fold, normalize, substring_score,
    token_overlap_score,
};
use super::{rank, MatchResult, MatchStrategy};
use opsd_common::model::{MatchableCustomer, SuppressionRule};

/// Confidence for a literal counterparty-in-bank-name containment
const BANK_NAME_EXACT_CONFIDENCE: i64 = 95;
/// Confidence for a counterparty/alias containment
const ALIAS_CONFIDENCE: i64 = 93;
/// Exact-tier confidences for spreadsheet names
const SHEET_EXACT_CONFIDENCE: i64 = 100;
const NAME_EXACT_CONFIDENCE: i64 = 98;
const ALIAS_EXACT_CONFIDENCE: i64 = 95;
/// Fuzzy fallbacks only run while the best score sits below this bar
const FUZZY_FALLBACK_BAR: i64 = 90;

/// Match a bank counterparty string against the customer pool
///
/// Strategy order per candidate: learned bank name, learned aliases, then
/// (only while the best is still uncertain) blended fuzzy scores against
/// the display name and the spreadsheet name. Suppression rules remove a
/// `(source, target)` pairing from the output entirely.
pub fn match_customer(
    counterparty: &str,
    customers: &[MatchableCustomer],
    suppressions: &[SuppressionRule],
) -> Vec<MatchResult> {
    let query = normalize(counterparty);
    if query.is_empty() {
        return Vec::new();
    }

    let mut results = Vec::new();
    for customer in customers {
        if is_suppressed(suppressions, &query, customer) {
            continue;
        }

        let mut best: Option<(i64, MatchStrategy)> = None;

        if let Some(bank_name) = non_empty(customer.bank_name.as_deref()) {
            let score = if fold(bank_name).contains(&fold(&query)) {
                BANK_NAME_EXACT_CONFIDENCE
            } else {
                substring_score(&query, bank_name)
            };
            consider(&mut best, score, MatchStrategy::BankName);
        }

        for alias in &customer.aliases {
            if substring_score(&query, alias) > 0 {
                consider(&mut best, ALIAS_CONFIDENCE, MatchStrategy::Alias);
                break;
            }
        }

        if best_score(&best) < FUZZY_FALLBACK_BAR {
            let score = blended(&query, &customer.name);
            consider(&mut best, score, MatchStrategy::NameFuzzy);
        }

        if best_score(&best) < FUZZY_FALLBACK_BAR {
            if let Some(sheet_name) = non_empty(customer.sheet_name.as_deref()) {
                let score = blended(&query, sheet_name);
                consider(&mut best, score, MatchStrategy::SheetNameFuzzy);
            }
        }

        if let Some((confidence, matched_on)) = best {
            results.push(MatchResult {
                id: customer.id,
                label: customer.name.clone(),
                confidence,
                matched_on,
            });
        }
    }

    rank(results)
}

/// Match a sales-spreadsheet name against the customer pool
///
/// Tiered exact-match-first: sheet name, display name, alias, in decreasing
/// order of trust, before the fuzzy ladder.
pub fn match_sheet_customer(
    sheet_name: &str,
    customers: &[MatchableCustomer],
) -> Vec<MatchResult> {
    let query = normalize(sheet_name);
    if query.is_empty() {
        return Vec::new();
    }
    let folded = fold(&query);

    let mut results = Vec::new();
    for customer in customers {
        let mut best: Option<(i64, MatchStrategy)> = None;

        if let Some(name) = non_empty(customer.sheet_name.as_deref()) {
            if fold(name) == folded {
                consider(&mut best, SHEET_EXACT_CONFIDENCE, MatchStrategy::SheetNameExact);
            }
        }
        if best.is_none() && fold(&customer.name) == folded {
            consider(&mut best, NAME_EXACT_CONFIDENCE, MatchStrategy::NameExact);
        }
        if best.is_none() && customer.aliases.iter().any(|a| fold(a) == folded) {
            consider(&mut best, ALIAS_EXACT_CONFIDENCE, MatchStrategy::AliasExact);
        }

        if best_score(&best) < FUZZY_FALLBACK_BAR {
            let score = blended(&query, &customer.name);
            consider(&mut best, score, MatchStrategy::NameFuzzy);
        }
        if best_score(&best) < FUZZY_FALLBACK_BAR {
            if let Some(name) = non_empty(customer.sheet_name.as_deref()) {
                let score = blended(&query, name);
                consider(&mut best, score, MatchStrategy::SheetNameFuzzy);
            }
        }

        if let Some((confidence, matched_on)) = best {
            results.push(MatchResult {
                id: customer.id,
                label: customer.name.clone(),
                confidence,
                matched_on,
            });
        }
    }

    rank(results)
}

fn blended(query: &str, candidate: &str) -> i64 {
    blended_confidence(
        edit_distance_score(query, candidate),
        token_overlap_score(query, candidate),
        substring_score(query, candidate),
    )
}

fn is_suppressed(
    suppressions: &[SuppressionRule],
    query: &str,
    customer: &MatchableCustomer,
) -> bool {
    suppressions
        .iter()
        .any(|s| s.target_id == customer.id && fold(&s.source_entity) == fold(query))
}

fn consider(best: &mut Option<(i64, MatchStrategy)>, score: i64, strategy: MatchStrategy) {
    if score > best_score(best) {
        *best = Some((score, strategy));
    }
}

fn best_score(best: &Option<(i64, MatchStrategy)>) -> i64 {
    best.map(|(score, _)| score).unwrap_or(0)
}

fn non_empty(s: Option<&str>) -> Option<&str> {
    s.filter(|s| !s.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn customer(name: &str, bank_name: Option<&str>, aliases: &[&str]) -> MatchableCustomer {
        MatchableCustomer {
            id: Uuid::new_v4(),
            name: name.to_string(),
            bank_name: bank_name.map(|s| s.to_string()),
            aliases: aliases.iter().map(|s| s.to_string()).collect(),
            email_domain: None,
            sheet_name: None,
        }
    }

    #[test]
    fn test_bank_name_exact_match_wins() {
        let customers = vec![
            customer("Nouri Health", Some("NOURI HEALTH INC"), &[]),
            customer("Globex", Some("GLOBEX LLC"), &[]),
        ];

        let results = match_customer("NOURI HEALTH INC", &customers, &[]);
        assert_eq!(results[0].label, "Nouri Health");
        assert_eq!(results[0].confidence, 95);
        assert_eq!(results[0].matched_on, MatchStrategy::BankName);
    }

    #[test]
    fn test_alias_match() {
        let customers = vec![customer("Nouri Health", None, &["NOURI PAYMENTS"])];

        let results = match_customer("NOURI PAYMENTS", &customers, &[]);
        assert_eq!(results[0].confidence, 93);
        assert_eq!(results[0].matched_on, MatchStrategy::Alias);
    }

    #[test]
    fn test_fuzzy_fallback_on_display_name() {
        let customers = vec![customer("Brightline Analytics", None, &[])];

        let results = match_customer("BRIGHTLINE ANALYTICS LLC", &customers, &[]);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_on, MatchStrategy::NameFuzzy);
        assert!(results[0].confidence >= 80);
    }

    #[test]
    fn test_empty_input_returns_empty() {
        let customers = vec![customer("Nouri Health", Some("NOURI HEALTH INC"), &[])];
        assert!(match_customer("", &customers, &[]).is_empty());
        assert!(match_customer("   ", &customers, &[]).is_empty());
    }

    #[test]
    fn test_confidence_floor() {
        let customers = vec![customer("Globex Industrial Holdings", None, &[])];
        let results = match_customer("ZzQ", &customers, &[]);
        assert!(
            results.iter().all(|r| r.confidence > 30),
            "results at or below the floor must be omitted: {:?}",
            results
        );
    }

    #[test]
    fn test_suppression_removes_candidate() {
        let c = customer("Nouri Health", Some("NOURI HEALTH INC"), &[]);
        let suppression = SuppressionRule {
            source_entity: "NOURI HEALTH INC".to_string(),
            target_id: c.id,
        };

        let results = match_customer("NOURI HEALTH INC", &[c], &[suppression]);
        assert!(results.is_empty());
    }

    #[test]
    fn test_results_sorted_descending() {
        let customers = vec![
            customer("Nouri Health", Some("NOURI HEALTH INC"), &[]),
            customer("Nouri Health West", None, &[]),
        ];
        let results = match_customer("NOURI HEALTH INC", &customers, &[]);
        assert!(results.len() >= 2);
        assert!(results[0].confidence >= results[1].confidence);
    }

    #[test]
    fn test_determinism() {
        let customers = vec![
            customer("Nouri Health", Some("NOURI HEALTH INC"), &[]),
            customer("Globex", None, &["GLOBEX LLC"]),
        ];
        let a = match_customer("NOURI HEALTH", &customers, &[]);
        let b = match_customer("NOURI HEALTH", &customers, &[]);
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.confidence, y.confidence);
        }
    }

    #[test]
    fn test_sheet_exact_tiers() {
        let mut with_sheet = customer("Nouri Health", None, &["NH Group"]);
        with_sheet.sheet_name = Some("Nouri".to_string());

        let results = match_sheet_customer("nouri", &[with_sheet.clone()]);
        assert_eq!(results[0].confidence, 100);
        assert_eq!(results[0].matched_on, MatchStrategy::SheetNameExact);

        let results = match_sheet_customer("Nouri Health", &[with_sheet.clone()]);
        assert_eq!(results[0].confidence, 98);
        assert_eq!(results[0].matched_on, MatchStrategy::NameExact);

        let results = match_sheet_customer("NH Group", &[with_sheet]);
        assert_eq!(results[0].confidence, 95);
        assert_eq!(results[0].matched_on, MatchStrategy::AliasExact);
    }

    #[test]
    fn test_sheet_fuzzy_fallback() {
        let customers = vec![customer("Brightline Analytics", None, &[])];
        let results = match_sheet_customer("Brightline Analytics Inc", &customers);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].matched_on, MatchStrategy::NameFuzzy);
    }
}
