//! String similarity scoring
//!
//! Pure functions producing 0-100 similarity scores between two strings,
//! plus the blending rule that folds them into one confidence number. The
//! weights and the substring asymmetry are calibrated constants; the match
//! test fixtures assume these exact values.

/// Score when the haystack contains the full query
const CONTAINS_NEEDLE_SCORE: i64 = 85;
/// Score for the reverse containment (query contains the candidate) -
/// weaker evidence than finding the full query inside the candidate
const CONTAINS_HAYSTACK_SCORE: i64 = 80;

/// Blend weights when substring evidence is present
const BLEND_EDIT_WEIGHT: f64 = 0.3;
const BLEND_TOKEN_WEIGHT: f64 = 0.3;
const BLEND_SUBSTR_WEIGHT: f64 = 0.4;

/// Blend weights for the purely fuzzy path
const FUZZY_EDIT_WEIGHT: f64 = 0.4;
const FUZZY_TOKEN_WEIGHT: f64 = 0.6;

/// Trim and collapse internal whitespace, preserving case
pub fn normalize(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Case-folded form used for comparisons
pub fn fold(s: &str) -> String {
    normalize(s).to_lowercase()
}

/// Normalized Levenshtein similarity, 0-100
///
/// Case-insensitive; equal strings (after trim) score 100, either-empty
/// scores 0.
pub fn edit_distance_score(a: &str, b: &str) -> i64 {
    let a = fold(a);
    let b = fold(b);
    if a.is_empty() || b.is_empty() {
        return 0;
    }
    if a == b {
        return 100;
    }

    let distance = strsim::levenshtein(&a, &b);
    let max_len = a.chars().count().max(b.chars().count());
    let similarity = (max_len.saturating_sub(distance)) as f64 / max_len as f64;
    (similarity * 100.0).round() as i64
}

/// Token-set overlap, 0-100
///
/// Splits both strings on whitespace/punctuation into lowercase token sets;
/// returns `|A ∩ B| / max(|A|, |B|)` scaled to 100. Zero if either token
/// set is empty.
pub fn token_overlap_score(a: &str, b: &str) -> i64 {
    let tokens_a = tokenize(a);
    let tokens_b = tokenize(b);
    if tokens_a.is_empty() || tokens_b.is_empty() {
        return 0;
    }

    let shared = tokens_a.iter().filter(|t| tokens_b.contains(*t)).count();
    let max_len = tokens_a.len().max(tokens_b.len());
    ((shared as f64 / max_len as f64) * 100.0).round() as i64
}

/// Substring containment score: 85, 80, or 0
///
/// Finding the full query inside the candidate is stronger evidence than
/// the reverse, hence the asymmetry.
pub fn substring_score(needle: &str, haystack: &str) -> i64 {
    let needle = fold(needle);
    let haystack = fold(haystack);
    if needle.is_empty() || haystack.is_empty() {
        return 0;
    }

    if haystack.contains(&needle) {
        CONTAINS_NEEDLE_SCORE
    } else if needle.contains(&haystack) {
        CONTAINS_HAYSTACK_SCORE
    } else {
        0
    }
}

/// Blend the three signals into one 0-100 confidence
///
/// Substring evidence dominates when present, but the fuzzy signals can
/// push the result above the bare containment score.
pub fn blended_confidence(edit: i64, token: i64, substr: i64) -> i64 {
    if substr > 0 {
        let weighted = BLEND_EDIT_WEIGHT * edit as f64
            + BLEND_TOKEN_WEIGHT * token as f64
            + BLEND_SUBSTR_WEIGHT * substr as f64;
        substr.max(weighted.round() as i64)
    } else {
        let weighted = FUZZY_EDIT_WEIGHT * edit as f64 + FUZZY_TOKEN_WEIGHT * token as f64;
        weighted.round() as i64
    }
}

fn tokenize(s: &str) -> Vec<String> {
    let mut tokens: Vec<String> = s
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| t.to_string())
        .collect();
    tokens.sort();
    tokens.dedup();
    tokens
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_distance_equal_strings() {
        assert_eq!(edit_distance_score("Acme Corp", "acme corp"), 100);
        assert_eq!(edit_distance_score("  Acme Corp  ", "Acme Corp"), 100);
    }

    #[test]
    fn test_edit_distance_empty_input() {
        assert_eq!(edit_distance_score("", "Acme"), 0);
        assert_eq!(edit_distance_score("Acme", ""), 0);
        assert_eq!(edit_distance_score("   ", "Acme"), 0);
    }

    #[test]
    fn test_edit_distance_close_strings() {
        // one substitution over nine characters
        let score = edit_distance_score("acme corp", "acme carp");
        assert_eq!(score, 89);
    }

    #[test]
    fn test_token_overlap() {
        assert_eq!(token_overlap_score("Nouri Health", "Nouri Health Inc"), 67);
        assert_eq!(token_overlap_score("alpha beta", "beta alpha"), 100);
        assert_eq!(token_overlap_score("alpha", "beta"), 0);
        assert_eq!(token_overlap_score("", "beta"), 0);
    }

    #[test]
    fn test_token_overlap_punctuation_split() {
        assert_eq!(token_overlap_score("acme,corp", "acme corp"), 100);
    }

    #[test]
    fn test_substring_asymmetry() {
        assert_eq!(substring_score("nouri", "Nouri Health Inc"), 85);
        assert_eq!(substring_score("Nouri Health Inc", "nouri"), 80);
        assert_eq!(substring_score("acme", "globex"), 0);
        assert_eq!(substring_score("", "globex"), 0);
    }

    #[test]
    fn test_blended_substring_dominates() {
        // low fuzzy signals cannot drag the result below the substring score
        assert_eq!(blended_confidence(10, 10, 85), 85);
        // strong fuzzy signals push it higher
        assert_eq!(blended_confidence(100, 100, 85), 94);
    }

    #[test]
    fn test_blended_fuzzy_only() {
        assert_eq!(blended_confidence(50, 100, 0), 80);
        assert_eq!(blended_confidence(0, 0, 0), 0);
    }

    #[test]
    fn test_normalize_collapses_whitespace() {
        assert_eq!(normalize("  ACME   GLOBAL  LLC "), "ACME GLOBAL LLC");
        assert_eq!(fold("  ACME   GLOBAL  LLC "), "acme global llc");
    }
}
