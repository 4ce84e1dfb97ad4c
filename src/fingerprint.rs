//! # Fingerprint Comparator — Tolerant Token-Wise Equality (§4.2)
//!
//! Splits each fingerprint on the character class `{ SPACE, '=' }`, then compares the
//! resulting token sequences pairwise: numeric tokens compare with absolute tolerance
//! `EPSILON`, everything else compares as exact bytes. Token ordering is significant and
//! empty tokens from consecutive separators are dropped.

/// Absolute tolerance for numeric token comparison.
pub const EPSILON: f64 = 1e-10;

fn tokenize(fingerprint: &str) -> Vec<&str> {
    fingerprint
        .split(|c: char| c == ' ' || c == '=')
        .filter(|t| !t.is_empty())
        .collect()
}

fn tokens_match(a: &str, b: &str) -> bool {
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => (x - y).abs() <= EPSILON,
        _ => a == b,
    }
}

/// Returns `true` iff `a` and `b` tokenize to the same number of tokens and every
/// corresponding pair matches under §4.2's numeric-tolerance rule.
pub fn fingerprints_match(a: &str, b: &str) -> bool {
    let ta = tokenize(a);
    let tb = tokenize(b);
    if ta.len() != tb.len() {
        return false;
    }
    ta.iter().zip(tb.iter()).all(|(x, y)| tokens_match(x, y))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_strings_match() {
        assert!(fingerprints_match("energy=100.0 step=1", "energy=100.0 step=1"));
    }

    #[test]
    fn reflexive() {
        let fp = "a=1 b=2.5 c=hello";
        assert!(fingerprints_match(fp, fp));
    }

    #[test]
    fn symmetric() {
        let a = "energy=1.0000000001";
        let b = "energy=1.0";
        assert_eq!(fingerprints_match(a, b), fingerprints_match(b, a));
    }

    #[test]
    fn tolerant_numeric_match_within_epsilon() {
        assert!(fingerprints_match("energy=1.0000000001", "energy=1.0"));
    }

    #[test]
    fn numeric_mismatch_beyond_epsilon() {
        assert!(!fingerprints_match("energy=1.0", "energy=1.001"));
    }

    #[test]
    fn boundary_perturbation_matches() {
        // difference is 2e-11 < 1e-10
        assert!(fingerprints_match("energy=1e-11", "energy=-1e-11"));
    }

    #[test]
    fn non_numeric_tokens_compare_exactly() {
        assert!(fingerprints_match("phase=solid", "phase=solid"));
        assert!(!fingerprints_match("phase=solid", "phase=liquid"));
    }

    #[test]
    fn numeric_vs_non_numeric_never_matches() {
        assert!(!fingerprints_match("value=1.0", "value=abc"));
    }

    #[test]
    fn differing_token_count_never_matches() {
        assert!(!fingerprints_match("a=1 b=2", "a=1"));
    }

    #[test]
    fn consecutive_separators_collapse_to_no_empty_tokens() {
        assert!(fingerprints_match("a==1  b=2", "a=1 b=2"));
    }

    #[test]
    fn token_ordering_is_significant() {
        assert!(!fingerprints_match("a=1 b=2", "b=2 a=1"));
    }

    #[test]
    fn empty_fingerprints_match() {
        assert!(fingerprints_match("", ""));
    }

    #[test]
    fn max_length_fingerprint_compares() {
        let fp = format!("k={}", "9".repeat(250));
        assert!(fingerprints_match(&fp, &fp));
    }
}
