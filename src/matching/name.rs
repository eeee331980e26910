// src/matching/name.rs - Candidate name normalization and comparison
//
// Every function here is total: a missing or unusable name is simply "no match".
use once_cell::sync::Lazy;
use rapidfuzz::fuzz;
use regex::Regex;
use std::collections::HashSet;

static NON_WORD_CHARS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^\w\s]").expect("static name-normalization pattern"));
static WHITESPACE_RUNS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Lowercased name with punctuation removed and whitespace collapsed.
/// A missing name normalizes to the empty string.
pub fn normalize_name(name: Option<&str>) -> String {
    let Some(name) = name else {
        return String::new();
    };
    let stripped = NON_WORD_CHARS.replace_all(name, "");
    let collapsed = WHITESPACE_RUNS.replace_all(&stripped, " ");
    collapsed.trim().to_lowercase()
}

/// Upper-cased first character of every whitespace-separated token.
pub fn extract_initials(name: Option<&str>) -> HashSet<char> {
    name.map(|n| n.split_whitespace().filter_map(initial).collect())
        .unwrap_or_default()
}

fn initial(token: &str) -> Option<char> {
    token.chars().next().and_then(|c| c.to_uppercase().next())
}

fn normalized_tokens(normalized: &str) -> HashSet<&str> {
    normalized.split_whitespace().collect()
}

/// Recall-oriented check that two display names could belong to one person,
/// allowing for an added, dropped or abbreviated middle name.
///
/// Rules, first success wins:
/// 1. normalized names are identical;
/// 2. the normalized tokens of one name are a subset of the other's;
/// 3. first and last raw tokens normalize identically and either the token
///    counts differ or the interior tokens share the same set of initials.
///
/// Expect false positives; callers gate the result with another signal.
pub fn names_match_with_abbreviation(name_1: Option<&str>, name_2: Option<&str>) -> bool {
    let (Some(raw_1), Some(raw_2)) = (name_1, name_2) else {
        return false;
    };

    let norm_1 = normalize_name(Some(raw_1));
    let norm_2 = normalize_name(Some(raw_2));
    // Nothing usable left after normalization: treated like a missing name.
    if norm_1.is_empty() || norm_2.is_empty() {
        return false;
    }

    if norm_1 == norm_2 {
        return true;
    }

    let tokens_1 = normalized_tokens(&norm_1);
    let tokens_2 = normalized_tokens(&norm_2);
    if tokens_1.is_subset(&tokens_2) || tokens_2.is_subset(&tokens_1) {
        return true;
    }

    let parts_1: Vec<&str> = raw_1.split_whitespace().collect();
    let parts_2: Vec<&str> = raw_2.split_whitespace().collect();
    if parts_1.len() < 2 || parts_2.len() < 2 {
        return false;
    }

    let same_first = normalize_name(parts_1.first().copied()) == normalize_name(parts_2.first().copied());
    let same_last = normalize_name(parts_1.last().copied()) == normalize_name(parts_2.last().copied());
    if !(same_first && same_last) {
        return false;
    }

    if parts_1.len() != parts_2.len() {
        return true;
    }

    let middle_1: HashSet<char> = parts_1[1..parts_1.len() - 1]
        .iter()
        .filter_map(|p| initial(p))
        .collect();
    let middle_2: HashSet<char> = parts_2[1..parts_2.len() - 1]
        .iter()
        .filter_map(|p| initial(p))
        .collect();
    middle_1 == middle_2
}

/// Percentage similarity in `[0, 100]` from the insertion/deletion edit distance
/// over characters, as `fuzz.ratio` scores it. Case sensitive and without token
/// reordering. Empty input scores 0.
pub fn similarity_ratio(name_1: &str, name_2: &str) -> u8 {
    if name_1.is_empty() || name_2.is_empty() {
        return 0;
    }
    let score = fuzz::ratio(name_1.chars(), name_2.chars());
    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

/// Highest ratio the two names could reach given only their lengths.
pub fn max_possible_ratio(len_1: usize, len_2: usize) -> u8 {
    let total = len_1 + len_2;
    if total == 0 {
        return 0;
    }
    ((200 * len_1.min(len_2)) as f64 / total as f64).round() as u8
}
