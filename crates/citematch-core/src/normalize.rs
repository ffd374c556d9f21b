//! Author/year canonicalization and string similarity.
//!
//! Every comparison in the crate goes through [`normalize`], so two strings
//! that differ only in case, punctuation, `et al.`, hyphenation or signal words
//! (`e.g.`, `see`, `cf.`) produce the same key.

use once_cell::sync::Lazy;
use regex::Regex;

static STRIP_CHARS_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.,&()]").unwrap());

static ET_AL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)\bet\s+al\b\.?").unwrap());

// Dots are already gone when this runs, so `e.g.` arrives as `eg`.
static SIGNAL_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(?:eg|see|cf)\b").unwrap());

static SEPARATOR_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[-\s]+").unwrap());

/// Splits an author list on commas, ampersands and the word "and".
pub(crate) static AUTHOR_LIST_SPLIT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[,&]|\sand\s").unwrap());

static FIRST_AUTHOR_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s*[&,]\s*").unwrap());

fn canonicalize_once(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = STRIP_CHARS_RE.replace_all(&lowered, "");
    let no_et_al = ET_AL_RE.replace_all(&stripped, " ");
    let no_signals = SIGNAL_WORD_RE.replace_all(&no_et_al, " ");
    SEPARATOR_RE
        .replace_all(&no_signals, " ")
        .trim()
        .to_string()
}

/// Canonical comparison key for an author/year string.
///
/// Idempotent: `normalize(&normalize(s)) == normalize(s)`.
pub fn normalize(text: &str) -> String {
    let mut key = canonicalize_once(text);
    loop {
        let next = canonicalize_once(&key);
        if next == key {
            return key;
        }
        key = next;
    }
}

/// Remove every `et al.` occurrence, leaving surrounding text trimmed.
pub fn strip_et_al(text: &str) -> String {
    ET_AL_RE.replace_all(text, "").trim().to_string()
}

/// First name in an author string: drop `et al.` and cut at the first `&` or `,`.
pub fn extract_first_author(authors: &str) -> String {
    let cleaned = strip_et_al(authors);
    FIRST_AUTHOR_SPLIT_RE
        .split(&cleaned)
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}

fn is_bare_initial(word: &str) -> bool {
    let mut chars = word.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, _) => c.is_alphabetic(),
        (Some(c), Some('.'), None) => c.is_alphabetic(),
        _ => false,
    }
}

/// The surname inside a single author name such as `"Smith, J."` or `"J. Smith"`.
///
/// Takes the last word longer than one character that is not an initial,
/// falling back to the input when nothing qualifies.
pub fn extract_surname(name: &str) -> String {
    let cleaned = strip_et_al(name).replace([',', '.'], "");
    cleaned
        .split_whitespace()
        .filter(|w| w.chars().count() > 1 && !is_bare_initial(w))
        .last()
        .map(str::to_string)
        .unwrap_or_else(|| name.to_string())
}

/// Normalized surname key for one author name.
pub fn surname_key(name: &str) -> String {
    normalize(&extract_surname(name))
}

/// Normalized surname keys for every author in a list, dropping keys of two
/// characters or fewer.
pub fn author_surnames(authors: &str) -> Vec<String> {
    AUTHOR_LIST_SPLIT_RE
        .split(authors)
        .map(|part| surname_key(part.trim()))
        .filter(|s| s.chars().count() > 2)
        .collect()
}

/// Year without its disambiguation letter: `2020a` -> `2020`.
pub fn strip_year_suffix(year: &str) -> &str {
    year.trim_end_matches(|c: char| c.is_ascii_lowercase())
}

/// Levenshtein distance over chars.
pub fn edit_distance(a: &str, b: &str) -> usize {
    strsim::levenshtein(a, b)
}

/// `(longer - distance) / longer`, with 1.0 when both are empty.
pub fn similarity(a: &str, b: &str) -> f64 {
    strsim::normalized_levenshtein(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_basic() {
        assert_eq!(normalize("Smith, J. (2020)"), "smith j 2020");
        assert_eq!(normalize("Smith & Jones 2019"), "smith jones 2019");
        assert_eq!(normalize("  Smith-Jones   2019 "), "smith jones 2019");
    }

    #[test]
    fn test_normalize_drops_et_al_and_signal_words() {
        assert_eq!(normalize("Smith et al. 2020"), "smith 2020");
        assert_eq!(normalize("see Smith 2020"), "smith 2020");
        assert_eq!(normalize("e.g. Smith, 2020"), "smith 2020");
        assert_eq!(normalize("cf. Smith 2020"), "smith 2020");
    }

    #[test]
    fn test_normalize_idempotent() {
        for input in [
            "Smith et al., 2020",
            "e.g., see Jones & Brown (2019a)",
            "O'Neil-Baker, K. et al.",
            "eg. e.g. cf see",
            "",
        ] {
            let once = normalize(input);
            assert_eq!(normalize(&once), once, "not idempotent for {input:?}");
        }
    }

    #[test]
    fn test_normalize_keeps_surname_containing_signal_letters() {
        assert_eq!(normalize("Seeger 2020"), "seeger 2020");
        assert_eq!(normalize("Cford 2020"), "cford 2020");
    }

    #[test]
    fn test_extract_first_author() {
        assert_eq!(extract_first_author("Smith et al."), "Smith");
        assert_eq!(extract_first_author("Smith & Jones"), "Smith");
        assert_eq!(extract_first_author("Smith, Jones, & Brown"), "Smith");
        assert_eq!(extract_first_author("Smith"), "Smith");
    }

    #[test]
    fn test_extract_surname() {
        assert_eq!(extract_surname("Smith, J."), "Smith");
        assert_eq!(extract_surname("J. Smith"), "Smith");
        assert_eq!(extract_surname("Smith et al."), "Smith");
        assert_eq!(extract_surname("J"), "J");
    }

    #[test]
    fn test_author_surnames() {
        assert_eq!(author_surnames("Smith, J., & Jones, K."), vec!["smith", "jones"]);
        assert_eq!(author_surnames("Lee and Brown"), vec!["lee", "brown"]);
        // Two-letter surnames are dropped.
        assert_eq!(author_surnames("Wu & Clark"), vec!["clark"]);
    }

    #[test]
    fn test_strip_year_suffix() {
        assert_eq!(strip_year_suffix("2020a"), "2020");
        assert_eq!(strip_year_suffix("2020"), "2020");
    }

    #[test]
    fn test_similarity() {
        assert!((similarity("smith", "smyth") - 0.8).abs() < 1e-9);
        assert_eq!(similarity("", ""), 1.0);
        assert_eq!(similarity("abc", "abc"), 1.0);
        assert_eq!(edit_distance("kitten", "sitting"), 3);
    }
}
