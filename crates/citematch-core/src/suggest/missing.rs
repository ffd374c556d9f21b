//! Stage 3: context around `(YEAR)` occurrences for citations that have no
//! reference, to help the user locate the source.

use crate::config::AnalysisConfig;
use crate::normalize::extract_first_author;
use crate::section::{ceil_char_boundary, floor_char_boundary};
use crate::{Citation, UnmatchedResult};

use super::{
    CandidateKind, Suggestion, SuggestionCandidate, SuggestionTarget, compile_search_pattern,
    dedup_candidates, rank_candidates, year_variants,
};

const YEAR_MATCH_CONFIDENCE: f64 = 0.7;
const MIN_VARIANT_CHARS: usize = 2;
const AUTHOR_PREFIX_CHARS: usize = 6;
/// Windows mentioning these are taken to be inside the bibliography.
const BIBLIOGRAPHY_MARKERS: [&str; 2] = ["reference", "bibliography"];

/// Search the whole document around each missing citation's year.
pub fn find_missing_references(
    missing: &[UnmatchedResult],
    document: &str,
    config: &AnalysisConfig,
) -> Vec<Suggestion> {
    missing
        .iter()
        .filter_map(|m| {
            let candidates = year_candidates(&m.citation, document, config);
            (!candidates.is_empty()).then(|| Suggestion {
                target: SuggestionTarget::Citation(m.citation.clone()),
                candidates,
            })
        })
        .collect()
}

/// Coarse author spellings; the stage only runs when one is long enough.
fn author_variants(citation: &Citation) -> Vec<String> {
    let first = extract_first_author(&citation.authors).to_lowercase();
    let first_word = first.split(' ').next().unwrap_or_default().to_string();
    let prefix: String = citation
        .authors
        .to_lowercase()
        .chars()
        .take(AUTHOR_PREFIX_CHARS)
        .collect();
    vec![first, first_word, prefix]
}

fn year_candidates(
    citation: &Citation,
    document: &str,
    config: &AnalysisConfig,
) -> Vec<SuggestionCandidate> {
    // Every variant runs the same year search, so one qualifying variant is enough.
    if !author_variants(citation)
        .iter()
        .any(|v| v.chars().count() >= MIN_VARIANT_CHARS)
    {
        return Vec::new();
    }

    let mut found = Vec::new();
    for year in year_variants(&citation.year) {
        let pattern = format!(r"\({}[a-z]?\)", regex::escape(&year));
        let Some(re) = compile_search_pattern(&pattern) else {
            continue;
        };
        for m in re.find_iter(document) {
            let start = floor_char_boundary(document, m.start().saturating_sub(config.context_radius));
            let end = ceil_char_boundary(document, m.start() + config.context_radius);
            let window = &document[start..end];
            let lowered = window.to_lowercase();
            if BIBLIOGRAPHY_MARKERS.iter().any(|k| lowered.contains(k)) {
                continue;
            }
            found.push(SuggestionCandidate::new(
                window,
                m.start(),
                YEAR_MATCH_CONFIDENCE,
                CandidateKind::YearMatch,
            ));
        }
    }

    let found = dedup_candidates(found, |c| c.text.clone());
    rank_candidates(found, config.missing_max_candidates)
}
