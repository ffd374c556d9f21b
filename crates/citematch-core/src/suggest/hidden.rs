//! Stage 2: citations of unused references in forms the extractor missed,
//! such as `Smith's (2020)`, `Smith(2020)` or `(cf. Smith 2020)`.

use crate::config::AnalysisConfig;
use crate::normalize::extract_first_author;
use crate::section;
use crate::{Reference, UnusedResult};

use super::{
    CandidateKind, Suggestion, SuggestionCandidate, SuggestionTarget, compile_search_pattern,
    dedup_candidates, rank_candidates, year_variants,
};

const NARRATIVE_CONFIDENCE: f64 = 0.95;
const PARENTHETICAL_CONFIDENCE: f64 = 0.9;
const MIN_VARIANT_CHARS: usize = 3;
/// Surnames shorter than this are not searched on their own.
const MIN_SURNAME_VARIANT_CHARS: usize = 4;
const MIN_CANDIDATE_CHARS: usize = 5;
const MAX_CANDIDATE_CHARS: usize = 200;

/// Search the main body for each unused reference.
pub fn find_hidden_citations(
    unused: &[UnusedResult],
    document: &str,
    config: &AnalysisConfig,
) -> Vec<Suggestion> {
    let body = section::main_body_with_config(document, config);
    let noise = config.noise_markers();

    unused
        .iter()
        .filter_map(|u| {
            let candidates = hidden_candidates(&u.reference, &body, &noise, config);
            (!candidates.is_empty()).then(|| Suggestion {
                target: SuggestionTarget::Reference(u.reference.clone()),
                candidates,
            })
        })
        .collect()
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Spellings of the reference's first author to search for.
pub(crate) fn author_variants(first_author: &str) -> Vec<String> {
    let base = extract_first_author(first_author).to_lowercase();
    let mut variants = vec![base.clone(), capitalize(&base)];

    if let Some(surname) = base.split(' ').next_back().filter(|_| base.contains(' ')) {
        if surname.chars().count() >= MIN_SURNAME_VARIANT_CHARS {
            variants.push(surname.to_string());
            variants.push(capitalize(surname));
        }
    }

    let mut seen = std::collections::HashSet::new();
    variants.retain(|v| v.chars().count() >= MIN_VARIANT_CHARS && seen.insert(v.clone()));
    variants
}

fn hidden_candidates(
    reference: &Reference,
    body: &str,
    noise: &[String],
    config: &AnalysisConfig,
) -> Vec<SuggestionCandidate> {
    let mut found = Vec::new();

    for author in author_variants(&reference.first_author) {
        let author = regex::escape(&author);
        for year in year_variants(&reference.year) {
            let year = regex::escape(&year);
            let patterns = [
                (
                    format!(r"\b{author}[A-Za-z\-]*(?:\s+et\s+al\.?)?(?:'s)?\s*\({year}[a-z]?\)"),
                    NARRATIVE_CONFIDENCE,
                    CandidateKind::NarrativeCitation,
                ),
                (
                    format!(r"\([^)]*{author}[^)]*{year}[a-z]?[^)]*\)"),
                    PARENTHETICAL_CONFIDENCE,
                    CandidateKind::ParentheticalCitation,
                ),
            ];
            for (pattern, confidence, kind) in patterns {
                let Some(re) = compile_search_pattern(&pattern) else {
                    continue;
                };
                found.extend(
                    re.find_iter(body)
                        .map(|m| SuggestionCandidate::new(m.as_str(), m.start(), confidence, kind)),
                );
            }
        }
    }

    let found = dedup_candidates(found, |c| c.text.trim().to_string());
    let found = found
        .into_iter()
        .filter(|c| {
            let len = c.text.chars().count();
            len > MIN_CANDIDATE_CHARS
                && len < MAX_CANDIDATE_CHARS
                && !noise.iter().any(|marker| c.text.contains(marker.as_str()))
        })
        .collect();
    rank_candidates(found, config.hidden_max_candidates)
}
