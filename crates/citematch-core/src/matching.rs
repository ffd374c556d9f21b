//! Citation-to-reference scoring and bucketing.
//!
//! Each citation is scored against every reference. The best pairing at or
//! above the accept threshold becomes a match; everything else is reported as
//! a missing reference or an unused reference.

use crate::config::AnalysisConfig;
use crate::normalize::{author_surnames, similarity, strip_et_al, strip_year_suffix, surname_key};
use crate::{Citation, Confidence, MatchResult, MatchType, Reference, UnmatchedResult, UnusedResult};

const EXACT_SURNAME_SCORE: f64 = 100.0;
const CONTAINED_SURNAME_SCORE: f64 = 90.0;
/// Surnames must be longer than this before containment or fuzzy comparison applies.
const MIN_FUZZY_SURNAME_CHARS: usize = 3;
const MULTI_AUTHOR_BASE: f64 = 70.0;
const MULTI_AUTHOR_SPAN: f64 = 25.0;
const FUZZY_WEIGHT: f64 = 0.9;
const PARTIAL_WEIGHT: f64 = 0.7;
const CONTAINED_AUTHOR_SCORE: f64 = 85.0;
/// Share of exact author matches for a multi-author pairing to count as full.
const FULL_EXACT_SHARE: f64 = 0.8;
/// Scores at or above this land in the full bucket regardless of type.
const FULL_BUCKET_SCORE: f64 = 90.0;

/// Score of one citation/reference pairing. `match_type` is `None` when no
/// evidence was found.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PairScore {
    pub score: f64,
    pub match_type: Option<MatchType>,
}

impl PairScore {
    const NONE: PairScore = PairScore {
        score: 0.0,
        match_type: None,
    };
}

/// Partition of citations and references produced by [`match_citations`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchOutcome {
    pub full_matches: Vec<MatchResult>,
    pub partial_matches: Vec<MatchResult>,
    pub spelling_errors: Vec<MatchResult>,
    pub unmatched: Vec<UnmatchedResult>,
    pub unused: Vec<UnusedResult>,
}

/// Strongest evidence that a single citation author appears among the reference's authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum AuthorEvidence {
    None,
    Contained,
    Fuzzy,
    Exact,
}

fn author_evidence(surname: &str, reference_surnames: &[String], threshold: f64) -> AuthorEvidence {
    let mut best_score = 0.0;
    let mut evidence = AuthorEvidence::None;

    for candidate in reference_surnames {
        if surname == candidate {
            return AuthorEvidence::Exact;
        }
        let sim = similarity(surname, candidate);
        if sim >= threshold && sim * 100.0 > best_score {
            best_score = sim * 100.0;
            evidence = AuthorEvidence::Fuzzy;
        } else if evidence != AuthorEvidence::Fuzzy
            && (candidate.contains(surname) || surname.contains(candidate.as_str()))
        {
            best_score = CONTAINED_AUTHOR_SCORE;
            evidence = AuthorEvidence::Contained;
        }
    }

    evidence
}

fn has_multiple_authors(authors: &str) -> bool {
    authors.contains(',') || authors.contains('&') || authors.contains("and")
}

fn multi_author_score(
    citation: &Citation,
    reference: &Reference,
    config: &AnalysisConfig,
) -> Option<PairScore> {
    let cited = author_surnames(&strip_et_al(&citation.authors));
    let listed = author_surnames(&reference.all_authors);
    if cited.is_empty() {
        return None;
    }

    let (mut exact, mut fuzzy, mut contained) = (0usize, 0usize, 0usize);
    for surname in &cited {
        match author_evidence(surname, &listed, config.similarity_threshold) {
            AuthorEvidence::Exact => exact += 1,
            AuthorEvidence::Fuzzy => fuzzy += 1,
            AuthorEvidence::Contained => contained += 1,
            AuthorEvidence::None => {}
        }
    }

    let total = cited.len() as f64;
    let ratio =
        (exact as f64 + FUZZY_WEIGHT * fuzzy as f64 + PARTIAL_WEIGHT * contained as f64) / total;
    if ratio < config.multi_author_ratio {
        return None;
    }

    let match_type = if fuzzy > 0 {
        MatchType::SpellingError
    } else if exact as f64 >= total * FULL_EXACT_SHARE {
        MatchType::Full
    } else {
        MatchType::Partial
    };
    Some(PairScore {
        score: MULTI_AUTHOR_BASE + ratio * MULTI_AUTHOR_SPAN,
        match_type: Some(match_type),
    })
}

/// Score one pairing with the default configuration.
pub fn score_pair(citation: &Citation, reference: &Reference) -> PairScore {
    score_pair_with_config(citation, reference, &AnalysisConfig::default())
}

/// Config-aware version of [`score_pair`].
///
/// Years must agree after dropping any disambiguation letter; otherwise the
/// score is zero.
pub fn score_pair_with_config(
    citation: &Citation,
    reference: &Reference,
    config: &AnalysisConfig,
) -> PairScore {
    if strip_year_suffix(&citation.year) != strip_year_suffix(&reference.year) {
        return PairScore::NONE;
    }

    let cited = surname_key(&citation.authors);
    let listed = surname_key(&reference.first_author);

    let mut best = PairScore::NONE;
    if !cited.is_empty() && cited == listed {
        best = PairScore {
            score: EXACT_SURNAME_SCORE,
            match_type: Some(MatchType::Full),
        };
    } else if cited.chars().count() > MIN_FUZZY_SURNAME_CHARS
        && listed.chars().count() > MIN_FUZZY_SURNAME_CHARS
    {
        if cited.contains(&listed) || listed.contains(&cited) {
            best = PairScore {
                score: CONTAINED_SURNAME_SCORE,
                match_type: Some(MatchType::Partial),
            };
        } else {
            let sim = similarity(&cited, &listed);
            if sim >= config.similarity_threshold {
                best = PairScore {
                    score: (sim * CONTAINED_SURNAME_SCORE).round(),
                    match_type: Some(MatchType::SpellingError),
                };
            }
        }
    }

    if has_multiple_authors(&citation.authors) {
        if let Some(multi) = multi_author_score(citation, reference, config) {
            if multi.score > best.score {
                best = multi;
            }
        }
    }

    best
}

/// Match every citation against every reference with the default configuration.
pub fn match_citations(citations: &[Citation], references: &[Reference]) -> MatchOutcome {
    match_citations_with_config(citations, references, &AnalysisConfig::default())
}

/// Config-aware version of [`match_citations`].
///
/// Ties keep the earliest reference. A reference may match several citations.
pub fn match_citations_with_config(
    citations: &[Citation],
    references: &[Reference],
    config: &AnalysisConfig,
) -> MatchOutcome {
    let mut outcome = MatchOutcome::default();
    let mut used = vec![false; references.len()];

    for citation in citations {
        let mut best: Option<(usize, f64, MatchType)> = None;
        for (idx, reference) in references.iter().enumerate() {
            let pair = score_pair_with_config(citation, reference, config);
            let current = best.map_or(0.0, |(_, score, _)| score);
            if let Some(match_type) = pair.match_type {
                if pair.score > current {
                    best = Some((idx, pair.score, match_type));
                }
            }
        }

        match best {
            Some((idx, score, match_type)) if score >= config.accept_threshold => {
                used[idx] = true;
                let result = MatchResult {
                    citation: citation.clone(),
                    reference: references[idx].clone(),
                    confidence: Confidence::Score(score),
                    match_type,
                };
                tracing::trace!(
                    citation = %citation.original,
                    score,
                    kind = match_type.as_str(),
                    "citation matched"
                );
                if match_type == MatchType::SpellingError {
                    outcome.spelling_errors.push(result);
                } else if match_type == MatchType::Full || score >= FULL_BUCKET_SCORE {
                    outcome.full_matches.push(result);
                } else {
                    outcome.partial_matches.push(result);
                }
            }
            _ => outcome.unmatched.push(UnmatchedResult {
                citation: citation.clone(),
                suggestions: Vec::new(),
            }),
        }
    }

    outcome.unused = references
        .iter()
        .zip(&used)
        .filter(|(_, used)| !**used)
        .map(|(reference, _)| UnusedResult {
            reference: reference.clone(),
            possible_matches: Vec::new(),
        })
        .collect();

    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CitationKind;

    fn cite(authors: &str, year: &str) -> Citation {
        Citation::new(
            format!("({authors}, {year})"),
            authors,
            year,
            CitationKind::Parenthetical,
        )
    }

    fn reference(first: &str, all: &str, year: &str) -> Reference {
        Reference::new(format!("{all} ({year}). Title."), first, all, year)
    }

    // ── score_pair ──

    #[test]
    fn test_exact_surname() {
        let s = score_pair(&cite("Smith", "2020"), &reference("Smith", "Smith, J", "2020"));
        assert_eq!(s.score, 100.0);
        assert_eq!(s.match_type, Some(MatchType::Full));
    }

    #[test]
    fn test_year_mismatch_scores_zero() {
        let s = score_pair(&cite("Smith", "2021"), &reference("Smith", "Smith, J", "2020"));
        assert_eq!(s, PairScore::NONE);
    }

    #[test]
    fn test_year_suffix_ignored() {
        let s = score_pair(&cite("Smith", "2020a"), &reference("Smith", "Smith, J", "2020"));
        assert_eq!(s.score, 100.0);
    }

    #[test]
    fn test_contained_surname() {
        let s = score_pair(
            &cite("Smithson", "2020"),
            &reference("Smith", "Smith, J", "2020"),
        );
        assert_eq!(s.score, 90.0);
        assert_eq!(s.match_type, Some(MatchType::Partial));
    }

    #[test]
    fn test_spelling_variant() {
        let s = score_pair(&cite("Smyth", "2020"), &reference("Smith", "Smith, J", "2020"));
        assert_eq!(s.score, 72.0);
        assert_eq!(s.match_type, Some(MatchType::SpellingError));
    }

    #[test]
    fn test_short_surnames_skip_fuzzy() {
        let s = score_pair(&cite("Lee", "2020"), &reference("Lea", "Lea, A", "2020"));
        assert_eq!(s, PairScore::NONE);
    }

    #[test]
    fn test_multi_author_full() {
        let s = score_pair(
            &cite("Jones & Brown", "2019"),
            &reference("Jones", "Jones, K., & Brown, L", "2019"),
        );
        // Both authors exact: ratio 1.0 -> 95, beating the single-surname path.
        assert_eq!(s.score, 95.0);
        assert_eq!(s.match_type, Some(MatchType::Full));
    }

    #[test]
    fn test_multi_author_fuzzy_is_spelling_error() {
        // The first author matches exactly, but one fuzzy author labels the pair.
        let s = score_pair(
            &cite("Jones & Browne", "2019"),
            &reference("Jones", "Jones, K., & Brown, L", "2019"),
        );
        assert!((s.score - 93.75).abs() < 1e-9);
        assert_eq!(s.match_type, Some(MatchType::SpellingError));
    }

    #[test]
    fn test_single_surname_win_keeps_its_label() {
        // Multi-author path: brwn~brown fuzzy, smith exact -> 93.75 spelling error.
        // Single-surname path: smith == smith -> 100 full, which wins.
        let citation = cite("Brwn & Smith", "2019");
        let reference = reference("Smith", "Smith, J., & Brown, K", "2019");
        let multi = multi_author_score(&citation, &reference, &AnalysisConfig::default()).unwrap();
        assert_eq!(multi.match_type, Some(MatchType::SpellingError));

        let s = score_pair(&citation, &reference);
        assert_eq!(s.score, 100.0);
        assert_eq!(s.match_type, Some(MatchType::Full));
    }

    #[test]
    fn test_multi_author_below_ratio() {
        let s = score_pair(
            &cite("Adams & Baker & Clark", "2019"),
            &reference("Davis", "Davis, K., & Baker, L", "2019"),
        );
        assert_eq!(s, PairScore::NONE);
    }

    // ── match_citations ──

    #[test]
    fn test_partition_and_unused() {
        let citations = vec![cite("Smith", "2020"), cite("Taylor", "2015")];
        let references = vec![
            reference("Smith", "Smith, J", "2020"),
            reference("Green", "Green, P", "2018"),
        ];
        let outcome = match_citations(&citations, &references);
        assert_eq!(outcome.full_matches.len(), 1);
        assert_eq!(outcome.unmatched.len(), 1);
        assert_eq!(outcome.unmatched[0].citation.authors, "Taylor");
        assert_eq!(outcome.unused.len(), 1);
        assert_eq!(outcome.unused[0].reference.first_author, "Green");
    }

    #[test]
    fn test_spelling_bucket() {
        let outcome = match_citations(
            &[cite("Smyth", "2020")],
            &[reference("Smith", "Smith, J", "2020")],
        );
        assert_eq!(outcome.spelling_errors.len(), 1);
        assert!(outcome.unused.is_empty());
    }

    #[test]
    fn test_contained_goes_to_full_bucket_at_ninety() {
        let outcome = match_citations(
            &[cite("Smithson", "2020")],
            &[reference("Smith", "Smith, J", "2020")],
        );
        assert_eq!(outcome.full_matches.len(), 1);
        assert_eq!(outcome.full_matches[0].match_type, MatchType::Partial);
    }

    #[test]
    fn test_ties_keep_first_reference() {
        let references = vec![
            reference("Smith", "Smith, J", "2020"),
            reference("Smith", "Smith, K", "2020"),
        ];
        let outcome = match_citations(&[cite("Smith", "2020")], &references);
        assert_eq!(outcome.full_matches[0].reference.all_authors, "Smith, J");
        assert_eq!(outcome.unused.len(), 1);
        assert_eq!(outcome.unused[0].reference.all_authors, "Smith, K");
    }

    #[test]
    fn test_accept_threshold_configurable() {
        let config = crate::AnalysisConfigBuilder::new()
            .accept_threshold(80.0)
            .build()
            .unwrap();
        let outcome = match_citations_with_config(
            &[cite("Smyth", "2020")],
            &[reference("Smith", "Smith, J", "2020")],
            &config,
        );
        assert!(outcome.spelling_errors.is_empty());
        assert_eq!(outcome.unmatched.len(), 1);
    }
}
