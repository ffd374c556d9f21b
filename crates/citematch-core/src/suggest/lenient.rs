//! Stage 4: sentences of the main body that plausibly discuss an unused
//! reference, scored by year, author surnames and title words.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::AnalysisConfig;
use crate::normalize::{AUTHOR_LIST_SPLIT_RE, strip_et_al};
use crate::section;
use crate::{Reference, UnusedResult};

use super::{
    CandidateKind, Suggestion, SuggestionCandidate, SuggestionTarget, dedup_candidates,
    rank_candidates,
};

static PAREN_GROUP_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\([^)]*\)").unwrap());
static SENTENCE_SPLIT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[.!?]+").unwrap());

const YEAR_POINTS: f64 = 30.0;
const AUTHOR_POINTS: f64 = 25.0;
const TITLE_POINTS: f64 = 40.0;
const MAX_SCORE: f64 = 100.0;
const MIN_SENTENCE_CHARS: usize = 20;
const MIN_SURNAME_CHARS: usize = 3;
const MIN_TITLE_WORD_CHARS: usize = 5;

/// Score body sentences against each unused reference.
pub fn find_lenient_matches(
    unused: &[UnusedResult],
    document: &str,
    config: &AnalysisConfig,
) -> Vec<Suggestion> {
    let body = section::main_body_with_config(document, config);
    let sentences = split_sentences(&body);
    let stopwords = config.stopwords();

    unused
        .iter()
        .filter_map(|u| {
            let candidates = sentence_candidates(&u.reference, &sentences, &stopwords, config);
            (!candidates.is_empty()).then(|| Suggestion {
                target: SuggestionTarget::Reference(u.reference.clone()),
                candidates,
            })
        })
        .collect()
}

/// Sentence fragments longer than 20 chars, untrimmed.
pub(crate) fn split_sentences(body: &str) -> Vec<&str> {
    SENTENCE_SPLIT_RE
        .split(body)
        .filter(|s| s.trim().chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

fn is_lower_initial(word: &str) -> bool {
    let mut chars = word.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some(c), None, _) => c.is_ascii_lowercase(),
        (Some(c), Some('.'), None) => c.is_ascii_lowercase(),
        _ => false,
    }
}

/// Lowercased surnames from the full author list.
pub(crate) fn surnames(all_authors: &str) -> Vec<String> {
    let lowered = all_authors.to_lowercase();
    AUTHOR_LIST_SPLIT_RE
        .split(&lowered)
        .filter_map(|part| {
            let cleaned = strip_et_al(part);
            cleaned
                .split_whitespace()
                .filter(|w| w.chars().count() >= MIN_SURNAME_CHARS && !is_lower_initial(w))
                .last()
                .map(str::to_string)
        })
        .filter(|s| s.chars().count() >= MIN_SURNAME_CHARS)
        .collect()
}

/// Distinctive words of the reference text with parenthesized groups removed.
pub(crate) fn title_words(original: &str, stopwords: &[String], max: usize) -> Vec<String> {
    let lowered = original.to_lowercase();
    let stripped = PAREN_GROUP_RE.replace_all(&lowered, "");
    stripped
        .split_whitespace()
        .filter(|w| {
            w.chars().count() >= MIN_TITLE_WORD_CHARS
                && !stopwords.iter().any(|s| s.as_str() == *w)
                && !w.chars().all(|c| c.is_ascii_digit())
        })
        .take(max)
        .map(str::to_string)
        .collect()
}

fn sentence_candidates(
    reference: &Reference,
    sentences: &[&str],
    stopwords: &[String],
    config: &AnalysisConfig,
) -> Vec<SuggestionCandidate> {
    let year = reference.year.to_lowercase();
    let surnames = surnames(&reference.all_authors);
    let words = title_words(&reference.original, stopwords, config.max_title_words);

    let mut found = Vec::new();
    for (idx, sentence) in sentences.iter().enumerate() {
        let lowered = sentence.to_lowercase();
        let mut score = 0.0;
        let mut terms = Vec::new();

        if lowered.contains(&year) {
            score += YEAR_POINTS;
            terms.push(format!("year:{}", reference.year));
        }
        for surname in &surnames {
            if lowered.contains(surname.as_str()) {
                score += AUTHOR_POINTS;
                terms.push(format!("author:{surname}"));
            }
        }
        let title_hits: Vec<&String> = words.iter().filter(|w| lowered.contains(w.as_str())).collect();
        if !title_hits.is_empty() {
            score += title_hits.len() as f64 / words.len() as f64 * TITLE_POINTS;
            terms.extend(title_hits.iter().map(|w| format!("title:{w}")));
        }

        let score = score.min(MAX_SCORE);
        if score < config.lenient_accept_score {
            continue;
        }

        let from = idx.saturating_sub(1);
        let to = (idx + 2).min(sentences.len());
        let context = sentences[from..to].join(". ");
        found.push(SuggestionCandidate {
            text: context.trim().to_string(),
            position: idx,
            confidence: score / MAX_SCORE,
            kind: CandidateKind::LenientTextMatch,
            matched_terms: terms,
            sentence: Some(sentence.trim().to_string()),
        });
    }

    let found = dedup_candidates(found, |c| c.sentence.clone());
    rank_candidates(found, config.lenient_max_candidates)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_STOPWORDS;

    fn stopwords() -> Vec<String> {
        DEFAULT_STOPWORDS.iter().map(|s| s.to_string()).collect()
    }

    fn unused(all: &str, year: &str, original: &str) -> UnusedResult {
        let first = all.split(',').next().unwrap_or(all);
        UnusedResult {
            reference: Reference::new(original, first, all, year),
            possible_matches: Vec::new(),
        }
    }

    #[test]
    fn test_surnames() {
        assert_eq!(surnames("Smith, J., & Jones, K."), vec!["smith", "jones"]);
        assert_eq!(surnames("Garcia Lopez and Wu"), vec!["lopez"]);
    }

    #[test]
    fn test_title_words() {
        let words = title_words(
            "Smith, J. (2020). Neural networks for citation matching in 2020 papers.",
            &stopwords(),
            8,
        );
        assert_eq!(
            words,
            vec!["smith,", "neural", "networks", "citation", "matching", "papers."]
        );
    }

    #[test]
    fn test_split_sentences() {
        let s = split_sentences("Short. This sentence is long enough to count! Tiny?");
        assert_eq!(s, vec![" This sentence is long enough to count"]);
    }

    #[test]
    fn test_year_and_author_sentence_matched() {
        let doc = "An opening sentence that sets the scene. In 2020 the work of Smith on unrelated topics changed the field. A closing remark that is long enough.";
        let u = unused("Smith, J", "2020", "Smith, J. (2020). Unrelated title words.");
        let out = find_lenient_matches(&[u], doc, &AnalysisConfig::default());
        assert_eq!(out.len(), 1);
        let c = &out[0].candidates[0];
        assert_eq!(c.sentence.as_deref(), Some("In 2020 the work of Smith on unrelated topics changed the field"));
        assert_eq!(c.position, 1);
        assert!(c.confidence >= 0.6);
        assert!(c.matched_terms.contains(&"year:2020".to_string()));
        assert!(c.matched_terms.contains(&"author:smith".to_string()));
        assert!(c.matched_terms.contains(&"title:unrelated".to_string()));
        assert!(c.text.starts_with("An opening sentence"));
        assert!(c.text.ends_with("long enough"));
    }

    #[test]
    fn test_year_alone_is_not_enough() {
        let doc = "Something notable happened in 2020 across the board.";
        let u = unused("Smith, J", "2020", "Smith, J. (2020). Title.");
        assert!(find_lenient_matches(&[u], doc, &AnalysisConfig::default()).is_empty());
    }

    #[test]
    fn test_score_clamped() {
        let doc = "Smith and Jones and Brown and Green wrote in 2020 about everything.";
        let u = unused("Smith, A., Jones, B., Brown, C., & Green, D", "2020", "Title.");
        let out = find_lenient_matches(&[u], doc, &AnalysisConfig::default());
        assert_eq!(out[0].candidates[0].confidence, 1.0);
    }
}
