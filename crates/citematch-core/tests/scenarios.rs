//! End-to-end analysis and review flows over small documents.

use std::collections::HashSet;

use citematch_core::{
    AnalysisError, AnalysisSession, CandidateKind, Confidence, MatchType, SuggestionStage,
    analyze, run_suggestion_stage, similarity,
};

const PERFECT: &str = "Recent work (Smith, 2020) confirms this.\n\nReferences\nSmith, J. (2020). Title. Journal.\n";

const MISSPELT: &str = "Recent work (Smyth, 2020) confirms this.\n\nReferences\nSmith, J. (2020). Title. Journal.\n";

const MIXED: &str = "Work (Taylor, 2015) and (Smith, 2020) here.\n\nReferences\nSmith, J. (2020). Title. Journal.\nGreen, P. (2018). Another title here. Press.\n";

const UNSPACED: &str = "As Smith(2020) argued, effects were large.\n\nReferences\nSmith, J. (2020). Title. Journal.\n";

const YEAR_ONLY: &str = "Work (Taylor, 2015) matters. The survey (2015) extended it. It was followed by a long paragraph of unrelated discussion that pads the document well beyond the window.\n\nReferences\nSmith, J. (2020). Title. Journal.\n";

const CITED_TWICE: &str = "Early work (Smith, 2020) set the stage. Smith (2020a) extended it. Others (Smyth, 2019) disagreed, and (Taylor, 2015) was ignored.\n\nReferences\nSmith, J. (2020). A study of things. Journal.\nSmith, A. (2019). Another study here. Journal.\nGreen, P. (2018). Unrelated material entirely. Press.\n";

fn reference_keys(matches: &[citematch_core::MatchResult]) -> HashSet<&str> {
    matches.iter().map(|m| m.reference.normalized.as_str()).collect()
}

/// Every citation lands in exactly one bucket; every reference lands in
/// exactly one of the three match buckets or the unused list.
fn assert_partitioned(results: &citematch_core::AnalysisResults) {
    let s = &results.summary;
    assert_eq!(
        s.total_citations,
        s.full_matches + s.partial_matches + s.probable_spelling_errors + s.missing_references
    );

    let full = reference_keys(&results.full_matches);
    let partial = reference_keys(&results.partial_matches);
    let spelling = reference_keys(&results.probable_spelling_errors);
    let unused: Vec<&str> = results
        .unused
        .iter()
        .map(|u| u.reference.normalized.as_str())
        .collect();
    let unused_set: HashSet<&str> = unused.iter().copied().collect();
    assert_eq!(unused.len(), unused_set.len(), "unused reference listed twice");

    let buckets = [&full, &partial, &spelling, &unused_set];
    for (i, a) in buckets.iter().enumerate() {
        for b in &buckets[i + 1..] {
            assert!(a.is_disjoint(b), "reference in two buckets: {a:?} / {b:?}");
        }
    }

    let covered: HashSet<&str> = buckets.iter().flat_map(|b| b.iter().copied()).collect();
    let all: HashSet<&str> = results.references.iter().map(|r| r.normalized.as_str()).collect();
    assert_eq!(covered, all);
    assert_eq!(all.len(), s.total_references);
}

// ── Initial analysis ──

#[test]
fn perfect_match() {
    let results = analyze(PERFECT).unwrap();
    assert_eq!(results.summary.full_matches, 1);
    assert_eq!(results.summary.missing_references, 0);
    assert_eq!(results.summary.unused_references, 0);
    let m = &results.full_matches[0];
    assert_eq!(m.citation.original, "(Smith, 2020)");
    assert_eq!(m.confidence, Confidence::Score(100.0));
    assert_partitioned(&results);
}

#[test]
fn misspelt_surname_is_flagged() {
    let results = analyze(MISSPELT).unwrap();
    assert!(results.full_matches.is_empty());
    assert_eq!(results.probable_spelling_errors.len(), 1);
    let m = &results.probable_spelling_errors[0];
    assert_eq!(m.match_type, MatchType::SpellingError);
    assert_eq!(m.confidence, Confidence::Score(72.0));
    assert_eq!(m.reference.first_author, "Smith");
    assert!(results.unused.is_empty());
    assert_partitioned(&results);
}

#[test]
fn missing_and_unused_are_reported() {
    let results = analyze(MIXED).unwrap();
    assert_eq!(results.summary.total_citations, 2);
    assert_eq!(results.summary.total_references, 2);
    assert_eq!(results.full_matches.len(), 1);
    assert_eq!(results.missing.len(), 1);
    assert_eq!(results.missing[0].citation.authors, "Taylor");
    assert_eq!(results.unused.len(), 1);
    assert_eq!(results.unused[0].reference.first_author, "Green");
    assert_partitioned(&results);
}

#[test]
fn reference_cited_twice_is_counted_once() {
    let results = analyze(CITED_TWICE).unwrap();
    assert_eq!(results.summary.total_citations, 4);
    assert_eq!(results.summary.total_references, 3);
    assert_eq!(results.full_matches.len(), 2);
    assert!(
        results
            .full_matches
            .iter()
            .all(|m| m.reference.first_author == "Smith" && m.reference.year == "2020")
    );
    assert_eq!(results.probable_spelling_errors.len(), 1);
    assert_eq!(results.missing.len(), 1);
    assert_eq!(results.unused.len(), 1);
    assert_eq!(results.unused[0].reference.first_author, "Green");
    assert_partitioned(&results);
}

#[test]
fn year_mismatch_never_matches() {
    let doc = "Recent work (Smith, 2021) confirms this.\n\nReferences\nSmith, J. (2020). Title. Journal.\n";
    let results = analyze(doc).unwrap();
    assert_eq!(results.missing.len(), 1);
    assert_eq!(results.unused.len(), 1);
    assert_partitioned(&results);
}

#[test]
fn similarity_is_symmetric() {
    let names = ["smith", "smyth", "jones", "johnson", "", "garcía"];
    for a in names {
        for b in names {
            assert_eq!(similarity(a, b), similarity(b, a), "{a} vs {b}");
        }
    }
}

#[test]
fn empty_document_errors() {
    assert_eq!(analyze("").unwrap_err(), AnalysisError::EmptyInput);
}

// ── Suggestion stages ──

#[test]
fn hidden_citation_found_for_unspaced_narrative() {
    let results = analyze(UNSPACED).unwrap();
    assert!(results.citations.is_empty());
    assert_eq!(results.unused.len(), 1);

    let list = run_suggestion_stage(SuggestionStage::HiddenCitations, &results, UNSPACED);
    assert_eq!(list.len(), 1);
    let top = &list.suggestions[0].candidates[0];
    assert_eq!(top.text, "Smith(2020)");
    assert_eq!(top.kind, CandidateKind::NarrativeCitation);
    assert_eq!(top.confidence, 0.95);
}

#[test]
fn stages_are_pure() {
    let results = analyze(MIXED).unwrap();
    for stage in SuggestionStage::ALL {
        let first = run_suggestion_stage(stage, &results, MIXED);
        let second = run_suggestion_stage(stage, &results, MIXED);
        assert_eq!(first, second);
    }
}

#[tokio::test]
async fn confirming_hidden_citation_moves_reference() {
    let session = AnalysisSession::default();
    session.analyze(UNSPACED).await.unwrap();
    let list = session
        .run_stage(SuggestionStage::HiddenCitations)
        .await
        .unwrap();
    let text = list.suggestions[0].candidates[0].text.clone();

    let results = session
        .confirm(SuggestionStage::HiddenCitations, 0, &text)
        .unwrap();
    assert!(results.unused.is_empty());
    assert_eq!(results.partial_matches.len(), 1);
    assert_eq!(results.partial_matches[0].match_type, MatchType::UserConfirmed);
    assert_eq!(results.partial_matches[0].citation.original, "Smith(2020)");
    assert_eq!(results.summary.partial_matches, 1);
}

#[tokio::test]
async fn confirming_missing_reference_synthesizes_reference() {
    let session = AnalysisSession::default();
    let before = session.analyze(YEAR_ONLY).await.unwrap();
    assert_eq!(before.missing.len(), 1);

    let list = session
        .run_stage(SuggestionStage::MissingReferences)
        .await
        .unwrap();
    assert_eq!(list.len(), 1);
    let candidate = &list.suggestions[0].candidates[0];
    assert_eq!(candidate.kind, CandidateKind::YearMatch);
    assert!(candidate.text.contains("The survey (2015)"));

    let results = session
        .confirm(SuggestionStage::MissingReferences, 0, &candidate.text)
        .unwrap();
    assert!(results.missing.is_empty());
    let m = results
        .full_matches
        .iter()
        .find(|m| m.match_type == MatchType::UserConfirmedMissing)
        .unwrap();
    assert_eq!(m.reference.first_author, "Taylor");
    assert_eq!(m.reference.year, "2015");
    assert_eq!(m.confidence.to_string(), "User Confirmed");
}

#[tokio::test]
async fn same_stage_cannot_overlap() {
    let session = AnalysisSession::default();
    session.analyze(MIXED).await.unwrap();

    let (a, b) = tokio::join!(
        session.run_stage(SuggestionStage::LenientText),
        session.run_stage(SuggestionStage::LenientText)
    );
    assert!(a.is_ok());
    assert_eq!(b.unwrap_err(), AnalysisError::StageBusy(4));
    assert!(!session.is_running(SuggestionStage::LenientText));
}

#[tokio::test]
async fn different_stages_may_overlap() {
    let session = AnalysisSession::default();
    session.analyze(MIXED).await.unwrap();

    let (a, b) = tokio::join!(
        session.run_stage(SuggestionStage::HiddenCitations),
        session.run_stage(SuggestionStage::MissingReferences)
    );
    assert!(a.is_ok());
    assert!(b.is_ok());
}
