use std::fmt;

use serde::{Deserialize, Serialize, Serializer};
use thiserror::Error;

pub mod citations;
pub mod config;
pub mod config_file;
pub mod matching;
pub mod normalize;
pub mod references;
pub mod section;
pub mod session;
pub mod suggest;
pub mod verify;

// Re-export for convenience
pub use config::{AnalysisConfig, AnalysisConfigBuilder, ListOverride};
pub use normalize::{extract_first_author, normalize, similarity};
pub use session::{AnalysisSession, AnalysisStore};
pub use suggest::{
    CandidateKind, Suggestion, SuggestionCandidate, SuggestionList, SuggestionStage,
    SuggestionTarget, run_suggestion_stage, run_suggestion_stage_with_config,
};

/// Label shown in place of a numeric score for user-confirmed matches.
pub const USER_CONFIRMED_LABEL: &str = "User Confirmed";

/// How an in-text citation was recognised.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CitationKind {
    Parenthetical,
    Narrative,
    NarrativeComplex,
    ParentheticalMulti,
    /// Synthesized from a confirmed suggestion rather than extracted.
    Confirmed,
}

impl CitationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CitationKind::Parenthetical => "parenthetical",
            CitationKind::Narrative => "narrative",
            CitationKind::NarrativeComplex => "narrative-complex",
            CitationKind::ParentheticalMulti => "parenthetical-multi",
            CitationKind::Confirmed => "confirmed",
        }
    }
}

/// An in-text citation such as `(Smith, 2020)` or `Smith et al. (2020)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Citation {
    pub original: String,
    pub authors: String,
    /// Four digits plus an optional lowercase disambiguation letter.
    pub year: String,
    /// Comparison key; identity for deduplication.
    pub normalized: String,
    #[serde(rename = "type")]
    pub kind: CitationKind,
}

impl Citation {
    pub fn new(
        original: impl Into<String>,
        authors: impl Into<String>,
        year: impl Into<String>,
        kind: CitationKind,
    ) -> Self {
        let authors = authors.into();
        let year = year.into();
        let normalized = normalize(&format!("{} {}", authors, year));
        Self {
            original: original.into(),
            authors,
            year,
            normalized,
            kind,
        }
    }

    /// Citation standing in for a text span the user confirmed as citing `reference`.
    pub fn confirmed(span: &str, reference: &Reference) -> Self {
        Self::new(
            span,
            reference.first_author.clone(),
            reference.year.clone(),
            CitationKind::Confirmed,
        )
    }
}

/// A bibliography entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Reference {
    pub original: String,
    pub first_author: String,
    pub all_authors: String,
    pub year: String,
    /// Comparison key over all authors and year; identity for deduplication.
    pub normalized: String,
    pub first_author_normalized: String,
}

impl Reference {
    pub fn new(
        original: impl Into<String>,
        first_author: impl Into<String>,
        all_authors: impl Into<String>,
        year: impl Into<String>,
    ) -> Self {
        let first_author = first_author.into();
        let all_authors = all_authors.into();
        let year = year.into();
        Self {
            original: original.into(),
            normalized: normalize(&format!("{} {}", all_authors, year)),
            first_author_normalized: normalize(&format!("{} {}", first_author, year)),
            first_author,
            all_authors,
            year,
        }
    }

    /// Reference standing in for a text span the user confirmed as the source of `citation`.
    pub fn confirmed(span: &str, citation: &Citation) -> Self {
        Self::new(
            span,
            citation.authors.clone(),
            citation.authors.clone(),
            citation.year.clone(),
        )
    }
}

/// Classification of a citation/reference pairing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchType {
    Full,
    Partial,
    SpellingError,
    /// Confirmed from a hidden-citation suggestion.
    UserConfirmed,
    /// Confirmed from a missing-reference suggestion.
    UserConfirmedMissing,
    /// Confirmed from a lenient full-text suggestion.
    #[serde(rename = "user_confirmed_fourth")]
    UserConfirmedLenient,
}

impl MatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchType::Full => "full",
            MatchType::Partial => "partial",
            MatchType::SpellingError => "spelling_error",
            MatchType::UserConfirmed => "user_confirmed",
            MatchType::UserConfirmedMissing => "user_confirmed_missing",
            MatchType::UserConfirmedLenient => "user_confirmed_fourth",
        }
    }
}

/// Match confidence: a 0–100 score, or the user-confirmed sentinel.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Confidence {
    Score(f64),
    UserConfirmed,
}

impl Confidence {
    pub fn score(&self) -> Option<f64> {
        match self {
            Confidence::Score(s) => Some(*s),
            Confidence::UserConfirmed => None,
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Confidence::Score(s) if s.fract() == 0.0 => write!(f, "{:.0}", s),
            Confidence::Score(s) => write!(f, "{:.1}", s),
            Confidence::UserConfirmed => f.write_str(USER_CONFIRMED_LABEL),
        }
    }
}

impl Serialize for Confidence {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Confidence::Score(s) => serializer.serialize_f64(*s),
            Confidence::UserConfirmed => serializer.serialize_str(USER_CONFIRMED_LABEL),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchResult {
    pub citation: Citation,
    pub reference: Reference,
    pub confidence: Confidence,
    pub match_type: MatchType,
}

/// A citation with no reference scoring above the accept threshold.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmatchedResult {
    pub citation: Citation,
    pub suggestions: Vec<SuggestionCandidate>,
}

/// A reference never matched by any citation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UnusedResult {
    pub reference: Reference,
    pub possible_matches: Vec<SuggestionCandidate>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub total_citations: usize,
    pub total_references: usize,
    pub full_matches: usize,
    pub partial_matches: usize,
    pub probable_spelling_errors: usize,
    pub missing_references: usize,
    pub unused_references: usize,
}

/// Everything produced by one analysis run, plus later user confirmations.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisResults {
    pub citations: Vec<Citation>,
    pub references: Vec<Reference>,
    pub full_matches: Vec<MatchResult>,
    pub partial_matches: Vec<MatchResult>,
    pub probable_spelling_errors: Vec<MatchResult>,
    pub missing: Vec<UnmatchedResult>,
    pub unused: Vec<UnusedResult>,
    pub summary: Summary,
}

impl AnalysisResults {
    /// Refresh the bucket counts. Totals stay fixed at their analysis-time values.
    pub fn recompute_summary(&mut self) {
        self.summary.full_matches = self.full_matches.len();
        self.summary.partial_matches = self.partial_matches.len();
        self.summary.probable_spelling_errors = self.probable_spelling_errors.len();
        self.summary.missing_references = self.missing.len();
        self.summary.unused_references = self.unused.len();
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AnalysisError {
    #[error("no document text provided")]
    EmptyInput,
    #[error("no citations or references found")]
    NoEntitiesFound,
    #[error("no analysis results yet; run the initial analysis first")]
    NoResults,
    #[error("stage {0} is already running")]
    StageBusy(u8),
    #[error("stage {0} has not been run")]
    NoSuggestions(u8),
    #[error("suggestion {index} out of range for stage {stage} ({len} pending)")]
    InvalidSuggestionIndex { stage: u8, index: usize, len: usize },
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid config file: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("invalid pattern in config: {0}")]
    Regex(#[from] regex::Error),
}

/// Extract citations and references from `text` and match them.
pub fn analyze(text: &str) -> Result<AnalysisResults, AnalysisError> {
    analyze_with_config(text, &AnalysisConfig::default())
}

/// Config-aware version of [`analyze`].
pub fn analyze_with_config(
    text: &str,
    config: &AnalysisConfig,
) -> Result<AnalysisResults, AnalysisError> {
    if text.trim().is_empty() {
        return Err(AnalysisError::EmptyInput);
    }

    let citations = citations::extract_citations(text);
    let references = references::extract_references_with_config(text, config);
    tracing::debug!(
        citations = citations.len(),
        references = references.len(),
        "extraction complete"
    );

    if citations.is_empty() && references.is_empty() {
        return Err(AnalysisError::NoEntitiesFound);
    }

    let outcome = matching::match_citations_with_config(&citations, &references, config);

    let mut results = AnalysisResults {
        summary: Summary {
            total_citations: citations.len(),
            total_references: references.len(),
            ..Summary::default()
        },
        citations,
        references,
        full_matches: outcome.full_matches,
        partial_matches: outcome.partial_matches,
        probable_spelling_errors: outcome.spelling_errors,
        missing: outcome.unmatched,
        unused: outcome.unused,
    };
    results.recompute_summary();

    tracing::info!(
        full = results.summary.full_matches,
        partial = results.summary.partial_matches,
        spelling = results.summary.probable_spelling_errors,
        missing = results.summary.missing_references,
        unused = results.summary.unused_references,
        "analysis complete"
    );

    Ok(results)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_is_rejected() {
        assert_eq!(analyze("   \n\t").unwrap_err(), AnalysisError::EmptyInput);
    }

    #[test]
    fn text_without_entities_is_rejected() {
        assert_eq!(
            analyze("Plain prose with no citations at all.").unwrap_err(),
            AnalysisError::NoEntitiesFound
        );
    }

    #[test]
    fn confidence_display() {
        assert_eq!(Confidence::Score(100.0).to_string(), "100");
        assert_eq!(Confidence::Score(92.5).to_string(), "92.5");
        assert_eq!(Confidence::UserConfirmed.to_string(), "User Confirmed");
    }

    #[test]
    fn confidence_serializes_as_number_or_label() {
        assert_eq!(serde_json::to_string(&Confidence::Score(72.0)).unwrap(), "72.0");
        assert_eq!(
            serde_json::to_string(&Confidence::UserConfirmed).unwrap(),
            "\"User Confirmed\""
        );
    }

    #[test]
    fn match_type_wire_names() {
        assert_eq!(
            serde_json::to_string(&MatchType::UserConfirmedLenient).unwrap(),
            "\"user_confirmed_fourth\""
        );
        assert_eq!(MatchType::SpellingError.as_str(), "spelling_error");
    }

    #[test]
    fn citation_serializes_kind_as_type() {
        let c = Citation::new("(Smith, 2020)", "Smith", "2020", CitationKind::Parenthetical);
        let json = serde_json::to_value(&c).unwrap();
        assert_eq!(json["type"], "parenthetical");
        assert_eq!(json["normalized"], "smith 2020");
    }

    #[test]
    fn reference_keys() {
        let r = Reference::new("Smith, J. (2020). Title.", "Smith", "Smith, J", "2020");
        assert_eq!(r.normalized, "smith j 2020");
        assert_eq!(r.first_author_normalized, "smith 2020");
    }
}
