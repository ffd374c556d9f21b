//! Follow-up suggestion stages run on demand after the initial analysis.
//!
//! - Stage 2 ([`hidden`]) looks for unused references cited in forms the
//!   extractor missed.
//! - Stage 3 ([`missing`]) looks for text around the year of each citation
//!   that has no reference.
//! - Stage 4 ([`lenient`]) scores body sentences against unused references
//!   by year, surname and title words.
//!
//! Each stage is a pure function of the analysis results and the document.

pub mod hidden;
pub mod lenient;
pub mod missing;

use std::fmt;

use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::config::AnalysisConfig;
use crate::{AnalysisResults, Citation, Reference};

/// A follow-up stage. Stage 1 is the initial analysis and has no variant here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SuggestionStage {
    HiddenCitations = 2,
    MissingReferences = 3,
    LenientText = 4,
}

impl SuggestionStage {
    pub const ALL: [SuggestionStage; 3] = [
        SuggestionStage::HiddenCitations,
        SuggestionStage::MissingReferences,
        SuggestionStage::LenientText,
    ];

    pub fn number(self) -> u8 {
        self as u8
    }

    pub fn label(self) -> &'static str {
        match self {
            SuggestionStage::HiddenCitations => "hidden citations",
            SuggestionStage::MissingReferences => "missing references",
            SuggestionStage::LenientText => "lenient text search",
        }
    }
}

impl TryFrom<u8> for SuggestionStage {
    type Error = u8;

    fn try_from(n: u8) -> Result<Self, Self::Error> {
        match n {
            2 => Ok(SuggestionStage::HiddenCitations),
            3 => Ok(SuggestionStage::MissingReferences),
            4 => Ok(SuggestionStage::LenientText),
            other => Err(other),
        }
    }
}

impl fmt::Display for SuggestionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {} ({})", self.number(), self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CandidateKind {
    NarrativeCitation,
    ParentheticalCitation,
    YearMatch,
    LenientTextMatch,
}

impl CandidateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            CandidateKind::NarrativeCitation => "narrative-citation",
            CandidateKind::ParentheticalCitation => "parenthetical-citation",
            CandidateKind::YearMatch => "year-match",
            CandidateKind::LenientTextMatch => "lenient-text-match",
        }
    }
}

/// A span of the document proposed as evidence for a pending item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SuggestionCandidate {
    pub text: String,
    /// Byte offset into the searched text, or a sentence index for lenient matches.
    pub position: usize,
    /// 0.0–1.0.
    pub confidence: f64,
    #[serde(rename = "type")]
    pub kind: CandidateKind,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub matched_terms: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sentence: Option<String>,
}

impl SuggestionCandidate {
    pub fn new(text: impl Into<String>, position: usize, confidence: f64, kind: CandidateKind) -> Self {
        Self {
            text: text.into(),
            position,
            confidence,
            kind,
            matched_terms: Vec::new(),
            sentence: None,
        }
    }
}

/// The pending item a suggestion is about.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "item", rename_all = "snake_case")]
pub enum SuggestionTarget {
    /// An unused reference (stages 2 and 4).
    Reference(Reference),
    /// A citation without a reference (stage 3).
    Citation(Citation),
}

impl SuggestionTarget {
    /// Identity key of the target item.
    pub fn key(&self) -> &str {
        match self {
            SuggestionTarget::Reference(r) => &r.normalized,
            SuggestionTarget::Citation(c) => &c.normalized,
        }
    }

    /// Display text of the target item.
    pub fn original(&self) -> &str {
        match self {
            SuggestionTarget::Reference(r) => &r.original,
            SuggestionTarget::Citation(c) => &c.original,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub target: SuggestionTarget,
    pub candidates: Vec<SuggestionCandidate>,
}

/// Output of one stage: only items with at least one candidate are listed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionList {
    pub stage: SuggestionStage,
    pub suggestions: Vec<Suggestion>,
}

impl SuggestionList {
    pub fn len(&self) -> usize {
        self.suggestions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.suggestions.is_empty()
    }
}

/// Run one suggestion stage with the default configuration.
pub fn run_suggestion_stage(
    stage: SuggestionStage,
    results: &AnalysisResults,
    document: &str,
) -> SuggestionList {
    run_suggestion_stage_with_config(stage, results, document, &AnalysisConfig::default())
}

/// Config-aware version of [`run_suggestion_stage`].
pub fn run_suggestion_stage_with_config(
    stage: SuggestionStage,
    results: &AnalysisResults,
    document: &str,
    config: &AnalysisConfig,
) -> SuggestionList {
    let suggestions = match stage {
        SuggestionStage::HiddenCitations => {
            hidden::find_hidden_citations(&results.unused, document, config)
        }
        SuggestionStage::MissingReferences => {
            missing::find_missing_references(&results.missing, document, config)
        }
        SuggestionStage::LenientText => {
            lenient::find_lenient_matches(&results.unused, document, config)
        }
    };
    tracing::info!(stage = stage.number(), items = suggestions.len(), "suggestion stage complete");
    SuggestionList { stage, suggestions }
}

/// Compile a runtime-built search pattern case-insensitively.
///
/// A pattern that fails to compile is logged and skipped.
pub(crate) fn compile_search_pattern(pattern: &str) -> Option<Regex> {
    match RegexBuilder::new(pattern).case_insensitive(true).build() {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::debug!(pattern, error = %e, "skipping malformed search pattern");
            None
        }
    }
}

/// `[year]` plus the year without its disambiguation letter when different.
pub(crate) fn year_variants(year: &str) -> Vec<String> {
    let bare = crate::normalize::strip_year_suffix(year);
    let mut variants = vec![year.to_string()];
    if bare != year {
        variants.push(bare.to_string());
    }
    variants
}

/// Keep the first candidate for each key, preserving order.
pub(crate) fn dedup_candidates<K, F>(
    candidates: Vec<SuggestionCandidate>,
    key: F,
) -> Vec<SuggestionCandidate>
where
    K: Eq + std::hash::Hash,
    F: Fn(&SuggestionCandidate) -> K,
{
    let mut seen = std::collections::HashSet::new();
    candidates
        .into_iter()
        .filter(|c| seen.insert(key(c)))
        .collect()
}

/// Stable sort by descending confidence, then cap.
pub(crate) fn rank_candidates(
    mut candidates: Vec<SuggestionCandidate>,
    cap: usize,
) -> Vec<SuggestionCandidate> {
    candidates.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    candidates.truncate(cap);
    candidates
}
