//! Interactive analysis state: one authoritative results store, stage runs
//! that never overlap with themselves, and confirm/dismiss transitions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::config::AnalysisConfig;
use crate::suggest::{self, Suggestion, SuggestionList, SuggestionStage, SuggestionTarget};
use crate::{AnalysisError, AnalysisResults, Citation, Confidence, MatchResult, MatchType, Reference};

/// Results plus the pending suggestions of each stage.
///
/// All mutation goes through [`apply_confirmation`](Self::apply_confirmation)
/// and [`apply_dismissal`](Self::apply_dismissal). Results are kept behind an
/// `Arc` so readers holding a snapshot are unaffected by later changes.
#[derive(Debug, Clone, Default)]
pub struct AnalysisStore {
    document: Option<Arc<str>>,
    results: Option<Arc<AnalysisResults>>,
    suggestions: HashMap<SuggestionStage, Vec<Suggestion>>,
}

impl AnalysisStore {
    /// Replace everything with a fresh analysis. Pending suggestions are dropped.
    pub fn reset(&mut self, document: Arc<str>, results: AnalysisResults) -> Arc<AnalysisResults> {
        let results = Arc::new(results);
        self.document = Some(document);
        self.results = Some(Arc::clone(&results));
        self.suggestions.clear();
        results
    }

    pub fn results(&self) -> Option<Arc<AnalysisResults>> {
        self.results.clone()
    }

    pub fn document(&self) -> Option<Arc<str>> {
        self.document.clone()
    }

    pub fn suggestions(&self, stage: SuggestionStage) -> Option<&[Suggestion]> {
        self.suggestions.get(&stage).map(Vec::as_slice)
    }

    /// Store a stage's output, dropping entries whose target was resolved
    /// while the stage was running.
    pub fn set_suggestions(&mut self, mut list: SuggestionList) -> SuggestionList {
        if let Some(results) = &self.results {
            list.suggestions.retain(|s| is_pending(results, &s.target));
        }
        self.suggestions.insert(list.stage, list.suggestions.clone());
        list
    }

    fn pending(&mut self, stage: SuggestionStage, index: usize) -> Result<&mut Vec<Suggestion>, AnalysisError> {
        if self.results.is_none() {
            return Err(AnalysisError::NoResults);
        }
        let list = self
            .suggestions
            .get_mut(&stage)
            .ok_or(AnalysisError::NoSuggestions(stage.number()))?;
        if index >= list.len() {
            return Err(AnalysisError::InvalidSuggestionIndex {
                stage: stage.number(),
                index,
                len: list.len(),
            });
        }
        Ok(list)
    }

    /// Accept `candidate_text` as evidence for suggestion `index` of `stage`.
    ///
    /// - Stages 2 and 4 move the reference out of the unused list into the
    ///   partial matches, and drop its suggestion from the other of the two stages.
    /// - Stage 3 moves the citation out of the missing list into the full
    ///   matches, with a reference synthesized from the span.
    pub fn apply_confirmation(
        &mut self,
        stage: SuggestionStage,
        index: usize,
        candidate_text: &str,
    ) -> Result<Arc<AnalysisResults>, AnalysisError> {
        let suggestion = self.pending(stage, index)?.remove(index);

        if let SuggestionTarget::Reference(reference) = &suggestion.target {
            let counterpart = match stage {
                SuggestionStage::LenientText => SuggestionStage::HiddenCitations,
                _ => SuggestionStage::LenientText,
            };
            if let Some(other) = self.suggestions.get_mut(&counterpart) {
                other.retain(|s| s.target.key() != reference.normalized);
            }
        }

        let shared = self.results.as_mut().ok_or(AnalysisError::NoResults)?;
        let results = Arc::make_mut(shared);
        match suggestion.target {
            SuggestionTarget::Reference(reference) => {
                results
                    .unused
                    .retain(|u| u.reference.normalized != reference.normalized);
                let match_type = if stage == SuggestionStage::LenientText {
                    MatchType::UserConfirmedLenient
                } else {
                    MatchType::UserConfirmed
                };
                results.partial_matches.push(MatchResult {
                    citation: Citation::confirmed(candidate_text, &reference),
                    reference,
                    confidence: Confidence::UserConfirmed,
                    match_type,
                });
            }
            SuggestionTarget::Citation(citation) => {
                results
                    .missing
                    .retain(|m| m.citation.normalized != citation.normalized);
                results.full_matches.push(MatchResult {
                    reference: Reference::confirmed(candidate_text, &citation),
                    citation,
                    confidence: Confidence::UserConfirmed,
                    match_type: MatchType::UserConfirmedMissing,
                });
            }
        }
        results.recompute_summary();

        tracing::info!(stage = stage.number(), index, "suggestion confirmed");
        Ok(Arc::clone(shared))
    }

    /// Drop suggestion `index` of `stage` without touching the results.
    /// Returns what is left of the stage's list.
    pub fn apply_dismissal(
        &mut self,
        stage: SuggestionStage,
        index: usize,
    ) -> Result<SuggestionList, AnalysisError> {
        let list = self.pending(stage, index)?;
        list.remove(index);
        tracing::debug!(stage = stage.number(), index, "suggestion dismissed");
        Ok(SuggestionList {
            stage,
            suggestions: list.clone(),
        })
    }
}

fn is_pending(results: &AnalysisResults, target: &SuggestionTarget) -> bool {
    match target {
        SuggestionTarget::Reference(r) => results
            .unused
            .iter()
            .any(|u| u.reference.normalized == r.normalized),
        SuggestionTarget::Citation(c) => results
            .missing
            .iter()
            .any(|m| m.citation.normalized == c.normalized),
    }
}

/// Marks a stage as running until dropped.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn acquire(flag: &'a AtomicBool, stage: u8) -> Result<Self, AnalysisError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map(|_| InFlight(flag))
            .map_err(|_| AnalysisError::StageBusy(stage))
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// An interactive analysis over one document at a time.
///
/// Stage runs are async so a caller's event loop can repaint between the
/// "busy" and "done" states. A second run of a stage that is already in
/// flight fails with [`AnalysisError::StageBusy`].
pub struct AnalysisSession {
    config: AnalysisConfig,
    store: Mutex<AnalysisStore>,
    /// Index 0 is the initial analysis; 1..=3 are stages 2..=4.
    in_flight: [AtomicBool; 4],
}

impl Default for AnalysisSession {
    fn default() -> Self {
        Self::new(AnalysisConfig::default())
    }
}

impl AnalysisSession {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            config,
            store: Mutex::new(AnalysisStore::default()),
            in_flight: Default::default(),
        }
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    fn lock(&self) -> MutexGuard<'_, AnalysisStore> {
        self.store.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn flag(&self, stage: SuggestionStage) -> &AtomicBool {
        &self.in_flight[usize::from(stage.number() - 1)]
    }

    /// Run the initial analysis and make it the current result set.
    pub async fn analyze(&self, text: &str) -> Result<Arc<AnalysisResults>, AnalysisError> {
        let _guard = InFlight::acquire(&self.in_flight[0], 1)?;
        tokio::task::yield_now().await;

        let results = crate::analyze_with_config(text, &self.config)?;
        let results = self.lock().reset(Arc::from(text), results);

        tokio::task::yield_now().await;
        Ok(results)
    }

    /// Run a suggestion stage against the current results and store its output.
    pub async fn run_stage(&self, stage: SuggestionStage) -> Result<SuggestionList, AnalysisError> {
        let _guard = InFlight::acquire(self.flag(stage), stage.number())?;
        tokio::task::yield_now().await;

        let (results, document) = {
            let store = self.lock();
            match (store.results(), store.document()) {
                (Some(r), Some(d)) => (r, d),
                _ => return Err(AnalysisError::NoResults),
            }
        };
        let list = suggest::run_suggestion_stage_with_config(stage, &results, &document, &self.config);
        let list = self.lock().set_suggestions(list);

        tokio::task::yield_now().await;
        Ok(list)
    }

    pub fn results(&self) -> Option<Arc<AnalysisResults>> {
        self.lock().results()
    }

    /// Pending suggestions of a stage, or `None` if it has not been run.
    pub fn suggestions(&self, stage: SuggestionStage) -> Option<Vec<Suggestion>> {
        self.lock().suggestions(stage).map(<[Suggestion]>::to_vec)
    }

    pub fn confirm(
        &self,
        stage: SuggestionStage,
        index: usize,
        candidate_text: &str,
    ) -> Result<Arc<AnalysisResults>, AnalysisError> {
        self.lock().apply_confirmation(stage, index, candidate_text)
    }

    pub fn dismiss(&self, stage: SuggestionStage, index: usize) -> Result<SuggestionList, AnalysisError> {
        self.lock().apply_dismissal(stage, index)
    }

    pub fn is_running(&self, stage: SuggestionStage) -> bool {
        self.flag(stage).load(Ordering::Acquire)
    }
}
