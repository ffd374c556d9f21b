use regex::Regex;

/// Controls how a list of values is overridden from its defaults.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum ListOverride<T> {
    /// Use the built-in defaults.
    #[default]
    Default,
    /// Completely replace the defaults with these values.
    Replace(Vec<T>),
    /// Append these values to the defaults.
    Extend(Vec<T>),
}

impl<T: Clone> ListOverride<T> {
    /// Resolve this override against the given defaults.
    pub fn resolve(&self, defaults: &[T]) -> Vec<T> {
        match self {
            ListOverride::Default => defaults.to_vec(),
            ListOverride::Replace(v) => v.clone(),
            ListOverride::Extend(v) => {
                let mut result = defaults.to_vec();
                result.extend(v.iter().cloned());
                result
            }
        }
    }
}

/// Hidden-citation candidates containing any of these are discarded.
pub const DEFAULT_NOISE_MARKERS: &[&str] = &["doi.org", "University", "Journal of"];

/// Words never counted as title evidence by the lenient full-text search.
pub const DEFAULT_STOPWORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "this", "that", "they", "have", "been", "were", "will",
    "their", "there", "when", "where", "what", "which", "while",
];

/// Tunables for analysis and the suggestion stages.
///
/// Regex fields are `Option<Regex>`; `None` means the built-in pattern.
/// Use [`AnalysisConfigBuilder`] to construct with string patterns.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    // ── section.rs ──
    pub(crate) references_heading_re: Option<Regex>,
    pub(crate) footnotes_heading_re: Option<Regex>,

    // ── matching.rs ──
    /// Minimum score for a citation to be matched (default: 70).
    pub(crate) accept_threshold: f64,
    /// Surname similarity needed to count as a spelling variant (default: 0.75).
    pub(crate) similarity_threshold: f64,
    /// Weighted author-overlap ratio needed by the multi-author path (default: 0.7).
    pub(crate) multi_author_ratio: f64,

    // ── suggest/hidden.rs ──
    pub(crate) hidden_max_candidates: usize,
    pub(crate) noise_markers: ListOverride<String>,

    // ── suggest/missing.rs ──
    pub(crate) missing_max_candidates: usize,
    /// Bytes of context kept on each side of a year match (default: 100).
    pub(crate) context_radius: usize,

    // ── suggest/lenient.rs ──
    pub(crate) lenient_max_candidates: usize,
    pub(crate) lenient_accept_score: f64,
    pub(crate) max_title_words: usize,
    pub(crate) stopwords: ListOverride<String>,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            references_heading_re: None,
            footnotes_heading_re: None,
            accept_threshold: 70.0,
            similarity_threshold: 0.75,
            multi_author_ratio: 0.7,
            hidden_max_candidates: 3,
            noise_markers: ListOverride::Default,
            missing_max_candidates: 5,
            context_radius: 100,
            lenient_max_candidates: 5,
            lenient_accept_score: 60.0,
            max_title_words: 8,
            stopwords: ListOverride::Default,
        }
    }
}

fn owned(defaults: &[&str]) -> Vec<String> {
    defaults.iter().map(|s| s.to_string()).collect()
}

impl AnalysisConfig {
    pub fn accept_threshold(&self) -> f64 {
        self.accept_threshold
    }

    pub fn similarity_threshold(&self) -> f64 {
        self.similarity_threshold
    }

    /// Resolved noise markers for hidden-citation filtering.
    pub fn noise_markers(&self) -> Vec<String> {
        self.noise_markers.resolve(&owned(DEFAULT_NOISE_MARKERS))
    }

    /// Resolved stopword list for lenient title matching.
    pub fn stopwords(&self) -> Vec<String> {
        self.stopwords.resolve(&owned(DEFAULT_STOPWORDS))
    }
}

/// Builder for [`AnalysisConfig`].
///
/// Heading patterns are compiled in [`build()`](Self::build), which fails fast
/// with `regex::Error` on an invalid pattern.
#[derive(Debug, Clone, Default)]
pub struct AnalysisConfigBuilder {
    references_heading_re: Option<String>,
    footnotes_heading_re: Option<String>,
    accept_threshold: Option<f64>,
    similarity_threshold: Option<f64>,
    multi_author_ratio: Option<f64>,
    hidden_max_candidates: Option<usize>,
    noise_markers: ListOverride<String>,
    missing_max_candidates: Option<usize>,
    context_radius: Option<usize>,
    lenient_max_candidates: Option<usize>,
    lenient_accept_score: Option<f64>,
    max_title_words: Option<usize>,
    stopwords: ListOverride<String>,
}

fn push_extend(list: &mut ListOverride<String>, value: String) {
    match list {
        ListOverride::Extend(v) | ListOverride::Replace(v) => v.push(value),
        ListOverride::Default => *list = ListOverride::Extend(vec![value]),
    }
}

impl AnalysisConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Headings ──

    pub fn references_heading_regex(mut self, pattern: &str) -> Self {
        self.references_heading_re = Some(pattern.to_string());
        self
    }

    pub fn footnotes_heading_regex(mut self, pattern: &str) -> Self {
        self.footnotes_heading_re = Some(pattern.to_string());
        self
    }

    // ── Matching ──

    pub fn accept_threshold(mut self, score: f64) -> Self {
        self.accept_threshold = Some(score);
        self
    }

    pub fn similarity_threshold(mut self, ratio: f64) -> Self {
        self.similarity_threshold = Some(ratio);
        self
    }

    pub fn multi_author_ratio(mut self, ratio: f64) -> Self {
        self.multi_author_ratio = Some(ratio);
        self
    }

    // ── Hidden citations ──

    pub fn hidden_max_candidates(mut self, n: usize) -> Self {
        self.hidden_max_candidates = Some(n);
        self
    }

    pub fn set_noise_markers(mut self, markers: Vec<String>) -> Self {
        self.noise_markers = ListOverride::Replace(markers);
        self
    }

    pub fn add_noise_marker(mut self, marker: String) -> Self {
        push_extend(&mut self.noise_markers, marker);
        self
    }

    // ── Missing references ──

    pub fn missing_max_candidates(mut self, n: usize) -> Self {
        self.missing_max_candidates = Some(n);
        self
    }

    pub fn context_radius(mut self, bytes: usize) -> Self {
        self.context_radius = Some(bytes);
        self
    }

    // ── Lenient text ──

    pub fn lenient_max_candidates(mut self, n: usize) -> Self {
        self.lenient_max_candidates = Some(n);
        self
    }

    pub fn lenient_accept_score(mut self, score: f64) -> Self {
        self.lenient_accept_score = Some(score);
        self
    }

    pub fn max_title_words(mut self, n: usize) -> Self {
        self.max_title_words = Some(n);
        self
    }

    pub fn set_stopwords(mut self, words: Vec<String>) -> Self {
        self.stopwords = ListOverride::Replace(words);
        self
    }

    pub fn add_stopword(mut self, word: String) -> Self {
        push_extend(&mut self.stopwords, word);
        self
    }

    /// Build the config, compiling any custom heading patterns.
    pub fn build(self) -> Result<AnalysisConfig, regex::Error> {
        let defaults = AnalysisConfig::default();
        Ok(AnalysisConfig {
            references_heading_re: self
                .references_heading_re
                .as_deref()
                .map(Regex::new)
                .transpose()?,
            footnotes_heading_re: self
                .footnotes_heading_re
                .as_deref()
                .map(Regex::new)
                .transpose()?,
            accept_threshold: self.accept_threshold.unwrap_or(defaults.accept_threshold),
            similarity_threshold: self
                .similarity_threshold
                .unwrap_or(defaults.similarity_threshold),
            multi_author_ratio: self
                .multi_author_ratio
                .unwrap_or(defaults.multi_author_ratio),
            hidden_max_candidates: self
                .hidden_max_candidates
                .unwrap_or(defaults.hidden_max_candidates),
            noise_markers: self.noise_markers,
            missing_max_candidates: self
                .missing_max_candidates
                .unwrap_or(defaults.missing_max_candidates),
            context_radius: self.context_radius.unwrap_or(defaults.context_radius),
            lenient_max_candidates: self
                .lenient_max_candidates
                .unwrap_or(defaults.lenient_max_candidates),
            lenient_accept_score: self
                .lenient_accept_score
                .unwrap_or(defaults.lenient_accept_score),
            max_title_words: self.max_title_words.unwrap_or(defaults.max_title_words),
            stopwords: self.stopwords,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_override_resolve() {
        let defaults = vec![1, 2];
        assert_eq!(ListOverride::Default.resolve(&defaults), vec![1, 2]);
        assert_eq!(ListOverride::Replace(vec![9]).resolve(&defaults), vec![9]);
        assert_eq!(ListOverride::Extend(vec![3]).resolve(&defaults), vec![1, 2, 3]);
    }

    #[test]
    fn test_default_builder_matches_default() {
        let built = AnalysisConfigBuilder::new().build().unwrap();
        let default = AnalysisConfig::default();
        assert_eq!(built.accept_threshold, default.accept_threshold);
        assert_eq!(built.context_radius, 100);
        assert_eq!(built.hidden_max_candidates, 3);
        assert!(built.references_heading_re.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let config = AnalysisConfigBuilder::new()
            .accept_threshold(80.0)
            .similarity_threshold(0.9)
            .add_noise_marker("Press".into())
            .set_stopwords(vec!["study".into()])
            .references_heading_regex(r"(?im)^Literature$")
            .build()
            .unwrap();
        assert_eq!(config.accept_threshold(), 80.0);
        assert_eq!(config.similarity_threshold(), 0.9);
        assert_eq!(config.noise_markers().len(), DEFAULT_NOISE_MARKERS.len() + 1);
        assert_eq!(config.stopwords(), vec!["study".to_string()]);
        assert!(config.references_heading_re.is_some());
    }

    #[test]
    fn test_builder_rejects_bad_regex() {
        assert!(
            AnalysisConfigBuilder::new()
                .footnotes_heading_regex("(unclosed")
                .build()
                .is_err()
        );
    }
}
