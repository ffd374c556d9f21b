//! Online lookup of bibliography entries in public scholarly databases.
//!
//! Each reference's full text is sent to every enabled source concurrently.
//! A source reports at most one candidate work; its title is compared with the
//! reference text by long-word overlap to decide the verdict.

pub mod crossref;
pub mod openalex;
pub mod pubmed;
pub mod semantic_scholar;

#[cfg(test)]
pub(crate) mod mock;

use std::collections::HashSet;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::Reference;

static LONG_WORD_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b[A-Za-z0-9_]{4,}\b").unwrap());

/// Overlapping long words needed for a full verification.
const VERIFIED_OVERLAP: usize = 2;
/// Words kept when a source needs a short keyword query.
const QUERY_WORDS: usize = 8;

#[derive(Error, Debug)]
pub enum VerifyError {
    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("rate limited (429)")]
    RateLimited,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("unexpected response: {0}")]
    Decode(String),
}

/// The best candidate a source found for a reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FoundWork {
    pub title: String,
    pub doi: Option<String>,
}

pub type LookupResult = Result<Option<FoundWork>, VerifyError>;

/// A scholarly database that can be searched with free reference text.
pub trait VerificationSource: Send + Sync {
    /// Display name, also used to disable the source from config.
    fn name(&self) -> &str;

    fn lookup<'a>(
        &'a self,
        reference_text: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum VerificationStatus {
    Verified,
    PartiallyVerified,
    NotFound,
    Error,
}

impl fmt::Display for VerificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VerificationStatus::Verified => "Verified",
            VerificationStatus::PartiallyVerified => "Partially Verified",
            VerificationStatus::NotFound => "Not Found",
            VerificationStatus::Error => "Error",
        })
    }
}

/// One source's answer for one reference.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Verdict {
    pub source: String,
    pub status: VerificationStatus,
    pub details: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReferenceVerification {
    pub reference: Reference,
    pub verdicts: Vec<Verdict>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VerifyConfig {
    /// Contact address for the CrossRef and OpenAlex polite pools.
    pub mailto: Option<String>,
    pub s2_api_key: Option<String>,
    pub timeout: Duration,
    /// Source names to skip, compared case-insensitively.
    pub disabled_sources: Vec<String>,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            mailto: None,
            s2_api_key: None,
            timeout: Duration::from_secs(10),
            disabled_sources: Vec::new(),
        }
    }
}

/// The enabled sources, in reporting order.
pub fn build_sources(config: &VerifyConfig) -> Vec<Arc<dyn VerificationSource>> {
    let all: Vec<Arc<dyn VerificationSource>> = vec![
        Arc::new(crossref::CrossRef {
            mailto: config.mailto.clone(),
        }),
        Arc::new(openalex::OpenAlex {
            mailto: config.mailto.clone(),
        }),
        Arc::new(semantic_scholar::SemanticScholar {
            api_key: config.s2_api_key.clone(),
        }),
        Arc::new(pubmed::PubMed),
    ];
    all.into_iter()
        .filter(|s| {
            !config
                .disabled_sources
                .iter()
                .any(|d| d.eq_ignore_ascii_case(s.name()))
        })
        .collect()
}

fn long_words(text: &str) -> impl Iterator<Item = String> + '_ {
    LONG_WORD_RE
        .find_iter(text)
        .map(|m| m.as_str().to_lowercase())
}

/// First long non-numeric words of the reference, for keyword-style search APIs.
pub(crate) fn query_words(reference_text: &str) -> String {
    long_words(reference_text)
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit()))
        .take(QUERY_WORDS)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Long words of `reference_text`, counted with repetition, that occur in `title`.
pub fn title_overlap(reference_text: &str, title: &str) -> usize {
    let title_words: HashSet<String> = long_words(title).collect();
    long_words(reference_text)
        .filter(|w| title_words.contains(w))
        .count()
}

/// Turn a source's lookup result into a verdict.
pub fn classify(source: &str, reference_text: &str, result: LookupResult) -> Verdict {
    let (status, details) = match result {
        Err(e) => (VerificationStatus::Error, format!("Lookup failed: {e}")),
        Ok(None) => (
            VerificationStatus::NotFound,
            format!("Reference not found in {source} database."),
        ),
        Ok(Some(work)) => {
            let overlap = title_overlap(reference_text, &work.title);
            if overlap >= VERIFIED_OVERLAP {
                let mut details = format!("Match found: \"{}\"", work.title);
                if let Some(doi) = &work.doi {
                    details.push_str(&format!(" (DOI: {doi})"));
                }
                (VerificationStatus::Verified, details)
            } else if overlap > 0 {
                (
                    VerificationStatus::PartiallyVerified,
                    format!("Potential match with low confidence: \"{}\"", work.title),
                )
            } else {
                (
                    VerificationStatus::NotFound,
                    format!("Reference not found in {source} database."),
                )
            }
        }
    };
    Verdict {
        source: source.to_string(),
        status,
        details,
    }
}

/// Query every source concurrently and wait for all of them.
///
/// Verdicts come back in `sources` order; a failing source yields an
/// [`VerificationStatus::Error`] verdict and never affects the others.
pub async fn verify_reference(
    reference_text: &str,
    sources: &[Arc<dyn VerificationSource>],
    client: &reqwest::Client,
    timeout: Duration,
) -> Vec<Verdict> {
    let mut join_set = tokio::task::JoinSet::new();

    for (idx, source) in sources.iter().enumerate() {
        let source = Arc::clone(source);
        let text = reference_text.to_string();
        let client = client.clone();
        join_set.spawn(async move {
            let result = source.lookup(&text, &client, timeout).await;
            (idx, classify(source.name(), &text, result))
        });
    }

    let mut verdicts: Vec<Option<Verdict>> = vec![None; sources.len()];
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok((idx, verdict)) => {
                tracing::debug!(source = %verdict.source, status = %verdict.status, "lookup finished");
                verdicts[idx] = Some(verdict);
            }
            Err(e) => tracing::warn!(error = %e, "verification task failed"),
        }
    }

    verdicts
        .into_iter()
        .zip(sources)
        .map(|(verdict, source)| {
            verdict.unwrap_or_else(|| Verdict {
                source: source.name().to_string(),
                status: VerificationStatus::Error,
                details: "Lookup task aborted.".to_string(),
            })
        })
        .collect()
}

/// HTTP client shared by all sources of a verification run.
pub fn http_client() -> Result<reqwest::Client, VerifyError> {
    Ok(reqwest::Client::builder()
        .user_agent(concat!("citematch/", env!("CARGO_PKG_VERSION")))
        .build()?)
}

/// Progress of a batch verification run.
#[derive(Debug, Clone, Copy)]
pub enum VerifyProgress<'a> {
    Checking {
        index: usize,
        total: usize,
        reference: &'a Reference,
    },
    Result {
        index: usize,
        total: usize,
        result: &'a ReferenceVerification,
    },
}

/// Verify a batch of references, one at a time, against all enabled sources.
pub async fn verify_references(
    references: &[Reference],
    config: &VerifyConfig,
    progress: impl FnMut(VerifyProgress<'_>),
) -> Result<Vec<ReferenceVerification>, VerifyError> {
    let client = http_client()?;
    let sources = build_sources(config);
    Ok(verify_with_sources(references, &sources, &client, config.timeout, progress).await)
}

/// [`verify_references`] with explicit sources and client.
pub async fn verify_with_sources(
    references: &[Reference],
    sources: &[Arc<dyn VerificationSource>],
    client: &reqwest::Client,
    timeout: Duration,
    mut progress: impl FnMut(VerifyProgress<'_>),
) -> Vec<ReferenceVerification> {
    let total = references.len();
    let mut out = Vec::with_capacity(total);
    for (index, reference) in references.iter().enumerate() {
        tracing::info!(index = index + 1, total, "verifying reference");
        progress(VerifyProgress::Checking {
            index,
            total,
            reference,
        });
        let verdicts = verify_reference(&reference.original, sources, client, timeout).await;
        let result = ReferenceVerification {
            reference: reference.clone(),
            verdicts,
        };
        progress(VerifyProgress::Result {
            index,
            total,
            result: &result,
        });
        out.push(result);
    }
    out
}

/// Shared status handling for JSON search endpoints.
pub(crate) async fn json_body(resp: reqwest::Response) -> Result<serde_json::Value, VerifyError> {
    let status = resp.status();
    if status.as_u16() == 429 {
        return Err(VerifyError::RateLimited);
    }
    if !status.is_success() {
        return Err(VerifyError::Status(status.as_u16()));
    }
    Ok(resp.json().await?)
}
