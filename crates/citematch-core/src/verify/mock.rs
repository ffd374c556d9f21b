//! Mock verification source for tests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use super::{FoundWork, LookupResult, VerificationSource, VerifyError};

#[derive(Clone, Debug)]
pub enum MockResponse {
    /// A work with this title.
    Found(String),
    NotFound,
    /// A non-success HTTP status.
    Error,
}

/// A [`VerificationSource`] returning a fixed response or a sequence of
/// responses (the last one repeats), with optional latency and call counting.
pub struct MockSource {
    name: &'static str,
    /// Stored reversed so `pop()` yields the next response.
    sequence: Mutex<Vec<MockResponse>>,
    fallback: MockResponse,
    delay: Option<Duration>,
    call_count: AtomicUsize,
}

impl MockSource {
    pub fn new(name: &'static str, response: MockResponse) -> Self {
        Self {
            name,
            sequence: Mutex::new(Vec::new()),
            fallback: response,
            delay: None,
            call_count: AtomicUsize::new(0),
        }
    }

    pub fn with_sequence(name: &'static str, mut responses: Vec<MockResponse>) -> Self {
        let fallback = responses.last().cloned().unwrap_or(MockResponse::NotFound);
        responses.reverse();
        Self {
            sequence: Mutex::new(responses),
            ..Self::new(name, fallback)
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    fn next_response(&self) -> MockResponse {
        let mut seq = self.sequence.lock().unwrap();
        seq.pop().unwrap_or_else(|| self.fallback.clone())
    }
}

impl VerificationSource for MockSource {
    fn name(&self) -> &str {
        self.name
    }

    fn lookup<'a>(
        &'a self,
        _reference_text: &'a str,
        _client: &'a reqwest::Client,
        _timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        self.call_count.fetch_add(1, Ordering::SeqCst);
        let response = self.next_response();
        Box::pin(async move {
            if let Some(d) = self.delay {
                tokio::time::sleep(d).await;
            }
            match response {
                MockResponse::Found(title) => Ok(Some(FoundWork {
                    title,
                    doi: Some("10.0/mock".to_string()),
                })),
                MockResponse::NotFound => Ok(None),
                MockResponse::Error => Err(VerifyError::Status(500)),
            }
        })
    }
}
