use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{FoundWork, LookupResult, VerificationSource, json_body};

pub struct SemanticScholar {
    pub api_key: Option<String>,
}

impl VerificationSource for SemanticScholar {
    fn name(&self) -> &str {
        "Semantic Scholar"
    }

    fn lookup<'a>(
        &'a self,
        reference_text: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            let query = super::query_words(reference_text);
            let url = format!(
                "https://api.semanticscholar.org/graph/v1/paper/search?query={}&limit=1&fields=title,externalIds",
                urlencoding::encode(&query)
            );

            let mut req = client.get(&url).timeout(timeout);
            if let Some(ref key) = self.api_key {
                req = req.header("x-api-key", key);
            }
            let data = json_body(req.send().await?).await?;

            Ok(parse_papers(&data))
        })
    }
}

fn parse_papers(data: &serde_json::Value) -> Option<FoundWork> {
    let paper = data["data"].as_array()?.first()?;
    Some(FoundWork {
        title: paper["title"].as_str()?.to_string(),
        doi: paper["externalIds"]["DOI"].as_str().map(String::from),
    })
}
