use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{FoundWork, LookupResult, VerificationSource, json_body};

pub struct OpenAlex {
    pub mailto: Option<String>,
}

impl VerificationSource for OpenAlex {
    fn name(&self) -> &str {
        "OpenAlex"
    }

    fn lookup<'a>(
        &'a self,
        reference_text: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            let query = super::query_words(reference_text);
            let mut url = format!(
                "https://api.openalex.org/works?search={}&per-page=1",
                urlencoding::encode(&query)
            );
            if let Some(ref email) = self.mailto {
                url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
            }

            let resp = client.get(&url).timeout(timeout).send().await?;
            let data = json_body(resp).await?;

            Ok(parse_results(&data))
        })
    }
}

fn parse_results(data: &serde_json::Value) -> Option<FoundWork> {
    let work = data["results"].as_array()?.first()?;
    let title = work["title"]
        .as_str()
        .or_else(|| work["display_name"].as_str())?;
    // OpenAlex reports DOIs as full URLs.
    let doi = work["doi"]
        .as_str()
        .map(|d| d.trim_start_matches("https://doi.org/").to_string());
    Some(FoundWork {
        title: title.to_string(),
        doi,
    })
}
