use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{FoundWork, LookupResult, VerificationSource, json_body};

/// CrossRef `works` search using the free-text bibliographic query.
pub struct CrossRef {
    pub mailto: Option<String>,
}

impl VerificationSource for CrossRef {
    fn name(&self) -> &str {
        "CrossRef"
    }

    fn lookup<'a>(
        &'a self,
        reference_text: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            let mut url = format!(
                "https://api.crossref.org/works?query.bibliographic={}&rows=1",
                urlencoding::encode(reference_text)
            );
            if let Some(ref email) = self.mailto {
                url.push_str(&format!("&mailto={}", urlencoding::encode(email)));
            }

            let resp = client.get(&url).timeout(timeout).send().await?;
            let data = json_body(resp).await?;

            Ok(parse_works(&data))
        })
    }
}

fn parse_works(data: &serde_json::Value) -> Option<FoundWork> {
    let item = data["message"]["items"].as_array()?.first()?;
    let title = item["title"].as_array()?.first()?.as_str()?;
    Some(FoundWork {
        title: title.to_string(),
        doi: item["DOI"].as_str().map(String::from),
    })
}
