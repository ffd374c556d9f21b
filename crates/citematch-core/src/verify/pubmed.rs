use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use super::{FoundWork, LookupResult, VerificationSource, VerifyError, json_body};

const ESEARCH_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esearch.fcgi";
const ESUMMARY_URL: &str = "https://eutils.ncbi.nlm.nih.gov/entrez/eutils/esummary.fcgi";

/// PubMed via NCBI E-utilities: esearch for an id, then esummary for its title.
pub struct PubMed;

impl VerificationSource for PubMed {
    fn name(&self) -> &str {
        "PubMed"
    }

    fn lookup<'a>(
        &'a self,
        reference_text: &'a str,
        client: &'a reqwest::Client,
        timeout: Duration,
    ) -> Pin<Box<dyn Future<Output = LookupResult> + Send + 'a>> {
        Box::pin(async move {
            let term = super::query_words(reference_text);
            let resp = client
                .get(ESEARCH_URL)
                .query(&[
                    ("db", "pubmed"),
                    ("term", term.as_str()),
                    ("retmode", "json"),
                    ("retmax", "1"),
                ])
                .timeout(timeout)
                .send()
                .await?;
            let data = json_body(resp).await?;

            let Some(id) = data["esearchresult"]["idlist"]
                .as_array()
                .and_then(|ids| ids.first())
                .and_then(|v| v.as_str())
                .map(String::from)
            else {
                return Ok(None);
            };

            let resp = client
                .get(ESUMMARY_URL)
                .query(&[("db", "pubmed"), ("id", id.as_str()), ("retmode", "json")])
                .timeout(timeout)
                .send()
                .await?;
            let data = json_body(resp).await?;

            parse_summary(&data, &id).map(Some)
        })
    }
}

fn parse_summary(data: &serde_json::Value, id: &str) -> Result<FoundWork, VerifyError> {
    let record = &data["result"][id];
    let title = record["title"]
        .as_str()
        .ok_or_else(|| VerifyError::Decode(format!("no title for PubMed id {id}")))?;
    let doi = record["articleids"].as_array().and_then(|ids| {
        ids.iter()
            .find(|a| a["idtype"].as_str() == Some("doi"))
            .and_then(|a| a["value"].as_str())
            .map(String::from)
    });
    Ok(FoundWork {
        title: title.trim_end_matches('.').to_string(),
        doi,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_summary() {
        let data = json!({"result": {"uids": ["42"], "42": {
            "title": "Sleep and memory.",
            "articleids": [
                {"idtype": "pubmed", "value": "42"},
                {"idtype": "doi", "value": "10.4/w"}
            ]
        }}});
        let work = parse_summary(&data, "42").unwrap();
        assert_eq!(work.title, "Sleep and memory");
        assert_eq!(work.doi.as_deref(), Some("10.4/w"));
    }

    #[test]
    fn test_parse_summary_missing_record() {
        let err = parse_summary(&json!({"result": {}}), "7").unwrap_err();
        assert!(matches!(err, VerifyError::Decode(_)));
    }
}
