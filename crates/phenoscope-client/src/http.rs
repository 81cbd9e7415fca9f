//! Elasticsearch HTTP backend.

use async_trait::async_trait;
use std::time::Duration;

use phenoscope_core::config::DatasetProfile;
use phenoscope_core::{PhenoscopeError, Result};

use crate::backend::{SearchBackend, SearchRequest, SearchResponse};

const ERROR_BODY_LIMIT: usize = 512;

/// Backend speaking the Elasticsearch `_search` protocol over HTTP.
pub struct EsBackend {
    client: reqwest::Client,
    index_url: String,
}

impl EsBackend {
    pub fn new(index_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| PhenoscopeError::Transport {
                reason: format!("failed to build HTTP client: {e}"),
            })?;
        Ok(Self {
            client,
            index_url: index_url.into(),
        })
    }

    pub fn from_profile(profile: &DatasetProfile) -> Result<Self> {
        Self::new(
            profile.index_url.value.clone(),
            Duration::from_secs(profile.request_timeout_secs.value),
        )
    }

    fn request_url(&self, request: &SearchRequest) -> String {
        format!("{}?size={}&from={}", self.index_url, request.size, request.from)
    }
}

#[async_trait]
impl SearchBackend for EsBackend {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse> {
        let url = self.request_url(request);
        tracing::debug!(%url, "issuing search request");

        let response = self
            .client
            .post(&url)
            .json(&request.body)
            .send()
            .await
            .map_err(|e| PhenoscopeError::Transport {
                reason: e.to_string(),
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| PhenoscopeError::Transport {
            reason: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(PhenoscopeError::BackendStatus {
                status: status.as_u16(),
                body: truncate(&text),
            });
        }

        serde_json::from_str(&text).map_err(|e| PhenoscopeError::MalformedResponse {
            reason: e.to_string(),
        })
    }
}

fn truncate(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut end = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &body[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::SearchRequestBody;
    use phenoscope_core::query::QueryState;

    #[test]
    fn test_request_url_carries_paging_parameters() {
        let backend =
            EsBackend::new("http://localhost:9200/phenobase/_search", Duration::from_secs(5))
                .unwrap();
        let profile = DatasetProfile::with_defaults();
        let request = SearchRequest {
            size: 15,
            from: 30,
            body: SearchRequestBody::build(&profile, &QueryState::MatchAll),
        };
        assert_eq!(
            backend.request_url(&request),
            "http://localhost:9200/phenobase/_search?size=15&from=30"
        );
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let short = "error";
        assert_eq!(truncate(short), "error");

        let long = "é".repeat(ERROR_BODY_LIMIT);
        let truncated = truncate(&long);
        assert!(truncated.ends_with("..."));
        assert!(truncated.len() <= ERROR_BODY_LIMIT + 3);
    }
}
