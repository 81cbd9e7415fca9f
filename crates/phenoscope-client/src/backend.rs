//! Search backend port and wire types.
//!
//! The request mirrors what the aggregation engine expects (`aggs` per
//! declared facet plus the compiled query); the response types cover exactly
//! the fields the orchestrator consumes. Anything that fails to deserialize
//! into these shapes is a malformed response.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

use phenoscope_core::config::DatasetProfile;
use phenoscope_core::models::ResultDocument;
use phenoscope_core::query::QueryState;
use phenoscope_core::Result;

/// `terms` aggregation over one facet's backing field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TermsAgg {
    pub field: String,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggSpec {
    pub terms: TermsAgg,
}

/// POST body of a search request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchRequestBody {
    pub aggs: BTreeMap<String, AggSpec>,
    pub query: serde_json::Value,
}

impl SearchRequestBody {
    /// Builds the request body for the given compiled query: one `terms`
    /// aggregation per declared facet, bucket counts per declaration.
    pub fn build(profile: &DatasetProfile, query: &QueryState) -> Self {
        let aggs = profile
            .facets
            .iter()
            .map(|def| {
                (
                    def.name.clone(),
                    AggSpec {
                        terms: TermsAgg {
                            field: def.backing_field().to_string(),
                            size: def.bucket_size,
                        },
                    },
                )
            })
            .collect();
        Self {
            aggs,
            query: query.to_es_json(),
        }
    }
}

/// One fully assembled search request.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchRequest {
    /// Page size (`size` query parameter).
    pub size: u32,
    /// Result offset (`from` query parameter).
    pub from: u64,
    pub body: SearchRequestBody,
}

/// Consumed fields of a backend response.
#[derive(Debug, Clone, Deserialize)]
pub struct SearchResponse {
    pub hits: ResponseHits,
    /// Absent aggregations are a malformed response; the orchestrator
    /// checks, so one deserialization covers both shapes.
    #[serde(default)]
    pub aggregations: Option<HashMap<String, ResponseAggregation>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseHits {
    #[serde(default)]
    pub total: Option<TotalHits>,
    pub hits: Vec<ResponseHit>,
}

/// `hits.total` arrives as `{ "value": n }` on current backends and as a
/// bare number on older ones.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum TotalHits {
    Explicit { value: u64 },
    Legacy(u64),
}

impl TotalHits {
    pub fn value(&self) -> u64 {
        match self {
            TotalHits::Explicit { value } => *value,
            TotalHits::Legacy(value) => *value,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseHit {
    #[serde(rename = "_source")]
    pub source: ResultDocument,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ResponseAggregation {
    #[serde(default)]
    pub buckets: Vec<ResponseBucket>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResponseBucket {
    pub key: serde_json::Value,
    pub doc_count: u64,
}

impl ResponseBucket {
    /// Bucket keys are strings for keyword fields and numbers for numeric
    /// ones; views always display them as strings.
    pub fn key_string(&self) -> String {
        match &self.key {
            serde_json::Value::String(s) => s.clone(),
            serde_json::Value::Number(n) => n.to_string(),
            serde_json::Value::Bool(b) => b.to_string(),
            other => other.to_string(),
        }
    }
}

/// The search/aggregation engine, as the orchestrator sees it.
#[async_trait]
pub trait SearchBackend: Send + Sync {
    async fn search(&self, request: &SearchRequest) -> Result<SearchResponse>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_body_carries_one_agg_per_facet() {
        let profile = DatasetProfile::with_defaults();
        let body = SearchRequestBody::build(&profile, &QueryState::MatchAll);

        assert_eq!(body.aggs.len(), 4);
        assert_eq!(body.aggs["mapped_traits"].terms.size, 500);
        assert_eq!(body.aggs["datasource"].terms.field, "datasource");
        assert_eq!(body.query, json!({ "match_all": {} }));
    }

    #[test]
    fn test_request_body_serialization_shape() {
        let profile = DatasetProfile::with_defaults();
        let body = SearchRequestBody::build(&profile, &QueryState::MatchAll);
        let wire = serde_json::to_value(&body).unwrap();

        assert_eq!(
            wire["aggs"]["family"],
            json!({ "terms": { "field": "family", "size": 50 } })
        );
        assert_eq!(wire["query"], json!({ "match_all": {} }));
    }

    #[test]
    fn test_total_hits_both_wire_forms() {
        let explicit: TotalHits = serde_json::from_value(json!({ "value": 42 })).unwrap();
        assert_eq!(explicit.value(), 42);

        let legacy: TotalHits = serde_json::from_value(json!(42)).unwrap();
        assert_eq!(legacy.value(), 42);
    }

    #[test]
    fn test_bucket_key_display() {
        let bucket: ResponseBucket =
            serde_json::from_value(json!({ "key": "Rosaceae", "doc_count": 12 })).unwrap();
        assert_eq!(bucket.key_string(), "Rosaceae");

        let bucket: ResponseBucket =
            serde_json::from_value(json!({ "key": 2021, "doc_count": 3 })).unwrap();
        assert_eq!(bucket.key_string(), "2021");
    }

    #[test]
    fn test_response_without_hits_is_rejected() {
        let result: std::result::Result<SearchResponse, _> =
            serde_json::from_value(json!({ "aggregations": {} }));
        assert!(result.is_err());
    }
}
