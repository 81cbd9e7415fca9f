//! Integration tests for the fetch orchestrator.
//!
//! These drive `ExplorerSession` against a scripted backend and verify the
//! ordering guarantee (latest request wins), last-good-state retention on
//! failure, and the total-count fallback.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::json;

use phenoscope_client::backend::{SearchBackend, SearchRequest, SearchResponse};
use phenoscope_client::session::{ExplorerSession, FetchOutcome};
use phenoscope_core::config::DatasetProfile;
use phenoscope_core::{PhenoscopeError, Result};

/// Backend that replays a queue of scripted results.
struct ScriptedBackend {
    results: Mutex<VecDeque<Result<SearchResponse>>>,
    calls: AtomicUsize,
}

impl ScriptedBackend {
    fn new(results: Vec<Result<SearchResponse>>) -> Self {
        Self {
            results: Mutex::new(results.into()),
            calls: AtomicUsize::new(0),
        }
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SearchBackend for ScriptedBackend {
    async fn search(&self, _request: &SearchRequest) -> Result<SearchResponse> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.results
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PhenoscopeError::Transport {
                    reason: "script exhausted".to_string(),
                })
            })
    }
}

fn response(total: Option<u64>, rows: usize, datasource_buckets: &[(&str, u64)]) -> SearchResponse {
    let hits: Vec<_> = (0..rows)
        .map(|i| {
            json!({
                "_source": {
                    "datasource": "inaturalist",
                    "scientific_name": format!("Taxon {i}"),
                    "family": "Rosaceae",
                    "latitude": 42.5,
                    "longitude": -71.1
                }
            })
        })
        .collect();
    let buckets: Vec<_> = datasource_buckets
        .iter()
        .map(|(key, count)| json!({ "key": key, "doc_count": count }))
        .collect();

    let mut body = json!({
        "hits": { "hits": hits },
        "aggregations": {
            "datasource": { "buckets": buckets },
            "mapped_traits": { "buckets": [] },
            "family": { "buckets": [{ "key": "Rosaceae", "doc_count": 12 }] },
            "basis_of_record": { "buckets": [] }
        }
    });
    if let Some(total) = total {
        body["hits"]["total"] = json!({ "value": total });
    }
    serde_json::from_value(body).unwrap()
}

fn session_with(results: Vec<Result<SearchResponse>>) -> ExplorerSession<ScriptedBackend> {
    ExplorerSession::new(DatasetProfile::with_defaults(), ScriptedBackend::new(results))
}

#[tokio::test]
async fn test_initial_fetch_publishes_full_view() {
    let mut session = session_with(vec![Ok(response(Some(37), 15, &[("inaturalist", 37)]))]);

    let outcome = session.refresh().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Applied);
    assert!(!session.is_loading());

    let view = session.current_view().unwrap();
    assert_eq!(view.results.rows.len(), 15);
    assert_eq!(view.results.summary(), "Showing 1-15 of 37");
    // Panels come in declaration order.
    let panel_fields: Vec<_> = view.facet_panels.iter().map(|p| p.field.as_str()).collect();
    assert_eq!(panel_fields, ["datasource", "mapped_traits", "family", "basis_of_record"]);
    // All 15 identical coordinates collapse into one marker group.
    assert_eq!(view.map_markers.len(), 1);
    assert!(view.export_link.contains("match_all"));
    assert!(view.export_link.ends_with("&limit=100000"));
    assert_eq!(session.pagination().total_count(), 37);
}

#[tokio::test]
async fn test_select_facet_tags_entries_and_resets_page() {
    let mut session = session_with(vec![
        Ok(response(Some(100), 15, &[("inaturalist", 80), ("npn", 20)])),
        Ok(response(Some(80), 15, &[("inaturalist", 80)])),
    ]);
    session.refresh().await.unwrap();
    session.stage_page(3);

    let outcome = session.select_facet("datasource", "inaturalist").await.unwrap();
    assert_eq!(outcome, FetchOutcome::Applied);
    // A new filter invalidates the old page position.
    assert_eq!(session.pagination().current_page(), 1);

    let view = session.current_view().unwrap();
    let datasource_panel = &view.facet_panels[0];
    assert!(datasource_panel.entries[0].selected);
    assert_eq!(view.selected.len(), 1);
    assert_eq!(view.selected[0].field, "datasource");
    assert_eq!(view.selected[0].value, "inaturalist");
    // The export link now reflects the filtered query.
    assert!(view.export_link.contains("inaturalist"));
}

#[tokio::test]
async fn test_stale_response_is_discarded() {
    let mut session = session_with(Vec::new());

    let first = session.begin_fetch();
    let second = session.begin_fetch();

    // The newer request resolves first and wins.
    let outcome = session
        .complete_fetch(second, Ok(response(Some(80), 15, &[("npn", 80)])))
        .unwrap();
    assert_eq!(outcome, FetchOutcome::Applied);

    // The older response arrives late and must not be applied.
    let outcome = session
        .complete_fetch(first, Ok(response(Some(999), 3, &[("legacy", 999)])))
        .unwrap();
    assert_eq!(outcome, FetchOutcome::Superseded);

    assert_eq!(session.pagination().total_count(), 80);
    let view = session.current_view().unwrap();
    assert_eq!(view.results.rows.len(), 15);
    assert_eq!(view.facet_panels[0].entries[0].value, "npn");
}

#[tokio::test]
async fn test_stale_error_is_discarded_too() {
    let mut session = session_with(Vec::new());

    let first = session.begin_fetch();
    let second = session.begin_fetch();

    session
        .complete_fetch(second, Ok(response(Some(10), 10, &[("npn", 10)])))
        .unwrap();

    let outcome = session
        .complete_fetch(
            first,
            Err(PhenoscopeError::Transport {
                reason: "timed out".to_string(),
            }),
        )
        .unwrap();
    assert_eq!(outcome, FetchOutcome::Superseded);
    assert!(session.current_view().is_some());
}

#[tokio::test]
async fn test_failed_fetch_retains_last_good_view() {
    let mut session = session_with(vec![
        Ok(response(Some(37), 15, &[("inaturalist", 37)])),
        Err(PhenoscopeError::Transport {
            reason: "connection refused".to_string(),
        }),
    ]);
    session.refresh().await.unwrap();

    let result = session.refresh().await;
    assert!(matches!(result, Err(PhenoscopeError::Transport { .. })));

    // The 15 previously visible rows are still there.
    let view = session.current_view().unwrap();
    assert_eq!(view.results.rows.len(), 15);
    assert_eq!(view.results.summary(), "Showing 1-15 of 37");
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_malformed_response_surfaces_without_state_change() {
    let mut session = session_with(vec![Ok(response(Some(37), 15, &[("inaturalist", 37)]))]);
    session.refresh().await.unwrap();

    let no_aggregations: SearchResponse = serde_json::from_value(json!({
        "hits": { "total": { "value": 5 }, "hits": [] }
    }))
    .unwrap();

    let prepared = session.begin_fetch();
    let result = session.complete_fetch(prepared, Ok(no_aggregations));
    assert!(matches!(result, Err(PhenoscopeError::MalformedResponse { .. })));

    // Neither the view nor the pagination totals moved.
    assert_eq!(session.current_view().unwrap().results.rows.len(), 15);
    assert_eq!(session.pagination().total_count(), 37);
}

#[tokio::test]
async fn test_total_falls_back_to_bucket_sum() {
    let mut session = session_with(vec![Ok(response(None, 15, &[("inaturalist", 40), ("npn", 2)]))]);

    session.refresh().await.unwrap();
    assert_eq!(session.pagination().total_count(), 42);
    assert_eq!(session.current_view().unwrap().results.total, 42);
}

#[tokio::test]
async fn test_shrinking_total_clamps_current_page() {
    let mut session = session_with(vec![
        Ok(response(Some(50), 15, &[("inaturalist", 50)])),
        Ok(response(Some(37), 0, &[("inaturalist", 37)])),
    ]);
    session.refresh().await.unwrap();

    // Page 4 was valid under 50 results...
    session.stage_page(4);
    session.refresh().await.unwrap();

    // ...but 37 results only span 3 pages.
    assert_eq!(session.pagination().current_page(), 3);
}

#[tokio::test]
async fn test_noop_actions_never_reach_the_network() {
    let mut session = session_with(vec![
        Ok(response(Some(15), 15, &[("inaturalist", 15)])),
        Ok(response(Some(10), 10, &[("inaturalist", 10)])),
        Ok(response(Some(4), 4, &[("inaturalist", 4)])),
    ]);
    session.refresh().await.unwrap();
    assert_eq!(session.backend().call_count(), 1);

    session.select_facet("datasource", "inaturalist").await.unwrap();
    assert_eq!(session.backend().call_count(), 2);

    // Selecting the same value again is a no-op.
    let outcome = session.select_facet("datasource", "inaturalist").await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchanged);

    // Removing something that was never selected is a no-op.
    let outcome = session.remove_facet("family", "Rosaceae").await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchanged);

    // Single page of results: pagination guards hold.
    let outcome = session.next_page().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchanged);
    let outcome = session.previous_page().await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchanged);

    // Setting an equivalent text filter is a no-op.
    session.set_text_filter("Rosa").await.unwrap();
    let outcome = session.set_text_filter("  Rosa  ").await.unwrap();
    assert_eq!(outcome, FetchOutcome::Unchanged);

    assert_eq!(session.backend().call_count(), 3);
}

#[tokio::test]
async fn test_loading_flag_tracks_latest_request_only() {
    let mut session = session_with(Vec::new());
    assert!(!session.is_loading());

    let first = session.begin_fetch();
    assert!(session.is_loading());

    let second = session.begin_fetch();
    assert!(session.is_loading());

    // A stale completion does not end the loading window.
    session
        .complete_fetch(first, Ok(response(Some(1), 1, &[("x", 1)])))
        .unwrap();
    assert!(session.is_loading());

    session
        .complete_fetch(second, Ok(response(Some(1), 1, &[("x", 1)])))
        .unwrap();
    assert!(!session.is_loading());
}

#[tokio::test]
async fn test_text_filter_appears_in_export_link() {
    let mut session = session_with(vec![Ok(response(Some(5), 5, &[("inaturalist", 5)]))]);
    session.stage_text_filter("Rosa canina");
    session.refresh().await.unwrap();

    let view = session.current_view().unwrap();
    assert!(view.export_link.contains("scientific_name"));
    // Spaces are percent-encoded for URL embedding.
    assert!(view.export_link.contains("Rosa%20canina"));
}
