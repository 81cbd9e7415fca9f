//! Result fetch orchestration.
//!
//! `ExplorerSession` owns the selection store and pagination controller,
//! issues one query per user action, and republishes the full view state
//! atomically from each response. Every request carries a monotonically
//! increasing token; a completion whose token is older than the latest
//! issued request is discarded, so the published view only ever reflects the
//! most recently initiated request.

use std::collections::HashMap;

use phenoscope_core::config::DatasetProfile;
use phenoscope_core::models::{
    FacetEntry, FacetPanel, MapMarkers, ResultsPage, SelectedFacet, ViewState,
};
use phenoscope_core::pagination::Pagination;
use phenoscope_core::query::{self, QueryState};
use phenoscope_core::selection::FacetSelection;
use phenoscope_core::{PhenoscopeError, Result};

use crate::backend::{ResponseAggregation, SearchBackend, SearchRequest, SearchRequestBody, SearchResponse};

/// What a fetch cycle did to the published state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The response was applied and the view state replaced.
    Applied,
    /// A newer request was issued before this one completed; the response
    /// was discarded.
    Superseded,
    /// The action changed nothing, so no request was issued.
    Unchanged,
}

/// A request handed to the backend, tagged with its sequence token.
#[derive(Debug, Clone)]
pub struct PreparedFetch {
    token: u64,
    query: QueryState,
    pub request: SearchRequest,
}

impl PreparedFetch {
    pub fn token(&self) -> u64 {
        self.token
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }
}

pub struct ExplorerSession<B: SearchBackend> {
    profile: DatasetProfile,
    backend: B,
    selection: FacetSelection,
    pagination: Pagination,
    latest_token: u64,
    in_flight: bool,
    view: Option<ViewState>,
}

impl<B: SearchBackend> ExplorerSession<B> {
    pub fn new(profile: DatasetProfile, backend: B) -> Self {
        let pagination = Pagination::new(profile.page_size.value);
        Self {
            profile,
            backend,
            selection: FacetSelection::new(),
            pagination,
            latest_token: 0,
            in_flight: false,
            view: None,
        }
    }

    pub fn profile(&self) -> &DatasetProfile {
        &self.profile
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// The last successfully published view, untouched by failed or
    /// superseded fetches.
    pub fn current_view(&self) -> Option<&ViewState> {
        self.view.as_ref()
    }

    pub fn pagination(&self) -> &Pagination {
        &self.pagination
    }

    /// True while a fetch is outstanding. Consumers disable facet-link
    /// activation during this window; text input and pagination stay live.
    pub fn is_loading(&self) -> bool {
        self.in_flight
    }

    /// The export link for the current selection. Available before the
    /// first fetch, since it is derived, not fetched.
    pub fn export_link(&self) -> String {
        let compiled = query::compile(&self.profile, &self.selection.snapshot());
        query::build_export_link(&self.profile, &compiled)
    }

    // UI-facing operations. Each mutates state, then runs one fetch cycle;
    // no-op actions never reach the network.

    /// Initial or re-issued fetch for the current state.
    pub async fn refresh(&mut self) -> Result<FetchOutcome> {
        self.fetch().await
    }

    pub async fn select_facet(&mut self, field: &str, value: &str) -> Result<FetchOutcome> {
        if !self.selection.select(field, value) {
            return Ok(FetchOutcome::Unchanged);
        }
        self.pagination.on_query_changed();
        self.fetch().await
    }

    pub async fn remove_facet(&mut self, field: &str, value: &str) -> Result<FetchOutcome> {
        if !self.selection.deselect(field, value) {
            return Ok(FetchOutcome::Unchanged);
        }
        self.pagination.on_query_changed();
        self.fetch().await
    }

    pub async fn set_text_filter(&mut self, text: &str) -> Result<FetchOutcome> {
        if !self.selection.set_text_filter(text) {
            return Ok(FetchOutcome::Unchanged);
        }
        self.pagination.on_query_changed();
        self.fetch().await
    }

    pub async fn next_page(&mut self) -> Result<FetchOutcome> {
        if !self.pagination.next_page() {
            return Ok(FetchOutcome::Unchanged);
        }
        self.fetch().await
    }

    pub async fn previous_page(&mut self) -> Result<FetchOutcome> {
        if !self.pagination.previous_page() {
            return Ok(FetchOutcome::Unchanged);
        }
        self.fetch().await
    }

    // Staging operations for one-shot consumers (CLI): build up the filter
    // state first, then issue a single fetch via `refresh`.

    pub fn stage_facet(&mut self, field: &str, value: &str) -> bool {
        if self.selection.select(field, value) {
            self.pagination.on_query_changed();
            return true;
        }
        false
    }

    pub fn stage_text_filter(&mut self, text: &str) -> bool {
        if self.selection.set_text_filter(text) {
            self.pagination.on_query_changed();
            return true;
        }
        false
    }

    pub fn stage_page(&mut self, page: u32) -> bool {
        self.pagination.jump_to(page)
    }

    /// Compiles the current state into a tokenized request and marks the
    /// session loading. Split from `complete_fetch` so overlapping requests
    /// can resolve out of order.
    pub fn begin_fetch(&mut self) -> PreparedFetch {
        self.latest_token += 1;
        self.in_flight = true;

        let compiled = query::compile(&self.profile, &self.selection.snapshot());
        let request = SearchRequest {
            size: self.pagination.page_size(),
            from: self.pagination.offset(),
            body: SearchRequestBody::build(&self.profile, &compiled),
        };
        tracing::debug!(token = self.latest_token, from = request.from, "prepared fetch");

        PreparedFetch {
            token: self.latest_token,
            query: compiled,
            request,
        }
    }

    /// Applies a completed fetch. Stale completions (token older than the
    /// latest issued request) are discarded without touching any state,
    /// errors included. For the latest request, a successful response
    /// replaces the entire view; a failure leaves the previous view intact.
    pub fn complete_fetch(
        &mut self,
        prepared: PreparedFetch,
        result: Result<SearchResponse>,
    ) -> Result<FetchOutcome> {
        if prepared.token != self.latest_token {
            tracing::debug!(
                token = prepared.token,
                latest = self.latest_token,
                "discarding stale completion"
            );
            return Ok(FetchOutcome::Superseded);
        }
        self.in_flight = false;

        let response = result?;
        let aggregations = response.aggregations.as_ref().ok_or_else(|| {
            PhenoscopeError::MalformedResponse {
                reason: "response has no aggregations".to_string(),
            }
        })?;

        let total = self.resolve_total_count(&response, aggregations);
        self.pagination.on_results_received(total);

        let view = self.build_view(&prepared, &response, aggregations, total);
        tracing::debug!(
            token = prepared.token,
            total,
            rows = view.results.rows.len(),
            "published view state"
        );
        self.view = Some(view);
        Ok(FetchOutcome::Applied)
    }

    async fn fetch(&mut self) -> Result<FetchOutcome> {
        let prepared = self.begin_fetch();
        let result = self.backend.search(&prepared.request).await;
        self.complete_fetch(prepared, result)
    }

    /// The explicit total is authoritative; summing the first declared
    /// facet's buckets is a fallback for backends that omit it.
    fn resolve_total_count(
        &self,
        response: &SearchResponse,
        aggregations: &HashMap<String, ResponseAggregation>,
    ) -> u64 {
        if let Some(total) = &response.hits.total {
            return total.value();
        }
        if let Some(def) = self.profile.facets.first() {
            if let Some(aggregation) = aggregations.get(&def.name) {
                tracing::warn!(
                    facet = %def.name,
                    "explicit total missing; deriving total from bucket sum"
                );
                return aggregation.buckets.iter().map(|b| b.doc_count).sum();
            }
        }
        tracing::warn!("explicit total missing and no fallback aggregation; assuming 0");
        0
    }

    fn build_view(
        &self,
        prepared: &PreparedFetch,
        response: &SearchResponse,
        aggregations: &HashMap<String, ResponseAggregation>,
        total: u64,
    ) -> ViewState {
        let facet_panels = self
            .profile
            .facets
            .iter()
            .map(|def| {
                let entries = aggregations
                    .get(&def.name)
                    .map(|aggregation| {
                        aggregation
                            .buckets
                            .iter()
                            .map(|bucket| {
                                let value = bucket.key_string();
                                let selected = self.selection.is_selected(&def.name, &value);
                                FacetEntry {
                                    value,
                                    count: bucket.doc_count,
                                    selected,
                                }
                            })
                            .collect()
                    })
                    .unwrap_or_default();
                FacetPanel {
                    field: def.name.clone(),
                    entries,
                }
            })
            .collect();

        let snapshot = self.selection.snapshot();
        let mut selected = Vec::new();
        let mut chip_field = |field: &str| {
            for value in snapshot.values(field) {
                selected.push(SelectedFacet {
                    field: field.to_string(),
                    value: value.clone(),
                });
            }
        };
        for def in &self.profile.facets {
            chip_field(&def.name);
        }
        for field in snapshot.field_names() {
            if !self.profile.facets.iter().any(|def| def.name == field) {
                chip_field(field);
            }
        }

        let rows: Vec<_> = response.hits.hits.iter().map(|hit| hit.source.clone()).collect();
        let map_markers = MapMarkers::from_documents(&rows);
        let results = ResultsPage::new(rows, prepared.request.from, total);

        ViewState {
            facet_panels,
            selected,
            results,
            map_markers,
            export_link: query::build_export_link(&self.profile, &prepared.query),
        }
    }
}
