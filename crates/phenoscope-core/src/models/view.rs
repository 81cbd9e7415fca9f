//! View-synchronization contract.
//!
//! These are the shapes every dependent view reads. They are rebuilt as one
//! unit from a single backend response, so the facet sidebar, results table,
//! and map can never disagree about which query they reflect.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::document::ResultDocument;

/// Fixed page size for multi-record popups on a single map location.
pub const MARKER_POPUP_PAGE_SIZE: usize = 10;

/// One row of a facet panel: a backend bucket tagged with selection state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetEntry {
    pub value: String,
    pub count: u64,
    pub selected: bool,
}

/// All entries for one facet field, in backend bucket order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FacetPanel {
    pub field: String,
    pub entries: Vec<FacetEntry>,
}

/// A currently selected (field, value) pair, for removable filter chips.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedFacet {
    pub field: String,
    pub value: String,
}

/// The current page of results plus the range it covers.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ResultsPage {
    pub rows: Vec<ResultDocument>,

    /// 1-based index of the first row, 0 when the page is empty.
    pub from: u64,
    /// 1-based index of the last row, 0 when the page is empty.
    pub to: u64,
    pub total: u64,
}

impl ResultsPage {
    pub fn new(rows: Vec<ResultDocument>, offset: u64, total: u64) -> Self {
        let (from, to) = if rows.is_empty() {
            (0, 0)
        } else {
            (offset + 1, offset + rows.len() as u64)
        };
        Self { rows, from, to, total }
    }

    /// Human-readable range summary, e.g. "Showing 16-30 of 2154".
    pub fn summary(&self) -> String {
        format!("Showing {}-{} of {}", self.from, self.to, self.total)
    }
}

/// All records sharing one exact coordinate pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarkerGroup {
    pub latitude: f64,
    pub longitude: f64,
    pub documents: Vec<ResultDocument>,
}

impl MarkerGroup {
    /// One popup page of records, 0-based.
    pub fn popup_page(&self, page: usize) -> &[ResultDocument] {
        let start = page.saturating_mul(MARKER_POPUP_PAGE_SIZE);
        if start >= self.documents.len() {
            return &[];
        }
        let end = (start + MARKER_POPUP_PAGE_SIZE).min(self.documents.len());
        &self.documents[start..end]
    }

    pub fn popup_page_count(&self) -> usize {
        self.documents.len().div_ceil(MARKER_POPUP_PAGE_SIZE)
    }
}

/// Geocoded records of the current page, grouped by identical coordinates.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MapMarkers {
    /// Keyed by "lat,lon" in the exact decimal form of the source record.
    pub locations: BTreeMap<String, MarkerGroup>,
}

impl MapMarkers {
    pub fn from_documents<'a>(documents: impl IntoIterator<Item = &'a ResultDocument>) -> Self {
        let mut locations: BTreeMap<String, MarkerGroup> = BTreeMap::new();
        for doc in documents {
            let Some((latitude, longitude)) = doc.coordinates() else {
                continue;
            };
            locations
                .entry(format!("{latitude},{longitude}"))
                .or_insert_with(|| MarkerGroup {
                    latitude,
                    longitude,
                    documents: Vec::new(),
                })
                .documents
                .push(doc.clone());
        }
        Self { locations }
    }

    pub fn len(&self) -> usize {
        self.locations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty()
    }
}

/// Everything the view layer reads, republished atomically after each fetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewState {
    pub facet_panels: Vec<FacetPanel>,
    pub selected: Vec<SelectedFacet>,
    pub results: ResultsPage,
    pub map_markers: MapMarkers,
    pub export_link: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn geocoded(name: &str, lat: f64, lon: f64) -> ResultDocument {
        ResultDocument {
            scientific_name: Some(name.to_string()),
            latitude: Some(lat),
            longitude: Some(lon),
            ..ResultDocument::default()
        }
    }

    #[test]
    fn test_results_page_range() {
        let rows = vec![ResultDocument::default(); 15];
        let page = ResultsPage::new(rows, 15, 37);
        assert_eq!(page.from, 16);
        assert_eq!(page.to, 30);
        assert_eq!(page.summary(), "Showing 16-30 of 37");
    }

    #[test]
    fn test_empty_results_page_range() {
        let page = ResultsPage::new(Vec::new(), 45, 37);
        assert_eq!(page.from, 0);
        assert_eq!(page.to, 0);
        assert_eq!(page.summary(), "Showing 0-0 of 37");
    }

    #[test]
    fn test_markers_group_identical_pairs_only() {
        let docs = vec![
            geocoded("a", 42.5, -71.1),
            geocoded("b", 42.5, -71.1),
            geocoded("c", 42.5, -71.2),
            ResultDocument::default(), // not geocoded, excluded
        ];
        let markers = MapMarkers::from_documents(&docs);
        assert_eq!(markers.len(), 2);
        assert_eq!(markers.locations["42.5,-71.1"].documents.len(), 2);
        assert_eq!(markers.locations["42.5,-71.2"].documents.len(), 1);
    }

    #[test]
    fn test_popup_pagination() {
        let group = MarkerGroup {
            latitude: 0.0,
            longitude: 0.0,
            documents: vec![ResultDocument::default(); 25],
        };
        assert_eq!(group.popup_page_count(), 3);
        assert_eq!(group.popup_page(0).len(), 10);
        assert_eq!(group.popup_page(2).len(), 5);
        assert!(group.popup_page(3).is_empty());
    }
}
