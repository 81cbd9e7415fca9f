pub mod document;
pub mod facet;
pub mod view;

pub use document::ResultDocument;
pub use facet::FacetFieldDef;
pub use view::{
    FacetEntry, FacetPanel, MapMarkers, MarkerGroup, ResultsPage, SelectedFacet, ViewState,
    MARKER_POPUP_PAGE_SIZE,
};
