use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One occurrence/phenotype record as stored in the index (`_source`).
///
/// The typed fields are the ones the tabular and map views read. Everything
/// else the backend returns is retained in `extra` so a detail view can show
/// the complete record without a second request.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ResultDocument {
    pub datasource: Option<String>,
    pub scientific_name: Option<String>,
    pub taxon_rank: Option<String>,
    pub year: Option<i32>,
    pub day_of_year: Option<u16>,
    pub family: Option<String>,

    /// `trait` is a reserved word in Rust; the wire name is kept via serde.
    #[serde(rename = "trait")]
    pub trait_name: Option<String>,

    pub prediction_class: Option<String>,
    pub basis_of_record: Option<String>,

    /// Geocoordinate pair. Both must be present for the record to appear on
    /// the map.
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,

    pub observed_image_url: Option<String>,
    pub observed_image_guid: Option<String>,

    /// Remaining `_source` fields, preserved for record detail inspection.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

impl ResultDocument {
    /// Returns the (latitude, longitude) pair when the record is geocoded.
    pub fn coordinates(&self) -> Option<(f64, f64)> {
        Some((self.latitude?, self.longitude?))
    }
}
