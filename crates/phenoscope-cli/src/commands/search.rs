use anyhow::{Context, Result};
use tabled::Tabled;

use crate::cli::SearchArgs;
use crate::commands::{build_session, stage_filters};
use crate::output::OutputWriter;
use phenoscope_core::config::DatasetProfile;
use phenoscope_core::models::ResultDocument;

#[derive(Tabled)]
struct ResultRow {
    #[tabled(rename = "Datasource")]
    datasource: String,
    #[tabled(rename = "Scientific name")]
    scientific_name: String,
    #[tabled(rename = "Rank")]
    taxon_rank: String,
    #[tabled(rename = "Year")]
    year: String,
    #[tabled(rename = "Day")]
    day_of_year: String,
    #[tabled(rename = "Family")]
    family: String,
    #[tabled(rename = "Trait")]
    trait_name: String,
    #[tabled(rename = "Prediction")]
    prediction_class: String,
}

impl From<&ResultDocument> for ResultRow {
    fn from(doc: &ResultDocument) -> Self {
        let text = |value: &Option<String>| value.clone().unwrap_or_else(|| "-".to_string());
        Self {
            datasource: text(&doc.datasource),
            scientific_name: text(&doc.scientific_name),
            taxon_rank: text(&doc.taxon_rank),
            year: doc.year.map(|y| y.to_string()).unwrap_or_else(|| "-".to_string()),
            day_of_year: doc
                .day_of_year
                .map(|d| d.to_string())
                .unwrap_or_else(|| "-".to_string()),
            family: text(&doc.family),
            trait_name: text(&doc.trait_name),
            prediction_class: text(&doc.prediction_class),
        }
    }
}

pub async fn execute(
    args: SearchArgs,
    profile: DatasetProfile,
    output: &OutputWriter,
) -> Result<()> {
    let mut session = build_session(profile)?;
    stage_filters(&mut session, &args.filter);
    session.stage_page(args.page);

    session.refresh().await.context("search failed")?;
    let view = session
        .current_view()
        .ok_or_else(|| anyhow::anyhow!("search completed but no view state was published"))?;

    if output.is_json() {
        return output.json(view);
    }

    output.info(view.results.summary());
    if !view.selected.is_empty() {
        let chips: Vec<_> = view
            .selected
            .iter()
            .map(|chip| format!("{}={}", chip.field, chip.value))
            .collect();
        output.info(format!("Filters: {}", chips.join(", ")));
    }

    output.table(view.results.rows.iter().map(ResultRow::from).collect::<Vec<_>>());

    if args.markers && !view.map_markers.is_empty() {
        output.info(format!("{} map locations on this page:", view.map_markers.len()));
        for group in view.map_markers.locations.values() {
            output.plain(format!(
                "  ({}, {}) - {} records",
                group.latitude,
                group.longitude,
                group.documents.len()
            ));
        }
    }

    output.info(format!("Export: {}", view.export_link));
    Ok(())
}
