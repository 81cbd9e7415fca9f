use anyhow::Result;

use crate::cli::ExportArgs;
use crate::output::OutputWriter;
use phenoscope_core::config::{parse_dialect, ConfigSource, DatasetProfile};
use phenoscope_core::query;
use phenoscope_core::selection::FacetSelection;

/// The export link is derived, not fetched, so this command never touches
/// the network.
pub fn execute(args: ExportArgs, mut profile: DatasetProfile, output: &OutputWriter) -> Result<()> {
    if let Some(dialect) = &args.dialect {
        profile.dialect.update(parse_dialect(dialect)?, ConfigSource::Cli);
    }

    let mut selection = FacetSelection::new();
    for facet in &args.filter.facets {
        selection.select(&facet.field, &facet.value);
    }
    if let Some(name) = &args.filter.name {
        selection.set_text_filter(name);
    }

    let compiled = query::compile(&profile, &selection.snapshot());
    let link = query::build_export_link(&profile, &compiled);

    if output.is_json() {
        return output.json(&serde_json::json!({ "export_link": link }));
    }
    output.success(link);
    Ok(())
}
