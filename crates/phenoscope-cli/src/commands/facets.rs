use anyhow::{Context, Result};
use console::style;

use crate::cli::FacetsArgs;
use crate::commands::{build_session, stage_filters};
use crate::output::OutputWriter;
use phenoscope_core::config::DatasetProfile;

pub async fn execute(
    args: FacetsArgs,
    profile: DatasetProfile,
    output: &OutputWriter,
) -> Result<()> {
    let mut session = build_session(profile)?;
    stage_filters(&mut session, &args.filter);

    session.refresh().await.context("facet query failed")?;
    let view = session
        .current_view()
        .ok_or_else(|| anyhow::anyhow!("fetch completed but no view state was published"))?;

    if output.is_json() {
        return output.json(&view.facet_panels);
    }

    output.info(format!("{} matching records", view.results.total));
    for panel in &view.facet_panels {
        output.plain(format!("\n{}", style(&panel.field).bold()));
        if panel.entries.is_empty() {
            output.plain("  (no values)");
            continue;
        }
        for entry in &panel.entries {
            let marker = if entry.selected { style("✓").green().to_string() } else { " ".to_string() };
            output.plain(format!("  {} {} ({})", marker, entry.value, entry.count));
        }
    }
    Ok(())
}
