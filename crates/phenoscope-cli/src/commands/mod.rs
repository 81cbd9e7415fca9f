//! Command implementations

mod export;
mod facets;
mod profile;
mod search;

use crate::cli::{Cli, Commands, FilterArgs};
use crate::output::OutputWriter;
use anyhow::Result;
use phenoscope_client::{EsBackend, ExplorerSession};
use phenoscope_core::config::{CliProfileOverrides, DatasetProfile};

/// Execute a CLI command
pub async fn execute(cli: Cli) -> Result<()> {
    let output = OutputWriter::new(cli.json);
    let dataset_profile = resolve_profile(&cli)?;

    match cli.command {
        Commands::Search(args) => search::execute(args, dataset_profile, &output).await,
        Commands::Facets(args) => facets::execute(args, dataset_profile, &output).await,
        Commands::Export(args) => export::execute(args, dataset_profile, &output),
        Commands::Profile(args) => profile::execute(args, dataset_profile, &output),
    }
}

/// Layer the dataset profile: defaults, then file, then env, then CLI flags.
fn resolve_profile(cli: &Cli) -> Result<DatasetProfile> {
    let mut profile = DatasetProfile::with_defaults();
    if let Some(path) = &cli.config {
        profile = profile.load_from_file(path)?;
    }
    profile = profile.load_from_env();
    profile.update_from_cli(CliProfileOverrides {
        index_url: cli.index_url.clone(),
        page_size: cli.page_size,
        ..CliProfileOverrides::default()
    });
    Ok(profile)
}

pub(crate) fn build_session(profile: DatasetProfile) -> Result<ExplorerSession<EsBackend>> {
    let backend = EsBackend::from_profile(&profile)?;
    Ok(ExplorerSession::new(profile, backend))
}

pub(crate) fn stage_filters(session: &mut ExplorerSession<EsBackend>, filter: &FilterArgs) {
    for facet in &filter.facets {
        session.stage_facet(&facet.field, &facet.value);
    }
    if let Some(name) = &filter.name {
        session.stage_text_filter(name);
    }
}
