use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Phenoscope - faceted exploration over occurrence and phenotype indexes
#[derive(Parser, Debug)]
#[command(name = "phenoscope")]
#[command(about = "Faceted exploration over occurrence and phenotype indexes", long_about = None)]
#[command(version)]
pub struct Cli {
    /// Output results in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Dataset profile file (TOML)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Override the search index endpoint
    #[arg(long, global = true, value_name = "URL")]
    pub index_url: Option<String>,

    /// Override the result page size
    #[arg(long, global = true, value_name = "N")]
    pub page_size: Option<u32>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a filtered search and print the current result page
    Search(SearchArgs),

    /// Print facet value counts for a filter set
    Facets(FacetsArgs),

    /// Print the export/download link for a filter set
    Export(ExportArgs),

    /// Show the resolved dataset profile and where each value came from
    Profile(ProfileArgs),
}

/// Filter flags shared by the query-issuing commands.
#[derive(Parser, Debug, Clone)]
pub struct FilterArgs {
    /// Facet filter as FIELD=VALUE (repeatable)
    #[arg(long = "facet", value_name = "FIELD=VALUE", value_parser = parse_facet_filter)]
    pub facets: Vec<FacetFilter>,

    /// Scientific-name text filter
    #[arg(long, value_name = "TEXT")]
    pub name: Option<String>,
}

#[derive(Debug, Clone)]
pub struct FacetFilter {
    pub field: String,
    pub value: String,
}

pub fn parse_facet_filter(s: &str) -> Result<FacetFilter, String> {
    let (field, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected FIELD=VALUE, got '{s}'"))?;
    let field = field.trim();
    let value = value.trim();
    if field.is_empty() || value.is_empty() {
        return Err(format!("expected FIELD=VALUE, got '{s}'"));
    }
    Ok(FacetFilter {
        field: field.to_string(),
        value: value.to_string(),
    })
}

#[derive(Parser, Debug)]
pub struct SearchArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Result page to show (1-based)
    #[arg(long, default_value = "1")]
    pub page: u32,

    /// Also print map marker groupings for the page
    #[arg(long)]
    pub markers: bool,
}

#[derive(Parser, Debug)]
pub struct FacetsArgs {
    #[command(flatten)]
    pub filter: FilterArgs,
}

#[derive(Parser, Debug)]
pub struct ExportArgs {
    #[command(flatten)]
    pub filter: FilterArgs,

    /// Export query dialect (es-json or lucene)
    #[arg(long, value_name = "DIALECT")]
    pub dialect: Option<String>,
}

#[derive(Parser, Debug)]
pub struct ProfileArgs {}
