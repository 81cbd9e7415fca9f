//! Dataset profile configuration.
//!
//! Everything that used to vary between copy-pasted variants of the explorer
//! (field names, bucket sizes, endpoints, export dialect) is injected here
//! instead. Values layer Default < File < Environment < Cli.

use crate::error::{PhenoscopeError, Result};
use crate::models::facet::FacetFieldDef;
use crate::query::QueryDialect;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::Path;

/// Configuration source for tracking where values come from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Default value
    Default,
    /// Loaded from config file
    File,
    /// Loaded from environment variable
    Environment,
    /// Provided via CLI argument
    Cli,
}

impl ConfigSource {
    /// Returns the precedence level (higher = higher priority)
    pub fn precedence(&self) -> u8 {
        match self {
            ConfigSource::Default => 0,
            ConfigSource::File => 1,
            ConfigSource::Environment => 2,
            ConfigSource::Cli => 3,
        }
    }
}

/// A configuration value with its source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigValue<T> {
    pub value: T,
    pub source: ConfigSource,
}

impl<T> ConfigValue<T> {
    pub fn new(value: T, source: ConfigSource) -> Self {
        Self { value, source }
    }

    /// Update the value if the new source has higher precedence
    pub fn update(&mut self, value: T, source: ConfigSource) {
        if source.precedence() > self.source.precedence() {
            self.value = value;
            self.source = source;
        }
    }
}

/// Layered dataset profile for one explorer deployment.
#[derive(Debug, Clone)]
pub struct DatasetProfile {
    /// Search/aggregation endpoint (POST target).
    pub index_url: ConfigValue<String>,
    /// Root endpoint for the downloadable-result link.
    pub download_url: ConfigValue<String>,
    /// Rows per result page.
    pub page_size: ConfigValue<u32>,
    /// Maximum-row cap on the export link.
    pub export_limit: ConfigValue<u64>,
    /// Serialization dialect for the portable query form.
    pub dialect: ConfigValue<QueryDialect>,
    /// Request timeout for the search backend.
    pub request_timeout_secs: ConfigValue<u64>,
    /// Index field the free-text filter matches against.
    pub text_field: ConfigValue<String>,

    /// Facet declarations, in panel and clause order. Replaced wholesale by
    /// a file that declares any.
    pub facets: Vec<FacetFieldDef>,
    pub facets_source: ConfigSource,
}

impl DatasetProfile {
    /// Create a new profile with the phenobase defaults.
    pub fn with_defaults() -> Self {
        Self {
            index_url: ConfigValue::new(
                "https://biscicol.org/phenobase/api/v1/query/phenobase/_search".to_string(),
                ConfigSource::Default,
            ),
            download_url: ConfigValue::new(
                "https://biscicol.org/phenobase/api/v1/download/_search".to_string(),
                ConfigSource::Default,
            ),
            page_size: ConfigValue::new(15, ConfigSource::Default),
            export_limit: ConfigValue::new(100_000, ConfigSource::Default),
            dialect: ConfigValue::new(QueryDialect::EsJson, ConfigSource::Default),
            request_timeout_secs: ConfigValue::new(30, ConfigSource::Default),
            text_field: ConfigValue::new("scientific_name".to_string(), ConfigSource::Default),
            facets: vec![
                FacetFieldDef::new("datasource", 10),
                FacetFieldDef::new("mapped_traits", 500),
                FacetFieldDef::new("family", 50),
                FacetFieldDef::new("basis_of_record", 50),
            ],
            facets_source: ConfigSource::Default,
        }
    }

    /// Load profile values from a TOML file
    pub fn load_from_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self> {
        let content =
            fs::read_to_string(path.as_ref()).map_err(|e| PhenoscopeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to read profile file: {}", e),
            })?;

        let file_config: FileConfig =
            toml::from_str(&content).map_err(|e| PhenoscopeError::ConfigInvalid {
                key: "file".to_string(),
                reason: format!("Failed to parse TOML: {}", e),
            })?;

        if let Some(index_url) = file_config.index_url {
            self.index_url.update(index_url, ConfigSource::File);
        }

        if let Some(download_url) = file_config.download_url {
            self.download_url.update(download_url, ConfigSource::File);
        }

        if let Some(page_size) = file_config.page_size {
            if page_size == 0 {
                return Err(PhenoscopeError::ConfigInvalid {
                    key: "page_size".to_string(),
                    reason: "page size must be positive".to_string(),
                });
            }
            self.page_size.update(page_size, ConfigSource::File);
        }

        if let Some(export_limit) = file_config.export_limit {
            self.export_limit.update(export_limit, ConfigSource::File);
        }

        if let Some(dialect) = file_config.dialect {
            self.dialect.update(dialect, ConfigSource::File);
        }

        if let Some(timeout) = file_config.request_timeout_secs {
            self.request_timeout_secs.update(timeout, ConfigSource::File);
        }

        if let Some(text_field) = file_config.text_field {
            self.text_field.update(text_field, ConfigSource::File);
        }

        if let Some(facets) = file_config.facets {
            if facets.is_empty() {
                return Err(PhenoscopeError::ConfigInvalid {
                    key: "facets".to_string(),
                    reason: "at least one facet must be declared".to_string(),
                });
            }
            self.facets = facets;
            self.facets_source = ConfigSource::File;
        }

        Ok(self)
    }

    /// Load profile values from environment variables
    pub fn load_from_env(mut self) -> Self {
        if let Ok(index_url) = env::var("PHENOSCOPE_INDEX_URL") {
            self.index_url.update(index_url, ConfigSource::Environment);
        }

        if let Ok(download_url) = env::var("PHENOSCOPE_DOWNLOAD_URL") {
            self.download_url.update(download_url, ConfigSource::Environment);
        }

        if let Ok(size_str) = env::var("PHENOSCOPE_PAGE_SIZE") {
            match size_str.parse::<u32>() {
                Ok(size) if size > 0 => self.page_size.update(size, ConfigSource::Environment),
                _ => tracing::warn!(
                    "Invalid PHENOSCOPE_PAGE_SIZE value '{}': expected positive integer",
                    size_str
                ),
            }
        }

        if let Ok(limit_str) = env::var("PHENOSCOPE_EXPORT_LIMIT") {
            match limit_str.parse::<u64>() {
                Ok(limit) => self.export_limit.update(limit, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid PHENOSCOPE_EXPORT_LIMIT value '{}': expected integer",
                    limit_str
                ),
            }
        }

        if let Ok(dialect_str) = env::var("PHENOSCOPE_DIALECT") {
            match parse_dialect(&dialect_str) {
                Ok(dialect) => self.dialect.update(dialect, ConfigSource::Environment),
                Err(_) => tracing::warn!(
                    "Invalid PHENOSCOPE_DIALECT value '{}': expected es-json or lucene",
                    dialect_str
                ),
            }
        }

        if let Ok(timeout_str) = env::var("PHENOSCOPE_TIMEOUT_SECS") {
            match timeout_str.parse::<u64>() {
                Ok(timeout) => {
                    self.request_timeout_secs.update(timeout, ConfigSource::Environment)
                }
                Err(_) => tracing::warn!(
                    "Invalid PHENOSCOPE_TIMEOUT_SECS value '{}': expected integer seconds",
                    timeout_str
                ),
            }
        }

        if let Ok(text_field) = env::var("PHENOSCOPE_TEXT_FIELD") {
            self.text_field.update(text_field, ConfigSource::Environment);
        }

        self
    }

    /// Update profile values from CLI arguments
    pub fn update_from_cli(&mut self, overrides: CliProfileOverrides) {
        if let Some(index_url) = overrides.index_url {
            self.index_url.update(index_url, ConfigSource::Cli);
        }

        if let Some(download_url) = overrides.download_url {
            self.download_url.update(download_url, ConfigSource::Cli);
        }

        if let Some(page_size) = overrides.page_size {
            self.page_size.update(page_size, ConfigSource::Cli);
        }

        if let Some(dialect) = overrides.dialect {
            self.dialect.update(dialect, ConfigSource::Cli);
        }
    }

    /// Get all profile values as a map for inspection
    pub fn to_inspection_map(&self) -> HashMap<String, (String, ConfigSource)> {
        let mut map = HashMap::new();

        map.insert(
            "index_url".to_string(),
            (self.index_url.value.clone(), self.index_url.source),
        );

        map.insert(
            "download_url".to_string(),
            (self.download_url.value.clone(), self.download_url.source),
        );

        map.insert(
            "page_size".to_string(),
            (self.page_size.value.to_string(), self.page_size.source),
        );

        map.insert(
            "export_limit".to_string(),
            (self.export_limit.value.to_string(), self.export_limit.source),
        );

        map.insert(
            "dialect".to_string(),
            (format!("{:?}", self.dialect.value), self.dialect.source),
        );

        map.insert(
            "request_timeout_secs".to_string(),
            (
                self.request_timeout_secs.value.to_string(),
                self.request_timeout_secs.source,
            ),
        );

        map.insert(
            "text_field".to_string(),
            (self.text_field.value.clone(), self.text_field.source),
        );

        map.insert(
            "facets".to_string(),
            (
                self.facets.iter().map(|f| f.name.as_str()).collect::<Vec<_>>().join(", "),
                self.facets_source,
            ),
        );

        map
    }
}

/// Profile loaded from TOML file
#[derive(Debug, Deserialize, Serialize)]
struct FileConfig {
    index_url: Option<String>,
    download_url: Option<String>,
    page_size: Option<u32>,
    export_limit: Option<u64>,
    dialect: Option<QueryDialect>,
    request_timeout_secs: Option<u64>,
    text_field: Option<String>,
    facets: Option<Vec<FacetFieldDef>>,
}

/// CLI profile overrides
#[derive(Debug, Default)]
pub struct CliProfileOverrides {
    pub index_url: Option<String>,
    pub download_url: Option<String>,
    pub page_size: Option<u32>,
    pub dialect: Option<QueryDialect>,
}

/// Parse a query dialect from string
pub fn parse_dialect(s: &str) -> Result<QueryDialect> {
    match s.to_lowercase().as_str() {
        "es-json" | "es_json" | "esjson" | "json" => Ok(QueryDialect::EsJson),
        "lucene" => Ok(QueryDialect::Lucene),
        _ => Err(PhenoscopeError::ConfigInvalid {
            key: "dialect".to_string(),
            reason: format!("Invalid dialect: {}. Use es-json or lucene", s),
        }),
    }
}
