//! Environment-layer tests for the dataset profile.
//!
//! These mutate process-wide environment variables, so they are serialized.

use phenoscope_core::config::{CliProfileOverrides, ConfigSource, DatasetProfile};
use phenoscope_core::query::QueryDialect;
use serial_test::serial;
use std::env;

fn clear_env() {
    for key in [
        "PHENOSCOPE_INDEX_URL",
        "PHENOSCOPE_DOWNLOAD_URL",
        "PHENOSCOPE_PAGE_SIZE",
        "PHENOSCOPE_EXPORT_LIMIT",
        "PHENOSCOPE_DIALECT",
        "PHENOSCOPE_TIMEOUT_SECS",
        "PHENOSCOPE_TEXT_FIELD",
    ] {
        env::remove_var(key);
    }
}

#[test]
#[serial]
fn test_env_overrides_defaults() {
    clear_env();
    env::set_var("PHENOSCOPE_PAGE_SIZE", "25");
    env::set_var("PHENOSCOPE_DIALECT", "lucene");
    env::set_var("PHENOSCOPE_INDEX_URL", "http://localhost:9200/demo/_search");

    let profile = DatasetProfile::with_defaults().load_from_env();
    clear_env();

    assert_eq!(profile.page_size.value, 25);
    assert_eq!(profile.page_size.source, ConfigSource::Environment);
    assert_eq!(profile.dialect.value, QueryDialect::Lucene);
    assert_eq!(profile.index_url.value, "http://localhost:9200/demo/_search");
    // Untouched values keep their defaults.
    assert_eq!(profile.export_limit.source, ConfigSource::Default);
}

#[test]
#[serial]
fn test_invalid_env_values_keep_prior_layer() {
    clear_env();
    env::set_var("PHENOSCOPE_PAGE_SIZE", "zero");
    env::set_var("PHENOSCOPE_DIALECT", "sql");

    let profile = DatasetProfile::with_defaults().load_from_env();
    clear_env();

    assert_eq!(profile.page_size.value, 15);
    assert_eq!(profile.page_size.source, ConfigSource::Default);
    assert_eq!(profile.dialect.value, QueryDialect::EsJson);
}

#[test]
#[serial]
fn test_cli_beats_environment() {
    clear_env();
    env::set_var("PHENOSCOPE_PAGE_SIZE", "25");

    let mut profile = DatasetProfile::with_defaults().load_from_env();
    clear_env();

    profile.update_from_cli(CliProfileOverrides {
        page_size: Some(50),
        ..CliProfileOverrides::default()
    });

    assert_eq!(profile.page_size.value, 50);
    assert_eq!(profile.page_size.source, ConfigSource::Cli);
}
