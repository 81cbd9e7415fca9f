use anyhow::Result;
use tabled::Tabled;

use crate::cli::ProfileArgs;
use crate::output::OutputWriter;
use phenoscope_core::config::DatasetProfile;

#[derive(Tabled)]
struct ProfileRow {
    #[tabled(rename = "Setting")]
    setting: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Source")]
    source: String,
}

pub fn execute(_args: ProfileArgs, profile: DatasetProfile, output: &OutputWriter) -> Result<()> {
    let map = profile.to_inspection_map();

    if output.is_json() {
        let body: serde_json::Map<String, serde_json::Value> = map
            .into_iter()
            .map(|(key, (value, source))| {
                (
                    key,
                    serde_json::json!({ "value": value, "source": format!("{source:?}") }),
                )
            })
            .collect();
        return output.json(&body);
    }

    let mut settings: Vec<_> = map.into_iter().collect();
    settings.sort_by(|a, b| a.0.cmp(&b.0));

    output.table(
        settings
            .into_iter()
            .map(|(setting, (value, source))| ProfileRow {
                setting,
                value,
                source: format!("{source:?}"),
            })
            .collect::<Vec<_>>(),
    );
    Ok(())
}
