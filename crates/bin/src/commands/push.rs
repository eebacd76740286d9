//! Push command - seeds configuration from a JSON document.

use std::path::Path;

use keeper::{ConfigurationClient, KeeperClient, Value};

use crate::cli::PushArgs;
use crate::output::print_table;

/// Read a configuration document.
fn load_configuration(file: &Path) -> Result<Value, Box<dyn std::error::Error>> {
    let contents = std::fs::read_to_string(file)
        .map_err(|e| format!("failed to read {}: {e}", file.display()))?;
    Ok(serde_json::from_str(&contents)?)
}

/// Run the push command
pub async fn run(client: &KeeperClient, args: &PushArgs) -> Result<(), Box<dyn std::error::Error>> {
    let configuration = load_configuration(&args.file)?;
    let report = client
        .put_configuration(&configuration, args.overwrite)
        .await?;

    let rows: Vec<Vec<String>> = report
        .written
        .iter()
        .map(|key| vec![key.clone(), "written".to_string()])
        .chain(
            report
                .skipped
                .iter()
                .map(|key| vec![key.clone(), "kept".to_string()]),
        )
        .collect();
    print_table(&["KEY", "ACTION"], &rows);
    println!(
        "{} written, {} kept",
        report.written.len(),
        report.skipped.len()
    );
    Ok(())
}
