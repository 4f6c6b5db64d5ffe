use std::time::Duration;

use serde::Deserialize;

use crate::execution::{CommandSpec, ProcessSpawnRequest};
use crate::models::{CoreError, CoreErrorKind, CoreResult, PackageRecord, ProductAction};

pub(crate) const POWERSHELL_COMMAND: &str = "powershell.exe";
const LIST_TIMEOUT: Duration = Duration::from_secs(120);
const GET_PACKAGE_SCRIPT: &str = "Get-Package | Select-Object Name,Version,ProviderName | ConvertTo-Json -Compress";

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GetPackageOutput {
    Many(Vec<GetPackageEntry>),
    One(GetPackageEntry),
}

#[derive(Debug, Deserialize)]
struct GetPackageEntry {
    #[serde(rename = "Name")]
    name: Option<String>,
    #[serde(rename = "Version")]
    version: Option<String>,
    #[serde(rename = "ProviderName")]
    provider_name: Option<String>,
}

pub fn get_package_list_request() -> ProcessSpawnRequest {
    ProcessSpawnRequest::new(
        ProductAction::Collect,
        CommandSpec::new(POWERSHELL_COMMAND).args([
            "-NoProfile",
            "-NonInteractive",
            "-Command",
            GET_PACKAGE_SCRIPT,
        ]),
    )
    .timeout(LIST_TIMEOUT)
}

/// Parses `Get-Package | ConvertTo-Json` output. PowerShell emits a bare
/// object for a single package and nothing at all for zero packages.
pub fn parse_get_package_output(output: &str) -> CoreResult<Vec<PackageRecord>> {
    let trimmed = output.trim_start_matches('\u{feff}').trim();
    if trimmed.is_empty() {
        return Ok(Vec::new());
    }

    let parsed: GetPackageOutput = serde_json::from_str(trimmed).map_err(|error| {
        parse_error(format!("Get-Package output is not valid JSON: {error}"))
    })?;

    let entries = match parsed {
        GetPackageOutput::Many(entries) => entries,
        GetPackageOutput::One(entry) => vec![entry],
    };

    let total = entries.len();
    let records: Vec<PackageRecord> = entries.into_iter().filter_map(record_from_entry).collect();

    if records.is_empty() && total > 0 {
        return Err(parse_error(
            "unable to parse any Get-Package entries".to_string(),
        ));
    }

    Ok(records)
}

fn record_from_entry(entry: GetPackageEntry) -> Option<PackageRecord> {
    let name = entry.name?.trim().to_string();
    if name.is_empty() {
        return None;
    }

    let provider = entry
        .provider_name
        .map(|provider| provider.trim().to_string())
        .unwrap_or_default();

    let mut record = PackageRecord::new(name, provider);
    if let Some(version) = entry
        .version
        .map(|version| version.trim().to_string())
        .filter(|version| !version.is_empty())
    {
        record = record.attribute("ensure", version);
    }

    Some(record)
}

fn parse_error(message: String) -> CoreError {
    CoreError {
        identity: None,
        action: Some(ProductAction::Collect),
        kind: CoreErrorKind::ParseFailure,
        message,
    }
}
