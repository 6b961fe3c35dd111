//! Resolution of a filing candidate to its primary structured document.
//!
//! Every EDGAR filing folder serves a machine-readable `index.json` manifest
//! listing the files it contains; the Form 4 payload is one of the XML files.

use serde::Deserialize;

use radar_core::{Fetch, FilingCandidate, RadarError};

#[derive(Debug, Deserialize)]
struct ManifestResponse {
    directory: ManifestDirectory,
}

#[derive(Debug, Deserialize)]
struct ManifestDirectory {
    #[serde(default)]
    item: Vec<ManifestItem>,
}

/// One file in a filing folder.
#[derive(Debug, Clone, Deserialize)]
pub struct ManifestItem {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub file_type: Option<String>,
}

/// A file counts as the structured-document type by extension, or by the
/// manifest's own `type` column when the name carries no extension.
fn is_structured(item: &ManifestItem) -> bool {
    item.name.to_lowercase().ends_with(".xml")
        || item
            .file_type
            .as_deref()
            .is_some_and(|t| t.to_lowercase().contains("xml"))
}

/// Pick the most likely primary document from a manifest: a file named for
/// the form wins, then EDGAR's conventional `primary_doc.xml`, then the
/// first XML file at all. `None` when the folder has no XML.
pub fn select_primary_document(items: &[ManifestItem]) -> Option<&str> {
    let xml_files: Vec<&ManifestItem> = items.iter().filter(|i| is_structured(i)).collect();

    if let Some(item) = xml_files
        .iter()
        .find(|i| i.name.to_lowercase().contains("form4"))
    {
        return Some(&item.name);
    }
    if let Some(item) = xml_files
        .iter()
        .find(|i| i.name.eq_ignore_ascii_case("primary_doc.xml"))
    {
        return Some(&item.name);
    }
    xml_files.first().map(|i| i.name.as_str())
}

/// Fetch a candidate's manifest and resolve the primary document URL.
/// Returns `Ok(None)` when the folder holds no structured document; the
/// caller still marks the candidate seen.
pub async fn resolve(
    fetcher: &dyn Fetch,
    candidate: &FilingCandidate,
) -> Result<Option<String>, RadarError> {
    let manifest_url = format!("{}index.json", candidate.base_url);
    let body = fetcher.fetch(&manifest_url).await?;

    let manifest: ManifestResponse = serde_json::from_str(&body)
        .map_err(|e| RadarError::Parse(format!("manifest {}: {}", manifest_url, e)))?;

    Ok(select_primary_document(&manifest.directory.item)
        .map(|name| format!("{}{}", candidate.base_url, name)))
}
