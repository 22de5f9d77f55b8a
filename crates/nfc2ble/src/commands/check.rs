//! `check`: load the identifier file and show what the bridge would use.

use std::path::PathBuf;

use serde::Serialize;
use tabled::Tabled;

use nfc2ble_core::{IdSource, IdentityMap};

use crate::cli::{CheckArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;

// ── Report ──────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CheckReport {
    path: PathBuf,
    loaded: usize,
    rejected: usize,
    nfc_ids: usize,
    entries: Vec<Mapping>,
}

#[derive(Debug, Serialize)]
struct Mapping {
    nfc_id: String,
    tag_ids: Vec<String>,
}

// ── Table row ───────────────────────────────────────────────────────

#[derive(Tabled)]
struct MappingRow {
    #[tabled(rename = "NFC id")]
    nfc_id: String,
    #[tabled(rename = "Tag ids (rotation order)")]
    tag_ids: String,
    #[tabled(rename = "Count")]
    count: usize,
}

impl From<&Mapping> for MappingRow {
    fn from(m: &Mapping) -> Self {
        Self {
            nfc_id: m.nfc_id.clone(),
            tag_ids: m.tag_ids.join(", "),
            count: m.tag_ids.len(),
        }
    }
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: &CheckArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let config = super::load_config(global, &args.ids)?;
    config.validate()?;
    let source = config.id_source();

    let (ids, load) = IdentityMap::discover(&source)?;
    let Some(path) = load.path else {
        return Err(CliError::IdFileNotFound {
            path: describe_search(&source),
        });
    };

    let report = CheckReport {
        path: path.clone(),
        loaded: load.loaded,
        rejected: load.rejected,
        nfc_ids: ids.len(),
        entries: ids
            .entries()
            .into_iter()
            .map(|(nfc_id, tag_ids)| Mapping { nfc_id, tag_ids })
            .collect(),
    };

    let summary = format!(
        "{}: {} records, {} rejected, {} NFC ids",
        path.display(),
        report.loaded,
        report.rejected,
        report.nfc_ids
    );
    let out = output::render_list(
        args.output,
        &summary,
        &report,
        &report.entries,
        |m| MappingRow::from(m),
        |m| m.nfc_id.clone(),
    )?;
    output::print_output(&out);
    Ok(())
}

fn describe_search(source: &IdSource) -> String {
    match source {
        IdSource::Explicit(path) => path.display().to_string(),
        IdSource::Search { file_name, dirs } => {
            let dirs: Vec<String> = dirs.iter().map(|d| d.display().to_string()).collect();
            format!("{file_name} (searched {})", dirs.join(", "))
        }
    }
}
