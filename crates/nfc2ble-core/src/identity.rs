// ── NFC → BLE identifier mapping ──
//
// Each NFC identifier owns a ring of BLE tag identifiers. Every lookup
// rotates the ring by one, so a tag mapped to N BLE ids cycles through
// all of them over N consecutive taps, in file order.

use std::collections::VecDeque;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use dashmap::DashMap;
use tracing::{debug, error, warn};

use crate::config::IdSource;
use crate::error::CoreError;

const COMMENT_PREFIX: char = '#';
const FIELD_SEPARATOR: char = ',';
const QUOTE: char = '"';

/// Outcome of loading an identifier source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoadReport {
    /// File the records came from, if any was found.
    pub path: Option<PathBuf>,
    /// Records accepted into the map.
    pub loaded: usize,
    /// Records rejected as malformed.
    pub rejected: usize,
}

/// Concurrent NFC id → rotating BLE tag id map.
///
/// Sequence lengths are fixed once loading finishes; only the rotation
/// order changes afterwards.
#[derive(Debug, Default)]
pub struct IdentityMap {
    entries: DashMap<String, VecDeque<String>>,
}

/// One parsed line of the identifier source.
#[derive(Debug, PartialEq, Eq)]
enum Record<'a> {
    Skip,
    Entry { nfc_id: &'a str, tag_id: &'a str },
    Malformed(&'static str),
}

fn parse_record(line: &str) -> Record<'_> {
    let line = line.trim();
    if line.is_empty() || line.starts_with(COMMENT_PREFIX) {
        return Record::Skip;
    }

    let mut fields = line.split(FIELD_SEPARATOR).map(unquote);
    let nfc_id = fields.next().unwrap_or_default();
    let Some(tag_id) = fields.next() else {
        return Record::Malformed("expected at least 2 fields");
    };
    if nfc_id.is_empty() {
        return Record::Malformed("empty NFC id");
    }
    if tag_id.is_empty() {
        return Record::Malformed("empty tag id");
    }
    // Remaining fields are free-form annotations.
    Record::Entry { nfc_id, tag_id }
}

/// Trim a field and drop one pair of surrounding double quotes, as written
/// by spreadsheet CSV exports. Separators inside quotes are not supported.
fn unquote(field: &str) -> &str {
    let field = field.trim();
    field
        .strip_prefix(QUOTE)
        .and_then(|inner| inner.strip_suffix(QUOTE))
        .map_or(field, str::trim)
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `tag_id` to the rotation of `nfc_id`.
    pub fn insert(&self, nfc_id: impl Into<String>, tag_id: impl Into<String>) {
        self.entries
            .entry(nfc_id.into())
            .or_default()
            .push_back(tag_id.into());
    }

    /// Rotate-and-fetch the next tag id for `nfc_id`.
    ///
    /// Returns `None` for an unknown id and leaves the map untouched.
    pub fn lookup(&self, nfc_id: &str) -> Option<String> {
        let mut ring = self.entries.get_mut(nfc_id)?;
        let tag_id = ring.pop_front()?;
        ring.push_back(tag_id.clone());
        debug!(nfc_id, tag_id = %tag_id, remaining = ?*ring, "rotated tag ids");
        Some(tag_id)
    }

    /// Current rotation order for `nfc_id`, without rotating.
    pub fn tag_ids(&self, nfc_id: &str) -> Option<Vec<String>> {
        self.entries
            .get(nfc_id)
            .map(|ring| ring.iter().cloned().collect())
    }

    /// Number of distinct NFC ids.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Snapshot of every mapping, sorted by NFC id.
    pub fn entries(&self) -> Vec<(String, Vec<String>)> {
        let mut all: Vec<(String, Vec<String>)> = self
            .entries
            .iter()
            .map(|e| (e.key().clone(), e.value().iter().cloned().collect()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }

    // ── Loading ──────────────────────────────────────────────────────

    /// Parse records from an in-memory source.
    pub fn load_str(&self, source: &str) -> LoadReport {
        let mut report = LoadReport::default();
        for (idx, line) in source.lines().enumerate() {
            self.apply_line(idx + 1, line, &mut report);
        }
        report
    }

    /// Parse records from a line-oriented reader.
    ///
    /// I/O failures (including invalid UTF-8) abort the load; malformed
    /// records are rejected one by one and counted in the report.
    pub fn load_from_reader<R: BufRead>(&self, reader: R) -> std::io::Result<LoadReport> {
        let mut report = LoadReport::default();
        for (idx, line) in reader.lines().enumerate() {
            self.apply_line(idx + 1, &line?, &mut report);
        }
        Ok(report)
    }

    /// Load a specific file.
    pub fn load_file(&self, path: &Path) -> Result<LoadReport, CoreError> {
        let read_err = |source| CoreError::IdFileRead {
            path: path.to_path_buf(),
            source,
        };
        let file = File::open(path).map_err(read_err)?;
        let mut report = self.load_from_reader(BufReader::new(file)).map_err(read_err)?;
        report.path = Some(path.to_path_buf());
        Ok(report)
    }

    /// Build a map from an [`IdSource`].
    ///
    /// A search that finds nothing is not fatal: the error is logged and an
    /// empty map is returned, so every lookup resolves to `None`. An
    /// explicit path that does not exist is an error.
    pub fn discover(source: &IdSource) -> Result<(Self, LoadReport), CoreError> {
        let map = Self::new();
        let path = match source {
            IdSource::Explicit(path) => {
                if !path.is_file() {
                    return Err(CoreError::IdFileNotFound { path: path.clone() });
                }
                path.clone()
            }
            IdSource::Search { file_name, dirs } => match search_id_file(file_name, dirs) {
                Some(path) => path,
                None => {
                    error!(file = %file_name, dirs = ?dirs, "identifier file not found in search path");
                    return Ok((map, LoadReport::default()));
                }
            },
        };

        let report = map.load_file(&path)?;
        debug!(
            path = %path.display(),
            loaded = report.loaded,
            rejected = report.rejected,
            nfc_ids = map.len(),
            "identifier file loaded"
        );
        Ok((map, report))
    }

    fn apply_line(&self, line_no: usize, line: &str, report: &mut LoadReport) {
        match parse_record(line) {
            Record::Skip => {}
            Record::Entry { nfc_id, tag_id } => {
                report.loaded += 1;
                debug!(line = line_no, nfc_id, tag_id, "record");
                self.insert(nfc_id, tag_id);
            }
            Record::Malformed(reason) => {
                report.rejected += 1;
                warn!(line = line_no, reason, record = line, "rejected identifier record");
            }
        }
    }
}

/// Return the first `dir/file_name` that exists as a regular file.
pub fn search_id_file(file_name: &str, dirs: &[PathBuf]) -> Option<PathBuf> {
    dirs.iter().map(|dir| dir.join(file_name)).find(|candidate| {
        let hit = candidate.is_file();
        debug!(candidate = %candidate.display(), hit, "searching identifier file");
        hit
    })
}
