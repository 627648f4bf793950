use std::collections::HashMap;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;

/// One scanned record file and the admission window it covers.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PdfEntry {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub path: PathBuf,
}

impl PdfEntry {
    /// Inclusive; a missing bound is open.
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| from <= date) && self.to.is_none_or(|to| date <= to)
    }
}

/// Maps patient ids to their nursing-record PDFs.
///
/// Loaded from a JSON object of `{"<patient_id>": [{"from", "to", "path"}]}`.
/// Relative paths resolve against the registry file's directory.
#[derive(Debug, Clone, Default)]
pub struct PdfRegistry {
    entries: HashMap<String, Vec<PdfEntry>>,
}

impl PdfRegistry {
    pub fn load(file: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(file)
            .with_context(|| format!("reading patient PDF registry {}", file.display()))?;
        let mut entries: HashMap<String, Vec<PdfEntry>> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing patient PDF registry {}", file.display()))?;

        let base = file.parent().unwrap_or_else(|| Path::new(""));
        for entry in entries.values_mut().flatten() {
            if entry.path.is_relative() {
                entry.path = base.join(&entry.path);
            }
        }
        Ok(Self { entries })
    }

    pub fn patient_count(&self) -> usize {
        self.entries.len()
    }

    /// Picks the PDF to read for a patient.
    ///
    /// Without a date the entry with the latest `from` wins (entries without one
    /// sort last). With a date, the first entry in file order whose range covers
    /// it wins. Only files that exist are returned.
    pub fn select(&self, patient_id: &str, target_date: Option<NaiveDate>) -> Option<PathBuf> {
        let entries = self.entries.get(patient_id)?;

        match target_date {
            None => {
                let mut sorted: Vec<&PdfEntry> = entries.iter().collect();
                sorted.sort_by(|a, b| b.from.cmp(&a.from));
                sorted
                    .into_iter()
                    .find(|e| e.path.exists())
                    .map(|e| e.path.clone())
            }
            Some(date) => entries
                .iter()
                .find(|e| e.covers(date) && e.path.exists())
                .map(|e| e.path.clone()),
        }
    }
}
