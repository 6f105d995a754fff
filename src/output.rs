//! Writes the dataset CSV and the summary JSON.

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use anyhow::{Context, Result};
use csv::WriterBuilder;

use crate::model::{EventRecord, CSV_HEADER};
use crate::summary::FunnelSummary;

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create directory {}", parent.display()))?;
    }
    Ok(())
}

/// Write `rows` with a header line. An empty slice still gets the header.
pub fn write_csv(path: &Path, rows: &[EventRecord]) -> Result<()> {
    ensure_parent(path)?;
    let file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    let mut writer = WriterBuilder::new()
        .has_headers(false)
        .from_writer(BufWriter::new(file));

    // Header written by hand so an empty dataset still has one.
    writer
        .write_record(CSV_HEADER)
        .context("failed to write CSV header")?;
    for row in rows {
        writer
            .serialize(row)
            .with_context(|| format!("failed to write row for {}", row.session_id))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;
    Ok(())
}

pub fn write_summary(path: &Path, summary: &FunnelSummary) -> Result<()> {
    ensure_parent(path)?;
    let json = serde_json::to_string_pretty(summary).context("failed to encode summary")?;
    fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}
