use anyhow::{Context, Result};
use chrono::{DateTime, Local};
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::core::types::NormalizedRecord;

const FILE_PREFIX: &str = "webindustrial_anuncios_limpos";
const ENRICHED_SUFFIX: &str = "_enriquecidos";
/// Written first so spreadsheet tools pick UTF-8 for the accented labels.
const UTF8_BOM: &str = "\u{feff}";

/// `webindustrial_anuncios_limpos_<YYYYmmdd-HHMMSS>.csv`
pub fn default_file_name(now: DateTime<Local>) -> String {
    format!("{}_{}.csv", FILE_PREFIX, now.format("%Y%m%d-%H%M%S"))
}

/// `<dir>/<stem>_enriquecidos.csv` next to the input file.
pub fn enriched_path(input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| FILE_PREFIX.to_string());
    input.with_file_name(format!("{}{}.csv", stem, ENRICHED_SUFFIX))
}

/// Where a run's dataset ends up.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Timestamped file inside `dir`.
    pub fn in_dir(dir: &Path, now: DateTime<Local>) -> Self {
        Self::at(dir.join(default_file_name(now)))
    }

    pub fn write(&self, records: &[NormalizedRecord]) -> Result<&Path> {
        write_records(&self.path, records)?;
        Ok(&self.path)
    }
}

/// Write records with a header row. Missing numbers become empty cells.
pub fn write_records(path: &Path, records: &[NormalizedRecord]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }

    let mut file =
        File::create(path).with_context(|| format!("failed to create {}", path.display()))?;
    file.write_all(UTF8_BOM.as_bytes())
        .with_context(|| format!("failed to write {}", path.display()))?;

    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(file);
    for record in records {
        writer
            .serialize(record)
            .with_context(|| format!("failed to write record {}", record.id))?;
    }
    writer
        .flush()
        .with_context(|| format!("failed to flush {}", path.display()))?;

    info!("💾 Saved {} records to {}", records.len(), path.display());
    Ok(())
}

/// Load a file previously written by [`write_records`].
pub fn read_records(path: &Path) -> Result<Vec<NormalizedRecord>> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let body = contents.strip_prefix(UTF8_BOM).unwrap_or(&contents);

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .from_reader(body.as_bytes());
    let records = reader
        .deserialize::<NormalizedRecord>()
        .collect::<std::result::Result<Vec<_>, _>>()
        .with_context(|| format!("malformed dataset {}", path.display()))?;

    info!("Loaded {} records from {}", records.len(), path.display());
    Ok(records)
}
