//! CSV stage tables
//!
//! Every pipeline stage reads and writes a header-first CSV file. Header
//! names are a compatibility surface for downstream tooling and come from
//! the serde field names of the row types.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::File;
use std::path::{Path, PathBuf};

/// Read every record of a typed table
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>> {
    let mut reader = csv::Reader::from_path(path).map_err(|e| with_path(e, path))?;
    let mut records = Vec::new();
    for record in reader.deserialize() {
        records.push(record.map_err(|e| with_path(e, path))?);
    }
    tracing::debug!(path = %path.display(), rows = records.len(), "Read table");
    Ok(records)
}

/// Write a typed table, replacing any existing file
pub fn write_records<T: Serialize>(path: &Path, records: &[T]) -> Result<()> {
    let mut writer = RecordWriter::create(path)?;
    for record in records {
        writer.append(record)?;
    }
    writer.finish()
}

/// Typed table written one row at a time
///
/// The file exists from [`RecordWriter::create`] on and every appended row
/// is flushed, so an interrupted run leaves every completed row on disk.
pub struct RecordWriter {
    writer: csv::Writer<File>,
    path: PathBuf,
    rows: usize,
}

impl RecordWriter {
    /// Create (or truncate) `path`, creating parent folders as needed
    pub fn create(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let writer = csv::Writer::from_path(path).map_err(|e| with_path(e, path))?;
        Ok(Self {
            writer,
            path: path.to_path_buf(),
            rows: 0,
        })
    }

    /// Append one row and flush it; the first row also writes the header
    pub fn append<T: Serialize>(&mut self, record: &T) -> Result<()> {
        self.writer
            .serialize(record)
            .map_err(|e| with_path(e, &self.path))?;
        self.writer.flush()?;
        self.rows += 1;
        Ok(())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn finish(mut self) -> Result<()> {
        self.writer.flush()?;
        tracing::debug!(path = %self.path.display(), rows = self.rows, "Wrote table");
        Ok(())
    }
}

/// Untyped table: header row plus string cells
///
/// Used for the raw survey export, whose demographic columns are not known
/// at compile time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

/// Read a CSV file without a fixed schema
///
/// Rows may have fewer or more cells than the header.
pub fn read_raw(path: &Path) -> Result<RawTable> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| with_path(e, path))?;

    let headers = reader
        .headers()
        .map_err(|e| with_path(e, path))?
        .iter()
        .map(str::to_string)
        .collect();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| with_path(e, path))?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(RawTable { headers, rows })
}

/// Write an untyped table
pub fn write_raw(path: &Path, table: &RawTable) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(path)
        .map_err(|e| with_path(e, path))?;
    writer.write_record(&table.headers)?;
    for row in &table.rows {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

fn with_path(e: csv::Error, path: &Path) -> Error {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return Error::Io(std::io::Error::new(
                io.kind(),
                format!("{}: {}", path.display(), io),
            ));
        }
        return Error::Internal(format!("{}: unreadable table", path.display()));
    }
    Error::InvalidInput(format!("{}: {}", path.display(), e))
}
