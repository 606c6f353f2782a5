//! Load canonical exposure/accounts files
//!
//! Canonical headers are lowercased on load so profile columns match
//! regardless of the transformer's casing.

use std::path::{Path, PathBuf};

use csv::{Reader, StringRecord};

use crate::error::{Error, Result};

/// A canonical CSV file held as raw string rows
#[derive(Debug, Clone)]
pub struct CanonicalTable {
    path: PathBuf,
    headers: Vec<String>,
    rows: Vec<StringRecord>,
}

impl CanonicalTable {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = Reader::from_path(path)?;
        Self::from_reader(path, &mut reader)
    }

    /// Load from any reader (e.g. an in-memory buffer); `path` is only used in errors
    pub fn from_reader<R: std::io::Read>(path: &Path, reader: &mut Reader<R>) -> Result<Self> {
        let headers = reader
            .headers()?
            .iter()
            .map(|h| h.trim().to_lowercase())
            .collect();

        let mut rows = Vec::new();
        for result in reader.records() {
            rows.push(result?);
        }

        Ok(Self {
            path: path.to_path_buf(),
            headers,
            rows,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        let name = name.to_lowercase();
        self.headers.iter().position(|h| *h == name)
    }

    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column(name).ok_or_else(|| Error::MissingColumn {
            file: self.path.clone(),
            column: name.to_string(),
        })
    }

    /// Raw (trimmed) cell value
    pub fn value(&self, row: usize, col: usize) -> &str {
        self.rows[row].get(col).map_or("", str::trim)
    }

    /// Numeric cell value; empty cells read as zero
    pub fn number(&self, row: usize, col: usize) -> Result<f64> {
        let raw = self.value(row, col);
        if raw.is_empty() {
            return Ok(0.0);
        }
        raw.parse().map_err(|_| Error::InvalidValue {
            file: self.path.clone(),
            column: self.headers[col].clone(),
            row: row + 1,
            value: raw.to_string(),
        })
    }

    /// Numeric value of an optional column; an absent column reads as zero
    pub fn optional_number(&self, row: usize, name: &str) -> Result<f64> {
        match self.column(name) {
            Some(col) => self.number(row, col),
            None => Ok(0.0),
        }
    }
}

/// Number of data rows in a CSV file
pub fn count_rows<P: AsRef<Path>>(path: P) -> Result<usize> {
    let mut reader = Reader::from_path(path)?;
    let mut n = 0;
    for result in reader.records() {
        result?;
        n += 1;
    }
    Ok(n)
}
