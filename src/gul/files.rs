//! Writers for items.csv, coverages.csv and gulsummaryxref.csv

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use csv::Writer;
use log::debug;
use serde::{Deserialize, Serialize};

use super::GulItem;
use crate::error::Result;
use crate::fanout::run_concurrently;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRow {
    pub item_id: u32,
    pub coverage_id: u32,
    pub areaperil_id: u32,
    pub vulnerability_id: u32,
    pub group_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CoverageRow {
    pub coverage_id: u32,
    pub tiv: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GulSummaryXrefRow {
    pub coverage_id: u32,
    pub summary_id: u32,
    pub summaryset_id: u32,
}

/// GUL output files, each with its own writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GulFile {
    Items,
    Coverages,
    GulSummaryXref,
}

impl GulFile {
    pub const ALL: [GulFile; 3] = [GulFile::Items, GulFile::Coverages, GulFile::GulSummaryXref];

    pub fn file_name(self) -> &'static str {
        match self {
            GulFile::Items => "items.csv",
            GulFile::Coverages => "coverages.csv",
            GulFile::GulSummaryXref => "gulsummaryxref.csv",
        }
    }

    /// ktools converter for the binary form fmcalc reads, if it reads one
    pub fn binary_converter(self) -> Option<&'static str> {
        match self {
            GulFile::Items => Some("itemtobin"),
            GulFile::Coverages => Some("coveragetobin"),
            GulFile::GulSummaryXref => None,
        }
    }

    pub fn binary_file_name(self) -> String {
        self.file_name().replace(".csv", ".bin")
    }

    pub fn write(self, items: &[GulItem], path: &Path) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        match self {
            GulFile::Items => {
                for item in items {
                    writer.serialize(ItemRow {
                        item_id: item.item_id,
                        coverage_id: item.coverage_id,
                        areaperil_id: item.areaperil_id,
                        vulnerability_id: item.vulnerability_id,
                        group_id: item.group_id,
                    })?;
                }
            }
            GulFile::Coverages => {
                let mut seen = HashSet::new();
                for item in items.iter().filter(|i| seen.insert(i.coverage_id)) {
                    writer.serialize(CoverageRow {
                        coverage_id: item.coverage_id,
                        tiv: item.tiv,
                    })?;
                }
            }
            GulFile::GulSummaryXref => {
                let mut seen = HashSet::new();
                for item in items.iter().filter(|i| seen.insert(i.coverage_id)) {
                    writer.serialize(GulSummaryXrefRow {
                        coverage_id: item.coverage_id,
                        summary_id: item.summary_id,
                        summaryset_id: item.summaryset_id,
                    })?;
                }
            }
        }
        writer.flush()?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl fmt::Display for GulFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

/// Write all GUL files into `dir` concurrently
pub fn write_gul_files(items: &[GulItem], dir: &Path) -> Result<()> {
    run_concurrently(&GulFile::ALL, |file| file.write(items, &dir.join(file.file_name())))
}
