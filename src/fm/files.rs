//! Writers for the five FM files

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::path::Path;

use csv::Writer;
use log::debug;
use serde::{Deserialize, Serialize};

use super::FmItem;
use crate::error::Result;
use crate::fanout::run_concurrently;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmPolicyTcRow {
    pub layer_id: u32,
    pub level_id: u32,
    pub agg_id: u32,
    pub policytc_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmProgrammeRow {
    pub from_agg_id: u32,
    pub level_id: u32,
    pub to_agg_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FmProfileRow {
    pub policytc_id: u32,
    pub calcrule_id: u32,
    pub deductible1: f64,
    pub deductible2: f64,
    pub deductible3: f64,
    pub attachment1: f64,
    pub limit1: f64,
    pub share1: f64,
    pub share2: f64,
    pub share3: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmXrefRow {
    pub output_id: u32,
    pub agg_id: u32,
    pub layer_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmSummaryXrefRow {
    pub output_id: u32,
    pub summary_id: u32,
    pub summaryset_id: u32,
}

/// FM output files, each with its own writer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FmFile {
    PolicyTc,
    Programme,
    Profile,
    Xref,
    SummaryXref,
}

impl FmFile {
    pub const ALL: [FmFile; 5] = [
        FmFile::PolicyTc,
        FmFile::Programme,
        FmFile::Profile,
        FmFile::Xref,
        FmFile::SummaryXref,
    ];

    pub fn file_name(self) -> &'static str {
        match self {
            FmFile::PolicyTc => "fm_policytc.csv",
            FmFile::Programme => "fm_programme.csv",
            FmFile::Profile => "fm_profile.csv",
            FmFile::Xref => "fm_xref.csv",
            FmFile::SummaryXref => "fmsummaryxref.csv",
        }
    }

    /// ktools converter producing the binary form of this file, if the engine reads one
    pub fn binary_converter(self) -> Option<&'static str> {
        match self {
            FmFile::PolicyTc => Some("fmpolicytctobin"),
            FmFile::Programme => Some("fmprogrammetobin"),
            FmFile::Profile => Some("fmprofiletobin"),
            FmFile::Xref => Some("fmxreftobin"),
            FmFile::SummaryXref => None,
        }
    }

    pub fn binary_file_name(self) -> String {
        self.file_name().replace(".csv", ".bin")
    }

    pub fn write(self, fm_items: &[FmItem], path: &Path) -> Result<()> {
        let mut writer = Writer::from_path(path)?;
        match self {
            FmFile::PolicyTc => serialize_all(&mut writer, policytc_rows(fm_items))?,
            FmFile::Programme => serialize_all(&mut writer, programme_rows(fm_items))?,
            FmFile::Profile => serialize_all(&mut writer, profile_rows(fm_items))?,
            FmFile::Xref => serialize_all(&mut writer, xref_rows(fm_items))?,
            FmFile::SummaryXref => serialize_all(
                &mut writer,
                xref_rows(fm_items).into_iter().map(|x| FmSummaryXrefRow {
                    output_id: x.output_id,
                    summary_id: 1,
                    summaryset_id: 1,
                }),
            )?,
        }
        writer.flush()?;
        debug!("Wrote {}", path.display());
        Ok(())
    }
}

impl fmt::Display for FmFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

fn serialize_all<W, T, I>(writer: &mut Writer<W>, rows: I) -> Result<()>
where
    W: std::io::Write,
    T: Serialize,
    I: IntoIterator<Item = T>,
{
    for row in rows {
        writer.serialize(row)?;
    }
    Ok(())
}

/// One policytc per (level, agg, layer); the first item seen decides the terms
pub fn policytc_rows(fm_items: &[FmItem]) -> Vec<FmPolicyTcRow> {
    let mut rows = BTreeMap::new();
    for item in fm_items {
        rows.entry((item.level_id, item.agg_id, item.layer_id))
            .or_insert(item.policytc_id);
    }
    rows.into_iter()
        .map(|((level_id, agg_id, layer_id), policytc_id)| FmPolicyTcRow {
            layer_id,
            level_id,
            agg_id,
            policytc_id,
        })
        .collect()
}

/// Links from each level's aggregates to the next; level one starts from the items
pub fn programme_rows(fm_items: &[FmItem]) -> Vec<FmProgrammeRow> {
    let mut level_ids: Vec<u32> = Vec::new();
    for item in fm_items {
        if !level_ids.contains(&item.level_id) {
            level_ids.push(item.level_id);
        }
    }
    let previous_level: HashMap<u32, u32> =
        level_ids.windows(2).map(|w| (w[1], w[0])).collect();

    let base: Vec<&FmItem> = fm_items.iter().filter(|i| i.layer_id == 1).collect();
    let agg_of: HashMap<(u32, u32), u32> = base
        .iter()
        .map(|i| ((i.level_id, i.item_id), i.agg_id))
        .collect();

    let mut links = BTreeSet::new();
    for item in base {
        let from_agg_id = match previous_level.get(&item.level_id) {
            Some(prev) => agg_of[&(*prev, item.item_id)],
            None => item.item_id,
        };
        links.insert((item.level_id, from_agg_id, item.agg_id));
    }

    links
        .into_iter()
        .map(|(level_id, from_agg_id, to_agg_id)| FmProgrammeRow {
            from_agg_id,
            level_id,
            to_agg_id,
        })
        .collect()
}

pub fn profile_rows(fm_items: &[FmItem]) -> Vec<FmProfileRow> {
    let mut rows = BTreeMap::new();
    for item in fm_items {
        rows.entry(item.policytc_id).or_insert(FmProfileRow {
            policytc_id: item.policytc_id,
            calcrule_id: item.calcrule_id,
            deductible1: item.terms.deductible,
            deductible2: 0.0,
            deductible3: 0.0,
            attachment1: item.terms.attachment,
            limit1: item.terms.limit,
            share1: item.terms.share,
            share2: 0.0,
            share3: 0.0,
        });
    }
    rows.into_values().collect()
}

/// Layer-level FM items ordered by (item, layer): one per FM output
pub fn layer_outputs(fm_items: &[FmItem]) -> Vec<&FmItem> {
    let Some(top) = fm_items.last().map(|i| i.level_id) else {
        return Vec::new();
    };
    let mut outputs: Vec<&FmItem> = fm_items.iter().filter(|i| i.level_id == top).collect();
    outputs.sort_by_key(|i| (i.item_id, i.layer_id));
    outputs
}

pub fn xref_rows(fm_items: &[FmItem]) -> Vec<FmXrefRow> {
    layer_outputs(fm_items)
        .into_iter()
        .enumerate()
        .map(|(i, item)| FmXrefRow {
            output_id: i as u32 + 1,
            agg_id: item.item_id,
            layer_id: item.layer_id,
        })
        .collect()
}

/// Write all FM files into `dir` concurrently
pub fn write_fm_files(fm_items: &[FmItem], dir: &Path) -> Result<()> {
    run_concurrently(&FmFile::ALL, |file| file.write(fm_items, &dir.join(file.file_name())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fm::tests::fixture;
    use std::fs;

    #[test]
    fn test_programme_links_levels() {
        let rows = programme_rows(&fixture());

        let level1: Vec<_> = rows.iter().filter(|r| r.level_id == 1).collect();
        assert_eq!(level1.len(), 8);
        assert!(level1.iter().all(|r| r.from_agg_id == r.to_agg_id));

        let level2: Vec<(u32, u32)> = rows
            .iter()
            .filter(|r| r.level_id == 2)
            .map(|r| (r.from_agg_id, r.to_agg_id))
            .collect();
        assert_eq!(level2, vec![(1, 1), (2, 1), (3, 1), (4, 1), (5, 2), (6, 2), (7, 2), (8, 2)]);

        let level3: Vec<(u32, u32)> = rows
            .iter()
            .filter(|r| r.level_id == 3)
            .map(|r| (r.from_agg_id, r.to_agg_id))
            .collect();
        assert_eq!(level3, vec![(1, 1), (2, 1)]);
    }

    #[test]
    fn test_policytc_rows_layers_only_on_top_level() {
        let rows = policytc_rows(&fixture());
        assert_eq!(rows.iter().filter(|r| r.level_id == 1).count(), 8);
        assert_eq!(rows.iter().filter(|r| r.level_id == 2).count(), 2);
        let top: Vec<u32> = rows.iter().filter(|r| r.level_id == 3).map(|r| r.layer_id).collect();
        assert_eq!(top, vec![1, 2]);
    }

    #[test]
    fn test_profile_rows_unique_ids() {
        let rows = profile_rows(&fixture());
        let ids: Vec<u32> = rows.iter().map(|r| r.policytc_id).collect();
        assert_eq!(ids, (1..=rows.len() as u32).collect::<Vec<_>>());
    }

    #[test]
    fn test_xref_rows() {
        let rows = xref_rows(&fixture());
        assert_eq!(rows.len(), 16);
        assert_eq!(rows[0], FmXrefRow { output_id: 1, agg_id: 1, layer_id: 1 });
        assert_eq!(rows[1], FmXrefRow { output_id: 2, agg_id: 1, layer_id: 2 });
        assert_eq!(rows[15], FmXrefRow { output_id: 16, agg_id: 8, layer_id: 2 });
    }

    #[test]
    fn test_write_fm_files() {
        let dir = tempfile::tempdir().unwrap();
        write_fm_files(&fixture(), dir.path()).unwrap();

        for file in FmFile::ALL {
            assert!(dir.path().join(file.file_name()).exists(), "{} missing", file);
        }
        let xref = fs::read_to_string(dir.path().join("fm_xref.csv")).unwrap();
        assert!(xref.starts_with("output_id,agg_id,layer_id\n1,1,1\n"));
        let programme = fs::read_to_string(dir.path().join("fm_programme.csv")).unwrap();
        assert!(programme.starts_with("from_agg_id,level_id,to_agg_id\n"));
        let summary = fs::read_to_string(dir.path().join("fmsummaryxref.csv")).unwrap();
        assert_eq!(summary.lines().count(), 17);
    }

    #[test]
    fn test_binary_names() {
        assert_eq!(FmFile::Programme.binary_file_name(), "fm_programme.bin");
        assert_eq!(FmFile::SummaryXref.binary_converter(), None);
    }
}
