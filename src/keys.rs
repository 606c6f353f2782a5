//! Synthetic keys for model-independent Oasis file generation
//!
//! Every exposure row is assumed to carry all four coverage types
//! (BuildingTIV, OtherTIV, ContentsTIV, BITIV), so n locations give 4n keys,
//! and 4n items downstream. Ids are the 1-based location index.

use std::path::Path;

use csv::{Reader, Writer};
use log::info;
use serde::{Deserialize, Serialize};

use crate::canonical::count_rows;
use crate::error::Result;

/// Peril id stamped on every synthetic key
pub const PERIL_ID: u32 = 1;

/// Coverage types in key order
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoverageType {
    Buildings = 1,
    Other = 2,
    Contents = 3,
    BusinessInterruption = 4,
}

impl CoverageType {
    pub const ALL: [CoverageType; 4] = [
        CoverageType::Buildings,
        CoverageType::Other,
        CoverageType::Contents,
        CoverageType::BusinessInterruption,
    ];

    pub fn id(self) -> u8 {
        self as u8
    }
}

/// One row of the keys file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyRecord {
    #[serde(rename = "LocID")]
    pub id: u32,
    #[serde(rename = "PerilID")]
    pub peril_id: u32,
    #[serde(rename = "CoverageTypeID")]
    pub coverage_type: u8,
    #[serde(rename = "AreaPerilID")]
    pub area_peril_id: u32,
    #[serde(rename = "VulnerabilityID")]
    pub vulnerability_id: u32,
}

/// Keys for `n` locations, location-major then coverage types 1..4
pub fn synthesize_keys(n: usize) -> Vec<KeyRecord> {
    (1..=n as u32)
        .flat_map(|loc| {
            CoverageType::ALL.into_iter().map(move |cov| KeyRecord {
                id: loc,
                peril_id: PERIL_ID,
                coverage_type: cov.id(),
                area_peril_id: loc,
                vulnerability_id: loc,
            })
        })
        .collect()
}

pub fn write_keys_file<P: AsRef<Path>>(keys: &[KeyRecord], path: P) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for key in keys {
        writer.serialize(key)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_keys<P: AsRef<Path>>(path: P) -> Result<Vec<KeyRecord>> {
    let mut reader = Reader::from_path(path)?;
    let mut keys = Vec::new();
    for result in reader.deserialize() {
        keys.push(result?);
    }
    Ok(keys)
}

/// Write the keys file for a canonical exposure file
pub fn generate_keys_file(canexp_path: &Path, keys_path: &Path) -> Result<Vec<KeyRecord>> {
    let n = count_rows(canexp_path)?;
    let keys = synthesize_keys(n);
    write_keys_file(&keys, keys_path)?;
    info!("Wrote {} keys for {} locations to {}", keys.len(), n, keys_path.display());
    Ok(keys)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_four_keys_per_location_in_order() {
        let keys = synthesize_keys(3);
        assert_eq!(keys.len(), 12);

        for (i, key) in keys.iter().enumerate() {
            let loc = (i / 4 + 1) as u32;
            assert_eq!(key.id, loc);
            assert_eq!(key.area_peril_id, loc);
            assert_eq!(key.vulnerability_id, loc);
            assert_eq!(key.coverage_type, (i % 4 + 1) as u8);
            assert_eq!(key.peril_id, PERIL_ID);
        }
    }

    #[test]
    fn test_no_locations_no_keys() {
        assert!(synthesize_keys(0).is_empty());
    }

    #[test]
    fn test_keys_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let canexp = dir.path().join("canexp.csv");
        let keys_path = dir.path().join("keys.csv");
        fs::write(&canexp, "locnumber,buildingtiv\nL1,1000\n").unwrap();

        let keys = generate_keys_file(&canexp, &keys_path).unwrap();
        assert_eq!(keys.len(), 4);

        let written = fs::read_to_string(&keys_path).unwrap();
        let mut lines = written.lines();
        assert_eq!(
            lines.next(),
            Some("LocID,PerilID,CoverageTypeID,AreaPerilID,VulnerabilityID")
        );
        assert_eq!(lines.next(), Some("1,1,1,1,1"));
        assert_eq!(lines.last(), Some("1,1,4,1,1"));

        assert_eq!(load_keys(&keys_path).unwrap(), keys);
    }

    #[test]
    fn test_keys_are_reproducible() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.csv");
        let b = dir.path().join("b.csv");
        write_keys_file(&synthesize_keys(5), &a).unwrap();
        write_keys_file(&synthesize_keys(5), &b).unwrap();
        assert_eq!(fs::read(a).unwrap(), fs::read(b).unwrap());
    }
}
