//! Ground-up loss (GUL) items and the items/coverages/summary files
//!
//! One item per key: the key's location row in the canonical exposure file
//! supplies the TIV for the key's coverage type.

mod files;

pub use files::{write_gul_files, CoverageRow, GulFile, GulSummaryXrefRow, ItemRow};

use std::path::Path;

use log::info;

use crate::canonical::CanonicalTable;
use crate::error::{Error, Result};
use crate::keys::{load_keys, KeyRecord};
use crate::profiles::ExposureProfile;

/// A GUL item joined with its exposure attributes
#[derive(Debug, Clone, PartialEq)]
pub struct GulItem {
    pub item_id: u32,

    /// 0-based row of the location in the canonical exposure file
    pub loc_idx: usize,

    /// Location identifier value
    pub location: String,

    /// Account identifier value (links to the accounts file)
    pub account: String,

    pub coverage_id: u32,
    pub coverage_type_id: u8,
    pub peril_id: u32,
    pub areaperil_id: u32,
    pub vulnerability_id: u32,
    pub tiv: f64,
    pub group_id: u32,
    pub summary_id: u32,
    pub summaryset_id: u32,
}

/// Load the canonical exposure file and keys file and build GUL items
pub fn load_gul_items(
    profile: &ExposureProfile,
    canexp_path: &Path,
    keys_path: &Path,
) -> Result<(Vec<GulItem>, CanonicalTable)> {
    let canexp = CanonicalTable::load(canexp_path)?;
    let keys = load_keys(keys_path)?;
    let items = build_gul_items(profile, &canexp, &keys)?;
    info!("Built {} GUL items from {} locations", items.len(), canexp.len());
    Ok((items, canexp))
}

pub fn build_gul_items(
    profile: &ExposureProfile,
    canexp: &CanonicalTable,
    keys: &[KeyRecord],
) -> Result<Vec<GulItem>> {
    let location_col = canexp.require_column(&profile.location_column)?;
    let account_col = canexp.require_column(&profile.account_column)?;

    let mut items = Vec::with_capacity(keys.len());
    for (i, key) in keys.iter().enumerate() {
        let loc_idx = (key.id as usize)
            .checked_sub(1)
            .filter(|&idx| idx < canexp.len())
            .ok_or(Error::UnknownLocation {
                loc_id: key.id,
                rows: canexp.len(),
            })?;

        let tiv_field = profile
            .tiv_field(key.coverage_type)
            .ok_or_else(|| Error::MissingColumn {
                file: canexp.path().to_path_buf(),
                column: format!("TIV for coverage type {}", key.coverage_type),
            })?;
        let tiv = canexp.number(loc_idx, canexp.require_column(&tiv_field.column)?)?;

        let item_id = (i + 1) as u32;
        items.push(GulItem {
            item_id,
            loc_idx,
            location: canexp.value(loc_idx, location_col).to_string(),
            account: canexp.value(loc_idx, account_col).to_string(),
            coverage_id: item_id,
            coverage_type_id: key.coverage_type,
            peril_id: key.peril_id,
            areaperil_id: key.area_peril_id,
            vulnerability_id: key.vulnerability_id,
            tiv,
            group_id: key.id,
            summary_id: 1,
            summaryset_id: 1,
        });
    }

    Ok(items)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keys::synthesize_keys;
    use csv::Reader;

    fn canexp(data: &str) -> CanonicalTable {
        let mut reader = Reader::from_reader(data.as_bytes());
        CanonicalTable::from_reader(Path::new("canexp.csv"), &mut reader).unwrap()
    }

    const TWO_LOCATIONS: &str = "\
LocNumber,AccNumber,BuildingTIV,OtherTIV,ContentsTIV,BITIV
L1,A1,1000,100,500,50
L2,A1,2000,0,800,20
";

    #[test]
    fn test_items_per_key() {
        let table = canexp(TWO_LOCATIONS);
        let items =
            build_gul_items(&ExposureProfile::default_oed(), &table, &synthesize_keys(2)).unwrap();

        assert_eq!(items.len(), 8);
        let tivs: Vec<f64> = items.iter().map(|i| i.tiv).collect();
        assert_eq!(tivs, vec![1000.0, 100.0, 500.0, 50.0, 2000.0, 0.0, 800.0, 20.0]);

        let fifth = &items[4];
        assert_eq!(fifth.item_id, 5);
        assert_eq!(fifth.coverage_id, 5);
        assert_eq!(fifth.coverage_type_id, 1);
        assert_eq!(fifth.location, "L2");
        assert_eq!(fifth.account, "A1");
        assert_eq!(fifth.group_id, 2);
        assert_eq!(fifth.areaperil_id, 2);
    }

    #[test]
    fn test_key_beyond_exposure_rows() {
        let table = canexp(TWO_LOCATIONS);
        let result = build_gul_items(&ExposureProfile::default_oed(), &table, &synthesize_keys(3));
        assert!(matches!(
            result,
            Err(Error::UnknownLocation { loc_id: 3, rows: 2 })
        ));
    }

    #[test]
    fn test_missing_tiv_column() {
        let table = canexp("LocNumber,AccNumber,BuildingTIV\nL1,A1,1000\n");
        let result = build_gul_items(&ExposureProfile::default_oed(), &table, &synthesize_keys(1));
        assert!(matches!(result, Err(Error::MissingColumn { .. })));
    }
}
