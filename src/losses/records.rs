//! GUL and IL loss records

use std::collections::HashMap;
use std::path::Path;

use csv::{Reader, Writer};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::gul::{CoverageRow, ItemRow};

/// Sample index of the mean loss placeholder
pub const MEAN_SIDX: i32 = -1;
/// Sample index of the standard deviation placeholder
pub const STD_DEV_SIDX: i32 = -2;
/// Sample index of the one real sample
pub const SAMPLE_SIDX: i32 = 1;

/// The single event every deterministic loss belongs to
pub const EVENT_ID: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GulRecord {
    pub event_id: u32,
    pub item_id: u32,
    pub sidx: i32,
    pub loss: f64,
}

/// Row of the decoded financial engine output
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IlRecord {
    pub event_id: u32,
    pub output_id: u32,
    pub sidx: i32,
    pub loss: f64,
}

/// An item joined with the TIV of its coverage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ItemTiv {
    pub item: ItemRow,
    pub tiv: f64,
}

/// Inner join of items.csv and coverages.csv on coverage_id
pub fn load_items_with_tiv(items_path: &Path, coverages_path: &Path) -> Result<Vec<ItemTiv>> {
    let mut tivs = HashMap::new();
    let mut reader = Reader::from_path(coverages_path)?;
    for result in reader.deserialize() {
        let row: CoverageRow = result?;
        tivs.entry(row.coverage_id).or_insert(row.tiv);
    }

    let mut items = Vec::new();
    let mut reader = Reader::from_path(items_path)?;
    for result in reader.deserialize() {
        let item: ItemRow = result?;
        if let Some(&tiv) = tivs.get(&item.coverage_id) {
            items.push(ItemTiv { item, tiv });
        }
    }
    Ok(items)
}

/// Three records per item: mean and sample at `pct` of TIV, zero standard deviation
pub fn synthesize_guls(items: &[ItemTiv], loss_percentage_of_tiv: f64) -> Vec<GulRecord> {
    items
        .iter()
        .flat_map(|it| {
            let loss = loss_percentage_of_tiv * it.tiv;
            let item_id = it.item.item_id;
            [
                GulRecord { event_id: EVENT_ID, item_id, sidx: MEAN_SIDX, loss },
                GulRecord { event_id: EVENT_ID, item_id, sidx: STD_DEV_SIDX, loss: 0.0 },
                GulRecord { event_id: EVENT_ID, item_id, sidx: SAMPLE_SIDX, loss },
            ]
        })
        .collect()
}

pub fn write_guls(guls: &[GulRecord], path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for gul in guls {
        writer.serialize(gul)?;
    }
    writer.flush()?;
    Ok(())
}

pub fn load_ils(path: &Path) -> Result<Vec<IlRecord>> {
    let mut reader = Reader::from_path(path)?;
    let mut ils = Vec::new();
    for result in reader.deserialize() {
        ils.push(result?);
    }
    Ok(ils)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::fs;

    fn item(item_id: u32, tiv: f64) -> ItemTiv {
        ItemTiv {
            item: ItemRow {
                item_id,
                coverage_id: item_id,
                areaperil_id: 1,
                vulnerability_id: 1,
                group_id: 1,
            },
            tiv,
        }
    }

    #[test]
    fn test_single_item_full_loss() {
        let guls = synthesize_guls(&[item(1, 1000.0)], 1.0);
        assert_eq!(
            guls,
            vec![
                GulRecord { event_id: 1, item_id: 1, sidx: -1, loss: 1000.0 },
                GulRecord { event_id: 1, item_id: 1, sidx: -2, loss: 0.0 },
                GulRecord { event_id: 1, item_id: 1, sidx: 1, loss: 1000.0 },
            ]
        );
    }

    #[test]
    fn test_three_records_per_item() {
        let items: Vec<ItemTiv> = (1..=5).map(|i| item(i, 100.0 * i as f64)).collect();
        let guls = synthesize_guls(&items, 0.25);
        assert_eq!(guls.len(), 15);

        for (chunk, it) in guls.chunks(3).zip(&items) {
            let sidx: Vec<i32> = chunk.iter().map(|g| g.sidx).collect();
            assert_eq!(sidx, vec![-1, -2, 1]);
            assert_relative_eq!(chunk[0].loss, 0.25 * it.tiv);
            assert_eq!(chunk[1].loss, 0.0);
            assert_relative_eq!(chunk[2].loss, 0.25 * it.tiv);
            assert!(chunk.iter().all(|g| g.item_id == it.item.item_id));
        }
    }

    #[test]
    fn test_items_join_coverages() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.csv");
        let coverages = dir.path().join("coverages.csv");
        fs::write(
            &items,
            "item_id,coverage_id,areaperil_id,vulnerability_id,group_id\n1,1,1,1,1\n2,2,1,1,1\n3,9,1,1,1\n",
        )
        .unwrap();
        fs::write(&coverages, "coverage_id,tiv\n1,1000.0\n2,250\n").unwrap();

        let joined = load_items_with_tiv(&items, &coverages).unwrap();
        assert_eq!(joined.len(), 2);
        assert_eq!(joined[1].item.item_id, 2);
        assert_eq!(joined[1].tiv, 250.0);
    }

    #[test]
    fn test_non_integer_id_is_error() {
        let dir = tempfile::tempdir().unwrap();
        let items = dir.path().join("items.csv");
        let coverages = dir.path().join("coverages.csv");
        fs::write(
            &items,
            "item_id,coverage_id,areaperil_id,vulnerability_id,group_id\nx,1,1,1,1\n",
        )
        .unwrap();
        fs::write(&coverages, "coverage_id,tiv\n1,1000.0\n").unwrap();

        assert!(load_items_with_tiv(&items, &coverages).is_err());
    }

    #[test]
    fn test_guls_file_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("guls.csv");
        write_guls(&synthesize_guls(&[item(1, 1000.0)], 1.0), &path).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "event_id,item_id,sidx,loss\n1,1,-1,1000.0\n1,1,-2,0.0\n1,1,1,1000.0\n"
        );
    }
}
