//! Apply a deterministic loss to every item and compare ground-up vs insured losses
//!
//! Ground-up losses are a fixed percentage of each item's TIV. They are run
//! through the financial engine and the insured losses it returns are joined
//! back to the ground-up losses through the FM cross-reference descriptions.

mod records;

pub use records::{
    load_ils, load_items_with_tiv, synthesize_guls, write_guls, GulRecord, IlRecord, ItemTiv,
    EVENT_ID, MEAN_SIDX, SAMPLE_SIDX, STD_DEV_SIDX,
};

use std::collections::HashMap;
use std::path::Path;

use csv::Writer;
use log::info;
use serde::{Deserialize, Serialize};

use crate::config::{FM_RUN_DIR, GULS_FILE, ILS_FILE, ILS_SNAPSHOT_FILE};
use crate::error::Result;
use crate::fm::XrefDescription;
use crate::gul::GulFile;
use crate::ktools::{FmRun, Ktools, ALLOCATE_TO_ITEMS_BY_PREVIOUS_LEVEL_ALLOC_ID};

/// Ground-up and insured loss of one FM output
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LossComparison {
    pub xref_id: u32,
    pub layer_id: u32,
    pub accnumber: String,
    pub polnumber: String,
    pub locnumber: String,
    pub coverage_type_id: u8,
    pub tiv: f64,
    pub loss_gul: f64,
    pub loss_il: f64,
}

/// Runs the deterministic loss through the financial engine
#[derive(Debug, Clone)]
pub struct LossApplicator {
    ktools: Ktools,
    alloc_rule: u32,
}

impl LossApplicator {
    pub fn new(ktools: Ktools) -> Self {
        Self {
            ktools,
            alloc_rule: ALLOCATE_TO_ITEMS_BY_PREVIOUS_LEVEL_ALLOC_ID,
        }
    }

    pub fn with_alloc_rule(mut self, alloc_rule: u32) -> Self {
        self.alloc_rule = alloc_rule;
        self
    }

    /// Apply `loss_percentage_of_tiv` of TIV to every item in `input_dir`
    ///
    /// `input_dir` must hold the GUL and FM files; `xref_descriptions`
    /// describe the FM outputs those files define.
    pub fn apply_fm(
        &self,
        input_dir: &Path,
        xref_descriptions: &[XrefDescription],
        loss_percentage_of_tiv: f64,
        net: bool,
    ) -> Result<Vec<LossComparison>> {
        let items = load_items_with_tiv(
            &input_dir.join(GulFile::Items.file_name()),
            &input_dir.join(GulFile::Coverages.file_name()),
        )?;
        let guls = synthesize_guls(&items, loss_percentage_of_tiv);
        let guls_path = input_dir.join(GULS_FILE);
        write_guls(&guls, &guls_path)?;
        info!(
            "Wrote {} GUL records for {} items at {} x TIV",
            guls.len(),
            items.len(),
            loss_percentage_of_tiv
        );

        let run_dir = input_dir.join(FM_RUN_DIR);
        self.ktools.convert_fm_inputs(input_dir, &run_dir)?;

        let ils_path = input_dir.join(ILS_FILE);
        self.ktools.run_fm_pipeline(&FmRun {
            guls: &guls_path,
            run_dir: &run_dir,
            snapshot: &input_dir.join(ILS_SNAPSHOT_FILE),
            output: &ils_path,
            net,
            alloc_rule: self.alloc_rule,
        })?;

        let ils = load_ils(&ils_path)?;
        let comparison = compare_losses(&guls, &ils, xref_descriptions);
        info!("Compared {} outputs", comparison.len());
        Ok(comparison)
    }
}

/// Join sample losses: GUL on item, IL on output id
pub fn compare_losses(
    guls: &[GulRecord],
    ils: &[IlRecord],
    xref_descriptions: &[XrefDescription],
) -> Vec<LossComparison> {
    let gul_by_item: HashMap<u32, f64> = guls
        .iter()
        .filter(|g| g.sidx == SAMPLE_SIDX)
        .map(|g| (g.item_id, g.loss))
        .collect();
    let il_by_output: HashMap<u32, f64> = ils
        .iter()
        .filter(|il| il.sidx == SAMPLE_SIDX)
        .map(|il| (il.output_id, il.loss))
        .collect();

    xref_descriptions
        .iter()
        .filter_map(|d| {
            let loss_gul = *gul_by_item.get(&d.item_id)?;
            let loss_il = *il_by_output.get(&d.xref_id)?;
            Some(LossComparison {
                xref_id: d.xref_id,
                layer_id: d.layer_id,
                accnumber: d.accnumber.clone(),
                polnumber: d.polnumber.clone(),
                locnumber: d.locnumber.clone(),
                coverage_type_id: d.coverage_type_id,
                tiv: d.tiv,
                loss_gul,
                loss_il,
            })
        })
        .collect()
}

pub fn write_comparison(rows: &[LossComparison], path: &Path) -> Result<()> {
    let mut writer = Writer::from_path(path)?;
    for row in rows {
        writer.serialize(row)?;
    }
    writer.flush()?;
    Ok(())
}
