//! Financial module (FM) items and files
//!
//! Every GUL item gets one FM item per aggregation level. Levels below the
//! layer level carry layer 1 only; the layer level carries one layer per
//! accounts row of the item's account. Aggregation ids are dense per level in
//! first-appearance order of the level's key.

mod files;
mod terms;

pub use files::{
    layer_outputs, policytc_rows, profile_rows, programme_rows, write_fm_files, xref_rows,
    FmFile, FmPolicyTcRow, FmProfileRow, FmProgrammeRow, FmSummaryXrefRow, FmXrefRow,
};
pub use terms::{PolicyTcRegistry, PolicyTerms};

use std::collections::HashMap;
use std::path::Path;

use log::info;
use serde::{Deserialize, Serialize};

use crate::canonical::CanonicalTable;
use crate::error::{Error, Result};
use crate::gul::GulItem;
use crate::profiles::{AccountsProfile, AggKeyField, ExposureProfile, FmAggProfile};

#[derive(Debug, Clone, PartialEq)]
pub struct FmItem {
    /// GUL item this FM item derives from
    pub item_id: u32,
    pub level_id: u32,
    pub layer_id: u32,
    pub agg_id: u32,
    pub policytc_id: u32,
    pub calcrule_id: u32,
    pub terms: PolicyTerms,
    pub location: String,
    pub account: String,
    pub policy: String,
    pub coverage_type_id: u8,
    pub tiv: f64,
}

/// Descriptive attributes of one FM output, keyed by its output id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct XrefDescription {
    /// Output id in fm_xref.csv (and in the financial engine's output)
    pub xref_id: u32,
    pub item_id: u32,
    pub layer_id: u32,
    pub accnumber: String,
    pub polnumber: String,
    pub locnumber: String,
    pub coverage_type_id: u8,
    pub tiv: f64,
}

/// Load the canonical accounts file and build FM items for the GUL items
pub fn load_fm_items(
    canexp: &CanonicalTable,
    gul_items: &[GulItem],
    exposure_profile: &ExposureProfile,
    accounts_profile: &AccountsProfile,
    canacc_path: &Path,
    fm_agg_profile: &FmAggProfile,
) -> Result<(Vec<FmItem>, CanonicalTable)> {
    let canacc = CanonicalTable::load(canacc_path)?;
    let fm_items = build_fm_items(
        canexp,
        gul_items,
        exposure_profile,
        &canacc,
        accounts_profile,
        fm_agg_profile,
    )?;
    info!(
        "Built {} FM items over {} levels from {} accounts rows",
        fm_items.len(),
        fm_agg_profile.levels.len(),
        canacc.len()
    );
    Ok((fm_items, canacc))
}

pub fn build_fm_items(
    canexp: &CanonicalTable,
    gul_items: &[GulItem],
    exposure_profile: &ExposureProfile,
    canacc: &CanonicalTable,
    accounts_profile: &AccountsProfile,
    fm_agg_profile: &FmAggProfile,
) -> Result<Vec<FmItem>> {
    let account_col = canacc.require_column(&accounts_profile.account_column)?;
    let policy_col = canacc.require_column(&accounts_profile.policy_column)?;

    let mut layers_by_account: HashMap<&str, Vec<usize>> = HashMap::new();
    for row in 0..canacc.len() {
        layers_by_account
            .entry(canacc.value(row, account_col))
            .or_default()
            .push(row);
    }

    let mut item_layers: Vec<&[usize]> = Vec::with_capacity(gul_items.len());
    for item in gul_items {
        let rows = layers_by_account
            .get(item.account.as_str())
            .ok_or_else(|| Error::MissingAccount { account: item.account.clone() })?;
        item_layers.push(rows);
    }

    let mut registry = PolicyTcRegistry::default();
    let mut fm_items = Vec::new();

    for level in &fm_agg_profile.levels {
        let is_layer = fm_agg_profile.is_layer_level(level.level_id);
        let mut agg_ids: HashMap<Vec<String>, u32> = HashMap::new();

        for (item, &rows) in gul_items.iter().zip(&item_layers) {
            let next = agg_ids.len() as u32 + 1;
            let agg_id = *agg_ids.entry(agg_key(&level.agg_key, item)).or_insert(next);

            let layer_rows = if is_layer { rows } else { &rows[..1] };
            for (layer_idx, &acc_row) in layer_rows.iter().enumerate() {
                let mut terms = PolicyTerms::default();
                for field in exposure_profile
                    .term_fields()
                    .filter(|f| f.applies_to(level.level_id, item.coverage_type_id))
                {
                    terms.set(field.kind, canexp.optional_number(item.loc_idx, &field.column)?);
                }
                for field in accounts_profile
                    .fields
                    .iter()
                    .filter(|f| f.applies_to(level.level_id, item.coverage_type_id))
                {
                    terms.set(field.kind, canacc.optional_number(acc_row, &field.column)?);
                }
                // absent participation means the layer is fully taken
                if is_layer && terms.share == 0.0 {
                    terms.share = 1.0;
                }

                let calcrule_id = terms.calcrule_id(is_layer);
                let policytc_id = registry.id_for(calcrule_id, &terms);

                fm_items.push(FmItem {
                    item_id: item.item_id,
                    level_id: level.level_id,
                    layer_id: layer_idx as u32 + 1,
                    agg_id,
                    policytc_id,
                    calcrule_id,
                    terms,
                    location: item.location.clone(),
                    account: item.account.clone(),
                    policy: canacc.value(acc_row, policy_col).to_string(),
                    coverage_type_id: item.coverage_type_id,
                    tiv: item.tiv,
                });
            }
        }
    }

    Ok(fm_items)
}

fn agg_key(fields: &[AggKeyField], item: &GulItem) -> Vec<String> {
    fields
        .iter()
        .map(|field| match field {
            AggKeyField::ItemId => item.item_id.to_string(),
            AggKeyField::Location => item.loc_idx.to_string(),
            AggKeyField::CoverageType => item.coverage_type_id.to_string(),
            AggKeyField::Account => item.account.clone(),
        })
        .collect()
}

/// Descriptions for every FM output, in output id order
pub fn xref_descriptions(fm_items: &[FmItem]) -> Vec<XrefDescription> {
    layer_outputs(fm_items)
        .into_iter()
        .enumerate()
        .map(|(i, item)| XrefDescription {
            xref_id: i as u32 + 1,
            item_id: item.item_id,
            layer_id: item.layer_id,
            accnumber: item.account.clone(),
            polnumber: item.policy.clone(),
            locnumber: item.location.clone(),
            coverage_type_id: item.coverage_type_id,
            tiv: item.tiv,
        })
        .collect()
}
