//! Canonical exposure/accounts profiles and the FM aggregation profile
//!
//! Profiles describe which canonical columns hold TIVs and financial terms,
//! and how items aggregate through the FM levels.

mod exposure;
mod fm_agg;

pub use exposure::{AccountsProfile, ExposureProfile, ProfileField, TermKind};
pub use fm_agg::{AggKeyField, FmAggProfile, FmLevel};

use std::fs::File;
use std::path::Path;

use log::info;
use serde::de::DeserializeOwned;

use crate::error::Result;

pub const EXPOSURE_PROFILE_FILE: &str = "canexp_profile.json";
pub const ACCOUNTS_PROFILE_FILE: &str = "canacc_profile.json";
pub const FM_AGG_PROFILE_FILE: &str = "fm_agg_profile.json";

/// Container for the three profiles a run needs
#[derive(Debug, Clone)]
pub struct Profiles {
    pub exposure: ExposureProfile,
    pub accounts: AccountsProfile,
    pub fm_agg: FmAggProfile,
}

impl Profiles {
    /// Built-in profiles for OED location and account files
    pub fn default_oed() -> Self {
        Self {
            exposure: ExposureProfile::default_oed(),
            accounts: AccountsProfile::default_oed(),
            fm_agg: FmAggProfile::default_oed(),
        }
    }

    /// Load profiles from JSON files in a directory
    pub fn from_json_dir(dir: &Path) -> Result<Self> {
        info!("Loading profiles from {}", dir.display());
        Ok(Self {
            exposure: load_json(&dir.join(EXPOSURE_PROFILE_FILE))?,
            accounts: load_json(&dir.join(ACCOUNTS_PROFILE_FILE))?,
            fm_agg: load_json(&dir.join(FM_AGG_PROFILE_FILE))?,
        })
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(file)?)
}
