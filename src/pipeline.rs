//! Generation of the Oasis input files for a validation run
//!
//! Canonical files, keys, GUL files and FM files are all written into the
//! input directory, each step reading what the previous one wrote.

use log::info;

use crate::canonical::{Canonicalizer, SourceKind};
use crate::config::InputLayout;
use crate::error::Result;
use crate::fm::{load_fm_items, write_fm_files, xref_descriptions, FmItem, XrefDescription};
use crate::gul::{load_gul_items, write_gul_files, GulItem};
use crate::keys::generate_keys_file;
use crate::profiles::Profiles;

/// Items behind the files written by [`generate_oasis_files`]
#[derive(Debug, Clone)]
pub struct OasisFiles {
    pub gul_items: Vec<GulItem>,
    pub fm_items: Vec<FmItem>,
    /// One per FM output, in output id order
    pub xref_descriptions: Vec<XrefDescription>,
}

pub fn generate_oasis_files(
    layout: &InputLayout,
    canonicalizer: &dyn Canonicalizer,
    profiles: &Profiles,
) -> Result<OasisFiles> {
    info!("Generating Oasis files in {}", layout.dir.display());

    let canexp_path = layout.canonical_exposure();
    let canacc_path = layout.canonical_accounts();
    canonicalizer.canonicalize(
        SourceKind::Exposures,
        &layout.source_exposure(),
        &layout.exposure_mapping(),
        &canexp_path,
    )?;
    canonicalizer.canonicalize(
        SourceKind::Accounts,
        &layout.source_accounts(),
        &layout.accounts_mapping(),
        &canacc_path,
    )?;

    let keys_path = layout.keys();
    generate_keys_file(&canexp_path, &keys_path)?;

    let (gul_items, canexp) = load_gul_items(&profiles.exposure, &canexp_path, &keys_path)?;
    write_gul_files(&gul_items, &layout.dir)?;
    info!("Wrote GUL files for {} items", gul_items.len());

    let (fm_items, _canacc) = load_fm_items(
        &canexp,
        &gul_items,
        &profiles.exposure,
        &profiles.accounts,
        &canacc_path,
        &profiles.fm_agg,
    )?;
    write_fm_files(&fm_items, &layout.dir)?;
    let xref_descriptions = xref_descriptions(&fm_items);
    info!("Wrote FM files with {} outputs", xref_descriptions.len());

    Ok(OasisFiles {
        gul_items,
        fm_items,
        xref_descriptions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::canonical::CopyCanonicalizer;
    use crate::error::Error;
    use std::fs;
    use std::path::Path;

    const GENERATED: [&str; 11] = [
        "canexp.csv",
        "canacc.csv",
        "keys.csv",
        "items.csv",
        "coverages.csv",
        "gulsummaryxref.csv",
        "fm_policytc.csv",
        "fm_programme.csv",
        "fm_profile.csv",
        "fm_xref.csv",
        "fmsummaryxref.csv",
    ];

    fn write_sources(dir: &Path) {
        fs::write(
            dir.join("location.csv"),
            "LocNumber,AccNumber,BuildingTIV,OtherTIV,ContentsTIV,BITIV,LocDed1Building\n\
             L1,A1,1000,100,500,50,10\n\
             L2,A1,2000,0,800,20,0\n\
             L3,A1,300,30,60,6,0\n",
        )
        .unwrap();
        fs::write(
            dir.join("account.csv"),
            "AccNumber,PolNumber,LayerAttachment,LayerLimit,LayerParticipation\nA1,P1,0,5000,1\n",
        )
        .unwrap();
    }

    #[test]
    fn test_generates_every_file() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());

        let files = generate_oasis_files(
            &InputLayout::new(dir.path()),
            &CopyCanonicalizer,
            &Profiles::default_oed(),
        )
        .unwrap();

        for name in GENERATED {
            assert!(dir.path().join(name).exists(), "{} missing", name);
        }
        assert_eq!(files.gul_items.len(), 12);
        assert_eq!(files.xref_descriptions.len(), 12);
        assert_eq!(files.fm_items.len(), 36);

        let keys = fs::read_to_string(dir.path().join("keys.csv")).unwrap();
        assert_eq!(keys.lines().count(), 13);
    }

    #[test]
    fn test_rerun_is_byte_identical() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        let layout = InputLayout::new(dir.path());
        let profiles = Profiles::default_oed();

        generate_oasis_files(&layout, &CopyCanonicalizer, &profiles).unwrap();
        let first: Vec<Vec<u8>> = GENERATED
            .iter()
            .map(|name| fs::read(dir.path().join(name)).unwrap())
            .collect();

        generate_oasis_files(&layout, &CopyCanonicalizer, &profiles).unwrap();
        for (name, before) in GENERATED.iter().zip(first) {
            assert_eq!(fs::read(dir.path().join(name)).unwrap(), before, "{} changed", name);
        }
    }

    #[test]
    fn test_missing_accounts_source() {
        let dir = tempfile::tempdir().unwrap();
        write_sources(dir.path());
        fs::remove_file(dir.path().join("account.csv")).unwrap();

        let result = generate_oasis_files(
            &InputLayout::new(dir.path()),
            &CopyCanonicalizer,
            &Profiles::default_oed(),
        );
        assert!(matches!(result, Err(Error::Io(_))));
        assert!(!dir.path().join("keys.csv").exists());
    }
}
