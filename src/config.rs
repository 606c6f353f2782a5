//! File layout and runtime configuration
//!
//! Everything beyond the CLI flags is read from the environment once, with
//! defaults when a variable is unset:
//!   DETLOSS_KTOOLS_DIR, DETLOSS_XSLT_PROCESSOR, DETLOSS_TRANSFORM, DETLOSS_PROFILES_DIR

use std::env;
use std::path::{Path, PathBuf};

use log::warn;

pub const SOURCE_EXPOSURE_FILE: &str = "location.csv";
pub const SOURCE_ACCOUNTS_FILE: &str = "account.csv";
pub const EXPOSURE_MAPPING_FILE: &str = "MappingMapToOED_CanLocA.xslt";
pub const ACCOUNTS_MAPPING_FILE: &str = "MappingMapToOED_CanAccA.xslt";

pub const CANONICAL_EXPOSURE_FILE: &str = "canexp.csv";
pub const CANONICAL_ACCOUNTS_FILE: &str = "canacc.csv";
pub const KEYS_FILE: &str = "keys.csv";
pub const GULS_FILE: &str = "guls.csv";
pub const ILS_FILE: &str = "ils.csv";
pub const ILS_SNAPSHOT_FILE: &str = "ils.bin";

/// Run directory handed to `fmcalc -p`; the binary FM, items and coverages files go directly in it
pub const FM_RUN_DIR: &str = "direct";

pub const DEFAULT_XSLT_PROCESSOR: &str = "xsltproc";

/// How source files are brought into canonical form
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransformMode {
    /// Apply the mapping stylesheet with an external XSLT processor
    Xslt,
    /// Sources are already canonical; copy them through
    Copy,
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding the ktools binaries (None = resolve through PATH)
    pub ktools_dir: Option<PathBuf>,
    pub xslt_processor: PathBuf,
    pub transform: TransformMode,
    /// Directory with profile JSON files (None = built-in OED profiles)
    pub profiles_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            ktools_dir: None,
            xslt_processor: PathBuf::from(DEFAULT_XSLT_PROCESSOR),
            transform: TransformMode::Xslt,
            profiles_dir: None,
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let transform = match env::var("DETLOSS_TRANSFORM").ok().as_deref() {
            None | Some("xslt") => TransformMode::Xslt,
            Some("copy") => TransformMode::Copy,
            Some(other) => {
                warn!("Unknown DETLOSS_TRANSFORM '{}', using xslt", other);
                TransformMode::Xslt
            }
        };

        Self {
            ktools_dir: env::var_os("DETLOSS_KTOOLS_DIR").map(PathBuf::from),
            xslt_processor: env::var_os("DETLOSS_XSLT_PROCESSOR")
                .map(PathBuf::from)
                .unwrap_or(defaults.xslt_processor),
            transform,
            profiles_dir: env::var_os("DETLOSS_PROFILES_DIR").map(PathBuf::from),
        }
    }
}

/// Paths of every file the run reads or writes inside the input directory
#[derive(Debug, Clone)]
pub struct InputLayout {
    pub dir: PathBuf,
}

impl InputLayout {
    pub fn new<P: AsRef<Path>>(dir: P) -> Self {
        Self { dir: dir.as_ref().to_path_buf() }
    }

    pub fn file(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }

    pub fn source_exposure(&self) -> PathBuf {
        self.file(SOURCE_EXPOSURE_FILE)
    }

    pub fn source_accounts(&self) -> PathBuf {
        self.file(SOURCE_ACCOUNTS_FILE)
    }

    pub fn exposure_mapping(&self) -> PathBuf {
        self.file(EXPOSURE_MAPPING_FILE)
    }

    pub fn accounts_mapping(&self) -> PathBuf {
        self.file(ACCOUNTS_MAPPING_FILE)
    }

    pub fn canonical_exposure(&self) -> PathBuf {
        self.file(CANONICAL_EXPOSURE_FILE)
    }

    pub fn canonical_accounts(&self) -> PathBuf {
        self.file(CANONICAL_ACCOUNTS_FILE)
    }

    pub fn keys(&self) -> PathBuf {
        self.file(KEYS_FILE)
    }

    pub fn fm_run_dir(&self) -> PathBuf {
        self.file(FM_RUN_DIR)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths() {
        let layout = InputLayout::new("/data/run");
        assert_eq!(layout.source_exposure(), PathBuf::from("/data/run/location.csv"));
        assert_eq!(layout.canonical_accounts(), PathBuf::from("/data/run/canacc.csv"));
        assert_eq!(layout.fm_run_dir(), PathBuf::from("/data/run/direct"));
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.transform, TransformMode::Xslt);
        assert_eq!(config.xslt_processor, PathBuf::from("xsltproc"));
        assert!(config.ktools_dir.is_none());
    }
}
