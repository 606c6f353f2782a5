//! Conversion of vendor source files into canonical exposure/accounts files
//!
//! The mapping itself belongs to the transformer behind [`Canonicalizer`];
//! this module only drives it and loads the canonical result.

mod records;
mod table;
mod xslt;

pub use records::{parse_records, render_records, write_records_csv};
pub use table::{count_rows, CanonicalTable};
pub use xslt::XsltCanonicalizer;

use std::fmt;
use std::fs;
use std::path::Path;

use log::{debug, info};

use crate::config::{Config, TransformMode};
use crate::error::Result;

/// Which source file is being canonicalized
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Exposures,
    Accounts,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceKind::Exposures => write!(f, "exposures"),
            SourceKind::Accounts => write!(f, "accounts"),
        }
    }
}

/// Turns a source file into a canonical file using a mapping file
pub trait Canonicalizer {
    fn canonicalize(
        &self,
        kind: SourceKind,
        source: &Path,
        mapping: &Path,
        output: &Path,
    ) -> Result<()>;
}

/// Passes sources through unchanged, for inputs already in canonical form
#[derive(Debug, Clone, Copy, Default)]
pub struct CopyCanonicalizer;

impl Canonicalizer for CopyCanonicalizer {
    fn canonicalize(
        &self,
        kind: SourceKind,
        source: &Path,
        mapping: &Path,
        output: &Path,
    ) -> Result<()> {
        debug!("Ignoring mapping {} for {} copy", mapping.display(), kind);
        fs::copy(source, output)?;
        info!("Copied {} source {} -> {}", kind, source.display(), output.display());
        Ok(())
    }
}

/// Pick the canonicalizer the configuration asks for
pub fn canonicalizer_for(config: &Config) -> Box<dyn Canonicalizer> {
    match config.transform {
        TransformMode::Xslt => Box::new(XsltCanonicalizer::new(config.xslt_processor.clone())),
        TransformMode::Copy => Box::new(CopyCanonicalizer),
    }
}
