//! Deterministic loss validation for Oasis-style catastrophe loss inputs
//!
//! This library provides:
//! - Canonicalization of source exposure and accounts files
//! - Synthetic keys and the GUL items/coverages files
//! - FM policy term, programme and cross-reference files
//! - A deterministic ground-up loss run through the ktools financial engine,
//!   compared against the insured losses it returns

pub mod canonical;
pub mod config;
pub mod error;
pub mod fanout;
pub mod fm;
pub mod gul;
pub mod keys;
pub mod ktools;
pub mod losses;
pub mod pipeline;
pub mod profiles;

// Re-export commonly used types
pub use canonical::{canonicalizer_for, Canonicalizer, CopyCanonicalizer, XsltCanonicalizer};
pub use config::{Config, InputLayout, TransformMode};
pub use error::{Error, Result};
pub use ktools::Ktools;
pub use losses::{write_comparison, LossApplicator, LossComparison};
pub use pipeline::{generate_oasis_files, OasisFiles};
pub use profiles::Profiles;
