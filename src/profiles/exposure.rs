//! Canonical exposure and accounts profiles

use serde::{Deserialize, Serialize};

/// Role a canonical column plays in item/FM derivation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TermKind {
    /// Total insured value for one coverage type
    Tiv,
    Deductible,
    Limit,
    /// Layer attachment point
    Attachment,
    /// Layer participation
    Share,
}

/// One profiled column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProfileField {
    /// Canonical column name (matched case-insensitively)
    pub column: String,

    pub kind: TermKind,

    /// Coverage type the column applies to; None = all coverage types
    #[serde(default)]
    pub coverage_type_id: Option<u8>,

    /// FM level whose terms this column feeds
    pub fm_level_id: u32,
}

impl ProfileField {
    fn new(column: &str, kind: TermKind, coverage_type_id: Option<u8>, fm_level_id: u32) -> Self {
        Self {
            column: column.to_string(),
            kind,
            coverage_type_id,
            fm_level_id,
        }
    }

    /// Whether the field applies to the given level and coverage type
    pub fn applies_to(&self, level_id: u32, coverage_type_id: u8) -> bool {
        self.fm_level_id == level_id
            && self.coverage_type_id.map_or(true, |c| c == coverage_type_id)
    }
}

/// Profile of the canonical exposure (location) file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExposureProfile {
    /// Location identifier column
    pub location_column: String,

    /// Column linking a location to its account
    pub account_column: String,

    pub fields: Vec<ProfileField>,
}

impl ExposureProfile {
    /// OED location columns: per-coverage TIVs and terms at level 1, site terms at level 2
    pub fn default_oed() -> Self {
        use TermKind::*;

        let per_coverage = [
            (1, "buildingtiv", "locded1building", "loclimit1building"),
            (2, "othertiv", "locded2other", "loclimit2other"),
            (3, "contentstiv", "locded3contents", "loclimit3contents"),
            (4, "bitiv", "locded4bi", "loclimit4bi"),
        ];

        let mut fields = Vec::new();
        for (coverage_type_id, tiv, ded, limit) in per_coverage {
            fields.push(ProfileField::new(tiv, Tiv, Some(coverage_type_id), 1));
            fields.push(ProfileField::new(ded, Deductible, Some(coverage_type_id), 1));
            fields.push(ProfileField::new(limit, Limit, Some(coverage_type_id), 1));
        }
        fields.push(ProfileField::new("locded6all", Deductible, None, 2));
        fields.push(ProfileField::new("loclimit6all", Limit, None, 2));

        Self {
            location_column: "locnumber".to_string(),
            account_column: "accnumber".to_string(),
            fields,
        }
    }

    /// TIV column for a coverage type
    pub fn tiv_field(&self, coverage_type_id: u8) -> Option<&ProfileField> {
        self.fields
            .iter()
            .find(|f| f.kind == TermKind::Tiv && f.coverage_type_id == Some(coverage_type_id))
    }

    /// Financial term fields (everything but TIVs)
    pub fn term_fields(&self) -> impl Iterator<Item = &ProfileField> {
        self.fields.iter().filter(|f| f.kind != TermKind::Tiv)
    }
}

/// Profile of the canonical accounts file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountsProfile {
    pub account_column: String,
    pub policy_column: String,
    pub fields: Vec<ProfileField>,
}

impl AccountsProfile {
    /// OED account columns: policy deductible and layer terms on the layer level
    pub fn default_oed() -> Self {
        use TermKind::*;

        Self {
            account_column: "accnumber".to_string(),
            policy_column: "polnumber".to_string(),
            fields: vec![
                ProfileField::new("polded6all", Deductible, None, 3),
                ProfileField::new("layerattachment", Attachment, None, 3),
                ProfileField::new("layerlimit", Limit, None, 3),
                ProfileField::new("layerparticipation", Share, None, 3),
            ],
        }
    }
}
