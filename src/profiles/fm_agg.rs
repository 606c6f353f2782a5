//! FM aggregation profile: how items roll up through the financial levels

use serde::{Deserialize, Serialize};

/// Attribute of an item that contributes to a level's aggregation key
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AggKeyField {
    ItemId,
    Location,
    CoverageType,
    Account,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmLevel {
    pub level_id: u32,
    pub name: String,
    pub agg_key: Vec<AggKeyField>,
}

/// Ordered FM levels; the last one is the layer level
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FmAggProfile {
    pub levels: Vec<FmLevel>,
}

impl FmAggProfile {
    /// Site coverage, site all, policy layer
    pub fn default_oed() -> Self {
        use AggKeyField::*;

        Self {
            levels: vec![
                FmLevel {
                    level_id: 1,
                    name: "site coverage".to_string(),
                    agg_key: vec![Location, CoverageType],
                },
                FmLevel {
                    level_id: 2,
                    name: "site all".to_string(),
                    agg_key: vec![Location],
                },
                FmLevel {
                    level_id: 3,
                    name: "policy layer".to_string(),
                    agg_key: vec![Account],
                },
            ],
        }
    }

    pub fn layer_level(&self) -> Option<&FmLevel> {
        self.levels.last()
    }

    pub fn is_layer_level(&self, level_id: u32) -> bool {
        self.layer_level().map_or(false, |l| l.level_id == level_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_levels() {
        let profile = FmAggProfile::default_oed();
        assert_eq!(profile.levels.len(), 3);
        assert_eq!(profile.layer_level().unwrap().level_id, 3);
        assert!(profile.is_layer_level(3));
        assert!(!profile.is_layer_level(1));
    }

    #[test]
    fn test_parse_agg_key() {
        let level: FmLevel = serde_json::from_str(
            r#"{"level_id": 1, "name": "item", "agg_key": ["item_id"]}"#,
        )
        .unwrap();
        assert_eq!(level.agg_key, vec![AggKeyField::ItemId]);
    }
}
