//! Policy terms, calc rule selection and policytc id assignment

use std::collections::HashMap;

use crate::profiles::TermKind;

/// Deductible and limit
pub const CALCRULE_DEDUCTIBLE_AND_LIMIT: u32 = 1;
/// Deductible, attachment, limit and share
pub const CALCRULE_LAYER: u32 = 2;
/// Deductible only (a zero deductible passes losses through)
pub const CALCRULE_DEDUCTIBLE_ONLY: u32 = 12;
/// Limit only
pub const CALCRULE_LIMIT_ONLY: u32 = 14;

/// Financial terms applying at one (level, agg, layer)
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PolicyTerms {
    pub deductible: f64,
    pub limit: f64,
    pub attachment: f64,
    pub share: f64,
}

impl PolicyTerms {
    pub fn set(&mut self, kind: TermKind, value: f64) {
        match kind {
            TermKind::Deductible => self.deductible = value,
            TermKind::Limit => self.limit = value,
            TermKind::Attachment => self.attachment = value,
            TermKind::Share => self.share = value,
            TermKind::Tiv => {}
        }
    }

    /// Calc rule for these terms; layer rules need a layer limit
    pub fn calcrule_id(&self, is_layer: bool) -> u32 {
        if is_layer && self.limit > 0.0 {
            CALCRULE_LAYER
        } else if self.deductible > 0.0 && self.limit > 0.0 {
            CALCRULE_DEDUCTIBLE_AND_LIMIT
        } else if self.limit > 0.0 {
            CALCRULE_LIMIT_ONLY
        } else {
            CALCRULE_DEDUCTIBLE_ONLY
        }
    }
}

/// Hands out one policytc id per distinct (calc rule, terms)
#[derive(Debug, Default)]
pub struct PolicyTcRegistry {
    ids: HashMap<[u64; 5], u32>,
}

impl PolicyTcRegistry {
    pub fn id_for(&mut self, calcrule_id: u32, terms: &PolicyTerms) -> u32 {
        let key = [
            calcrule_id as u64,
            terms.deductible.to_bits(),
            terms.limit.to_bits(),
            terms.attachment.to_bits(),
            terms.share.to_bits(),
        ];
        let next = self.ids.len() as u32 + 1;
        *self.ids.entry(key).or_insert(next)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn terms(deductible: f64, limit: f64) -> PolicyTerms {
        PolicyTerms { deductible, limit, ..Default::default() }
    }

    #[test]
    fn test_calcrule_selection() {
        assert_eq!(terms(0.0, 0.0).calcrule_id(false), CALCRULE_DEDUCTIBLE_ONLY);
        assert_eq!(terms(100.0, 0.0).calcrule_id(false), CALCRULE_DEDUCTIBLE_ONLY);
        assert_eq!(terms(0.0, 500.0).calcrule_id(false), CALCRULE_LIMIT_ONLY);
        assert_eq!(terms(100.0, 500.0).calcrule_id(false), CALCRULE_DEDUCTIBLE_AND_LIMIT);
        assert_eq!(terms(100.0, 500.0).calcrule_id(true), CALCRULE_LAYER);
        assert_eq!(terms(100.0, 0.0).calcrule_id(true), CALCRULE_DEDUCTIBLE_ONLY);
    }

    #[test]
    fn test_set_ignores_tiv() {
        let mut t = PolicyTerms::default();
        t.set(TermKind::Tiv, 1000.0);
        t.set(TermKind::Share, 0.5);
        assert_eq!(t, PolicyTerms { share: 0.5, ..Default::default() });
    }

    #[test]
    fn test_registry_dedupes_terms() {
        let mut registry = PolicyTcRegistry::default();
        assert_eq!(registry.id_for(12, &terms(0.0, 0.0)), 1);
        assert_eq!(registry.id_for(1, &terms(10.0, 50.0)), 2);
        assert_eq!(registry.id_for(12, &terms(0.0, 0.0)), 1);
        assert_eq!(registry.id_for(14, &terms(0.0, 0.0)), 3);
        assert_eq!(registry.len(), 3);
    }
}
