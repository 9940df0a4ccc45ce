// 📒 Trace Ledger - entity → trace slot, one per chart
//
// Invariants: an entity appears at most once, and no two entities share a
// slot. Entries are added when a trace is appended and forgotten when the
// trace is blanked; a reset replaces the whole ledger.

use crate::error::{DashboardError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceLedger {
    entries: BTreeMap<String, usize>,
}

impl TraceLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, entity_id: &str, trace_index: usize) -> Result<()> {
        if self.entries.contains_key(entity_id)
            || self.entries.values().any(|&i| i == trace_index)
        {
            return Err(DashboardError::LedgerConflict {
                entity: entity_id.to_string(),
                index: trace_index,
            });
        }
        self.entries.insert(entity_id.to_string(), trace_index);
        Ok(())
    }

    /// Drop an entity, returning the slot it occupied
    pub fn forget(&mut self, entity_id: &str) -> Option<usize> {
        self.entries.remove(entity_id)
    }

    pub fn index_of(&self, entity_id: &str) -> Option<usize> {
        self.entries.get(entity_id).copied()
    }

    pub fn contains(&self, entity_id: &str) -> bool {
        self.entries.contains_key(entity_id)
    }

    pub fn entities(&self) -> BTreeSet<String> {
        self.entries.keys().cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, usize)> {
        self.entries.iter().map(|(e, &i)| (e.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_and_forget() {
        let mut ledger = TraceLedger::new();
        ledger.record("Professor (II)", 0).unwrap();
        ledger.record("jane doe", 1).unwrap();

        assert_eq!(ledger.index_of("jane doe"), Some(1));
        assert_eq!(ledger.forget("Professor (II)"), Some(0));
        assert_eq!(ledger.forget("Professor (II)"), None);
        assert_eq!(ledger.len(), 1);
    }

    #[test]
    fn test_duplicate_entity_rejected() {
        let mut ledger = TraceLedger::new();
        ledger.record("a", 0).unwrap();

        let err = ledger.record("a", 4).unwrap_err();
        assert_eq!(
            err,
            DashboardError::LedgerConflict {
                entity: "a".to_string(),
                index: 4
            }
        );
    }

    #[test]
    fn test_duplicate_index_rejected() {
        let mut ledger = TraceLedger::new();
        ledger.record("a", 2).unwrap();

        assert!(ledger.record("b", 2).is_err());
        assert!(!ledger.contains("b"));
    }
}
