//! Static worker registry built from configuration.

use std::collections::BTreeMap;

use crate::domain::models::{WorkerEntry, WorkersConfig};
use crate::domain::ports::WorkerRegistry;

/// Read-only worker catalogue. Registration order is preserved.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticWorkerRegistry {
    entries: Vec<WorkerEntry>,
}

impl StaticWorkerRegistry {
    /// Later duplicates of a name are ignored.
    pub fn new(entries: Vec<WorkerEntry>) -> Self {
        let mut unique: Vec<WorkerEntry> = Vec::with_capacity(entries.len());
        for entry in entries {
            if !unique.iter().any(|e| e.name == entry.name) {
                unique.push(entry);
            }
        }
        Self { entries: unique }
    }

    pub fn from_config(config: &WorkersConfig) -> Self {
        Self::new(config.registry.clone())
    }

    pub fn entries(&self) -> &[WorkerEntry] {
        &self.entries
    }

    pub fn description(&self, worker: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|e| e.name == worker)
            .map(|e| e.description.as_str())
    }
}

impl WorkerRegistry for StaticWorkerRegistry {
    fn list_workers(&self) -> BTreeMap<String, String> {
        self.entries
            .iter()
            .map(|e| (e.name.clone(), e.description.clone()))
            .collect()
    }

    fn worker_names(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.name.clone()).collect()
    }

    fn contains(&self, worker: &str) -> bool {
        self.entries.iter().any(|e| e.name == worker)
    }

    fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registration_order_and_duplicates() {
        let registry = StaticWorkerRegistry::new(vec![
            WorkerEntry::new("Writer", "writes"),
            WorkerEntry::new("Analyst", "crunches"),
            WorkerEntry::new("Writer", "shadowed"),
        ]);

        assert_eq!(registry.worker_names(), vec!["Writer", "Analyst"]);
        assert_eq!(registry.description("Writer"), Some("writes"));
        assert!(registry.contains("Analyst"));
        assert!(!registry.contains("analyst"));
        assert_eq!(registry.list_workers().len(), 2);
    }

    #[test]
    fn test_default_is_empty() {
        assert!(StaticWorkerRegistry::default().is_empty());
    }
}
