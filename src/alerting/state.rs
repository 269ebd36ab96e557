//! Memory of the last severity notified per unit and measurement
//!
//! A record exists while the pair is in an active WARN/ERROR alert. It is
//! created on the first non-INFO notification, replaced on a severity change
//! and removed on recovery to INFO.

use dashmap::DashMap;

use crate::{Severity, Unit};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AlertKey {
    pub unit: Unit,
    pub key: String,
}

impl AlertKey {
    pub fn new(unit: &Unit, key: impl Into<String>) -> Self {
        Self {
            unit: unit.clone(),
            key: key.into(),
        }
    }
}

/// Storage for alert records.
///
/// Implementations must allow concurrent use from several unit handlers.
pub trait AlertStateStore: Send + Sync {
    fn get(&self, key: &AlertKey) -> Option<Severity>;

    fn put(&self, key: AlertKey, severity: Severity);

    fn remove(&self, key: &AlertKey) -> Option<Severity>;
}

/// Sharded concurrent map; operations on different keys do not contend on
/// one global lock.
#[derive(Debug, Default)]
pub struct InMemoryAlertStore {
    records: DashMap<AlertKey, Severity>,
}

impl InMemoryAlertStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Copy of all active records
    pub fn active(&self) -> Vec<(AlertKey, Severity)> {
        self.records
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect()
    }
}

impl AlertStateStore for InMemoryAlertStore {
    fn get(&self, key: &AlertKey) -> Option<Severity> {
        self.records.get(key).map(|entry| *entry.value())
    }

    fn put(&self, key: AlertKey, severity: Severity) {
        self.records.insert(key, severity);
    }

    fn remove(&self, key: &AlertKey) -> Option<Severity> {
        self.records.remove(key).map(|(_, severity)| severity)
    }
}
