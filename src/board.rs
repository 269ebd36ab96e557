//! StatusBoard - latest snapshot per unit
//!
//! Each unit has a single writer: the driver reporting for that unit. A
//! publish replaces the unit's entry unless the stored snapshot is newer, so
//! a late snapshot never hides a more recent one. Writers of different units
//! never touch each other's entries.

use std::collections::HashMap;

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use tracing::trace;

use crate::{StatusSnapshot, Unit};

#[derive(Debug, Default)]
pub struct StatusBoard {
    snapshots: DashMap<Unit, StatusSnapshot>,
}

impl StatusBoard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `snapshot` as the latest of its unit.
    ///
    /// Returns `false` when a newer snapshot was already stored.
    pub fn publish(&self, snapshot: StatusSnapshot) -> bool {
        match self.snapshots.entry(snapshot.unit.clone()) {
            Entry::Occupied(mut entry) => {
                if entry.get().created_at > snapshot.created_at {
                    trace!("{}: ignoring snapshot older than the stored one", snapshot.unit);
                    return false;
                }
                entry.insert(snapshot);
            }
            Entry::Vacant(entry) => {
                entry.insert(snapshot);
            }
        }
        true
    }

    pub fn get(&self, unit: &Unit) -> Option<StatusSnapshot> {
        self.snapshots.get(unit).map(|entry| entry.value().clone())
    }

    pub fn remove(&self, unit: &Unit) -> Option<StatusSnapshot> {
        self.snapshots.remove(unit).map(|(_, snapshot)| snapshot)
    }

    /// Copy of the latest snapshot of every unit
    pub fn current(&self) -> HashMap<Unit, StatusSnapshot> {
        self.snapshots
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}
