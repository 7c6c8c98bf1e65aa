// # In-Flight Tracker
//
// In-memory set of record sets currently being reconciled.
//
// ## Purpose
//
// Ticks dispatch passes without waiting for earlier ones, so a slow pass for
// a record set can still be running when the next tick reaches the same
// record set. Two such passes would publish competing writes for one name.
// The tracker lets the zone reconciler skip a record set while a pass for it
// is outstanding.
//
// ## Crash Behavior
//
// Nothing is persisted. A restart starts with an empty set and abandons every
// in-flight pass.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Utc};

use crate::model::RecordSetKey;

/// Tracks record sets with an outstanding reconciliation pass
///
/// Cloning shares the underlying set.
#[derive(Debug, Clone, Default)]
pub struct InFlightTracker {
    inner: Arc<Mutex<HashMap<RecordSetKey, DateTime<Utc>>>>,
}

impl InFlightTracker {
    /// Create a new empty tracker
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a record set as in flight
    ///
    /// Returns `Err` with the start time of the existing pass when the record
    /// set is already marked. The marker is released when the returned guard
    /// is dropped, including during a panic unwind.
    pub fn try_acquire(&self, key: RecordSetKey) -> Result<InFlightGuard, DateTime<Utc>> {
        let mut set = self.lock();
        if let Some(started) = set.get(&key) {
            return Err(*started);
        }

        set.insert(key.clone(), Utc::now());
        Ok(InFlightGuard {
            key,
            tracker: self.clone(),
        })
    }

    /// Whether a record set is currently marked
    pub fn contains(&self, key: &RecordSetKey) -> bool {
        self.lock().contains_key(key)
    }

    /// Number of record sets in flight
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Check if nothing is in flight
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn release(&self, key: &RecordSetKey) {
        self.lock().remove(key);
    }

    // The map holds plain data, so a poisoned lock is still consistent
    fn lock(&self) -> MutexGuard<'_, HashMap<RecordSetKey, DateTime<Utc>>> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Marker for one in-flight pass; releases the record set on drop
#[derive(Debug)]
pub struct InFlightGuard {
    key: RecordSetKey,
    tracker: InFlightTracker,
}

impl InFlightGuard {
    pub fn key(&self) -> &RecordSetKey {
        &self.key
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.tracker.release(&self.key);
    }
}
