//! The local entry table and its publish API.

use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Updates buffered per replication session before the oldest are dropped
/// (a lagging session resyncs from a fresh snapshot).
const UPDATE_BACKLOG: usize = 256;

/// One published change, also the wire format of a replication line.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntryUpdate {
    pub key: String,
    pub value: f64,
}

pub(crate) struct Inner {
    pub(crate) entries: DashMap<String, f64>,
    pub(crate) updates: broadcast::Sender<EntryUpdate>,
    /// Robot address learned from the driver station, preferred over the
    /// team-derived one when present.
    pub(crate) ds_override: RwLock<Option<IpAddr>>,
}

/// Cheap-clone handle on the telemetry table. Safe for concurrent publishes
/// from any number of tasks without external locking.
#[derive(Clone)]
pub struct TelemetryInstance {
    pub(crate) inner: Arc<Inner>,
}

impl TelemetryInstance {
    pub fn new() -> Self {
        let (updates, _) = broadcast::channel(UPDATE_BACKLOG);
        Self {
            inner: Arc::new(Inner {
                entries: DashMap::new(),
                updates,
                ds_override: RwLock::new(None),
            }),
        }
    }

    pub fn table(&self, name: &str) -> TelemetryTable {
        TelemetryTable {
            instance: self.clone(),
            name: name.to_string(),
        }
    }

    /// Last value published at a full key path, e.g. `Vision/BLUE`.
    pub fn get_number(&self, path: &str) -> Option<f64> {
        self.inner.entries.get(path).map(|entry| *entry.value())
    }

    pub(crate) fn publish(&self, key: String, value: f64) {
        self.inner.entries.insert(key.clone(), value);
        // Replication is best-effort; with no sessions there are no
        // receivers and the send just drops.
        let _ = self.inner.updates.send(EntryUpdate { key, value });
    }

    pub(crate) fn snapshot(&self) -> Vec<EntryUpdate> {
        self.inner
            .entries
            .iter()
            .map(|entry| EntryUpdate {
                key: entry.key().clone(),
                value: *entry.value(),
            })
            .collect()
    }

    pub(crate) fn subscribe_updates(&self) -> broadcast::Receiver<EntryUpdate> {
        self.inner.updates.subscribe()
    }
}

impl Default for TelemetryInstance {
    fn default() -> Self {
        Self::new()
    }
}

/// A named table; entries live under `<table>/<key>`.
pub struct TelemetryTable {
    instance: TelemetryInstance,
    name: String,
}

impl TelemetryTable {
    pub fn entry(&self, key: &str) -> TelemetryEntry {
        TelemetryEntry {
            instance: self.instance.clone(),
            path: format!("{}/{}", self.name, key),
        }
    }
}

/// A single named slot in the table.
pub struct TelemetryEntry {
    instance: TelemetryInstance,
    path: String,
}

impl TelemetryEntry {
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn set_number(&self, value: f64) {
        self.instance.publish(self.path.clone(), value);
    }
}
