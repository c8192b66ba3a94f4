//! In-memory inventory of Jeedom entities
//!
//! A map of buckets, one per [`EntityKind`], each mapping an entity id to the
//! last record seen for it. Requesters refresh their own bucket; the event
//! requester reads the `cmd`, `eqLogic` and `jeeObject` buckets to resolve
//! human-readable names. A bucket that was never populated simply yields no
//! records.

use crate::jeedom::types::Record;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Category of controller entity, named after its Jeedom API class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EntityKind {
    Cmd,
    EqLogic,
    JeeObject,
    Plugin,
    Summary,
    System,
    Interaction,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Cmd => "cmd",
            EntityKind::EqLogic => "eqLogic",
            EntityKind::JeeObject => "jeeObject",
            EntityKind::Plugin => "plugin",
            EntityKind::Summary => "summary",
            EntityKind::System => "system",
            EntityKind::Interaction => "interactQuery",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

type Bucket = HashMap<String, Record>;

#[derive(Debug, Default)]
pub struct Inventory {
    buckets: RwLock<HashMap<EntityKind, Bucket>>,
}

impl Inventory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last known record for `id`, if the bucket holds one
    pub fn get(&self, kind: EntityKind, id: &str) -> Option<Record> {
        self.buckets
            .read()
            .get(&kind)
            .and_then(|bucket| bucket.get(id))
            .cloned()
    }

    /// Replace the whole bucket with a fresh snapshot
    pub fn put_all(&self, kind: EntityKind, records: HashMap<String, Record>) {
        self.buckets.write().insert(kind, records);
    }

    /// Overwrite one record, dropping any fields the old one had
    pub fn put(&self, kind: EntityKind, id: &str, record: Record) {
        self.buckets
            .write()
            .entry(kind)
            .or_default()
            .insert(id.to_string(), record);
    }

    /// Merge one record into the bucket; fields of `record` win
    pub fn upsert(&self, kind: EntityKind, id: &str, record: Record) {
        let mut buckets = self.buckets.write();
        let bucket = buckets.entry(kind).or_default();
        match bucket.get_mut(id) {
            Some(existing) => {
                for (field, value) in record {
                    existing.insert(field, value);
                }
            }
            None => {
                bucket.insert(id.to_string(), record);
            }
        }
    }

    pub fn len(&self, kind: EntityKind) -> usize {
        self.buckets.read().get(&kind).map_or(0, HashMap::len)
    }

    pub fn is_empty(&self, kind: EntityKind) -> bool {
        self.len(kind) == 0
    }

    /// Ids of a bucket, sorted
    pub fn ids(&self, kind: EntityKind) -> Vec<String> {
        let mut ids: Vec<String> = self
            .buckets
            .read()
            .get(&kind)
            .map(|bucket| bucket.keys().cloned().collect())
            .unwrap_or_default();
        ids.sort();
        ids
    }

    /// Sorted copy of the whole tree, for display
    pub fn snapshot(&self) -> BTreeMap<EntityKind, BTreeMap<String, Record>> {
        self.buckets
            .read()
            .iter()
            .map(|(kind, bucket)| {
                let records = bucket
                    .iter()
                    .map(|(id, record)| (id.clone(), record.clone()))
                    .collect();
                (*kind, records)
            })
            .collect()
    }
}
