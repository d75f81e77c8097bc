//! In-memory document store with push-based live subscriptions.

use std::{cmp::Ordering, collections::BTreeMap, sync::Mutex};

use api_types::DocumentId;
use async_trait::async_trait;
use chrono::{DateTime, Duration, SecondsFormat, Utc};
use remote::{
    CollectionPath, Direction, DocSubscription, Document, DocumentSnapshot, DocumentStore, Query,
    SnapshotSet, StoreError, Subscription, is_server_timestamp,
};
use serde_json::Value;
use tokio::sync::watch;

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<StoreInner>,
}

#[derive(Default)]
struct StoreInner {
    collections: BTreeMap<String, BTreeMap<DocumentId, Document>>,
    query_watchers: Vec<QueryWatcher>,
    doc_watchers: Vec<DocWatcher>,
    clock: Option<DateTime<Utc>>,
}

struct QueryWatcher {
    query: Query,
    tx: watch::Sender<SnapshotSet>,
}

struct DocWatcher {
    path: String,
    id: DocumentId,
    tx: watch::Sender<Option<DocumentSnapshot>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StoreInner {
    /// Server clock: strictly increasing across writes, so creation-time
    /// ordering has no ties.
    fn next_timestamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let ts = match self.clock {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.clock = Some(ts);
        ts
    }

    fn resolve_sentinels(&mut self, fields: &mut Document) {
        let sentinel_keys: Vec<String> = fields
            .iter()
            .filter(|(_, v)| is_server_timestamp(v))
            .map(|(k, _)| k.clone())
            .collect();
        if sentinel_keys.is_empty() {
            return;
        }
        // Fixed-precision RFC 3339 keeps lexicographic and chronological
        // order in agreement.
        let stamp = self
            .next_timestamp()
            .to_rfc3339_opts(SecondsFormat::Micros, true);
        for key in sentinel_keys {
            fields.insert(key, Value::String(stamp.clone()));
        }
    }

    fn evaluate(&self, query: &Query) -> SnapshotSet {
        let Some(documents) = self.collections.get(query.path.as_str()) else {
            return Vec::new();
        };
        let mut snapshots: SnapshotSet = documents
            .iter()
            .map(|(id, fields)| DocumentSnapshot {
                id: id.clone(),
                fields: fields.clone(),
            })
            .collect();
        if let Some(order) = &query.order_by {
            snapshots.sort_by(|a, b| {
                let av = a.fields.get(&order.field).unwrap_or(&Value::Null);
                let bv = b.fields.get(&order.field).unwrap_or(&Value::Null);
                let ord = compare_values(av, bv);
                match order.direction {
                    Direction::Ascending => ord,
                    Direction::Descending => ord.reverse(),
                }
            });
        }
        snapshots
    }

    /// Re-evaluate and push to every watcher touching `path`. Watchers whose
    /// receivers were dropped are pruned here, which is what makes dropping
    /// a subscription the unsubscribe.
    fn notify(&mut self, path: &str) {
        self.query_watchers.retain(|w| !w.tx.is_closed());
        self.doc_watchers.retain(|w| !w.tx.is_closed());

        let pushes: Vec<(usize, SnapshotSet)> = self
            .query_watchers
            .iter()
            .enumerate()
            .filter(|(_, w)| w.query.path.as_str() == path)
            .map(|(i, w)| (i, self.evaluate(&w.query)))
            .collect();
        for (i, set) in pushes {
            self.query_watchers[i].tx.send_replace(set);
        }

        let docs = self.collections.get(path);
        for watcher in self.doc_watchers.iter().filter(|w| w.path == path) {
            let snapshot = docs
                .and_then(|d| d.get(&watcher.id))
                .map(|fields| DocumentSnapshot {
                    id: watcher.id.clone(),
                    fields: fields.clone(),
                });
            watcher.tx.send_replace(snapshot);
        }
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Null, Value::Null) => Ordering::Equal,
        (Value::Null, _) => Ordering::Less,
        (_, Value::Null) => Ordering::Greater,
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Number(a), Value::Number(b)) => a
            .as_f64()
            .unwrap_or(0.0)
            .total_cmp(&b.as_f64().unwrap_or(0.0)),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => Ordering::Equal,
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(
        &self,
        collection: &CollectionPath,
        mut fields: Document,
    ) -> Result<DocumentId, StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.resolve_sentinels(&mut fields);
        let id = DocumentId::generate();
        inner
            .collections
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(id.clone(), fields);
        inner.notify(collection.as_str());
        tracing::debug!(collection = %collection, id = %id, "document created");
        Ok(id)
    }

    async fn set(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        mut fields: Document,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.resolve_sentinels(&mut fields);
        inner
            .collections
            .entry(collection.as_str().to_string())
            .or_default()
            .insert(id.clone(), fields);
        inner.notify(collection.as_str());
        Ok(())
    }

    async fn update(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        mut fields: Document,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.resolve_sentinels(&mut fields);
        let existing = inner
            .collections
            .get_mut(collection.as_str())
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| StoreError::NotFound(format!("{collection}/{id}")))?;
        existing.extend(fields);
        inner.notify(collection.as_str());
        Ok(())
    }

    async fn delete(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
    ) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let removed = inner
            .collections
            .get_mut(collection.as_str())
            .and_then(|docs| docs.remove(id));
        if removed.is_some() {
            inner.notify(collection.as_str());
        }
        Ok(())
    }

    fn subscribe(&self, query: Query) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let initial = inner.evaluate(&query);
        let (tx, mut rx) = watch::channel(initial);
        inner.query_watchers.push(QueryWatcher { query, tx });
        // Prime the receiver so the current result set arrives as the first push.
        rx.mark_changed();
        rx
    }

    fn observe(&self, collection: &CollectionPath, id: &DocumentId) -> DocSubscription {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let initial = inner
            .collections
            .get(collection.as_str())
            .and_then(|docs| docs.get(id))
            .map(|fields| DocumentSnapshot {
                id: id.clone(),
                fields: fields.clone(),
            });
        let (tx, mut rx) = watch::channel(initial);
        inner.doc_watchers.push(DocWatcher {
            path: collection.as_str().to_string(),
            id: id.clone(),
            tx,
        });
        rx.mark_changed();
        rx
    }
}
