//! Document store interface.
//!
//! The store is hierarchical: collections of documents addressed by path,
//! with sub-collections nested under document ids (`teams/{id}/members`).
//! Reads are live subscriptions that push the full current result set on
//! every relevant change; dropping a subscription receiver is the
//! unsubscribe.

use api_types::DocumentId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio::sync::watch;

use crate::error::StoreError;

/// Raw document fields as held by the store.
pub type Document = serde_json::Map<String, Value>;

/// Sentinel value resolved to the store's own clock at write time.
/// Creation timestamps are therefore server-assigned and monotonic.
pub const SERVER_TIMESTAMP: &str = "$serverTimestamp";

pub fn server_timestamp() -> Value {
    Value::String(SERVER_TIMESTAMP.to_string())
}

pub fn is_server_timestamp(value: &Value) -> bool {
    matches!(value, Value::String(s) if s == SERVER_TIMESTAMP)
}

/// One document as delivered by a push: its id plus its current fields.
#[derive(Debug, Clone)]
pub struct DocumentSnapshot {
    pub id: DocumentId,
    pub fields: Document,
}

impl DocumentSnapshot {
    /// Decode the snapshot into a typed entity, injecting the document id
    /// into the `id` field.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, StoreError> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.to_string()));
        Ok(serde_json::from_value(Value::Object(fields))?)
    }
}

/// Slash-separated collection path, e.g. `users` or `teams/{id}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath(String);

impl CollectionPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Ascending,
    Descending,
}

/// Store-level sort over a named field. Applied by the store on every
/// push, never by the client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub field: String,
    pub direction: Direction,
}

/// A live query: one collection, optionally ordered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub path: CollectionPath,
    pub order_by: Option<OrderBy>,
}

impl Query {
    pub fn collection(path: CollectionPath) -> Self {
        Self {
            path,
            order_by: None,
        }
    }

    pub fn order_by(mut self, field: impl Into<String>, direction: Direction) -> Self {
        self.order_by = Some(OrderBy {
            field: field.into(),
            direction,
        });
        self
    }
}

/// Full result set of a query at one point in time.
pub type SnapshotSet = Vec<DocumentSnapshot>;

/// Live subscription over a query. The current result set is delivered as
/// the first push; each subsequent push replaces it wholesale. Pushes are
/// monotonic per subscription; there is no ordering across subscriptions.
pub type Subscription = watch::Receiver<SnapshotSet>;

/// Live subscription over a single document. `None` while the document
/// does not exist.
pub type DocSubscription = watch::Receiver<Option<DocumentSnapshot>>;

/// Narrow interface to the remote document store.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Create a document with a store-assigned id.
    async fn create(
        &self,
        collection: &CollectionPath,
        fields: Document,
    ) -> Result<DocumentId, StoreError>;

    /// Write a document at a caller-chosen id, replacing any existing one.
    async fn set(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError>;

    /// Merge partial fields into an existing document.
    async fn update(
        &self,
        collection: &CollectionPath,
        id: &DocumentId,
        fields: Document,
    ) -> Result<(), StoreError>;

    async fn delete(&self, collection: &CollectionPath, id: &DocumentId)
    -> Result<(), StoreError>;

    fn subscribe(&self, query: Query) -> Subscription;

    fn observe(&self, collection: &CollectionPath, id: &DocumentId) -> DocSubscription;
}
