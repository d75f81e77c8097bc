//! Helpers shared by the live-projection workers.

use remote::{DocumentSnapshot, DocumentStore, Shape, Subscription};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Decode a pushed result set into typed entities.
///
/// A document that fails to decode is skipped with a warning; one bad
/// document must never stop the rest of the push from being delivered.
pub fn decode_set<T: DeserializeOwned>(snapshots: &[DocumentSnapshot]) -> Vec<T> {
    snapshots
        .iter()
        .filter_map(|snapshot| match snapshot.deserialize() {
            Ok(entity) => Some(entity),
            Err(err) => {
                tracing::warn!(id = %snapshot.id, %err, "skipping undecodable document");
                None
            }
        })
        .collect()
}

/// Open a live subscription for a typed shape.
pub fn subscribe_shape<T>(store: &dyn DocumentStore, shape: &Shape<T>) -> Subscription {
    store.subscribe(shape.query().clone())
}

/// Extract the field map from a `json!` object literal.
pub(crate) fn fields_of(value: Value) -> remote::Document {
    match value {
        Value::Object(map) => map,
        _ => remote::Document::new(),
    }
}
