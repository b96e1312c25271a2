//! Estimated state: the field values a caller sees.
//!
//! Computed by replaying every queued batch, oldest first, onto the last
//! confirmed server snapshot. Pure functions of their inputs.

use crate::batch::OperationBatch;
use crate::queue::OperationQueue;
use crate::value::Value;
use std::collections::BTreeMap;

/// Replays all queued operations onto `base`.
pub fn materialize(base: &BTreeMap<String, Value>, queue: &OperationQueue) -> BTreeMap<String, Value> {
    let mut state = base.clone();
    for batch in queue.batches() {
        apply_batch(&mut state, batch);
    }
    state
}

/// Estimates a single field without materializing the rest.
pub fn estimate_field(
    base: &BTreeMap<String, Value>,
    queue: &OperationQueue,
    field: &str,
) -> Option<Value> {
    let mut value = base.get(field).cloned();
    for batch in queue.batches() {
        if let Some(operation) = batch.get(field) {
            value = operation.apply(value.as_ref());
        }
    }
    value
}

/// Applies one batch in place.
pub fn apply_batch(state: &mut BTreeMap<String, Value>, batch: &OperationBatch) {
    for (field, operation) in batch.iter() {
        match operation.apply(state.get(field)) {
            Some(value) => {
                state.insert(field.to_string(), value);
            }
            None => {
                state.remove(field);
            }
        }
    }
}
