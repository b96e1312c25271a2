//! Per-entity operation queue.
//!
//! The queue has two slots: the *current* batch that accepts new writes, and
//! at most one *in-flight* batch captured by a round trip that has not
//! resolved yet. Callers keep mutating the current batch while a request is
//! outstanding without touching what was sent.

use crate::batch::OperationBatch;
use crate::error::{ModelError, ModelResult};
use crate::operation::Operation;
use tracing::warn;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationQueue {
    in_flight: Option<OperationBatch>,
    current: OperationBatch,
}

impl OperationQueue {
    /// Creates a queue holding a single empty batch.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The batch accepting new writes.
    pub fn current(&self) -> &OperationBatch {
        &self.current
    }

    /// The batch captured by the outstanding round trip, if any.
    pub fn in_flight(&self) -> Option<&OperationBatch> {
        self.in_flight.as_ref()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Returns true if nothing is queued or in flight.
    pub fn is_empty(&self) -> bool {
        self.in_flight.is_none() && self.current.is_empty()
    }

    /// Number of batches held (1 or 2).
    pub fn len(&self) -> usize {
        1 + usize::from(self.in_flight.is_some())
    }

    /// Batches oldest first.
    pub fn batches(&self) -> impl Iterator<Item = &OperationBatch> {
        self.in_flight.iter().chain(std::iter::once(&self.current))
    }

    /// The operation pending in the current batch for `field`.
    pub fn pending_operation(&self, field: &str) -> Option<&Operation> {
        self.current.get(field)
    }

    /// Merges `operation` into the current batch under `field`.
    ///
    /// Fails without modifying the queue if the operation cannot be combined
    /// with what is already queued for the field, either in the current
    /// batch or, after a failed round trip, with the in-flight batch.
    pub fn record_operation(&mut self, field: &str, operation: Operation) -> ModelResult<()> {
        let merged = match self.current.get(field) {
            Some(previous) => {
                let next = operation.kind();
                Operation::compose(previous, operation)
                    .ok_or_else(|| incompatible(field, previous.kind(), next))?
            }
            None => operation,
        };

        if let Some(sent) = self.in_flight.as_ref().and_then(|b| b.get(field)) {
            if Operation::compose(sent, merged.clone()).is_none() {
                return Err(incompatible(field, sent.kind(), merged.kind()));
            }
        }

        self.current.insert(field, merged);
        Ok(())
    }

    /// Captures the batch to send.
    ///
    /// With nothing in flight, the current batch becomes the in-flight one
    /// and a fresh empty batch takes its place. If a round trip is already
    /// outstanding its batch is returned again and nothing new is created.
    /// The returned batch is a snapshot; the queue keeps its own copy.
    pub fn begin_round_trip(&mut self) -> OperationBatch {
        if let Some(sent) = &self.in_flight {
            return sent.clone();
        }
        let sent = std::mem::take(&mut self.current);
        self.in_flight = Some(sent.clone());
        sent
    }

    /// Drops the in-flight batch after its response has been applied.
    pub fn commit_round_trip(&mut self) -> Option<OperationBatch> {
        self.in_flight.take()
    }

    /// Folds a failed round trip's batch back into the queue.
    ///
    /// `sent`'s operations go first, followed by everything recorded since
    /// the round trip began; the two batches collapse into one.
    pub fn merge_back(&mut self, sent: OperationBatch) {
        self.in_flight = None;
        let later = std::mem::take(&mut self.current);
        let mut merged = sent;
        for (field, operation) in later {
            let combined = match merged.get(&field) {
                Some(earlier) => match Operation::compose(earlier, operation.clone()) {
                    Some(combined) => combined,
                    None => {
                        // record_operation checks against the in-flight batch
                        warn!(field = %field, "dropping unmergeable earlier operation");
                        operation
                    }
                },
                None => operation,
            };
            merged.insert(field, combined);
        }
        self.current = merged;
    }

    /// Clears everything back to a single empty batch.
    pub fn reset(&mut self) {
        self.in_flight = None;
        self.current = OperationBatch::new();
    }
}

fn incompatible(field: &str, previous: &'static str, next: &'static str) -> ModelError {
    ModelError::IncompatibleOperation {
        field: field.to_string(),
        previous,
        next,
    }
}
