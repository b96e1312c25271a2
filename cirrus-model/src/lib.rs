//! Local object model for Cirrus.
//!
//! Defines how a single remote record is represented and mutated locally:
//! - [`Value`]: the local field value model (primitives, dates, geo points,
//!   nested maps, object references, relation markers)
//! - [`Operation`]: one pending field mutation, with deterministic composition
//! - [`OperationBatch`] / [`OperationQueue`]: mutations accumulated per round
//!   trip, with at most one batch in flight
//! - [`materialize`]: the estimated state, replayed from the base snapshot
//! - [`Entity`]: identity, base snapshot, queue and server-managed metadata
//!
//! Nothing here performs I/O. The sync layer drives round trips and feeds
//! server responses back in as [`ServerSnapshot`]s.

mod batch;
mod entity;
mod error;
mod estimate;
mod operation;
mod queue;
mod value;

pub use batch::OperationBatch;
pub use entity::{Entity, ServerSnapshot};
pub use error::{ModelError, ModelResult};
pub use estimate::{apply_batch, estimate_field, materialize};
pub use operation::Operation;
pub use queue::OperationQueue;
pub use value::Value;

pub use cirrus_types::{Acl, GeoPoint, ObjectRef};
