//! Round-trip orchestration for Cirrus objects.
//!
//! Connects the local object model in `cirrus-model` to a backend:
//! - **Codec**: operations and values to and from the JSON wire format
//! - **Transport**: one async call per request, with an HTTP implementation
//!   and a scripted mock for tests
//! - **Registry**: class-specific constructors, used for every object built
//!   locally or decoded from a response
//! - **Objects**: [`SyncedObject`] drives save, fetch and delete for one
//!   entity, allowing at most one round trip in flight
//!
//! # Failure handling
//!
//! A failed save returns its operations to the queue, merged under any
//! mutation made while the request was outstanding, so retrying is always
//! safe. A failed fetch or delete leaves the object untouched.
//!
//! # Example
//!
//! ```
//! use cirrus_sync::Backend;
//! use cirrus_sync::transport::mock::MockTransport;
//!
//! let backend = Backend::new(MockTransport::new());
//! let item = backend.object("Item").unwrap();
//! item.set("price", 10).unwrap();
//! item.increment("price", 5).unwrap();
//!
//! assert_eq!(item.get("price").and_then(|v| v.as_i64()), Some(15));
//! assert!(item.is_dirty());
//! ```

pub mod codec;
mod config;
pub mod endpoint;
mod error;
mod http;
mod object;
mod registry;
pub mod transport;

pub use config::ClientConfig;
pub use error::{SyncError, SyncResult};
pub use http::HttpTransport;
pub use object::{Backend, SaveState, SyncedObject};
pub use registry::{Constructor, ObjectRegistry};
pub use transport::{Method, Transport, TransportResponse};
