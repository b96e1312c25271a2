//! Core type definitions for Cirrus.
//!
//! This crate defines the value-level types shared by the model and sync
//! layers:
//! - Backend date formatting and parsing (millisecond ISO-8601, UTC)
//! - Geographic points
//! - Object references (class name + server-assigned id)
//! - Access-control lists
//! - Field and class name rules
//!
//! Nothing in here performs I/O or holds shared mutable state.

mod acl;
mod date;
mod geo;
mod names;
mod object_ref;

pub use acl::{Acl, Permission, PUBLIC_KEY};
pub use date::{format_date, parse_date, DATE_FORMAT};
pub use geo::GeoPoint;
pub use names::{
    is_reserved_field, validate_class_name, validate_field_name, validate_object_id,
    RESERVED_FIELDS,
};
pub use object_ref::ObjectRef;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("invalid date: {0}")]
    InvalidDate(String),

    #[error("invalid geo point: latitude {latitude}, longitude {longitude}")]
    InvalidGeoPoint { latitude: f64, longitude: f64 },

    #[error("invalid field name: {0:?}")]
    InvalidFieldName(String),

    #[error("reserved field name: {0}")]
    ReservedField(String),

    #[error("invalid class name: {0:?}")]
    InvalidClassName(String),

    #[error("invalid object id: {0:?}")]
    InvalidObjectId(String),
}
