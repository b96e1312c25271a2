//! Naming rules for classes and fields.

use crate::{Error, Result};

/// Fields managed by the server. Callers cannot write them directly.
pub const RESERVED_FIELDS: &[&str] = &[
    "objectId",
    "createDate",
    "updateDate",
    "createdAt",
    "updatedAt",
    "acl",
];

/// Returns true if `name` is a server-managed field.
#[must_use]
pub fn is_reserved_field(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Checks that `name` is usable as a caller-writable field.
pub fn validate_field_name(name: &str) -> Result<()> {
    if !is_identifier(name) {
        return Err(Error::InvalidFieldName(name.to_string()));
    }
    if is_reserved_field(name) {
        return Err(Error::ReservedField(name.to_string()));
    }
    Ok(())
}

/// Checks that `name` is usable as a class name.
pub fn validate_class_name(name: &str) -> Result<()> {
    if is_identifier(name) {
        Ok(())
    } else {
        Err(Error::InvalidClassName(name.to_string()))
    }
}

/// Checks that `id` can name a stored object. Ids are server-assigned and
/// otherwise opaque; only blank ids are rejected.
pub fn validate_object_id(id: &str) -> Result<()> {
    if id.trim().is_empty() {
        Err(Error::InvalidObjectId(id.to_string()))
    } else {
        Ok(())
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
