//! Access-control lists.
//!
//! The backend keys permissions by `*` (everyone), a user's object id, or
//! `role:<name>`. Only granted flags appear on the wire.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The ACL key that grants to everyone.
pub const PUBLIC_KEY: &str = "*";

const ROLE_PREFIX: &str = "role:";

/// Read/write grant for one ACL key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub read: bool,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub write: bool,
}

impl Permission {
    fn is_empty(&self) -> bool {
        !self.read && !self.write
    }
}

/// An access-control list attached to an object.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Acl {
    entries: BTreeMap<String, Permission>,
}

impl Acl {
    /// Creates an empty ACL (no one but the master key may access).
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an ACL granting public read and write.
    #[must_use]
    pub fn public_read_write() -> Self {
        let mut acl = Self::new();
        acl.set_public_read(true);
        acl.set_public_write(true);
        acl
    }

    pub fn set_public_read(&mut self, allowed: bool) {
        self.update(PUBLIC_KEY, |p| p.read = allowed);
    }

    pub fn set_public_write(&mut self, allowed: bool) {
        self.update(PUBLIC_KEY, |p| p.write = allowed);
    }

    pub fn set_user_read(&mut self, user_id: &str, allowed: bool) {
        self.update(user_id, |p| p.read = allowed);
    }

    pub fn set_user_write(&mut self, user_id: &str, allowed: bool) {
        self.update(user_id, |p| p.write = allowed);
    }

    pub fn set_role_read(&mut self, role: &str, allowed: bool) {
        self.update(&format!("{ROLE_PREFIX}{role}"), |p| p.read = allowed);
    }

    pub fn set_role_write(&mut self, role: &str, allowed: bool) {
        self.update(&format!("{ROLE_PREFIX}{role}"), |p| p.write = allowed);
    }

    /// Replaces the permission for a raw key (`*`, a user id, or `role:<name>`).
    pub fn set(&mut self, key: &str, permission: Permission) {
        self.update(key, |p| *p = permission);
    }

    /// Returns the permission recorded for `key`, if any.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<Permission> {
        self.entries.get(key).copied()
    }

    #[must_use]
    pub fn public_read(&self) -> bool {
        self.get(PUBLIC_KEY).is_some_and(|p| p.read)
    }

    #[must_use]
    pub fn public_write(&self) -> bool {
        self.get(PUBLIC_KEY).is_some_and(|p| p.write)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Serializes to the wire shape.
    #[must_use]
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_else(|_| serde_json::Value::Object(Default::default()))
    }

    /// Parses the wire shape.
    pub fn from_json(value: &serde_json::Value) -> serde_json::Result<Self> {
        Self::deserialize(value)
    }

    fn update(&mut self, key: &str, f: impl FnOnce(&mut Permission)) {
        let mut permission = self.entries.get(key).copied().unwrap_or_default();
        f(&mut permission);
        if permission.is_empty() {
            self.entries.remove(key);
        } else {
            self.entries.insert(key.to_string(), permission);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn revoking_last_flag_drops_entry() {
        let mut acl = Acl::new();
        acl.set_user_read("u1", true);
        acl.set_user_read("u1", false);
        assert!(acl.is_empty());
    }

    #[test]
    fn wire_shape_omits_false_flags() {
        let mut acl = Acl::new();
        acl.set_public_read(true);
        acl.set_role_write("admin", true);
        assert_eq!(
            acl.to_json(),
            json!({"*": {"read": true}, "role:admin": {"write": true}})
        );
    }
}
