use serde::{Deserialize, Serialize};
use std::fmt;

/// The identity of a persisted remote record.
///
/// Relations and pointers only ever carry this pair; the full object is
/// resolved separately.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectRef {
    pub class_name: String,
    pub object_id: String,
}

impl ObjectRef {
    /// Creates a reference from its parts.
    pub fn new(class_name: impl Into<String>, object_id: impl Into<String>) -> Self {
        Self {
            class_name: class_name.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.class_name, self.object_id)
    }
}
