use crate::operation::Operation;
use std::collections::BTreeMap;

/// Field mutations accumulated since the last round trip began.
///
/// Holds exactly one operation per field. Ordered by field name so that
/// wire payloads built from a batch are deterministic.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct OperationBatch {
    operations: BTreeMap<String, Operation>,
}

impl OperationBatch {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, field: &str) -> Option<&Operation> {
        self.operations.get(field)
    }

    pub fn insert(&mut self, field: impl Into<String>, operation: Operation) {
        self.operations.insert(field.into(), operation);
    }

    pub fn remove(&mut self, field: &str) -> Option<Operation> {
        self.operations.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.operations.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    pub fn len(&self) -> usize {
        self.operations.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.operations.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Operation)> {
        self.operations.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl IntoIterator for OperationBatch {
    type Item = (String, Operation);
    type IntoIter = std::collections::btree_map::IntoIter<String, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.into_iter()
    }
}

impl FromIterator<(String, Operation)> for OperationBatch {
    fn from_iter<I: IntoIterator<Item = (String, Operation)>>(iter: I) -> Self {
        Self {
            operations: iter.into_iter().collect(),
        }
    }
}
