//! Pending field operations.
//!
//! Each queued mutation is an [`Operation`]. Two operations on the same
//! field compose into one, and composition agrees with application:
//! applying `compose(a, b)` gives the same value as applying `a` then `b`.
//! That is what keeps replay deterministic however the queue was split
//! into batches.

use crate::value::Value;
use cirrus_types::ObjectRef;
use serde_json::Number;

/// A pending mutation of one field.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    /// Replace the value.
    Set(Value),
    /// Remove the field.
    Delete,
    /// Add to a number.
    Increment(Number),
    /// Append to an array; `unique` skips values already present.
    ArrayAdd { values: Vec<Value>, unique: bool },
    /// Remove every occurrence of the values from an array.
    ArrayRemove(Vec<Value>),
    /// Add objects to a relation. All refs share one class.
    RelationAdd(Vec<ObjectRef>),
    /// Remove objects from a relation. All refs share one class.
    RelationRemove(Vec<ObjectRef>),
}

impl Operation {
    /// Short name used in errors and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Operation::Set(_) => "Set",
            Operation::Delete => "Delete",
            Operation::Increment(_) => "Increment",
            Operation::ArrayAdd { unique: false, .. } => "Add",
            Operation::ArrayAdd { unique: true, .. } => "AddUnique",
            Operation::ArrayRemove(_) => "Remove",
            Operation::RelationAdd(_) => "AddRelation",
            Operation::RelationRemove(_) => "RemoveRelation",
        }
    }

    fn is_relation(&self) -> bool {
        matches!(self, Operation::RelationAdd(_) | Operation::RelationRemove(_))
    }

    fn relation_class(refs: &[ObjectRef]) -> Option<&str> {
        refs.first().map(|r| r.class_name.as_str())
    }

    /// Applies the operation to the previous value of a field.
    ///
    /// `None` means the field is absent. Type mismatches resolve the way the
    /// server resolves them: an increment of a non-number starts from the
    /// amount, an array add on a non-array starts from an empty array.
    pub fn apply(&self, previous: Option<&Value>) -> Option<Value> {
        match self {
            Operation::Set(v) => Some(v.clone()),
            Operation::Delete => None,
            Operation::Increment(amount) => Some(Value::Number(match previous {
                Some(Value::Number(n)) => Value::add_numbers(n, amount),
                _ => amount.clone(),
            })),
            Operation::ArrayAdd { values, unique } => {
                let mut items = match previous {
                    Some(Value::Array(items)) => items.clone(),
                    _ => Vec::new(),
                };
                for value in values {
                    if !*unique || !items.iter().any(|existing| existing.same_as(value)) {
                        items.push(value.clone());
                    }
                }
                Some(Value::Array(items))
            }
            Operation::ArrayRemove(values) => {
                let items = match previous {
                    Some(Value::Array(items)) => items
                        .iter()
                        .filter(|item| !values.iter().any(|v| v.same_as(item)))
                        .cloned()
                        .collect(),
                    _ => Vec::new(),
                };
                Some(Value::Array(items))
            }
            Operation::RelationAdd(refs) | Operation::RelationRemove(refs) => match previous {
                Some(relation @ Value::Relation { .. }) => Some(relation.clone()),
                _ => match Self::relation_class(refs) {
                    Some(class_name) => Some(Value::Relation {
                        class_name: class_name.to_string(),
                    }),
                    None => previous.cloned(),
                },
            },
        }
    }

    /// Composes `earlier` followed by `later` into a single operation.
    ///
    /// Returns `None` when no single operation has the combined effect,
    /// e.g. an add followed by a remove on the same array.
    pub fn compose(earlier: &Operation, later: Operation) -> Option<Operation> {
        use Operation::*;

        match (earlier, later) {
            (_, later @ (Set(_) | Delete)) => Some(later),

            (Increment(a), Increment(b)) => Some(Increment(Value::add_numbers(a, &b))),

            (
                ArrayAdd { values: a, unique: ua },
                ArrayAdd {
                    values: b,
                    unique: ub,
                },
            ) if *ua == ub => {
                let mut values = a.clone();
                for value in b {
                    if !ub || !values.iter().any(|existing| existing.same_as(&value)) {
                        values.push(value);
                    }
                }
                Some(ArrayAdd { values, unique: ub })
            }

            (ArrayRemove(a), ArrayRemove(b)) => {
                let mut values = a.clone();
                for value in b {
                    if !values.iter().any(|existing| existing.same_as(&value)) {
                        values.push(value);
                    }
                }
                Some(ArrayRemove(values))
            }

            (RelationAdd(a), RelationAdd(b)) => Self::union_refs(a, b).map(RelationAdd),
            (RelationRemove(a), RelationRemove(b)) => Self::union_refs(a, b).map(RelationRemove),

            // Relation edits are never folded into a plain value: the
            // estimated value only carries a marker, not the members.
            (earlier, later) if earlier.is_relation() || later.is_relation() => None,

            (Set(v), later) => Some(Set(later.apply(Some(v)).unwrap_or(Value::Null))),
            (Delete, later) => Some(Set(later.apply(None).unwrap_or(Value::Null))),

            // The earlier result is an array, so the increment starts over.
            (ArrayAdd { .. } | ArrayRemove(_), later @ Increment(_)) => {
                Some(Set(later.apply(None).unwrap_or(Value::Null)))
            }
            // The earlier result is a number, so the array op starts over.
            (Increment(_), later @ (ArrayAdd { .. } | ArrayRemove(_))) => {
                Some(Set(later.apply(None).unwrap_or(Value::Null)))
            }

            _ => None,
        }
    }

    fn union_refs(a: &[ObjectRef], b: Vec<ObjectRef>) -> Option<Vec<ObjectRef>> {
        if let (Some(ca), Some(cb)) = (Self::relation_class(a), Self::relation_class(&b)) {
            if ca != cb {
                return None;
            }
        }
        let mut refs = a.to_vec();
        for r in b {
            if !refs.contains(&r) {
                refs.push(r);
            }
        }
        Some(refs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(n: i64) -> Number {
        Number::from(n)
    }

    fn arr(items: &[i64]) -> Value {
        Value::Array(items.iter().map(|&n| Value::from(n)).collect())
    }

    #[test]
    fn increments_sum() {
        let op = Operation::compose(&Operation::Increment(num(2)), Operation::Increment(num(3)));
        assert_eq!(op, Some(Operation::Increment(num(5))));
    }

    #[test]
    fn set_supersedes_everything() {
        let earlier = Operation::ArrayAdd {
            values: vec![Value::from(1)],
            unique: false,
        };
        let op = Operation::compose(&earlier, Operation::Set(Value::from("x")));
        assert_eq!(op, Some(Operation::Set(Value::from("x"))));
    }

    #[test]
    fn increment_after_set_folds_into_set() {
        let op = Operation::compose(&Operation::Set(Value::from(10)), Operation::Increment(num(5)));
        assert_eq!(op, Some(Operation::Set(Value::from(15))));
    }

    #[test]
    fn increment_after_delete_starts_from_amount() {
        let op = Operation::compose(&Operation::Delete, Operation::Increment(num(5)));
        assert_eq!(op, Some(Operation::Set(Value::from(5))));
    }

    #[test]
    fn unique_adds_dedup() {
        let a = Operation::ArrayAdd {
            values: vec![Value::from(1), Value::from(2)],
            unique: true,
        };
        let b = Operation::ArrayAdd {
            values: vec![Value::from(2), Value::from(3)],
            unique: true,
        };
        assert_eq!(
            Operation::compose(&a, b),
            Some(Operation::ArrayAdd {
                values: vec![Value::from(1), Value::from(2), Value::from(3)],
                unique: true
            })
        );
    }

    #[test]
    fn add_then_remove_is_incompatible() {
        let a = Operation::ArrayAdd {
            values: vec![Value::from(1)],
            unique: false,
        };
        assert_eq!(
            Operation::compose(&a, Operation::ArrayRemove(vec![Value::from(1)])),
            None
        );
    }

    #[test]
    fn relations_of_different_classes_do_not_merge() {
        let a = Operation::RelationAdd(vec![ObjectRef::new("Tag", "t1")]);
        let b = Operation::RelationAdd(vec![ObjectRef::new("User", "u1")]);
        assert_eq!(Operation::compose(&a, b), None);
    }

    #[test]
    fn apply_remove_filters_all_occurrences() {
        let op = Operation::ArrayRemove(vec![Value::from(2)]);
        assert_eq!(op.apply(Some(&arr(&[1, 2, 3, 2]))), Some(arr(&[1, 3])));
    }

    #[test]
    fn apply_add_unique_skips_existing() {
        let op = Operation::ArrayAdd {
            values: vec![Value::from(2), Value::from(4), Value::from(4)],
            unique: true,
        };
        assert_eq!(op.apply(Some(&arr(&[1, 2]))), Some(arr(&[1, 2, 4])));
    }

    #[test]
    fn apply_relation_yields_marker() {
        let op = Operation::RelationAdd(vec![ObjectRef::new("Tag", "t1")]);
        assert_eq!(
            op.apply(None),
            Some(Value::Relation {
                class_name: "Tag".into()
            })
        );
    }
}
