use crate::batch::OperationBatch;
use crate::error::{ModelError, ModelResult};
use crate::estimate::{apply_batch, estimate_field, materialize};
use crate::operation::Operation;
use crate::queue::OperationQueue;
use crate::value::Value;
use chrono::{DateTime, Utc};
use cirrus_types::{
    is_reserved_field, validate_class_name, validate_field_name, validate_object_id, Acl,
    ObjectRef, Permission,
};
use serde_json::Number;
use std::collections::BTreeMap;

const ACL_FIELD: &str = "acl";

/// Server state decoded from a response body.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServerSnapshot {
    pub object_id: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub updated_at: Option<DateTime<Utc>>,
    pub acl: Option<Acl>,
    /// Plain fields, with server-managed keys already removed.
    pub fields: BTreeMap<String, Value>,
}

/// Local representative of one remote record.
///
/// `base` holds the last confirmed server fields; the values a caller reads
/// are `base` with every queued operation replayed on top. The ACL is kept
/// apart from the fields: `acl` is the confirmed list and a queued change
/// shadows it until saved.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    class_name: String,
    object_id: Option<String>,
    base: BTreeMap<String, Value>,
    queue: OperationQueue,
    created_at: Option<DateTime<Utc>>,
    updated_at: Option<DateTime<Utc>>,
    acl: Option<Acl>,
}

impl Entity {
    /// Creates a new, unsaved entity.
    pub fn new(class_name: &str) -> ModelResult<Self> {
        validate_class_name(class_name)?;
        Ok(Self::unchecked(class_name))
    }

    /// Creates an entity standing for an existing record, holding only its identity.
    pub fn with_object_id(class_name: &str, object_id: &str) -> ModelResult<Self> {
        validate_object_id(object_id)?;
        let mut entity = Self::new(class_name)?;
        entity.object_id = Some(object_id.to_string());
        Ok(entity)
    }

    /// Creates an entity from a known attribute snapshot.
    pub fn with_attributes(
        class_name: &str,
        attributes: BTreeMap<String, Value>,
    ) -> ModelResult<Self> {
        let mut entity = Self::new(class_name)?;
        entity.base = attributes;
        Ok(entity)
    }

    /// Identity-only entity for a reference received from the server.
    pub fn from_ref(reference: &ObjectRef) -> Self {
        let mut entity = Self::unchecked(&reference.class_name);
        entity.object_id = Some(reference.object_id.clone());
        entity
    }

    fn unchecked(class_name: &str) -> Self {
        Self {
            class_name: class_name.to_string(),
            object_id: None,
            base: BTreeMap::new(),
            queue: OperationQueue::new(),
            created_at: None,
            updated_at: None,
            acl: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn class_name(&self) -> &str {
        &self.class_name
    }

    /// The server-assigned id; `None` until the first save succeeds.
    pub fn object_id(&self) -> Option<&str> {
        self.object_id.as_deref()
    }

    /// Server timestamps, absent until a response has carried them.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.created_at
    }

    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.updated_at
    }

    /// The access-control list, including a change not yet saved.
    pub fn acl(&self) -> Option<Acl> {
        match self.pending_acl() {
            Some(pending) => pending,
            None => self.acl.clone(),
        }
    }

    /// `Some(None)` when a queued change clears the list.
    fn pending_acl(&self) -> Option<Option<Acl>> {
        self.queue
            .batches()
            .filter_map(|batch| batch.get(ACL_FIELD))
            .last()
            .map(acl_from_operation)
    }

    /// Pending operations, oldest batch first.
    pub fn queue(&self) -> &OperationQueue {
        &self.queue
    }

    /// The last confirmed server fields.
    pub fn server_data(&self) -> &BTreeMap<String, Value> {
        &self.base
    }

    /// Returns the identity as a reference, once the entity has been saved.
    pub fn to_ref(&self) -> Option<ObjectRef> {
        self.object_id
            .as_ref()
            .map(|id| ObjectRef::new(self.class_name.clone(), id.clone()))
    }

    /// Reads a field's estimated value. The ACL is not a field; see [`Entity::acl`].
    pub fn get(&self, field: &str) -> Option<Value> {
        if field == ACL_FIELD {
            return None;
        }
        estimate_field(&self.base, &self.queue, field)
    }

    /// All estimated field values.
    pub fn estimated_data(&self) -> BTreeMap<String, Value> {
        let mut data = materialize(&self.base, &self.queue);
        data.remove(ACL_FIELD);
        data
    }

    /// Returns true if any mutation has not been confirmed by the server.
    pub fn is_dirty(&self) -> bool {
        !self.queue.is_empty()
    }

    // ── Mutations ────────────────────────────────────────────────

    /// Replaces a field's value.
    pub fn set(&mut self, field: &str, value: impl Into<Value>) -> ModelResult<()> {
        self.record(field, Operation::Set(value.into()))
    }

    /// Deletes a field from the record.
    pub fn remove(&mut self, field: &str) -> ModelResult<()> {
        self.record(field, Operation::Delete)
    }

    /// Adds `amount` to a numeric field; a missing or non-numeric field starts from zero.
    pub fn increment(&mut self, field: &str, amount: impl Into<Number>) -> ModelResult<()> {
        self.record(field, Operation::Increment(amount.into()))
    }

    /// Appends values to an array field.
    pub fn add_objects(&mut self, field: &str, values: Vec<Value>) -> ModelResult<()> {
        self.record(
            field,
            Operation::ArrayAdd {
                values,
                unique: false,
            },
        )
    }

    /// Appends the values not already present in an array field.
    pub fn add_unique_objects(&mut self, field: &str, values: Vec<Value>) -> ModelResult<()> {
        self.record(
            field,
            Operation::ArrayAdd {
                values,
                unique: true,
            },
        )
    }

    /// Removes every occurrence of the values from an array field.
    pub fn remove_objects(&mut self, field: &str, values: Vec<Value>) -> ModelResult<()> {
        self.record(field, Operation::ArrayRemove(values))
    }

    /// Adds saved objects of one class to a relation field.
    pub fn add_relation(&mut self, field: &str, refs: Vec<ObjectRef>) -> ModelResult<()> {
        check_relation_refs(field, &refs)?;
        self.record(field, Operation::RelationAdd(refs))
    }

    /// Removes saved objects of one class from a relation field.
    pub fn remove_relation(&mut self, field: &str, refs: Vec<ObjectRef>) -> ModelResult<()> {
        check_relation_refs(field, &refs)?;
        self.record(field, Operation::RelationRemove(refs))
    }

    /// Replaces the access-control list; sent with the next save.
    pub fn set_acl(&mut self, acl: Acl) -> ModelResult<()> {
        self.queue
            .record_operation(ACL_FIELD, Operation::Set(Value::from(acl.to_json())))
    }

    fn record(&mut self, field: &str, operation: Operation) -> ModelResult<()> {
        validate_field_name(field)?;
        self.queue.record_operation(field, operation)
    }

    // ── Round-trip reconciliation ────────────────────────────────

    /// Captures the batch to send; see [`OperationQueue::begin_round_trip`].
    pub fn begin_round_trip(&mut self) -> OperationBatch {
        self.queue.begin_round_trip()
    }

    /// Returns the sent batch to the queue after a failed round trip.
    pub fn merge_back(&mut self, sent: OperationBatch) {
        self.queue.merge_back(sent);
    }

    /// Folds a successful save response into the base snapshot.
    ///
    /// The identity checks run before anything changes, so a conflicting
    /// response, or one that leaves a new object without an id, leaves the
    /// entity as it was.
    pub fn apply_save_response(
        &mut self,
        sent: &OperationBatch,
        snapshot: ServerSnapshot,
    ) -> ModelResult<()> {
        self.check_identity(snapshot.object_id.as_deref())?;
        if self.object_id.is_none() && snapshot.object_id.is_none() {
            return Err(ModelError::MissingObjectId {
                class_name: self.class_name.clone(),
            });
        }

        if let Some(operation) = sent.get(ACL_FIELD) {
            self.acl = acl_from_operation(operation);
        }

        let confirmed: OperationBatch = sent
            .iter()
            .filter(|(field, _)| !is_reserved_field(field))
            .map(|(field, op)| (field.to_string(), op.clone()))
            .collect();
        apply_batch(&mut self.base, &confirmed);
        self.absorb(snapshot, false);
        self.queue.commit_round_trip();
        Ok(())
    }

    /// Folds a fetch response into the base snapshot.
    ///
    /// A refresh replaces the base snapshot; otherwise server fields are
    /// merged over it. Queued operations keep shadowing either way.
    pub fn apply_fetch(&mut self, snapshot: ServerSnapshot, is_refresh: bool) -> ModelResult<()> {
        self.check_identity(snapshot.object_id.as_deref())?;
        self.absorb(snapshot, is_refresh);
        Ok(())
    }

    /// Resets to an unsaved, empty entity of the same class.
    pub fn reset(&mut self) {
        *self = Self::unchecked(&self.class_name);
    }

    fn check_identity(&self, server: Option<&str>) -> ModelResult<()> {
        match (self.object_id.as_deref(), server) {
            (Some(local), Some(server)) if local != server => Err(ModelError::IdentityConflict {
                local: local.to_string(),
                server: server.to_string(),
            }),
            _ => Ok(()),
        }
    }

    fn absorb(&mut self, snapshot: ServerSnapshot, replace: bool) {
        if self.object_id.is_none() {
            self.object_id = snapshot.object_id;
        }
        if snapshot.created_at.is_some() {
            self.created_at = snapshot.created_at;
        }
        if let Some(updated) = snapshot.updated_at.or(snapshot.created_at) {
            self.updated_at = Some(updated);
        }
        // Confirmed list only; a queued change still shadows it.
        if snapshot.acl.is_some() {
            self.acl = snapshot.acl;
        }
        if replace {
            self.base = snapshot.fields;
        } else {
            self.base.extend(snapshot.fields);
        }
    }
}

/// Reads the list a queued ACL change leaves behind.
fn acl_from_operation(operation: &Operation) -> Option<Acl> {
    let Some(Value::Map(entries)) = operation.apply(None) else {
        return None;
    };
    let mut acl = Acl::new();
    for (key, grant) in &entries {
        let flag = |name: &str| match grant {
            Value::Map(flags) => flags.get(name).and_then(Value::as_bool).unwrap_or(false),
            _ => false,
        };
        acl.set(
            key,
            Permission {
                read: flag("read"),
                write: flag("write"),
            },
        );
    }
    Some(acl)
}

fn check_relation_refs(field: &str, refs: &[ObjectRef]) -> ModelResult<()> {
    let Some(first) = refs.first() else {
        return Err(ModelError::InvalidOperation {
            field: field.to_string(),
            reason: "relation needs at least one object".into(),
        });
    };
    if refs.iter().any(|r| r.class_name != first.class_name) {
        return Err(ModelError::InvalidOperation {
            field: field.to_string(),
            reason: "relation objects must share one class".into(),
        });
    }
    Ok(())
}
