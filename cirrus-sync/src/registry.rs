//! Class-name → constructor registry.
//!
//! Objects are built through the registry both when a caller asks for one
//! and when a response embeds a reference, so class-specific setup (default
//! ACLs, seeded fields) applies uniformly.

use cirrus_model::{Entity, ModelResult, ServerSnapshot, Value};
use cirrus_types::validate_object_id;
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

/// Builds a fresh, unsaved entity for a class.
pub type Constructor = Arc<dyn Fn(&str) -> ModelResult<Entity> + Send + Sync>;

#[derive(Clone, Default)]
pub struct ObjectRegistry {
    constructors: HashMap<String, Constructor>,
}

impl ObjectRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the constructor used for `class_name`, replacing any earlier one.
    pub fn register<F>(&mut self, class_name: impl Into<String>, constructor: F)
    where
        F: Fn(&str) -> ModelResult<Entity> + Send + Sync + 'static,
    {
        self.constructors
            .insert(class_name.into(), Arc::new(constructor));
    }

    pub fn is_registered(&self, class_name: &str) -> bool {
        self.constructors.contains_key(class_name)
    }

    /// Creates an unsaved entity; unregistered classes get a plain one.
    pub fn create(&self, class_name: &str) -> ModelResult<Entity> {
        match self.constructors.get(class_name) {
            Some(constructor) => constructor(class_name),
            None => Entity::new(class_name),
        }
    }

    /// Creates an entity holding only an identity.
    pub fn create_with_object_id(&self, class_name: &str, object_id: &str) -> ModelResult<Entity> {
        validate_object_id(object_id)?;
        let mut entity = self.create(class_name)?;
        entity.apply_fetch(
            ServerSnapshot {
                object_id: Some(object_id.to_string()),
                ..Default::default()
            },
            false,
        )?;
        Ok(entity)
    }

    /// Creates an entity whose base snapshot is `attributes`.
    pub fn create_with_attributes(
        &self,
        class_name: &str,
        attributes: BTreeMap<String, Value>,
    ) -> ModelResult<Entity> {
        self.create_from_snapshot(
            class_name,
            ServerSnapshot {
                fields: attributes,
                ..Default::default()
            },
        )
    }

    /// Creates an entity from a decoded server snapshot.
    pub fn create_from_snapshot(
        &self,
        class_name: &str,
        snapshot: ServerSnapshot,
    ) -> ModelResult<Entity> {
        let mut entity = self.create(class_name)?;
        entity.apply_fetch(snapshot, false)?;
        Ok(entity)
    }
}

impl fmt::Debug for ObjectRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut classes: Vec<_> = self.constructors.keys().collect();
        classes.sort();
        f.debug_struct("ObjectRegistry")
            .field("classes", &classes)
            .finish()
    }
}
