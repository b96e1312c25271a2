//! Save, fetch and delete orchestration.
//!
//! A [`SyncedObject`] wraps one [`Entity`] and drives its round trips. The
//! entity lock is only held for local bookkeeping, never across a request,
//! so callers keep reading and mutating while a round trip is outstanding.
//! A per-object gate allows one physical request at a time; concurrent
//! saves join the one already in flight.

use crate::codec;
use crate::config::ClientConfig;
use crate::endpoint;
use crate::error::{SyncError, SyncResult};
use crate::http::HttpTransport;
use crate::registry::ObjectRegistry;
use crate::transport::{Method, Transport};
use chrono::{DateTime, Utc};
use cirrus_model::{Acl, Entity, ModelResult, ObjectRef, Value};
use futures::future::{BoxFuture, FutureExt, Shared};
use parking_lot::Mutex;
use serde_json::Number;
use std::collections::BTreeMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Save progress of one object.
///
/// `SaveSucceeded` and `SaveFailed` report how the last save ended; the
/// object is idle in both and a new save may start.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SaveState {
    /// No save has run yet.
    #[default]
    Idle,
    /// A save request is outstanding.
    SaveInFlight,
    /// The last save was confirmed.
    SaveSucceeded,
    /// The last save failed and its operations were re-queued.
    SaveFailed,
}

impl SaveState {
    /// Returns true while a save request is outstanding.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, SaveState::SaveInFlight)
    }

    /// Returns true if a new save would start a new round trip.
    pub fn can_start_save(&self) -> bool {
        !self.is_in_flight()
    }
}

type SharedSave = Shared<BoxFuture<'static, SyncResult<()>>>;

struct BackendInner {
    transport: Arc<dyn Transport>,
    registry: ObjectRegistry,
}

/// Entry point: a transport plus the class registry.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<BackendInner>,
}

impl Backend {
    /// Creates a backend with an empty registry.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self::with_registry(transport, ObjectRegistry::new())
    }

    /// Creates a backend that builds objects through `registry`.
    pub fn with_registry(transport: impl Transport + 'static, registry: ObjectRegistry) -> Self {
        Self {
            inner: Arc::new(BackendInner {
                transport: Arc::new(transport),
                registry,
            }),
        }
    }

    /// Creates a backend talking HTTP.
    pub fn http(config: ClientConfig, registry: ObjectRegistry) -> SyncResult<Self> {
        Ok(Self::with_registry(HttpTransport::new(config)?, registry))
    }

    /// The class registry shared by every object of this backend.
    pub fn registry(&self) -> &ObjectRegistry {
        &self.inner.registry
    }

    /// A new, unsaved object.
    pub fn object(&self, class_name: &str) -> SyncResult<SyncedObject> {
        Ok(self.wrap(self.inner.registry.create(class_name)?))
    }

    /// A handle on an existing record, known only by identity until fetched.
    pub fn object_with_id(&self, class_name: &str, object_id: &str) -> SyncResult<SyncedObject> {
        Ok(self.wrap(
            self.inner
                .registry
                .create_with_object_id(class_name, object_id)?,
        ))
    }

    /// An object seeded with known server fields.
    pub fn object_with_attributes(
        &self,
        class_name: &str,
        attributes: BTreeMap<String, Value>,
    ) -> SyncResult<SyncedObject> {
        Ok(self.wrap(
            self.inner
                .registry
                .create_with_attributes(class_name, attributes)?,
        ))
    }

    /// Takes ownership of an entity built elsewhere (e.g. decoded from a response).
    pub fn wrap(&self, entity: Entity) -> SyncedObject {
        SyncedObject {
            shared: Arc::new(ObjectShared {
                backend: Arc::clone(&self.inner),
                entity: Mutex::new(entity),
                gate: tokio::sync::Mutex::new(()),
                pending_save: Mutex::new(None),
                save_state: Mutex::new(SaveState::Idle),
            }),
        }
    }
}

struct ObjectShared {
    backend: Arc<BackendInner>,
    entity: Mutex<Entity>,
    /// Held for the duration of every physical request.
    gate: tokio::sync::Mutex<()>,
    pending_save: Mutex<Option<SharedSave>>,
    save_state: Mutex<SaveState>,
}

/// A cloneable handle on one remote object.
///
/// Clones share the same entity, queue and in-flight state.
#[derive(Clone)]
pub struct SyncedObject {
    shared: Arc<ObjectShared>,
}

impl SyncedObject {
    // ── Reads ────────────────────────────────────────────────────

    /// The class this object belongs to.
    pub fn class_name(&self) -> String {
        self.shared.entity.lock().class_name().to_string()
    }

    /// The server-assigned id, once saved.
    pub fn object_id(&self) -> Option<String> {
        self.shared.entity.lock().object_id().map(str::to_string)
    }

    /// A reference usable as a pointer value, once saved.
    pub fn to_ref(&self) -> Option<ObjectRef> {
        self.shared.entity.lock().to_ref()
    }

    /// Creation time reported by the server.
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        self.shared.entity.lock().created_at()
    }

    /// Last update time reported by the server.
    pub fn updated_at(&self) -> Option<DateTime<Utc>> {
        self.shared.entity.lock().updated_at()
    }

    /// The access-control list, including a change not yet saved.
    pub fn acl(&self) -> Option<Acl> {
        self.shared.entity.lock().acl()
    }

    /// Estimated value of one field.
    pub fn get(&self, field: &str) -> Option<Value> {
        self.shared.entity.lock().get(field)
    }

    /// All estimated field values.
    pub fn estimated_data(&self) -> BTreeMap<String, Value> {
        self.shared.entity.lock().estimated_data()
    }

    /// Returns true if any mutation has not been confirmed by the server.
    pub fn is_dirty(&self) -> bool {
        self.shared.entity.lock().is_dirty()
    }

    /// A copy of the underlying entity.
    pub fn snapshot(&self) -> Entity {
        self.shared.entity.lock().clone()
    }

    /// How the most recent save ended, or whether one is running.
    pub fn save_state(&self) -> SaveState {
        *self.shared.save_state.lock()
    }

    // ── Mutations ────────────────────────────────────────────────
    //
    // Mutations only touch the queue and never wait on a round trip. See
    // the matching `Entity` methods for their semantics.

    /// Replaces a field's value.
    pub fn set(&self, field: &str, value: impl Into<Value>) -> SyncResult<()> {
        self.mutate(|e| e.set(field, value))
    }

    /// Deletes a field.
    pub fn remove(&self, field: &str) -> SyncResult<()> {
        self.mutate(|e| e.remove(field))
    }

    /// Adds `amount` to a numeric field.
    pub fn increment(&self, field: &str, amount: impl Into<Number>) -> SyncResult<()> {
        self.mutate(|e| e.increment(field, amount))
    }

    /// Appends values to an array field.
    pub fn add_objects(&self, field: &str, values: Vec<Value>) -> SyncResult<()> {
        self.mutate(|e| e.add_objects(field, values))
    }

    /// Appends the values not already present in an array field.
    pub fn add_unique_objects(&self, field: &str, values: Vec<Value>) -> SyncResult<()> {
        self.mutate(|e| e.add_unique_objects(field, values))
    }

    /// Removes values from an array field.
    pub fn remove_objects(&self, field: &str, values: Vec<Value>) -> SyncResult<()> {
        self.mutate(|e| e.remove_objects(field, values))
    }

    /// Adds objects to a relation field.
    pub fn add_relation(&self, field: &str, refs: Vec<ObjectRef>) -> SyncResult<()> {
        self.mutate(|e| e.add_relation(field, refs))
    }

    /// Removes objects from a relation field.
    pub fn remove_relation(&self, field: &str, refs: Vec<ObjectRef>) -> SyncResult<()> {
        self.mutate(|e| e.remove_relation(field, refs))
    }

    /// Replaces the access-control list; sent with the next save.
    pub fn set_acl(&self, acl: Acl) -> SyncResult<()> {
        self.mutate(|e| e.set_acl(acl))
    }

    fn mutate(&self, f: impl FnOnce(&mut Entity) -> ModelResult<()>) -> SyncResult<()> {
        let mut entity = self.shared.entity.lock();
        f(&mut *entity).map_err(SyncError::from)
    }

    // ── Round trips ──────────────────────────────────────────────

    /// Persists every queued mutation.
    ///
    /// If a save is already in flight this joins it and returns its outcome;
    /// mutations recorded meanwhile go out with the next save. On failure
    /// the sent operations are merged back so nothing is lost.
    pub async fn save(&self) -> SyncResult<()> {
        let round_trip = {
            let mut pending = self.shared.pending_save.lock();
            match pending.as_ref() {
                Some(existing) => {
                    debug!("save already in flight, joining it");
                    existing.clone()
                }
                None => {
                    *self.shared.save_state.lock() = SaveState::SaveInFlight;
                    let shared = Arc::clone(&self.shared);
                    let task = tokio::spawn(async move {
                        let result = shared.run_save().await;
                        shared.finish_save(&result);
                        result
                    });
                    let round_trip: SharedSave = async move {
                        task.await.unwrap_or_else(|e| {
                            Err(SyncError::Transport(format!("save task failed: {e}")))
                        })
                    }
                    .boxed()
                    .shared();
                    *pending = Some(round_trip.clone());
                    round_trip
                }
            }
        };
        round_trip.await
    }

    /// Fetches and merges server fields; pending mutations stay on top.
    pub async fn fetch(&self) -> SyncResult<()> {
        self.fetch_with(false).await
    }

    /// Fetches and replaces the base snapshot; pending mutations stay on top.
    pub async fn refresh(&self) -> SyncResult<()> {
        self.fetch_with(true).await
    }

    /// Fetches the record; `is_refresh` selects replace over merge.
    ///
    /// Fails with `Precondition` if the object was never saved and with
    /// `NotFound` if the record is gone; the object is unchanged on failure.
    pub async fn fetch_with(&self, is_refresh: bool) -> SyncResult<()> {
        let shared = Arc::clone(&self.shared);
        spawn_round_trip(async move { shared.run_fetch(is_refresh).await }).await
    }

    /// Deletes the record and resets the local object.
    ///
    /// On any failure the object is left exactly as it was.
    pub async fn delete(&self) -> SyncResult<()> {
        let shared = Arc::clone(&self.shared);
        spawn_round_trip(async move { shared.run_delete().await }).await
    }
}

/// Runs a round trip on its own task so that dropping the caller's future
/// does not abandon a request midway.
async fn spawn_round_trip<F>(round_trip: F) -> SyncResult<()>
where
    F: Future<Output = SyncResult<()>> + Send + 'static,
{
    tokio::spawn(round_trip)
        .await
        .unwrap_or_else(|e| Err(SyncError::Transport(format!("round trip task failed: {e}"))))
}

impl ObjectShared {
    async fn run_save(&self) -> SyncResult<()> {
        let _gate = self.gate.lock().await;

        let (method, path, payload, sent) = {
            let mut entity = self.entity.lock();
            if entity.object_id().is_some() && entity.queue().is_empty() {
                debug!(class = entity.class_name(), "nothing to save");
                return Ok(());
            }

            let sent = entity.begin_round_trip();
            let payload = match codec::to_wire_payload(&sent) {
                Ok(payload) => payload,
                Err(e) => {
                    entity.merge_back(sent);
                    return Err(e);
                }
            };
            let (method, path) = match entity.object_id() {
                Some(id) => (Method::Put, endpoint::object_path(entity.class_name(), id)),
                None => (Method::Post, endpoint::class_path(entity.class_name())),
            };
            (method, path, payload, sent)
        };

        info!(path = %path, fields = sent.len(), "saving object");
        let outcome = match self
            .backend
            .transport
            .perform_request(method, &path, Some(payload))
            .await
        {
            Ok(response) => response
                .into_result()
                .and_then(|body| codec::decode_server_snapshot(body, &self.backend.registry)),
            Err(e) => Err(e),
        };

        let mut entity = self.entity.lock();
        let result = outcome.and_then(|snapshot| {
            entity
                .apply_save_response(&sent, snapshot)
                .map_err(SyncError::from)
        });
        match &result {
            Ok(()) => debug!(path = %path, object_id = ?entity.object_id(), "save confirmed"),
            Err(e) => {
                warn!(path = %path, error = %e, "save failed, re-queueing operations");
                entity.merge_back(sent);
            }
        }
        result
    }

    fn finish_save(&self, result: &SyncResult<()>) {
        let mut pending = self.pending_save.lock();
        *self.save_state.lock() = if result.is_ok() {
            SaveState::SaveSucceeded
        } else {
            SaveState::SaveFailed
        };
        *pending = None;
    }

    async fn run_fetch(&self, is_refresh: bool) -> SyncResult<()> {
        let _gate = self.gate.lock().await;
        let path = self.identified_path("fetch")?;

        debug!(path = %path, is_refresh, "fetching object");
        let body = self
            .backend
            .transport
            .perform_request(Method::Get, &path, None)
            .await?
            .into_result()?;
        let snapshot = codec::decode_server_snapshot(body, &self.backend.registry)?;

        self.entity.lock().apply_fetch(snapshot, is_refresh)?;
        Ok(())
    }

    async fn run_delete(&self) -> SyncResult<()> {
        let _gate = self.gate.lock().await;
        let path = self.identified_path("delete")?;

        info!(path = %path, "deleting object");
        self.backend
            .transport
            .perform_request(Method::Delete, &path, None)
            .await?
            .into_result()?;

        self.entity.lock().reset();
        Ok(())
    }

    fn identified_path(&self, action: &str) -> SyncResult<String> {
        let entity = self.entity.lock();
        match entity.object_id() {
            Some(id) => Ok(endpoint::object_path(entity.class_name(), id)),
            None => Err(SyncError::Precondition(format!(
                "cannot {action} a {} object that has never been saved",
                entity.class_name()
            ))),
        }
    }
}
