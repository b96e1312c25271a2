use chrono::{TimeZone, Utc};
use cirrus_model::{Acl, Entity, ModelError, ObjectRef, ServerSnapshot, Value};
use pretty_assertions::assert_eq;
use std::collections::BTreeMap;

fn fields(pairs: &[(&str, Value)]) -> BTreeMap<String, Value> {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.clone()))
        .collect()
}

fn saved(class: &str, id: &str) -> Entity {
    Entity::with_object_id(class, id).unwrap()
}

// ── Construction ─────────────────────────────────────────────────

#[test]
fn new_entity_is_unsaved_and_clean() {
    let e = Entity::new("Item").unwrap();
    assert_eq!(e.class_name(), "Item");
    assert_eq!(e.object_id(), None);
    assert!(!e.is_dirty());
    assert!(e.estimated_data().is_empty());
}

#[test]
fn empty_class_name_rejected() {
    assert!(matches!(Entity::new(""), Err(ModelError::Invalid(_))));
}

#[test]
fn with_attributes_seeds_base_snapshot() {
    let e = Entity::with_attributes("Item", fields(&[("price", Value::from(10))])).unwrap();
    assert_eq!(e.get("price"), Some(Value::from(10)));
    assert!(!e.is_dirty());
}

#[test]
fn blank_object_id_rejected() {
    assert!(matches!(
        Entity::with_object_id("Item", ""),
        Err(ModelError::Invalid(cirrus_types::Error::InvalidObjectId(_)))
    ));
}

#[test]
fn from_ref_holds_identity_only() {
    let e = Entity::from_ref(&ObjectRef::new("Item", "abc"));
    assert_eq!(e.to_ref(), Some(ObjectRef::new("Item", "abc")));
    assert!(e.server_data().is_empty());
}

// ── Mutations ────────────────────────────────────────────────────

#[test]
fn mutations_show_in_estimated_state() {
    let mut e = Entity::with_attributes(
        "Item",
        fields(&[
            ("price", Value::from(10)),
            ("tags", Value::from(vec!["a"])),
            ("gone", Value::from(true)),
        ]),
    )
    .unwrap();

    e.increment("price", 5).unwrap();
    e.add_unique_objects("tags", vec![Value::from("a"), Value::from("b")])
        .unwrap();
    e.remove("gone").unwrap();
    e.set("name", "pen").unwrap();

    assert_eq!(
        e.estimated_data(),
        fields(&[
            ("name", Value::from("pen")),
            ("price", Value::from(15)),
            ("tags", Value::from(vec!["a", "b"])),
        ])
    );
    assert_eq!(e.get("gone"), None);
    // Base snapshot untouched until the server confirms.
    assert_eq!(e.server_data().get("price"), Some(&Value::from(10)));
}

#[test]
fn reserved_fields_cannot_be_set() {
    let mut e = Entity::new("Item").unwrap();
    assert!(e.set("objectId", "x").is_err());
    assert!(e.set("createDate", "x").is_err());
    assert!(!e.is_dirty());
}

#[test]
fn relation_requires_one_class() {
    let mut e = Entity::new("Post").unwrap();
    let err = e
        .add_relation(
            "tags",
            vec![ObjectRef::new("Tag", "t1"), ObjectRef::new("User", "u1")],
        )
        .unwrap_err();
    assert!(matches!(err, ModelError::InvalidOperation { .. }));
    assert!(e.add_relation("tags", vec![]).is_err());

    e.add_relation("tags", vec![ObjectRef::new("Tag", "t1")]).unwrap();
    assert_eq!(
        e.get("tags"),
        Some(Value::Relation {
            class_name: "Tag".into()
        })
    );
}

#[test]
fn set_acl_is_queued_and_visible() {
    let mut e = Entity::new("Item").unwrap();
    e.set_acl(Acl::public_read_write()).unwrap();
    assert!(e.acl().unwrap().public_read());
    assert!(e.queue().current().contains("acl"));
    assert_eq!(e.get("acl"), None);
    assert!(e.estimated_data().is_empty());
}

#[test]
fn fetched_acl_does_not_override_pending_change() {
    let mut e = saved("Item", "abc123");
    let mut local = Acl::new();
    local.set_user_write("u1", true);
    e.set_acl(local.clone()).unwrap();

    let mut remote = Acl::new();
    remote.set_public_read(true);
    e.apply_fetch(
        ServerSnapshot {
            acl: Some(remote.clone()),
            ..Default::default()
        },
        true,
    )
    .unwrap();
    assert_eq!(e.acl(), Some(local.clone()));

    let sent = e.begin_round_trip();
    e.merge_back(sent);
    assert_eq!(e.acl(), Some(local.clone()));

    let sent = e.begin_round_trip();
    e.apply_save_response(&sent, ServerSnapshot::default()).unwrap();
    assert_eq!(e.acl(), Some(local));
}

// ── Save reconciliation ──────────────────────────────────────────

#[test]
fn save_response_assigns_identity_and_advances_base() {
    let mut e = Entity::new("Item").unwrap();
    e.set("price", 10).unwrap();
    let sent = e.begin_round_trip();
    e.set("name", "later").unwrap();

    let created = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
    e.apply_save_response(
        &sent,
        ServerSnapshot {
            object_id: Some("abc123".into()),
            created_at: Some(created),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(e.object_id(), Some("abc123"));
    assert_eq!(e.created_at(), Some(created));
    assert_eq!(e.updated_at(), Some(created));
    assert_eq!(e.server_data(), &fields(&[("price", Value::from(10))]));
    assert_eq!(e.queue().len(), 1);
    assert_eq!(e.get("name"), Some(Value::from("later")));
}

#[test]
fn save_response_with_other_id_is_conflict_and_changes_nothing() {
    let mut e = saved("Item", "abc123");
    e.set("price", 1).unwrap();
    let sent = e.begin_round_trip();
    let before = e.clone();

    let err = e
        .apply_save_response(
            &sent,
            ServerSnapshot {
                object_id: Some("zzz".into()),
                ..Default::default()
            },
        )
        .unwrap_err();

    assert_eq!(
        err,
        ModelError::IdentityConflict {
            local: "abc123".into(),
            server: "zzz".into()
        }
    );
    assert_eq!(e, before);
}

#[test]
fn server_computed_fields_land_in_base() {
    let mut e = saved("Item", "abc123");
    e.increment("views", 1).unwrap();
    let sent = e.begin_round_trip();

    e.apply_save_response(
        &sent,
        ServerSnapshot {
            fields: fields(&[("views", Value::from(42))]),
            ..Default::default()
        },
    )
    .unwrap();

    assert_eq!(e.get("views"), Some(Value::from(42)));
}

#[test]
fn acl_is_not_copied_into_base() {
    let mut e = Entity::new("Item").unwrap();
    e.set_acl(Acl::public_read_write()).unwrap();
    let sent = e.begin_round_trip();
    e.apply_save_response(
        &sent,
        ServerSnapshot {
            object_id: Some("a".into()),
            ..Default::default()
        },
    )
    .unwrap();

    assert!(e.server_data().get("acl").is_none());
    assert!(e.acl().unwrap().public_write());
}

#[test]
fn first_save_response_without_id_changes_nothing() {
    let mut e = Entity::new("Item").unwrap();
    e.set("price", 1).unwrap();
    let sent = e.begin_round_trip();
    let before = e.clone();

    let err = e
        .apply_save_response(&sent, ServerSnapshot::default())
        .unwrap_err();
    assert_eq!(
        err,
        ModelError::MissingObjectId {
            class_name: "Item".into()
        }
    );
    assert_eq!(e, before);
}

// ── Fetch reconciliation ─────────────────────────────────────────

#[test]
fn fetch_keeps_pending_operations_on_top() {
    let mut e = saved("Item", "abc123");
    e.set("name", "local").unwrap();

    e.apply_fetch(
        ServerSnapshot {
            object_id: Some("abc123".into()),
            fields: fields(&[("name", Value::from("remote")), ("price", Value::from(10))]),
            ..Default::default()
        },
        false,
    )
    .unwrap();

    assert_eq!(
        e.estimated_data(),
        fields(&[("name", Value::from("local")), ("price", Value::from(10))])
    );
}

#[test]
fn refresh_replaces_base_while_merge_keeps_it() {
    let base = fields(&[("old", Value::from(1))]);
    let snapshot = ServerSnapshot {
        fields: fields(&[("new", Value::from(2))]),
        ..Default::default()
    };

    let mut merged = Entity::with_attributes("Item", base.clone()).unwrap();
    merged.apply_fetch(snapshot.clone(), false).unwrap();
    assert_eq!(merged.get("old"), Some(Value::from(1)));
    assert_eq!(merged.get("new"), Some(Value::from(2)));

    let mut refreshed = Entity::with_attributes("Item", base).unwrap();
    refreshed.apply_fetch(snapshot, true).unwrap();
    assert_eq!(refreshed.get("old"), None);
    assert_eq!(refreshed.get("new"), Some(Value::from(2)));
}

// ── Reset ────────────────────────────────────────────────────────

#[test]
fn reset_clears_everything_but_class() {
    let mut e = saved("Item", "abc123");
    e.set("price", 3).unwrap();
    e.set_acl(Acl::public_read_write()).unwrap();

    e.reset();

    assert_eq!(e, Entity::new("Item").unwrap());
}
