use chrono::{TimeZone, Utc};
use cirrus_types::{
    format_date, is_reserved_field, parse_date, validate_class_name, validate_field_name,
    validate_object_id, Acl, Error, GeoPoint, ObjectRef, Permission,
};
use pretty_assertions::assert_eq;
use proptest::prelude::*;
use serde_json::json;

// ── Dates ────────────────────────────────────────────────────────

#[test]
fn date_round_trips_through_wire_layout() {
    let d = Utc.with_ymd_and_hms(2023, 12, 31, 23, 59, 59).unwrap();
    let s = format_date(&d);
    assert_eq!(s, "2023-12-31T23:59:59.000Z");
    assert_eq!(parse_date(&s).unwrap(), d);
}

#[test]
fn date_without_millis_is_accepted() {
    let d = parse_date("2024-01-01T00:00:00Z").unwrap();
    assert_eq!(format_date(&d), "2024-01-01T00:00:00.000Z");
}

proptest! {
    #[test]
    fn formatted_dates_always_parse_back(millis in 0i64..4_102_444_800_000) {
        let d = Utc.timestamp_millis_opt(millis).unwrap();
        prop_assert_eq!(parse_date(&format_date(&d)).unwrap(), d);
    }
}

// ── Geo points ───────────────────────────────────────────────────

#[test]
fn geo_point_in_range() {
    let p = GeoPoint::new(35.6, 139.7).unwrap();
    assert_eq!(p.latitude(), 35.6);
    assert_eq!(p.longitude(), 139.7);
}

#[test]
fn geo_point_out_of_range() {
    assert!(matches!(
        GeoPoint::new(91.0, 0.0),
        Err(Error::InvalidGeoPoint { .. })
    ));
    assert!(GeoPoint::new(0.0, -180.5).is_err());
}

// ── Names ────────────────────────────────────────────────────────

#[test]
fn field_names() {
    assert!(validate_field_name("price").is_ok());
    assert!(validate_field_name("item_2").is_ok());
    assert_eq!(
        validate_field_name(""),
        Err(Error::InvalidFieldName(String::new()))
    );
    assert!(validate_field_name("_private").is_err());
    assert!(validate_field_name("has space").is_err());
    assert_eq!(
        validate_field_name("objectId"),
        Err(Error::ReservedField("objectId".into()))
    );
}

#[test]
fn reserved_fields() {
    assert!(is_reserved_field("acl"));
    assert!(is_reserved_field("updateDate"));
    assert!(!is_reserved_field("name"));
}

#[test]
fn class_names() {
    assert!(validate_class_name("Item").is_ok());
    assert!(validate_class_name("").is_err());
    assert!(validate_class_name("9lives").is_err());
}

#[test]
fn object_ids() {
    assert!(validate_object_id("abc123").is_ok());
    assert_eq!(
        validate_object_id(""),
        Err(Error::InvalidObjectId(String::new()))
    );
    assert!(validate_object_id("  ").is_err());
}

// ── Object refs ──────────────────────────────────────────────────

#[test]
fn object_ref_display_and_serde() {
    let r = ObjectRef::new("Item", "abc123");
    assert_eq!(r.to_string(), "Item/abc123");
    assert_eq!(
        serde_json::to_value(&r).unwrap(),
        json!({"className": "Item", "objectId": "abc123"})
    );
}

// ── ACL ──────────────────────────────────────────────────────────

#[test]
fn acl_public_read_write() {
    let acl = Acl::public_read_write();
    assert!(acl.public_read());
    assert!(acl.public_write());
    assert_eq!(acl.to_json(), json!({"*": {"read": true, "write": true}}));
}

#[test]
fn acl_from_wire() {
    let acl = Acl::from_json(&json!({"u1": {"read": true}, "*": {"write": true}})).unwrap();
    assert!(acl.get("u1").unwrap().read);
    assert!(!acl.get("u1").unwrap().write);
    assert!(acl.public_write());
    assert!(!acl.public_read());
}

#[test]
fn acl_set_raw_key() {
    let mut acl = Acl::new();
    acl.set("role:admin", Permission { read: true, write: true });
    acl.set("*", Permission { read: true, write: false });
    assert_eq!(
        acl.to_json(),
        json!({"*": {"read": true}, "role:admin": {"read": true, "write": true}})
    );

    acl.set("role:admin", Permission::default());
    assert!(acl.get("role:admin").is_none());
}
