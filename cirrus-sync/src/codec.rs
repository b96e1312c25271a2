//! JSON wire codec.
//!
//! Operations go out as `{"__op": ...}` objects, typed values as
//! `{"__type": ...}` objects, everything else as plain JSON. Incoming
//! object references are resolved through the [`ObjectRegistry`].

use crate::error::{SyncError, SyncResult};
use crate::registry::ObjectRegistry;
use cirrus_model::{Acl, GeoPoint, ObjectRef, Operation, OperationBatch, ServerSnapshot, Value};
use cirrus_types::{format_date, parse_date};
use serde_json::{json, Map, Value as JsonValue};
use std::collections::BTreeMap;

const OBJECT_ID: &str = "objectId";
const ACL: &str = "acl";
const CREATED_KEYS: [&str; 2] = ["createDate", "createdAt"];
const UPDATED_KEYS: [&str; 2] = ["updateDate", "updatedAt"];

// ── Encoding ─────────────────────────────────────────────────────

/// Encodes a batch as a save request body.
pub fn to_wire_payload(batch: &OperationBatch) -> SyncResult<JsonValue> {
    let mut body = Map::new();
    for (field, operation) in batch.iter() {
        body.insert(field.to_string(), encode_operation(operation)?);
    }
    Ok(JsonValue::Object(body))
}

pub fn encode_operation(operation: &Operation) -> SyncResult<JsonValue> {
    Ok(match operation {
        Operation::Set(value) => encode_value(value)?,
        Operation::Delete => json!({"__op": "Delete"}),
        Operation::Increment(amount) => json!({"__op": "Increment", "amount": amount}),
        Operation::ArrayAdd { values, .. } | Operation::ArrayRemove(values) => json!({
            "__op": operation.kind(),
            "objects": encode_all(values)?,
        }),
        Operation::RelationAdd(refs) | Operation::RelationRemove(refs) => json!({
            "__op": operation.kind(),
            "objects": refs.iter().map(encode_pointer).collect::<Vec<_>>(),
        }),
    })
}

/// Encodes a field value.
///
/// Fails for references to objects that have not been saved yet, since
/// they have no identity to point at.
pub fn encode_value(value: &Value) -> SyncResult<JsonValue> {
    Ok(match value {
        Value::Null => JsonValue::Null,
        Value::Bool(b) => JsonValue::Bool(*b),
        Value::Number(n) => JsonValue::Number(n.clone()),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Date(d) => json!({"__type": "Date", "iso": format_date(d)}),
        Value::GeoPoint(p) => json!({
            "__type": "GeoPoint",
            "latitude": p.latitude(),
            "longitude": p.longitude(),
        }),
        Value::Array(items) => JsonValue::Array(encode_all(items)?),
        Value::Map(map) => {
            let mut out = Map::new();
            for (k, v) in map {
                out.insert(k.clone(), encode_value(v)?);
            }
            JsonValue::Object(out)
        }
        Value::Object(entity) => match entity.to_ref() {
            Some(reference) => encode_pointer(&reference),
            None => {
                return Err(SyncError::Validation(format!(
                    "cannot reference an unsaved {} object",
                    entity.class_name()
                )));
            }
        },
        Value::Relation { class_name } => json!({"__type": "Relation", "className": class_name}),
    })
}

fn encode_all(values: &[Value]) -> SyncResult<Vec<JsonValue>> {
    values.iter().map(encode_value).collect()
}

fn encode_pointer(reference: &ObjectRef) -> JsonValue {
    json!({
        "__type": "Pointer",
        "className": reference.class_name,
        "objectId": reference.object_id,
    })
}

// ── Decoding ─────────────────────────────────────────────────────

/// Decodes a wire value into the local value model.
pub fn from_wire_value(json: JsonValue, registry: &ObjectRegistry) -> SyncResult<Value> {
    match json {
        JsonValue::Array(items) => Ok(Value::Array(
            items
                .into_iter()
                .map(|item| from_wire_value(item, registry))
                .collect::<SyncResult<_>>()?,
        )),
        JsonValue::Object(map) => decode_object(map, registry),
        other => Ok(Value::from(other)),
    }
}

fn decode_object(mut map: Map<String, JsonValue>, registry: &ObjectRegistry) -> SyncResult<Value> {
    let type_tag = map.get("__type").and_then(JsonValue::as_str).map(str::to_string);
    match type_tag.as_deref() {
        Some("Date") => Ok(Value::Date(decode_date(&JsonValue::Object(map))?)),
        Some("GeoPoint") => {
            let coordinate = |key: &str| {
                map.get(key)
                    .and_then(JsonValue::as_f64)
                    .ok_or_else(|| SyncError::Protocol(format!("geo point without {key}")))
            };
            let point = GeoPoint::new(coordinate("latitude")?, coordinate("longitude")?)
                .map_err(|e| SyncError::Protocol(e.to_string()))?;
            Ok(Value::GeoPoint(point))
        }
        Some("Pointer") => {
            let class_name = required_str(&map, "className")?;
            let object_id = required_str(&map, OBJECT_ID)?;
            let entity = registry
                .create_with_object_id(&class_name, &object_id)
                .map_err(|e| SyncError::Protocol(e.to_string()))?;
            Ok(Value::from(entity))
        }
        Some("Object") => {
            let class_name = required_str(&map, "className")?;
            map.remove("__type");
            map.remove("className");
            let snapshot = decode_server_snapshot(JsonValue::Object(map), registry)?;
            let entity = registry
                .create_from_snapshot(&class_name, snapshot)
                .map_err(|e| SyncError::Protocol(e.to_string()))?;
            Ok(Value::from(entity))
        }
        Some("Relation") => Ok(Value::Relation {
            class_name: required_str(&map, "className")?,
        }),
        _ => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                out.insert(k, from_wire_value(v, registry)?);
            }
            Ok(Value::Map(out))
        }
    }
}

/// Splits a response body into identity, metadata and plain fields.
///
/// A `null` body (e.g. an empty 200) decodes to an empty snapshot.
pub fn decode_server_snapshot(
    body: JsonValue,
    registry: &ObjectRegistry,
) -> SyncResult<ServerSnapshot> {
    let mut map = match body {
        JsonValue::Null => return Ok(ServerSnapshot::default()),
        JsonValue::Object(map) => map,
        other => {
            return Err(SyncError::Protocol(format!(
                "expected a JSON object, got {other}"
            )));
        }
    };

    let mut snapshot = ServerSnapshot::default();

    if let Some(id) = map.remove(OBJECT_ID) {
        match id {
            JsonValue::String(id) => snapshot.object_id = Some(id),
            JsonValue::Null => {}
            other => return Err(SyncError::Protocol(format!("objectId is not a string: {other}"))),
        }
    }
    for key in CREATED_KEYS {
        if let Some(date) = map.remove(key) {
            snapshot.created_at = Some(decode_date(&date)?);
        }
    }
    for key in UPDATED_KEYS {
        if let Some(date) = map.remove(key) {
            snapshot.updated_at = Some(decode_date(&date)?);
        }
    }
    if let Some(acl) = map.remove(ACL) {
        snapshot.acl = Some(Acl::from_json(&acl)?);
    }

    for (field, value) in map {
        snapshot.fields.insert(field, from_wire_value(value, registry)?);
    }
    Ok(snapshot)
}

/// Accepts either a bare date string or a `{"__type":"Date","iso":...}` object.
fn decode_date(json: &JsonValue) -> SyncResult<chrono::DateTime<chrono::Utc>> {
    let iso = match json {
        JsonValue::String(s) => s.as_str(),
        JsonValue::Object(map) => map
            .get("iso")
            .and_then(JsonValue::as_str)
            .ok_or_else(|| SyncError::Protocol("date without iso".into()))?,
        other => return Err(SyncError::Protocol(format!("invalid date: {other}"))),
    };
    parse_date(iso).map_err(|e| SyncError::Protocol(e.to_string()))
}

fn required_str(map: &Map<String, JsonValue>, key: &str) -> SyncResult<String> {
    map.get(key)
        .and_then(JsonValue::as_str)
        .map(str::to_string)
        .ok_or_else(|| SyncError::Protocol(format!("missing {key}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn increment_shape() {
        let op = Operation::Increment(serde_json::Number::from(5));
        assert_eq!(
            encode_operation(&op).unwrap(),
            json!({"__op": "Increment", "amount": 5})
        );
    }

    #[test]
    fn unknown_type_tag_decodes_structurally() {
        let v = from_wire_value(
            json!({"__type": "Mystery", "x": 1}),
            &ObjectRegistry::new(),
        )
        .unwrap();
        assert!(matches!(v, Value::Map(ref m) if m.len() == 2));
    }
}
