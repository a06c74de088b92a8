//! Conversion between field values and their JSON-safe backup form.
//!
//! Plain values map onto JSON directly. The three extended types are written
//! as maps carrying a reserved tag key:
//!
//! | Value       | Backup form                                                         |
//! |-------------|---------------------------------------------------------------------|
//! | Timestamp   | `{"_firestore_timestamp": <epoch secs>, "_iso_string": "<iso>"}`    |
//! | GeoPoint    | `{"_firestore_geopoint": true, "latitude": <f>, "longitude": <f>}`  |
//! | Reference   | `{"_firestore_reference": "<document path>"}`                       |
//!
//! Decoding checks tags in the order timestamp, geopoint, reference before
//! treating a map as plain fields.
//!
//! Timestamps do not round-trip by default: [`decode`] turns a timestamp tag
//! into [`Value::ServerTimestamp`], so the restored field holds the time of
//! the restore commit. [`TimestampMode::Preserve`] recovers the recorded
//! instant instead.

use serde_json::{Map, Number, Value as JsonValue};

use crate::error::CodecError;
use crate::model::{DocumentReference, Fields, GeoPoint, Timestamp, Value};

pub const TIMESTAMP_TAG: &str = "_firestore_timestamp";
pub const ISO_STRING_KEY: &str = "_iso_string";
pub const GEOPOINT_TAG: &str = "_firestore_geopoint";
pub const REFERENCE_TAG: &str = "_firestore_reference";

/// How timestamp tags are turned back into values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum TimestampMode {
    /// Substitute the store's commit time.
    #[default]
    ServerTime,
    /// Rebuild the recorded instant from `_iso_string` (or the epoch seconds).
    Preserve,
}

// ============================================================================
// Encoding
// ============================================================================

/// Convert a value to its JSON-safe backup form.
///
/// Non-finite doubles become `null`. A pending `ServerTimestamp` is written
/// as the current instant.
#[must_use]
pub fn encode(value: &Value) -> JsonValue {
    match value {
        Value::Null => JsonValue::Null,
        Value::Boolean(b) => JsonValue::Bool(*b),
        Value::Integer(i) => JsonValue::from(*i),
        Value::Double(d) => Number::from_f64(*d).map_or(JsonValue::Null, JsonValue::Number),
        Value::String(s) => JsonValue::String(s.clone()),
        Value::Array(items) => JsonValue::Array(items.iter().map(encode).collect()),
        Value::Map(fields) => JsonValue::Object(encode_fields(fields)),
        Value::Timestamp(ts) => encode_timestamp(ts),
        Value::ServerTimestamp => encode_timestamp(&Timestamp::now()),
        Value::GeoPoint(point) => encode_geopoint(point),
        Value::Reference(reference) => {
            let mut map = Map::new();
            map.insert(
                REFERENCE_TAG.to_string(),
                JsonValue::String(reference.path().to_string()),
            );
            JsonValue::Object(map)
        }
    }
}

/// Encode a document payload.
#[must_use]
pub fn encode_fields(fields: &Fields) -> Map<String, JsonValue> {
    fields
        .iter()
        .map(|(key, value)| (key.clone(), encode(value)))
        .collect()
}

fn encode_timestamp(ts: &Timestamp) -> JsonValue {
    let mut map = Map::new();
    map.insert(
        TIMESTAMP_TAG.to_string(),
        Number::from_f64(ts.epoch_seconds()).map_or(JsonValue::Null, JsonValue::Number),
    );
    map.insert(
        ISO_STRING_KEY.to_string(),
        JsonValue::String(ts.to_iso_string()),
    );
    JsonValue::Object(map)
}

fn encode_geopoint(point: &GeoPoint) -> JsonValue {
    let mut map = Map::new();
    map.insert(GEOPOINT_TAG.to_string(), JsonValue::Bool(true));
    map.insert("latitude".to_string(), JsonValue::from(point.latitude));
    map.insert("longitude".to_string(), JsonValue::from(point.longitude));
    JsonValue::Object(map)
}

// ============================================================================
// Decoding
// ============================================================================

/// Convert a backup value back into a field value.
///
/// Timestamp tags decode to [`Value::ServerTimestamp`].
///
/// # Errors
///
/// Returns a `CodecError` if a geopoint or reference tag is malformed.
pub fn decode(json: &JsonValue) -> Result<Value, CodecError> {
    decode_with(json, TimestampMode::ServerTime)
}

/// Like [`decode`], with explicit handling of timestamp tags.
///
/// # Errors
///
/// Returns a `CodecError` if a tagged map is malformed.
pub fn decode_with(json: &JsonValue, mode: TimestampMode) -> Result<Value, CodecError> {
    match json {
        JsonValue::Object(map) => {
            if map.contains_key(TIMESTAMP_TAG) {
                decode_timestamp(map, mode)
            } else if map.contains_key(GEOPOINT_TAG) {
                decode_geopoint(map)
            } else if let Some(path) = map.get(REFERENCE_TAG) {
                decode_reference(path)
            } else {
                decode_fields(map, mode).map(Value::Map)
            }
        }
        JsonValue::Array(items) => items
            .iter()
            .map(|item| decode_with(item, mode))
            .collect::<Result<Vec<_>, _>>()
            .map(Value::Array),
        JsonValue::Null => Ok(Value::Null),
        JsonValue::Bool(b) => Ok(Value::Boolean(*b)),
        JsonValue::Number(n) => Ok(decode_number(n)),
        JsonValue::String(s) => Ok(Value::String(s.clone())),
    }
}

/// Decode a document `data` payload, which must be a JSON object.
///
/// # Errors
///
/// Returns `InvalidDocumentData` for non-objects, or any nested `CodecError`.
pub fn decode_document_data(data: &JsonValue, mode: TimestampMode) -> Result<Fields, CodecError> {
    match data {
        JsonValue::Object(map) => decode_fields(map, mode),
        other => Err(CodecError::InvalidDocumentData {
            found: json_type_name(other),
        }),
    }
}

fn decode_fields(map: &Map<String, JsonValue>, mode: TimestampMode) -> Result<Fields, CodecError> {
    map.iter()
        .map(|(key, value)| decode_with(value, mode).map(|v| (key.clone(), v)))
        .collect()
}

fn decode_number(n: &Number) -> Value {
    n.as_i64().map_or_else(
        || n.as_f64().map_or(Value::Null, Value::Double),
        Value::Integer,
    )
}

fn decode_timestamp(map: &Map<String, JsonValue>, mode: TimestampMode) -> Result<Value, CodecError> {
    if mode == TimestampMode::ServerTime {
        return Ok(Value::ServerTimestamp);
    }

    if let Some(iso) = map.get(ISO_STRING_KEY).and_then(JsonValue::as_str) {
        if let Some(ts) = Timestamp::parse_iso(iso) {
            return Ok(Value::Timestamp(ts));
        }
    }
    map.get(TIMESTAMP_TAG)
        .and_then(JsonValue::as_f64)
        .and_then(Timestamp::from_epoch_seconds)
        .map(Value::Timestamp)
        .ok_or_else(|| {
            CodecError::MalformedTimestamp(format!(
                "neither {ISO_STRING_KEY} nor {TIMESTAMP_TAG} holds a valid instant"
            ))
        })
}

fn decode_geopoint(map: &Map<String, JsonValue>) -> Result<Value, CodecError> {
    let coordinate = |name: &str| {
        map.get(name)
            .and_then(JsonValue::as_f64)
            .ok_or_else(|| CodecError::MalformedGeoPoint(format!("missing numeric {name}")))
    };
    let point = GeoPoint::new(coordinate("latitude")?, coordinate("longitude")?)?;
    Ok(Value::GeoPoint(point))
}

fn decode_reference(path: &JsonValue) -> Result<Value, CodecError> {
    let path = path.as_str().ok_or_else(|| {
        CodecError::MalformedReference(format!(
            "expected a path string, found {}",
            json_type_name(path)
        ))
    })?;
    DocumentReference::parse(path).map(Value::Reference)
}

const fn json_type_name(value: &JsonValue) -> &'static str {
    match value {
        JsonValue::Null => "null",
        JsonValue::Bool(_) => "boolean",
        JsonValue::Number(_) => "number",
        JsonValue::String(_) => "string",
        JsonValue::Array(_) => "array",
        JsonValue::Object(_) => "object",
    }
}
