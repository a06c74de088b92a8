//! Core data types: field values, extended types, document snapshots, paths.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::{CodecError, StoreError};

/// Field name to value mapping: the payload of a document or a nested map.
pub type Fields = BTreeMap<String, Value>;

/// An instant in time with nanosecond precision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timestamp(DateTime<Utc>);

impl Timestamp {
    #[must_use]
    pub const fn new(instant: DateTime<Utc>) -> Self {
        Self(instant)
    }

    #[must_use]
    pub fn now() -> Self {
        Self(Utc::now())
    }

    /// Build from whole seconds and nanoseconds since the Unix epoch.
    #[must_use]
    pub fn from_unix(seconds: i64, nanos: u32) -> Option<Self> {
        Utc.timestamp_opt(seconds, nanos).single().map(Self)
    }

    /// Build from fractional seconds since the Unix epoch.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_epoch_seconds(seconds: f64) -> Option<Self> {
        if !seconds.is_finite() {
            return None;
        }
        let whole = seconds.floor();
        let nanos = ((seconds - whole) * 1e9).round().min(999_999_999.0) as u32;
        Self::from_unix(whole as i64, nanos)
    }

    #[must_use]
    pub const fn as_datetime(&self) -> &DateTime<Utc> {
        &self.0
    }

    /// Seconds since the Unix epoch as a float (sub-microsecond precision is lost).
    #[must_use]
    pub fn epoch_seconds(&self) -> f64 {
        self.0.timestamp() as f64 + f64::from(self.0.timestamp_subsec_nanos()) / 1e9
    }

    /// ISO-8601 rendering with an explicit `+00:00` offset.
    #[must_use]
    pub fn to_iso_string(&self) -> String {
        self.0.to_rfc3339_opts(SecondsFormat::AutoSi, false)
    }

    /// Parse an RFC 3339 / ISO-8601 string with an offset.
    #[must_use]
    pub fn parse_iso(value: &str) -> Option<Self> {
        DateTime::parse_from_rfc3339(value)
            .ok()
            .map(|dt| Self(dt.with_timezone(&Utc)))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_iso_string())
    }
}

/// A geographic point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    /// Create a point, checking both coordinates are finite and in range.
    ///
    /// # Errors
    ///
    /// Returns `MalformedGeoPoint` if latitude is outside [-90, 90] or
    /// longitude outside [-180, 180].
    pub fn new(latitude: f64, longitude: f64) -> Result<Self, CodecError> {
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(CodecError::MalformedGeoPoint(format!(
                "latitude {latitude} is outside [-90, 90]"
            )));
        }
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(CodecError::MalformedGeoPoint(format!(
                "longitude {longitude} is outside [-180, 180]"
            )));
        }
        Ok(Self {
            latitude,
            longitude,
        })
    }
}

/// A pointer to another document by its absolute path.
///
/// The path is stored as inert text; nothing is resolved or followed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DocumentReference {
    path: String,
}

impl DocumentReference {
    /// Parse a document path such as `users/u1` or `users/u1/orders/o1`.
    ///
    /// # Errors
    ///
    /// Returns `MalformedReference` if the path is empty, has an empty
    /// segment, or names a collection instead of a document.
    pub fn parse(path: &str) -> Result<Self, CodecError> {
        let segments =
            split_path(path).map_err(|e| CodecError::MalformedReference(e.to_string()))?;
        if segments.len() % 2 != 0 {
            return Err(CodecError::MalformedReference(format!(
                "'{path}' points at a collection, not a document"
            )));
        }
        Ok(Self {
            path: path.to_string(),
        })
    }

    #[must_use]
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Last path segment.
    #[must_use]
    pub fn id(&self) -> &str {
        self.path.rsplit('/').next().unwrap_or_default()
    }

    /// Path of the collection holding this document.
    #[must_use]
    pub fn parent(&self) -> &str {
        self.path.rsplit_once('/').map_or("", |(parent, _)| parent)
    }
}

impl fmt::Display for DocumentReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)
    }
}

/// A dynamically-typed field value.
///
/// The variant set is closed: every value the store can hold is one of these,
/// so conversions to and from the backup format are exhaustive matches.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    #[default]
    Null,
    Boolean(bool),
    Integer(i64),
    Double(f64),
    String(String),
    Array(Vec<Self>),
    Map(Fields),
    Timestamp(Timestamp),
    GeoPoint(GeoPoint),
    Reference(DocumentReference),
    /// Placeholder for "the commit time assigned by the store".
    ServerTimestamp,
}

impl Value {
    /// Short type name for diagnostics.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Boolean(_) => "boolean",
            Self::Integer(_) => "integer",
            Self::Double(_) => "double",
            Self::String(_) => "string",
            Self::Array(_) => "array",
            Self::Map(_) => "map",
            Self::Timestamp(_) => "timestamp",
            Self::GeoPoint(_) => "geopoint",
            Self::Reference(_) => "reference",
            Self::ServerTimestamp => "server_timestamp",
        }
    }

    /// True if this value or anything nested in it is a `ServerTimestamp`.
    #[must_use]
    pub fn contains_server_timestamp(&self) -> bool {
        match self {
            Self::ServerTimestamp => true,
            Self::Array(items) => items.iter().any(Self::contains_server_timestamp),
            Self::Map(fields) => fields.values().any(Self::contains_server_timestamp),
            _ => false,
        }
    }

    /// Replace every `ServerTimestamp` with the given commit instant.
    #[must_use]
    pub fn resolve_server_timestamps(self, commit_time: Timestamp) -> Self {
        match self {
            Self::ServerTimestamp => Self::Timestamp(commit_time),
            Self::Array(items) => Self::Array(
                items
                    .into_iter()
                    .map(|item| item.resolve_server_timestamps(commit_time))
                    .collect(),
            ),
            Self::Map(fields) => Self::Map(
                fields
                    .into_iter()
                    .map(|(k, v)| (k, v.resolve_server_timestamps(commit_time)))
                    .collect(),
            ),
            other => other,
        }
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Boolean(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Double(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<Timestamp> for Value {
    fn from(value: Timestamp) -> Self {
        Self::Timestamp(value)
    }
}

impl From<GeoPoint> for Value {
    fn from(value: GeoPoint) -> Self {
        Self::GeoPoint(value)
    }
}

impl From<DocumentReference> for Value {
    fn from(value: DocumentReference) -> Self {
        Self::Reference(value)
    }
}

impl From<Fields> for Value {
    fn from(value: Fields) -> Self {
        Self::Map(value)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    fn from(value: Vec<T>) -> Self {
        Self::Array(value.into_iter().map(Into::into).collect())
    }
}

/// A document as read from the store.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocumentSnapshot {
    pub id: String,
    pub fields: Fields,
    pub create_time: Option<Timestamp>,
    pub update_time: Option<Timestamp>,
}

// ============================================================================
// Paths
// ============================================================================

/// Join a child segment onto a collection or document path.
#[must_use]
pub fn child_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else {
        format!("{parent}/{segment}")
    }
}

/// Split a slash-separated path, rejecting empty paths and empty segments.
///
/// # Errors
///
/// Returns `InvalidPath` if the path or any segment is empty.
pub fn split_path(path: &str) -> Result<Vec<&str>, StoreError> {
    if path.is_empty() {
        return Err(StoreError::invalid_path(path, "path is empty"));
    }
    let segments: Vec<&str> = path.split('/').collect();
    if segments.iter().any(|s| s.is_empty()) {
        return Err(StoreError::invalid_path(path, "path has an empty segment"));
    }
    Ok(segments)
}

/// Build a `Fields` map from `(name, value)` pairs.
pub fn fields<K, V, I>(pairs: I) -> Fields
where
    K: Into<String>,
    V: Into<Value>,
    I: IntoIterator<Item = (K, V)>,
{
    pairs
        .into_iter()
        .map(|(k, v)| (k.into(), v.into()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_iso_has_explicit_offset() {
        let ts = Timestamp::from_unix(1_704_110_400, 0).unwrap();
        assert_eq!(ts.to_iso_string(), "2024-01-01T12:00:00+00:00");
    }

    #[test]
    fn test_timestamp_epoch_seconds_keeps_fraction() {
        let ts = Timestamp::from_unix(10, 500_000_000).unwrap();
        assert!((ts.epoch_seconds() - 10.5).abs() < f64::EPSILON);
        assert_eq!(Timestamp::from_epoch_seconds(10.5), Some(ts));
    }

    #[test]
    fn test_geopoint_rejects_out_of_range() {
        assert!(GeoPoint::new(91.0, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -181.0).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
        assert!(GeoPoint::new(45.5, -122.6).is_ok());
    }

    #[test]
    fn test_reference_requires_document_path() {
        let r = DocumentReference::parse("users/u1/orders/o1").unwrap();
        assert_eq!(r.id(), "o1");
        assert_eq!(r.parent(), "users/u1/orders");

        assert!(DocumentReference::parse("users").is_err());
        assert!(DocumentReference::parse("").is_err());
        assert!(DocumentReference::parse("users//u1").is_err());
    }

    #[test]
    fn test_resolve_server_timestamps_nested() {
        let commit = Timestamp::from_unix(100, 0).unwrap();
        let value = Value::Map(fields([(
            "audit",
            Value::Array(vec![Value::ServerTimestamp, Value::Integer(1)]),
        )]));
        assert!(value.contains_server_timestamp());

        let resolved = value.resolve_server_timestamps(commit);
        assert!(!resolved.contains_server_timestamp());
        assert_eq!(
            resolved,
            Value::Map(fields([(
                "audit",
                Value::Array(vec![Value::Timestamp(commit), Value::Integer(1)]),
            )]))
        );
    }

    #[test]
    fn test_child_path() {
        assert_eq!(child_path("", "users"), "users");
        assert_eq!(child_path("users", "u1"), "users/u1");
    }
}
