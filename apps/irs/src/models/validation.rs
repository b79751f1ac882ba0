//! Domain schema checks.
//!
//! Every record, however it was sourced, is deserialized from a
//! `serde_json::Value` and then structurally validated. Closed enums
//! (`status`, `endpoints`) are enforced by deserialization; the remaining
//! rules live in each type's [`Validate`] impl.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use crate::errors::{EntityKind, ValidationError};
use crate::models::{ApiKeyRecord, Intent, IrsRecord};

const UNKNOWN_ID: &str = "<unknown>";

pub trait Validate {
    const ENTITY: EntityKind;

    fn record_id(&self) -> &str;

    fn validate(&self) -> Result<(), ValidationError>;
}

pub(crate) fn require_non_empty(
    entity: EntityKind,
    id: &str,
    field: &str,
    value: &str,
) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let id = if id.trim().is_empty() { UNKNOWN_ID } else { id };
        return Err(ValidationError::new(
            entity,
            id,
            format!("'{field}' must not be empty"),
        ));
    }
    Ok(())
}

/// Field must be present in the document but may be `null`.
pub(crate) fn nullable<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer)
}

pub(crate) fn require_usage_limit(
    entity: EntityKind,
    id: &str,
    limit: Option<f64>,
) -> Result<(), ValidationError> {
    match limit {
        Some(tokens) if !tokens.is_finite() || tokens < 0.0 => Err(ValidationError::new(
            entity,
            id,
            format!("'usage_limit_tokens' must be a non-negative number, got {tokens}"),
        )),
        _ => Ok(()),
    }
}

/// Deserializes and validates a single record.
pub fn parse_record<T>(value: Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let id = document_id(T::ENTITY, &value);
    let record: T = serde_json::from_value(value)
        .map_err(|e| ValidationError::new(T::ENTITY, id, e.to_string()))?;
    record.validate()?;
    Ok(record)
}

/// Like [`parse_record`], for a document looked up by `requested_id`. A store
/// answering with some other record is a data-integrity defect.
pub fn parse_record_for<T>(requested_id: &str, value: Value) -> Result<T, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    let record: T = parse_record(value)?;
    if record.record_id() != requested_id {
        return Err(ValidationError::new(
            T::ENTITY,
            requested_id,
            format!("document holds '{}' instead", record.record_id()),
        ));
    }
    Ok(record)
}

/// Parses a JSON array of records, failing on the first invalid one.
pub fn parse_records<T>(value: Value) -> Result<Vec<T>, ValidationError>
where
    T: DeserializeOwned + Validate,
{
    match value {
        Value::Array(items) => items.into_iter().map(parse_record).collect(),
        _ => Err(ValidationError::new(
            T::ENTITY,
            UNKNOWN_ID,
            "expected a JSON array of records",
        )),
    }
}

pub fn parse_irs_record(value: Value) -> Result<IrsRecord, ValidationError> {
    parse_record(value)
}

pub fn parse_intent(value: Value) -> Result<Intent, ValidationError> {
    parse_record(value)
}

pub fn parse_api_key(value: Value) -> Result<ApiKeyRecord, ValidationError> {
    parse_record(value)
}

fn document_id(entity: EntityKind, value: &Value) -> String {
    let field = match entity {
        EntityKind::ApiKey => "key",
        EntityKind::Irs | EntityKind::Intent => "id",
    };
    value
        .get(field)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .unwrap_or(UNKNOWN_ID)
        .to_string()
}
