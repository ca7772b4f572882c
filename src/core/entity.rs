//! The record abstraction every bound resource implements

use super::error::{ApiError, ApiResult};
use super::pluralize::Pluralizer;
use chrono::Utc;
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use uuid::Uuid;

/// Field holding the creation timestamp, when a record has one
pub const CREATED_AT: &str = "created_at";

/// Field holding the last modification timestamp, when a record has one
pub const UPDATED_AT: &str = "updated_at";

/// A type persisted through the entity store and exposed as a REST resource.
///
/// Records serialize to a flat JSON object whose keys are the table columns.
/// The owner field always holds the id of the local user that created the
/// record and drives default visibility.
///
/// ```rust,ignore
/// #[derive(Clone, Serialize, Deserialize)]
/// struct Note { id: Uuid, owner_id: Uuid, title: String }
///
/// impl Record for Note {
///     fn resource_name() -> &'static str { "note" }
///     fn writable_fields() -> &'static [&'static str] { &["title"] }
///     fn id(&self) -> Uuid { self.id }
///     fn owner_id(&self) -> Uuid { self.owner_id }
/// }
/// ```
pub trait Record: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    /// The singular resource name (e.g., "note", "company")
    fn resource_name() -> &'static str;

    /// The plural resource name used in URLs (e.g., "notes", "companies")
    fn resource_plural() -> String {
        Pluralizer::pluralize(Self::resource_name())
    }

    /// Backing table or collection
    fn table_name() -> String {
        Self::resource_plural()
    }

    /// Column holding the owner reference
    fn owner_field() -> &'static str {
        "owner_id"
    }

    /// Fields a client may set on create and change on update
    fn writable_fields() -> &'static [&'static str];

    /// Get the unique identifier for this record
    fn id(&self) -> Uuid;

    /// Get the id of the local user owning this record
    fn owner_id(&self) -> Uuid;

    /// Reject a record whose fields are inconsistent, before it is stored
    fn validate_fields(&self) -> ApiResult<()> {
        Ok(())
    }
}

/// Extract the writable fields of a client payload
///
/// Keys outside [`Record::writable_fields`] are dropped, so identifiers, owner
/// references and timestamps can never be supplied by a client.
pub fn writable_subset<T: Record>(payload: &Value) -> ApiResult<Map<String, Value>> {
    let object = payload
        .as_object()
        .ok_or_else(|| ApiError::validation("request body must be a JSON object"))?;

    Ok(object
        .iter()
        .filter(|(key, _)| T::writable_fields().contains(&key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect())
}

/// Build a new record from client fields, a fresh id and the acting owner
pub fn new_record<T: Record>(fields: Map<String, Value>, owner: Uuid) -> ApiResult<T> {
    let now = Value::String(Utc::now().to_rfc3339());
    let mut object = fields;
    object.insert("id".to_string(), Value::String(Uuid::new_v4().to_string()));
    object.insert(T::owner_field().to_string(), Value::String(owner.to_string()));
    object.insert(CREATED_AT.to_string(), now.clone());
    object.insert(UPDATED_AT.to_string(), now);

    from_object(object)
}

/// Apply client changes on top of an existing record
pub fn apply_changes<T: Record>(existing: &T, changes: Map<String, Value>) -> ApiResult<T> {
    let mut object = to_object(existing)?;
    object.extend(changes);
    if object.contains_key(UPDATED_AT) {
        object.insert(
            UPDATED_AT.to_string(),
            Value::String(Utc::now().to_rfc3339()),
        );
    }

    from_object(object)
}

/// Serialize a record to its JSON row
pub fn to_object<T: Record>(record: &T) -> ApiResult<Map<String, Value>> {
    match serde_json::to_value(record) {
        Ok(Value::Object(object)) => Ok(object),
        Ok(_) => Err(ApiError::configuration(format!(
            "{} does not serialize to a JSON object",
            T::resource_name()
        ))),
        Err(e) => Err(ApiError::validation(e.to_string())),
    }
}

fn from_object<T: Record>(object: Map<String, Value>) -> ApiResult<T> {
    serde_json::from_value(Value::Object(object))
        .map_err(|e| ApiError::validation(format!("invalid {}: {}", T::resource_name(), e)))
}
