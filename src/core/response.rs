//! The JSON envelope wrapped around every response body

use super::query::PaginationMeta;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};

/// `{ "success": bool, "message": string, "data": ... }`
///
/// List responses additionally carry a `pagination` block and failures carry
/// a machine-readable `code`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: Option<T>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination: Option<PaginationMeta>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

impl<T> Envelope<T> {
    pub fn success(message: impl Into<String>, data: T) -> Self {
        Self {
            success: true,
            message: message.into(),
            data: Some(data),
            pagination: None,
            code: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            pagination: None,
            code: None,
        }
    }

    pub fn with_pagination(mut self, meta: PaginationMeta) -> Self {
        self.pagination = Some(meta);
        self
    }

    pub fn with_code(mut self, code: &str) -> Self {
        self.code = Some(code.to_string());
        self
    }
}

/// An envelope paired with the status it is sent with
pub struct Reply<T> {
    pub status: StatusCode,
    pub envelope: Envelope<T>,
}

impl<T> Reply<T> {
    pub fn ok(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::OK,
            envelope: Envelope::success(message, data),
        }
    }

    pub fn created(message: impl Into<String>, data: T) -> Self {
        Self {
            status: StatusCode::CREATED,
            envelope: Envelope::success(message, data),
        }
    }

    pub fn with_pagination(mut self, meta: PaginationMeta) -> Self {
        self.envelope = self.envelope.with_pagination(meta);
        self
    }
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_success_envelope_shape() {
        let envelope = Envelope::success("note created", json!({"title": "a"}));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(
            value,
            json!({"success": true, "message": "note created", "data": {"title": "a"}})
        );
    }

    #[test]
    fn test_failure_envelope_has_null_data() {
        let value = serde_json::to_value(Envelope::<()>::failure("nope")).unwrap();
        assert_eq!(value["success"], false);
        assert!(value["data"].is_null());
        assert!(value.get("pagination").is_none());
    }

    #[test]
    fn test_paginated_envelope() {
        let envelope = Envelope::success("ok", vec![1, 2]).with_pagination(PaginationMeta::new(1, 2, 5));
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["pagination"]["total"], 5);
        assert_eq!(value["pagination"]["total_pages"], 3);
    }
}
