use std::collections::BTreeMap;

use axum::http::header::{HeaderValue, CONTENT_TYPE};
use axum::http::StatusCode;
use axum::{response::IntoResponse, Json};
use serde::Serialize;
use serde_json::Value;
use utoipa::ToSchema;

pub const PROBLEM_CONTENT_TYPE: &str = "application/problem+json";

/// Wire shape of an error body, following RFC 7807.
///
/// Only used to document error responses in the OpenAPI schema; handlers build
/// errors through [`Problem`].
#[derive(Debug, Clone, Serialize, ToSchema)]
#[schema(example = json!({
    "type": "/probs/bad-request",
    "title": "Bad Request",
    "detail": "Column 'foo' does not exist",
    "table": "orders",
    "columns": ["foo"],
    "error_code": "VALIDATION_ERROR",
    "timestamp": "2025-01-01T00:00:00+00:00"
}))]
pub struct ProblemDetails {
    /// Problem category, e.g. `/probs/bad-request`
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_url: Option<String>,
    /// Fixed summary for the category
    pub title: String,
    /// What went wrong with this request
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Request path the problem refers to, when set
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Extension members such as `error_code`, `table` or `columns`
    #[schema(additional_properties = true)]
    pub extensions: BTreeMap<String, Value>,
}

/// An error response on its way to the client.
///
/// The standard members are typed; everything else lands in `extensions` and is
/// flattened into the top-level JSON object.
#[derive(Debug, Clone, Serialize)]
pub struct Problem {
    #[serde(skip)]
    pub status_code: StatusCode,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    type_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    instance: Option<String>,
    #[serde(flatten)]
    extensions: BTreeMap<String, Value>,
}

/// Create an empty `Problem` for a status code.
pub fn new<S>(status_code: S) -> Problem
where
    S: Into<StatusCode>,
{
    Problem {
        status_code: status_code.into(),
        type_uri: None,
        title: None,
        detail: None,
        instance: None,
        extensions: BTreeMap::new(),
    }
}

impl Problem {
    pub fn with_type(mut self, value: impl Into<String>) -> Self {
        self.type_uri = Some(value.into());
        self
    }

    pub fn with_title(mut self, value: impl Into<String>) -> Self {
        self.title = Some(value.into());
        self
    }

    pub fn with_detail(mut self, value: impl Into<String>) -> Self {
        self.detail = Some(value.into());
        self
    }

    pub fn with_instance(mut self, value: impl Into<String>) -> Self {
        self.instance = Some(value.into());
        self
    }

    /// Add an extension member. Standard member names are reserved.
    pub fn with_value<V>(mut self, key: &str, value: V) -> Self
    where
        V: Into<Value>,
    {
        if !matches!(key, "type" | "title" | "detail" | "instance") {
            self.extensions.insert(key.to_owned(), value.into());
        }
        self
    }

    pub fn type_uri(&self) -> Option<&str> {
        self.type_uri.as_deref()
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    pub fn instance(&self) -> Option<&str> {
        self.instance.as_deref()
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.extensions.get(key)
    }

    fn is_empty(&self) -> bool {
        self.type_uri.is_none()
            && self.title.is_none()
            && self.detail.is_none()
            && self.instance.is_none()
            && self.extensions.is_empty()
    }
}

impl<S> From<S> for Problem
where
    S: Into<StatusCode>,
{
    fn from(status_code: S) -> Self {
        new(status_code.into())
    }
}

/// Handler result whose error renders as problem+json.
pub type Result<T> = std::result::Result<T, Problem>;

impl IntoResponse for Problem {
    fn into_response(self) -> axum::response::Response {
        if self.is_empty() {
            return self.status_code.into_response();
        }

        let status = self.status_code;
        let mut response = (status, Json(self)).into_response();
        response.headers_mut().insert(
            CONTENT_TYPE,
            HeaderValue::from_static(PROBLEM_CONTENT_TYPE),
        );
        response
    }
}
