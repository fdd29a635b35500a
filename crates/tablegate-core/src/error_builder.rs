use std::fmt;

use axum::http::StatusCode;
use serde::Serialize;

use crate::problemdetails::{self, Problem};

/// Machine-readable error categories carried in every problem body as `error_code`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Unauthorized,
    NotFound,
    Validation,
    Backend,
    Unavailable,
    Internal,
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "UNAUTHORIZED",
            ErrorCode::NotFound => "NOT_FOUND",
            ErrorCode::Validation => "VALIDATION_ERROR",
            ErrorCode::Backend => "BACKEND_ERROR",
            ErrorCode::Unavailable => "SERVICE_UNAVAILABLE",
            ErrorCode::Internal => "INTERNAL_ERROR",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ErrorCode::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorCode::NotFound => StatusCode::NOT_FOUND,
            ErrorCode::Validation => StatusCode::BAD_REQUEST,
            ErrorCode::Backend => StatusCode::BAD_GATEWAY,
            ErrorCode::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Relative URI used as the problem `type`
    pub fn type_uri(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "/probs/unauthorized",
            ErrorCode::NotFound => "/probs/not-found",
            ErrorCode::Validation => "/probs/bad-request",
            ErrorCode::Backend => "/probs/bad-gateway",
            ErrorCode::Unavailable => "/probs/service-unavailable",
            ErrorCode::Internal => "/probs/internal-server-error",
        }
    }

    pub fn title(&self) -> &'static str {
        match self {
            ErrorCode::Unauthorized => "Unauthorized",
            ErrorCode::NotFound => "Resource Not Found",
            ErrorCode::Validation => "Bad Request",
            ErrorCode::Backend => "Bad Gateway",
            ErrorCode::Unavailable => "Service Unavailable",
            ErrorCode::Internal => "Internal Server Error",
        }
    }

    fn default_detail(&self) -> Option<&'static str> {
        match self {
            ErrorCode::Unauthorized => {
                Some("A valid X-API-Key header is required to access this resource")
            }
            ErrorCode::Validation => Some("The request was malformed or invalid"),
            ErrorCode::Backend => Some("The backing store failed to answer the query"),
            ErrorCode::Internal => {
                Some("An unexpected error occurred while processing your request")
            }
            ErrorCode::NotFound | ErrorCode::Unavailable => None,
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Incrementally builds a [`Problem`] for one error category.
///
/// Status, `type`, `title` and `error_code` come from the [`ErrorCode`]; callers add
/// the occurrence-specific `detail`, `instance` and extension members.
pub struct ErrorBuilder {
    code: ErrorCode,
    problem: Problem,
}

impl ErrorBuilder {
    pub fn new(code: ErrorCode) -> Self {
        let mut problem = problemdetails::new(code.status())
            .with_type(code.type_uri())
            .with_title(code.title())
            .with_value("error_code", code.as_str());
        if let Some(detail) = code.default_detail() {
            problem = problem.with_detail(detail);
        }
        Self { code, problem }
    }

    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Replace the category title with a more specific one
    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.problem = self.problem.with_title(title);
        self
    }

    pub fn detail(mut self, detail: impl Into<String>) -> Self {
        self.problem = self.problem.with_detail(detail);
        self
    }

    pub fn instance(mut self, instance: impl Into<String>) -> Self {
        self.problem = self.problem.with_instance(instance);
        self
    }

    /// Attach an extension member. Values that fail to serialize are dropped.
    pub fn value<T: Serialize>(mut self, key: &str, value: T) -> Self {
        if let Ok(value) = serde_json::to_value(value) {
            self.problem = self.problem.with_value(key, value);
        }
        self
    }

    pub fn build(self) -> Problem {
        self.problem
            .with_value("timestamp", chrono::Utc::now().to_rfc3339())
    }
}

pub fn unauthorized() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::Unauthorized)
}

pub fn not_found() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::NotFound)
}

pub fn bad_request() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::Validation)
}

pub fn bad_gateway() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::Backend)
}

pub fn service_unavailable() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::Unavailable)
}

pub fn internal_server_error() -> ErrorBuilder {
    ErrorBuilder::new(ErrorCode::Internal)
}
