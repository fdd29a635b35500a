use thiserror::Error;

/// Errors raised by a data source while talking to the backing store
#[derive(Error, Debug)]
pub enum QueryError {
    /// Store unreachable, or the credentials were refused
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// The store rejected or failed a rows/count query
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// Column introspection failed
    #[error("Schema error: {0}")]
    SchemaError(String),

    /// Connection settings are incomplete or malformed
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),

    /// Response from the store could not be decoded
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl QueryError {
    pub fn invalid_configuration(msg: impl Into<String>) -> Self {
        QueryError::InvalidConfiguration(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, QueryError>;

/// Rejections produced while compiling request parameters into a plan.
///
/// These are always the caller's fault and never involve the backing store.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Column '{column}' does not exist")]
    UnknownColumn { column: String },

    #[error("Invalid columns in select: {}", columns.join(", "))]
    InvalidSelect { columns: Vec<String> },

    #[error("Unknown operator '{operator}' in parameter '{key}'")]
    UnknownOperator { operator: String, key: String },

    #[error("Invalid value '{value}' for operator '{operator}' on column '{column}'; expected {expected}")]
    InvalidOperand {
        operator: String,
        column: String,
        value: String,
        expected: &'static str,
    },

    #[error("Invalid value '{value}' for parameter '{parameter}'; expected {expected}")]
    InvalidParameter {
        parameter: &'static str,
        value: String,
        expected: &'static str,
    },

    #[error("Schema is unknown; column '{column}' cannot be validated")]
    SchemaUnavailable { column: String },
}

impl ValidationError {
    /// Column names this error is about, if any
    pub fn columns(&self) -> Vec<&str> {
        match self {
            ValidationError::UnknownColumn { column }
            | ValidationError::InvalidOperand { column, .. }
            | ValidationError::SchemaUnavailable { column } => vec![column.as_str()],
            ValidationError::InvalidSelect { columns } => {
                columns.iter().map(String::as_str).collect()
            }
            ValidationError::UnknownOperator { .. } | ValidationError::InvalidParameter { .. } => {
                Vec::new()
            }
        }
    }
}
