//! Shared error type across rpcmetrics crates.

use thiserror::Error;

use crate::protocol::Operation;

/// Client-facing error codes (stable API).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientCode {
    /// Invalid input / malformed request.
    BadRequest,
    /// Declaration carries an unknown collector type.
    InvalidType,
    /// Declaration is structurally invalid (buckets, objectives).
    InvalidDeclaration,
    /// Collector with the same key is already declared.
    AlreadyExists,
    /// Exposition sink refused the collector.
    RegistrationFailure,
    /// No collector under the requested key.
    NotFound,
    /// Vector collector addressed without matching label values.
    MissingLabels,
    /// Operation not valid for the collector's type/shape.
    UnsupportedOperation,
    /// Value rejected by the collector (e.g. negative counter increment).
    InvalidValue,
    /// Unsupported config version.
    UnsupportedVersion,
    /// Internal server error.
    Internal,
}

impl ClientCode {
    /// String representation used in JSON responses.
    pub fn as_str(self) -> &'static str {
        match self {
            ClientCode::BadRequest => "BAD_REQUEST",
            ClientCode::InvalidType => "INVALID_TYPE",
            ClientCode::InvalidDeclaration => "INVALID_DECLARATION",
            ClientCode::AlreadyExists => "ALREADY_EXISTS",
            ClientCode::RegistrationFailure => "REGISTRATION_FAILURE",
            ClientCode::NotFound => "NOT_FOUND",
            ClientCode::MissingLabels => "MISSING_LABELS",
            ClientCode::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            ClientCode::InvalidValue => "INVALID_VALUE",
            ClientCode::UnsupportedVersion => "UNSUPPORTED_VERSION",
            ClientCode::Internal => "INTERNAL",
        }
    }
}

/// Shared result type.
pub type Result<T> = std::result::Result<T, MetricsError>;

/// Unified error type used by core and server.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("bad request: {0}")]
    BadRequest(String),
    #[error("unknown collector type {ty}, name: {name}")]
    InvalidType { name: String, ty: String },
    #[error("invalid declaration for collector {name}: {reason}")]
    InvalidDeclaration { name: String, reason: String },
    #[error("tried to register existing collector, name: {name}, namespace: {namespace}")]
    AlreadyExists { name: String, namespace: String },
    #[error("failed to register collector, name: {name}, namespace: {namespace}: {reason}")]
    RegistrationFailure {
        name: String,
        namespace: String,
        reason: String,
    },
    #[error("undefined collector, name: {name}, namespace: {namespace}")]
    NotFound { name: String, namespace: String },
    #[error("required {expected} label values for collector, got {got}, name: {name}, namespace: {namespace}")]
    MissingLabels {
        name: String,
        namespace: String,
        expected: usize,
        got: usize,
    },
    #[error("collector doesn't support method '{op}', name: {name}, namespace: {namespace}")]
    UnsupportedOperation {
        name: String,
        namespace: String,
        op: Operation,
    },
    #[error("invalid value {value} for method '{op}', name: {name}, namespace: {namespace}")]
    InvalidValue {
        name: String,
        namespace: String,
        op: Operation,
        value: f64,
    },
    #[error("unsupported config version")]
    UnsupportedVersion,
    #[error("internal: {0}")]
    Internal(String),
}

impl MetricsError {
    /// Map internal error to a stable client-facing code.
    pub fn client_code(&self) -> ClientCode {
        match self {
            MetricsError::BadRequest(_) => ClientCode::BadRequest,
            MetricsError::InvalidType { .. } => ClientCode::InvalidType,
            MetricsError::InvalidDeclaration { .. } => ClientCode::InvalidDeclaration,
            MetricsError::AlreadyExists { .. } => ClientCode::AlreadyExists,
            MetricsError::RegistrationFailure { .. } => ClientCode::RegistrationFailure,
            MetricsError::NotFound { .. } => ClientCode::NotFound,
            MetricsError::MissingLabels { .. } => ClientCode::MissingLabels,
            MetricsError::UnsupportedOperation { .. } => ClientCode::UnsupportedOperation,
            MetricsError::InvalidValue { .. } => ClientCode::InvalidValue,
            MetricsError::UnsupportedVersion => ClientCode::UnsupportedVersion,
            MetricsError::Internal(_) => ClientCode::Internal,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_collector_context() {
        let err = MetricsError::UnsupportedOperation {
            name: "latency".into(),
            namespace: "app".into(),
            op: Operation::Add,
        };
        let msg = err.to_string();
        assert!(msg.contains("'Add'"));
        assert!(msg.contains("latency"));
        assert!(msg.contains("app"));
        assert_eq!(err.client_code().as_str(), "UNSUPPORTED_OPERATION");
    }

    #[test]
    fn not_found_maps_to_stable_code() {
        let err = MetricsError::NotFound {
            name: "x".into(),
            namespace: String::new(),
        };
        assert_eq!(err.client_code(), ClientCode::NotFound);
        assert_eq!(err.client_code().as_str(), "NOT_FOUND");
    }
}
