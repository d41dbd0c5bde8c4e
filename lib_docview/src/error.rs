//! # Error Types
//!
//! Two families of errors cross the public API:
//!
//! - [`FrameworkError`] is raised synchronously by registry lookups (creating a
//!   component, resolving a data provider or a utility).
//! - [`AssetError`] is the rejection value of every
//!   [`AbortableFuture`](crate::core::future::AbortableFuture) handed out by the
//!   scope and the data providers. Transport problems never escape as native
//!   errors; they arrive here already normalized.

use serde_json::{json, Value};
use thiserror::Error;

/// The registry family a failed lookup targeted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FactoryKind {
    /// A presentation or behavior component.
    Component,
    /// A named data provider.
    DataProvider,
    /// A process-wide utility.
    Utility,
}

impl std::fmt::Display for FactoryKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FactoryKind::Component => "component",
            FactoryKind::DataProvider => "data-provider",
            FactoryKind::Utility => "utility",
        };
        f.write_str(label)
    }
}

/// Errors raised by the framework registry and the scope at creation sites.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FrameworkError {
    /// Nothing is registered under the requested name.
    #[error("{kind} not found: {name}")]
    NotFound {
        /// Which registry was consulted.
        kind: FactoryKind,
        /// The name that was looked up.
        name: String,
    },

    /// A utility exists under this name but has another concrete type.
    #[error("utility {name} is not a {expected}")]
    UtilityType {
        /// The utility name.
        name: String,
        /// The type the caller asked for.
        expected: &'static str,
    },
}

impl FrameworkError {
    /// Shorthand for a [`FrameworkError::NotFound`].
    pub fn not_found(kind: FactoryKind, name: &str) -> Self {
        FrameworkError::NotFound {
            kind,
            name: name.to_string(),
        }
    }

    /// True when the error is a missing registration.
    pub fn is_not_found(&self) -> bool {
        matches!(self, FrameworkError::NotFound { .. })
    }
}

/// Rejection reasons of an asset request.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AssetError {
    /// No data provider is registered for the requested model name.
    #[error("data-provider not found")]
    NotFound,

    /// The transport succeeded but delivered a zero-length body.
    #[error("empty response")]
    EmptyResponse {
        /// HTTP status of the response.
        status: u16,
        /// The requested URL.
        resource: String,
    },

    /// The transport reported a failure (non-200 status, network error,
    /// unsupported environment).
    #[error("{status_text}")]
    TransportFailure {
        /// HTTP status, `0` when no response was received.
        status: u16,
        /// Status text as reported by the transport.
        status_text: String,
        /// The requested URL.
        resource: String,
    },

    /// The caller cancelled the request.
    #[error("aborted")]
    Aborted,

    /// Asynchronous work was requested outside a tokio runtime.
    #[error("no async runtime")]
    NoRuntime,
}

impl AssetError {
    /// True for caller-initiated cancellation.
    pub fn is_aborted(&self) -> bool {
        matches!(self, AssetError::Aborted)
    }

    /// The structured `{error, status, resource}` payload broadcast to
    /// components as `asseterror`.
    pub fn to_payload(&self) -> Value {
        match self {
            AssetError::NotFound | AssetError::NoRuntime => json!({ "error": self.to_string() }),
            AssetError::EmptyResponse { status, resource } => json!({
                "error": self.to_string(),
                "status": status,
                "resource": resource,
            }),
            AssetError::TransportFailure {
                status,
                status_text,
                resource,
            } => json!({
                "error": status_text,
                "status": status,
                "resource": resource,
            }),
            AssetError::Aborted => Value::Null,
        }
    }
}

/// Errors produced while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("I/O error occurred: {0}")]
    IoError(#[from] std::io::Error),

    /// The document is not valid JSON5 or does not match the schema.
    #[error("Invalid configuration: {0}")]
    Parse(#[from] json5::Error),

    /// A configured URL cannot be parsed.
    #[error("Invalid URL {value}: {source}")]
    Url {
        /// The offending value.
        value: String,
        /// The parser error.
        source: url::ParseError,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_is_stable() {
        assert_eq!(AssetError::NotFound.to_string(), "data-provider not found");
    }

    #[test]
    fn payload_carries_status_and_resource() {
        let err = AssetError::EmptyResponse {
            status: 200,
            resource: "http://docs.test/1.svg".into(),
        };
        let payload = err.to_payload();
        assert_eq!(payload["error"], "empty response");
        assert_eq!(payload["status"], 200);
        assert_eq!(payload["resource"], "http://docs.test/1.svg");

        let failure = AssetError::TransportFailure {
            status: 404,
            status_text: "Not Found".into(),
            resource: "http://docs.test/2.svg".into(),
        };
        assert_eq!(failure.to_payload()["error"], "Not Found");
        assert!(AssetError::Aborted.to_payload().is_null());
    }

    #[test]
    fn framework_error_names_kind() {
        let err = FrameworkError::not_found(FactoryKind::DataProvider, "page-svg");
        assert!(err.is_not_found());
        assert_eq!(err.to_string(), "data-provider not found: page-svg");
    }
}
