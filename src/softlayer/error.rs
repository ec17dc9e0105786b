//! Error types for the `SoftLayer` client.

use crate::config::ConfigError;
use crate::instance::InstanceSpecError;
use crate::template::TemplateError;
use thiserror::Error;

use super::transport::TransportError;

/// Errors raised by the `SoftLayer` client.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum SoftlayerError {
    /// Raised when the high-level configuration is incomplete.
    #[error("configuration error: {0}")]
    Config(String),
    /// Raised when a call names an HTTP method other than GET, POST or DELETE.
    #[error("undefined request type '{0}', only GET/POST/DELETE are available")]
    UnsupportedMethod(String),
    /// Raised when an instance specification is missing a required field.
    #[error("invalid instance specification: {0}")]
    Validation(String),
    /// Raised when a request body cannot be rendered.
    #[error("request template error: {0}")]
    Template(#[from] TemplateError),
    /// Raised when the HTTP call itself fails.
    #[error(transparent)]
    Transport(#[from] TransportError),
    /// Raised in place of a transport failure once a JSON answer was expected.
    #[error("failed to get a usable HTTP response from SoftLayer for {path}")]
    NoResponse {
        /// API path that was requested.
        path: String,
    },
    /// Raised when a response body is not a JSON object.
    #[error("failed to decode JSON response from SoftLayer: {body} | {message}")]
    Decode {
        /// Raw response body.
        body: String,
        /// Parser diagnostic.
        message: String,
    },
    /// Raised when a decoded response lacks a field the operation needs.
    #[error("response from {path} has no usable `{field}` field")]
    MissingField {
        /// Field that was expected.
        field: String,
        /// API path that was requested.
        path: String,
    },
    /// Raised when the primary IP lookup returns no IPv4 address.
    #[error("instance {instance_id} missing public IPv4 address")]
    MissingPublicIp {
        /// Provider instance identifier.
        instance_id: String,
    },
    /// Raised when an asynchronous operation exceeds the caller's budget.
    #[error("timeout waiting for {action} on instance {instance_id}")]
    Timeout {
        /// Action being waited on.
        action: String,
        /// Provider instance identifier.
        instance_id: String,
    },
    /// Raised when a readiness query fails while polling.
    #[error("provider failure while polling instance {instance_id}: {source}")]
    Provider {
        /// Provider instance identifier.
        instance_id: String,
        /// Failure reported by the poll loop.
        source: Box<SoftlayerError>,
    },
    /// Raised when the poll loop ends without reporting any outcome.
    #[error("readiness poller for instance {instance_id} stopped without a result")]
    PollerAborted {
        /// Provider instance identifier.
        instance_id: String,
    },
}

impl SoftlayerError {
    /// Returns `true` when repeating the operation may succeed.
    ///
    /// Only timeouts qualify: the instance may still become ready. Provider
    /// failures point at a persistent problem and should abort provisioning.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }
}

impl From<ConfigError> for SoftlayerError {
    fn from(value: ConfigError) -> Self {
        Self::Config(value.to_string())
    }
}

impl From<InstanceSpecError> for SoftlayerError {
    fn from(value: InstanceSpecError) -> Self {
        match value {
            InstanceSpecError::Validation(field) => Self::Validation(field),
        }
    }
}
