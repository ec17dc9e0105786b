//! HTTP transport used by the client.
//!
//! The client only needs "send bytes, get bytes back", so the seam is a small
//! object-safe trait. [`ReqwestTransport`] is the production implementation;
//! tests inject scripted doubles.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use super::SoftlayerError;

/// HTTP methods the `SoftLayer` REST API is called with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum HttpMethod {
    /// `GET`
    Get,
    /// `POST`
    Post,
    /// `DELETE`
    Delete,
}

impl HttpMethod {
    /// Upper-case method name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Get => "GET",
            Self::Post => "POST",
            Self::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = SoftlayerError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "GET" => Ok(Self::Get),
            "POST" => Ok(Self::Post),
            "DELETE" => Ok(Self::Delete),
            _ => Err(SoftlayerError::UnsupportedMethod(value.to_owned())),
        }
    }
}

/// Network-level failure, raised before any response body was read.
#[derive(Clone, Debug, Error, Eq, PartialEq)]
#[error("transport failure: {message}")]
pub struct TransportError {
    /// Description of the underlying cause.
    pub message: String,
}

impl TransportError {
    /// Creates an error from a description of the cause.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(value: reqwest::Error) -> Self {
        Self::new(value.to_string())
    }
}

/// Future returned by [`Transport::send`].
pub type TransportFuture<'a> =
    Pin<Box<dyn Future<Output = Result<Vec<u8>, TransportError>> + Send + 'a>>;

/// Issues a single HTTP request and returns the full response body.
pub trait Transport: Send + Sync {
    /// Sends `body` (if any) to `url` and returns the raw response bytes.
    ///
    /// Implementations make exactly one attempt.
    fn send<'a>(
        &'a self,
        method: HttpMethod,
        url: &'a str,
        body: Option<Vec<u8>>,
    ) -> TransportFuture<'a>;
}

/// [`Transport`] backed by a shared `reqwest` connection pool.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    http: reqwest::Client,
}

impl ReqwestTransport {
    /// Builds a transport whose requests time out after `timeout`.
    ///
    /// Proxy settings are taken from the environment.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] when the TLS backend cannot be initialised.
    pub fn new(timeout: Duration) -> Result<Self, TransportError> {
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { http })
    }
}

impl Transport for ReqwestTransport {
    fn send<'a>(
        &'a self,
        method: HttpMethod,
        url: &'a str,
        body: Option<Vec<u8>>,
    ) -> TransportFuture<'a> {
        Box::pin(async move {
            let mut request = match method {
                HttpMethod::Get => self.http.get(url),
                HttpMethod::Post => self.http.post(url),
                HttpMethod::Delete => self.http.delete(url),
            };
            if let Some(payload) = body {
                request = request
                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                    .body(payload);
            }

            let response = request.send().await?;
            // `bytes` consumes the response, releasing the connection whatever
            // the body turns out to contain.
            let payload = response.bytes().await?;
            Ok(payload.to_vec())
        })
    }
}
