//! Client for the `SoftLayer` REST API.
//!
//! Every resource operation follows the same pipeline: render a request body
//! from a template, send it through the injected [`Transport`], then decode
//! the answer. Waiting for a new instance to become usable lives in
//! [`readiness`].

mod decode;
mod error;
mod operations;
pub mod readiness;
mod transport;
mod types;

use std::sync::Arc;
use std::time::Duration;

use camino::Utf8Path;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SoftlayerConfig;
use crate::template::{TemplateError, TemplateId, TemplateRenderer, TemplateSet};

pub use decode::{DecodedResponse, decode_object};
pub use error::SoftlayerError;
pub use operations::{captured_image_id, created_instance_id, extract_ipv4};
pub use transport::{HttpMethod, ReqwestTransport, Transport, TransportError, TransportFuture};
pub use types::{Deletion, ImageId, InstanceId, ResourceKind, SshKeyId};

/// Host and path prefix of the public REST endpoint.
pub const DEFAULT_API_HOST: &str = "api.softlayer.com/rest/v3";
pub(crate) const POLL_INTERVAL: Duration = Duration::from_secs(3);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// API user name and key embedded in every request target.
#[derive(Clone, Eq, PartialEq)]
pub struct Credentials {
    username: String,
    api_key: String,
}

impl Credentials {
    /// Creates credentials from a user name and API key.
    pub fn new(username: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            api_key: api_key.into(),
        }
    }

    /// Returns the API user name.
    #[must_use]
    pub fn username(&self) -> &str {
        &self.username
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// Client that provisions instances, SSH keys and images.
///
/// Cloning is cheap: the transport and templates are shared.
#[derive(Clone)]
pub struct SoftlayerClient {
    transport: Arc<dyn Transport>,
    templates: Arc<dyn TemplateRenderer>,
    credentials: Credentials,
    api_host: String,
    poll_interval: Duration,
}

impl SoftlayerClient {
    /// Builds a client from configuration, using [`ReqwestTransport`] and the
    /// configured (or built-in) templates.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Config`] when the configuration fails
    /// validation, [`SoftlayerError::Template`] when the templates cannot be
    /// loaded and [`SoftlayerError::Transport`] when the HTTP client cannot be
    /// built.
    pub fn new(config: &SoftlayerConfig) -> Result<Self, SoftlayerError> {
        config.validate()?;
        let templates =
            TemplateSet::from_optional_dir(config.template_dir.as_deref().map(Utf8Path::new))?;
        let transport = ReqwestTransport::new(config.request_timeout())?;
        Ok(Self::with_parts(
            Credentials::new(&config.username, &config.api_key),
            &config.api_host,
            Arc::new(transport),
            Arc::new(templates),
        )
        .with_poll_interval(config.poll_interval()))
    }

    /// Builds a client from explicit collaborators.
    pub fn with_parts(
        credentials: Credentials,
        api_host: impl Into<String>,
        transport: Arc<dyn Transport>,
        templates: Arc<dyn TemplateRenderer>,
    ) -> Self {
        Self {
            transport,
            templates,
            credentials,
            api_host: api_host.into().trim_matches('/').to_owned(),
            poll_interval: POLL_INTERVAL,
        }
    }

    /// Builds a client on the public endpoint with a default
    /// [`ReqwestTransport`] and the built-in templates.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError`] when the templates or HTTP client cannot be
    /// initialised.
    pub fn with_credentials(credentials: Credentials) -> Result<Self, SoftlayerError> {
        let templates = TemplateSet::builtin()?;
        let transport = ReqwestTransport::new(REQUEST_TIMEOUT)?;
        Ok(Self::with_parts(
            credentials,
            DEFAULT_API_HOST,
            Arc::new(transport),
            Arc::new(templates),
        ))
    }

    /// Overrides the delay between readiness checks.
    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    /// Delay between readiness checks.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    fn url(&self, path: &str) -> String {
        format!(
            "https://{}:{}@{}/{}",
            self.credentials.username, self.credentials.api_key, self.api_host, path
        )
    }

    fn redacted_url(&self, path: &str) -> String {
        format!(
            "https://{}:<redacted>@{}/{}",
            self.credentials.username, self.api_host, path
        )
    }

    /// Renders `template` with `data` and logs the resulting body.
    pub(crate) fn render_body<T: Serialize>(
        &self,
        template: TemplateId,
        data: &T,
    ) -> Result<Vec<u8>, SoftlayerError> {
        let value = serde_json::to_value(data).map_err(|err| TemplateError::Serialize {
            template,
            message: err.to_string(),
        })?;
        let body = self.templates.render(template, &value)?;
        debug!(
            template = %template,
            body = %String::from_utf8_lossy(&body),
            "generated request body"
        );
        Ok(body)
    }

    /// Sends one request and returns the raw response body.
    pub(crate) async fn send_raw(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SoftlayerError> {
        debug!(%method, target = %self.redacted_url(path), "sending request to SoftLayer");
        let url = self.url(path);
        let response = self.transport.send(method, &url, body).await?;
        debug!(
            %method,
            path,
            body = %String::from_utf8_lossy(&response),
            "received response from SoftLayer"
        );
        Ok(response)
    }

    /// Sends one request whose answer is expected to be JSON and returns the
    /// undecoded body.
    ///
    /// Transport failures are reported as [`SoftlayerError::NoResponse`].
    pub(crate) async fn fetch(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<Vec<u8>, SoftlayerError> {
        match self.send_raw(method, path, body).await {
            Err(SoftlayerError::Transport(err)) => {
                warn!(%method, path, error = %err, "no usable response from SoftLayer");
                Err(SoftlayerError::NoResponse {
                    path: path.to_owned(),
                })
            }
            other => other,
        }
    }

    /// Sends one request and decodes the response as a JSON object.
    ///
    /// Transport failures are reported as [`SoftlayerError::NoResponse`].
    pub(crate) async fn send(
        &self,
        method: HttpMethod,
        path: &str,
        body: Option<Vec<u8>>,
    ) -> Result<DecodedResponse, SoftlayerError> {
        let response = self.fetch(method, path, body).await?;
        decode_object(&response)
    }
}
