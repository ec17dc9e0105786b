//! Core library for the `SoftLayer` image builder backend.
//!
//! The crate provisions and tears down virtual guests, SSH keys and captured
//! images through the `SoftLayer` REST API, and waits for a freshly created
//! guest to become usable (powered on, no pending provisioning transaction)
//! within a caller-supplied budget.

pub mod config;
pub mod instance;
pub mod softlayer;
pub mod template;
pub mod test_support;

pub use config::{ConfigError, SoftlayerConfig};
pub use instance::{BootImage, InstanceSpec, InstanceSpecBuilder, InstanceSpecError, sanitize_name};
pub use softlayer::{
    Credentials, DEFAULT_API_HOST, DecodedResponse, Deletion, HttpMethod, ImageId, InstanceId,
    ReqwestTransport, ResourceKind, SoftlayerClient, SoftlayerError, SshKeyId, Transport,
    TransportError,
};
pub use template::{TemplateError, TemplateId, TemplateRenderer, TemplateSet};
