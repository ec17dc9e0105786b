//! Instance specification consumed by the create-instance operation.
//!
//! The provider restricts host names and domains to letters, digits, hyphens
//! and dots. [`InstanceSpec::sanitized`] strips everything else before the
//! specification is rendered into a request body.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use thiserror::Error;

use crate::softlayer::SshKeyId;

#[expect(clippy::expect_used, reason = "pattern is a compile-time constant")]
static INVALID_NAME_CHARS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[^A-Za-z0-9.\-]+").expect("valid host name pattern")
});

/// Removes every character outside `[A-Za-z0-9-.]`.
///
/// The operation is idempotent: sanitizing an already sanitized value returns
/// it unchanged.
#[must_use]
pub fn sanitize_name(value: &str) -> String {
    INVALID_NAME_CHARS.replace_all(value, "").into_owned()
}

/// Image the instance boots from.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum BootImage {
    /// Global identifier of a block-device template group (a captured image).
    Template(String),
    /// Operating system reference code, for example `UBUNTU_LATEST`.
    OperatingSystem(String),
}

/// Desired shape of a virtual guest.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSpec {
    /// Host name, sanitized before use.
    pub host_name: String,
    /// Domain, sanitized before use.
    pub domain: String,
    /// Datacenter short name (for example `ams01`).
    pub datacenter: String,
    /// Number of virtual CPUs.
    pub cpus: u32,
    /// Memory in megabytes.
    pub memory_mb: u64,
    /// Bill hourly instead of monthly.
    pub hourly_billing: bool,
    /// Use local disks instead of SAN storage.
    pub local_disk: bool,
    /// Capacity of the first disk in gigabytes.
    pub disk_capacity_gb: u32,
    /// Maximum speed of the network uplink in Mbps.
    pub network_speed_mbps: u32,
    /// SSH key installed on the guest at provisioning time.
    pub provisioning_ssh_key: Option<SshKeyId>,
    /// Image selector.
    pub boot_image: BootImage,
}

/// Errors raised while building an [`InstanceSpec`].
#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum InstanceSpecError {
    /// A required field is empty or zero.
    #[error("missing or empty field: {0}")]
    Validation(String),
}

/// Template data for `virtual_guest/createObject.json`.
#[derive(Serialize)]
#[serde(rename_all = "PascalCase")]
pub(crate) struct InstanceTemplateData<'a> {
    host_name: &'a str,
    domain: &'a str,
    datacenter: &'a str,
    cpus: u32,
    memory: u64,
    hourly_billing_flag: bool,
    local_disk_flag: bool,
    disk_capacity: u32,
    network_speed: u32,
    provisioning_ssh_key_id: Option<u64>,
    base_image_id: Option<&'a str>,
    base_os_code: Option<&'a str>,
}

impl InstanceSpec {
    /// Starts a builder for an [`InstanceSpec`].
    #[must_use]
    pub fn builder() -> InstanceSpecBuilder {
        InstanceSpecBuilder::new()
    }

    /// Returns a copy with host name and domain stripped of invalid characters.
    #[must_use]
    pub fn sanitized(&self) -> Self {
        Self {
            host_name: sanitize_name(&self.host_name),
            domain: sanitize_name(&self.domain),
            ..self.clone()
        }
    }

    /// Validates the specification.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceSpecError::Validation`] naming the first empty or
    /// zero field.
    pub fn validate(&self) -> Result<(), InstanceSpecError> {
        if self.host_name.is_empty() {
            return Err(InstanceSpecError::Validation("host_name".to_owned()));
        }
        if self.domain.is_empty() {
            return Err(InstanceSpecError::Validation("domain".to_owned()));
        }
        if self.datacenter.is_empty() {
            return Err(InstanceSpecError::Validation("datacenter".to_owned()));
        }
        if self.cpus == 0 {
            return Err(InstanceSpecError::Validation("cpus".to_owned()));
        }
        if self.memory_mb == 0 {
            return Err(InstanceSpecError::Validation("memory_mb".to_owned()));
        }
        let image = match &self.boot_image {
            BootImage::Template(id) | BootImage::OperatingSystem(id) => id,
        };
        if image.is_empty() {
            return Err(InstanceSpecError::Validation("boot_image".to_owned()));
        }
        Ok(())
    }

    pub(crate) fn template_data(&self) -> InstanceTemplateData<'_> {
        let (base_image_id, base_os_code) = match &self.boot_image {
            BootImage::Template(id) => (Some(id.as_str()), None),
            BootImage::OperatingSystem(code) => (None, Some(code.as_str())),
        };
        InstanceTemplateData {
            host_name: &self.host_name,
            domain: &self.domain,
            datacenter: &self.datacenter,
            cpus: self.cpus,
            memory: self.memory_mb,
            hourly_billing_flag: self.hourly_billing,
            local_disk_flag: self.local_disk,
            disk_capacity: self.disk_capacity_gb,
            network_speed: self.network_speed_mbps,
            provisioning_ssh_key_id: self.provisioning_ssh_key.map(SshKeyId::get),
            base_image_id,
            base_os_code,
        }
    }
}

/// Builder for [`InstanceSpec`] with the provider's smallest sensible
/// defaults for sizing fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct InstanceSpecBuilder {
    host_name: String,
    domain: String,
    datacenter: String,
    cpus: u32,
    memory_mb: u64,
    hourly_billing: bool,
    local_disk: bool,
    disk_capacity_gb: u32,
    network_speed_mbps: u32,
    provisioning_ssh_key: Option<SshKeyId>,
    boot_image: Option<BootImage>,
}

impl Default for InstanceSpecBuilder {
    fn default() -> Self {
        Self {
            host_name: String::new(),
            domain: String::new(),
            datacenter: String::new(),
            cpus: 1,
            memory_mb: 1024,
            hourly_billing: true,
            local_disk: true,
            disk_capacity_gb: 25,
            network_speed_mbps: 10,
            provisioning_ssh_key: None,
            boot_image: None,
        }
    }
}

impl InstanceSpecBuilder {
    /// Creates a builder with default sizing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the host name.
    #[must_use]
    pub fn host_name(mut self, value: impl Into<String>) -> Self {
        self.host_name = value.into();
        self
    }

    /// Sets the domain.
    #[must_use]
    pub fn domain(mut self, value: impl Into<String>) -> Self {
        self.domain = value.into();
        self
    }

    /// Sets the datacenter.
    #[must_use]
    pub fn datacenter(mut self, value: impl Into<String>) -> Self {
        self.datacenter = value.into();
        self
    }

    /// Sets the CPU count.
    #[must_use]
    pub const fn cpus(mut self, value: u32) -> Self {
        self.cpus = value;
        self
    }

    /// Sets memory in megabytes.
    #[must_use]
    pub const fn memory_mb(mut self, value: u64) -> Self {
        self.memory_mb = value;
        self
    }

    /// Selects hourly (`true`) or monthly billing.
    #[must_use]
    pub const fn hourly_billing(mut self, value: bool) -> Self {
        self.hourly_billing = value;
        self
    }

    /// Selects local (`true`) or SAN disks.
    #[must_use]
    pub const fn local_disk(mut self, value: bool) -> Self {
        self.local_disk = value;
        self
    }

    /// Sets the first disk's capacity in gigabytes.
    #[must_use]
    pub const fn disk_capacity_gb(mut self, value: u32) -> Self {
        self.disk_capacity_gb = value;
        self
    }

    /// Sets the uplink speed in Mbps.
    #[must_use]
    pub const fn network_speed_mbps(mut self, value: u32) -> Self {
        self.network_speed_mbps = value;
        self
    }

    /// Sets the optional provisioning SSH key.
    #[must_use]
    pub const fn provisioning_ssh_key(mut self, value: Option<SshKeyId>) -> Self {
        self.provisioning_ssh_key = value;
        self
    }

    /// Sets the boot image.
    #[must_use]
    pub fn boot_image(mut self, value: BootImage) -> Self {
        self.boot_image = Some(value);
        self
    }

    /// Builds the [`InstanceSpec`], trimming string inputs. Sanitization is
    /// deferred to the create-instance operation.
    ///
    /// # Errors
    ///
    /// Returns [`InstanceSpecError::Validation`] when a required field is
    /// missing.
    pub fn build(self) -> Result<InstanceSpec, InstanceSpecError> {
        let boot_image = match self.boot_image {
            Some(BootImage::Template(id)) => BootImage::Template(id.trim().to_owned()),
            Some(BootImage::OperatingSystem(code)) => {
                BootImage::OperatingSystem(code.trim().to_owned())
            }
            None => return Err(InstanceSpecError::Validation("boot_image".to_owned())),
        };
        let spec = InstanceSpec {
            host_name: self.host_name.trim().to_owned(),
            domain: self.domain.trim().to_owned(),
            datacenter: self.datacenter.trim().to_owned(),
            cpus: self.cpus,
            memory_mb: self.memory_mb,
            hourly_billing: self.hourly_billing,
            local_disk: self.local_disk,
            disk_capacity_gb: self.disk_capacity_gb,
            network_speed_mbps: self.network_speed_mbps,
            provisioning_ssh_key: self.provisioning_ssh_key,
            boot_image,
        };
        spec.validate()?;
        Ok(spec)
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    #[case("my host!!", "myhost")]
    #[case("example..com", "example..com")]
    #[case("web-01.prod", "web-01.prod")]
    #[case("ünïcødé_name", "ncdname")]
    #[case("", "")]
    fn sanitize_name_strips_invalid_characters(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_name(input), expected);
    }

    #[rstest]
    #[case("my host!!")]
    #[case("a/b\\c:d@e")]
    #[case("tab\tand\nnewline")]
    #[case("$(rm -rf /).example.com")]
    fn sanitize_name_is_idempotent_and_restricted(#[case] input: &str) {
        let once = sanitize_name(input);
        assert_eq!(sanitize_name(&once), once);
        assert!(
            once.chars()
                .all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '.'),
            "unexpected character in {once:?}"
        );
    }

    #[test]
    fn builder_requires_boot_image() {
        let err = InstanceSpec::builder()
            .host_name("host")
            .domain("example.com")
            .datacenter("ams01")
            .build()
            .expect_err("boot image is required");
        assert_eq!(err, InstanceSpecError::Validation("boot_image".to_owned()));
    }

    #[test]
    fn sanitized_spec_can_fail_validation_when_host_becomes_empty() {
        let spec = InstanceSpec::builder()
            .host_name("!!!")
            .domain("example.com")
            .datacenter("ams01")
            .boot_image(BootImage::OperatingSystem("UBUNTU_LATEST".to_owned()))
            .build()
            .expect("raw spec is valid");
        let err = spec.sanitized().validate().expect_err("empty host");
        assert_eq!(err, InstanceSpecError::Validation("host_name".to_owned()));
    }

    #[test]
    fn template_data_selects_one_boot_source() {
        let spec = InstanceSpec::builder()
            .host_name("host")
            .domain("example.com")
            .datacenter("ams01")
            .provisioning_ssh_key(Some(SshKeyId::new(42)))
            .boot_image(BootImage::Template("abc-123".to_owned()))
            .build()
            .expect("valid spec");
        let value = serde_json::to_value(spec.template_data()).expect("serialisable");
        assert_eq!(value["BaseImageId"], "abc-123");
        assert!(value["BaseOsCode"].is_null());
        assert_eq!(value["ProvisioningSshKeyId"], 42);
        assert_eq!(value["HostName"], "host");
    }
}
