//! Command-line interface definitions for the `softlayer-builder` binary.
//!
//! This module centralises the clap parser structures so both the main binary
//! and the build script can reuse them when generating the manual page.

use clap::Parser;

/// Top-level CLI for the `softlayer-builder` binary.
#[derive(Debug, Parser)]
#[command(
    name = "softlayer-builder",
    about = "Provision SoftLayer virtual guests, SSH keys and images",
    arg_required_else_help = true
)]
pub(crate) enum Cli {
    /// Create a virtual guest and optionally wait until it is ready.
    #[command(name = "create-instance")]
    CreateInstance(CreateInstanceCommand),
    /// Wait until a virtual guest is powered on with no active transaction.
    #[command(name = "wait-ready")]
    WaitReady(WaitReadyCommand),
    /// Delete a virtual guest.
    #[command(name = "destroy-instance")]
    DestroyInstance(InstanceArg),
    /// Upload a public SSH key and print its identifier.
    #[command(name = "upload-ssh-key")]
    UploadSshKey(UploadSshKeyCommand),
    /// Delete an uploaded SSH key.
    #[command(name = "destroy-ssh-key")]
    DestroySshKey(SshKeyArg),
    /// Capture a virtual guest as a reusable image.
    #[command(name = "capture-image")]
    CaptureImage(CaptureImageCommand),
    /// Delete a captured image.
    #[command(name = "destroy-image")]
    DestroyImage(ImageArg),
    /// Print the primary public IPv4 address of a virtual guest.
    #[command(name = "public-ip")]
    PublicIp(InstanceArg),
    /// Call an arbitrary API path with GET, POST or DELETE.
    #[command(name = "call")]
    Call(CallCommand),
}

/// Arguments for `create-instance`.
#[derive(Debug, Parser)]
pub(crate) struct CreateInstanceCommand {
    /// Host name; characters outside `[A-Za-z0-9-.]` are removed.
    #[arg(long)]
    pub(crate) host_name: String,
    /// Domain; characters outside `[A-Za-z0-9-.]` are removed.
    #[arg(long)]
    pub(crate) domain: String,
    /// Datacenter short name, for example `ams01`.
    #[arg(long)]
    pub(crate) datacenter: String,
    /// Number of virtual CPUs.
    #[arg(long, default_value_t = 1)]
    pub(crate) cpus: u32,
    /// Memory in megabytes.
    #[arg(long, default_value_t = 1024)]
    pub(crate) memory_mb: u64,
    /// Bill monthly instead of hourly.
    #[arg(long)]
    pub(crate) monthly_billing: bool,
    /// Use SAN storage instead of local disks.
    #[arg(long)]
    pub(crate) san_disk: bool,
    /// Capacity of the first disk in gigabytes.
    #[arg(long, default_value_t = 25)]
    pub(crate) disk_capacity_gb: u32,
    /// Uplink speed in Mbps.
    #[arg(long, default_value_t = 10)]
    pub(crate) network_speed_mbps: u32,
    /// Identifier of an uploaded SSH key to install at provisioning time.
    #[arg(long, value_name = "KEY_ID")]
    pub(crate) ssh_key_id: Option<u64>,
    /// Global identifier of a captured image to boot from.
    #[arg(long, value_name = "GLOBAL_ID", conflicts_with = "os_code")]
    pub(crate) image_id: Option<String>,
    /// Operating system reference code to boot from.
    #[arg(long, value_name = "CODE", required_unless_present = "image_id")]
    pub(crate) os_code: Option<String>,
    /// Block until the new guest is ready.
    #[arg(long)]
    pub(crate) wait: bool,
    /// Seconds to wait when `--wait` is given; defaults to the configured value.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) timeout_secs: Option<u64>,
}

/// Arguments for `wait-ready`.
#[derive(Debug, Parser)]
pub(crate) struct WaitReadyCommand {
    /// Virtual guest identifier.
    pub(crate) instance_id: String,
    /// Seconds to wait; defaults to the configured value.
    #[arg(long, value_name = "SECONDS")]
    pub(crate) timeout_secs: Option<u64>,
}

/// Single virtual guest identifier.
#[derive(Debug, Parser)]
pub(crate) struct InstanceArg {
    /// Virtual guest identifier.
    pub(crate) instance_id: String,
}

/// Arguments for `upload-ssh-key`.
#[derive(Debug, Parser)]
pub(crate) struct UploadSshKeyCommand {
    /// Label shown in the customer portal.
    #[arg(long)]
    pub(crate) label: String,
    /// Public key in OpenSSH format.
    #[arg(long)]
    pub(crate) public_key: String,
}

/// Single SSH key identifier.
#[derive(Debug, Parser)]
pub(crate) struct SshKeyArg {
    /// SSH key identifier.
    pub(crate) key_id: u64,
}

/// Arguments for `capture-image`.
#[derive(Debug, Parser)]
pub(crate) struct CaptureImageCommand {
    /// Virtual guest identifier.
    pub(crate) instance_id: String,
    /// Name of the new image.
    #[arg(long)]
    pub(crate) name: String,
    /// Free-form description of the new image.
    #[arg(long, default_value = "")]
    pub(crate) description: String,
}

/// Single image identifier.
#[derive(Debug, Parser)]
pub(crate) struct ImageArg {
    /// Image global identifier.
    pub(crate) image_id: String,
}

/// Arguments for `call`.
#[derive(Debug, Parser)]
pub(crate) struct CallCommand {
    /// HTTP method, exactly `GET`, `POST` or `DELETE` (upper case).
    pub(crate) method: String,
    /// API path, for example `SoftLayer_Account/getVirtualGuests.json`.
    pub(crate) path: String,
    /// JSON request body.
    #[arg(long, value_name = "JSON")]
    pub(crate) body: Option<String>,
}
