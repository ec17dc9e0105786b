//! Binary entry point for the `softlayer-builder` CLI.

use std::io::{self, Write};
use std::process;
use std::time::Duration;

use clap::Parser;
use serde_json::Value;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use softlayer_builder::softlayer::created_instance_id;
use softlayer_builder::{
    BootImage, DecodedResponse, Deletion, ImageId, InstanceId, InstanceSpec, SoftlayerClient,
    SoftlayerConfig, SoftlayerError, SshKeyId,
};

mod cli;

use cli::{CallCommand, Cli, CreateInstanceCommand, WaitReadyCommand};

#[derive(Debug, Error)]
enum CliError {
    #[error("configuration error: {0}")]
    Config(String),
    #[error(transparent)]
    Softlayer(#[from] SoftlayerError),
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("creation response carried no instance id")]
    MissingInstanceId,
    #[error("failed to write output: {0}")]
    Output(#[from] io::Error),
}

#[tokio::main]
async fn main() {
    init_tracing();
    let cli = Cli::parse();
    let exit_code = match run(cli).await {
        Ok(()) => 0,
        Err(err) => {
            report_error(&err);
            1
        }
    };

    process::exit(exit_code);
}

fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .init();
}

async fn run(cli: Cli) -> Result<(), CliError> {
    let config =
        SoftlayerConfig::load_without_cli_args().map_err(|err| CliError::Config(err.to_string()))?;
    let client = SoftlayerClient::new(&config)?;
    dispatch(cli, &client, &config, io::stdout()).await
}

async fn dispatch(
    cli: Cli,
    client: &SoftlayerClient,
    config: &SoftlayerConfig,
    mut out: impl Write,
) -> Result<(), CliError> {
    match cli {
        Cli::CreateInstance(command) => create_instance(command, client, config, out).await,
        Cli::WaitReady(WaitReadyCommand {
            instance_id,
            timeout_secs,
        }) => {
            let budget = timeout_secs.map_or_else(|| config.ready_timeout(), Duration::from_secs);
            client
                .wait_for_ready(&InstanceId::from(instance_id.as_str()), budget)
                .await?;
            writeln!(out, "instance {instance_id} is ready")?;
            Ok(())
        }
        Cli::DestroyInstance(arg) => {
            let deletion = client
                .destroy_instance(&InstanceId::from(arg.instance_id))
                .await?;
            write_deletion(out, &deletion)
        }
        Cli::UploadSshKey(command) => {
            let key_id = client
                .upload_ssh_key(&command.label, &command.public_key)
                .await?;
            writeln!(out, "{key_id}")?;
            Ok(())
        }
        Cli::DestroySshKey(arg) => {
            let deletion = client.destroy_ssh_key(SshKeyId::new(arg.key_id)).await?;
            write_deletion(out, &deletion)
        }
        Cli::CaptureImage(command) => {
            let captured = client
                .capture_image(
                    &InstanceId::from(command.instance_id),
                    &command.name,
                    &command.description,
                )
                .await?;
            write_json(out, captured)
        }
        Cli::DestroyImage(arg) => {
            let deletion = client.destroy_image(&ImageId::from(arg.image_id)).await?;
            write_deletion(out, &deletion)
        }
        Cli::PublicIp(arg) => {
            let address = client.public_ip(&InstanceId::from(arg.instance_id)).await?;
            writeln!(out, "{address}")?;
            Ok(())
        }
        Cli::Call(command) => call(command, client, out).await,
    }
}

async fn create_instance(
    command: CreateInstanceCommand,
    client: &SoftlayerClient,
    config: &SoftlayerConfig,
    mut out: impl Write,
) -> Result<(), CliError> {
    let boot_image = match (command.image_id, command.os_code) {
        (Some(image_id), _) => BootImage::Template(image_id),
        (None, Some(code)) => BootImage::OperatingSystem(code),
        (None, None) => return Err(SoftlayerError::Validation("boot_image".to_owned()).into()),
    };
    let spec = InstanceSpec::builder()
        .host_name(command.host_name)
        .domain(command.domain)
        .datacenter(command.datacenter)
        .cpus(command.cpus)
        .memory_mb(command.memory_mb)
        .hourly_billing(!command.monthly_billing)
        .local_disk(!command.san_disk)
        .disk_capacity_gb(command.disk_capacity_gb)
        .network_speed_mbps(command.network_speed_mbps)
        .provisioning_ssh_key(command.ssh_key_id.map(SshKeyId::new))
        .boot_image(boot_image)
        .build()
        .map_err(SoftlayerError::from)?;

    let created = client.create_instance(&spec).await?;
    if command.wait {
        let instance_id = created_instance_id(&created).ok_or(CliError::MissingInstanceId)?;
        let budget = command
            .timeout_secs
            .map_or_else(|| config.ready_timeout(), Duration::from_secs);
        client.wait_for_ready(&instance_id, budget).await?;
    }
    write_json(&mut out, created)
}

async fn call(
    command: CallCommand,
    client: &SoftlayerClient,
    out: impl Write,
) -> Result<(), CliError> {
    let body = command
        .body
        .as_deref()
        .map(serde_json::from_str::<Value>)
        .transpose()
        .map_err(|err| CliError::InvalidBody(err.to_string()))?;
    let response = client
        .call(&command.method, &command.path, body.as_ref())
        .await?;
    write_json(out, response)
}

fn write_json(mut out: impl Write, response: DecodedResponse) -> Result<(), CliError> {
    let rendered = serde_json::to_string_pretty(&Value::Object(response))
        .map_err(|err| CliError::Output(io::Error::other(err)))?;
    writeln!(out, "{rendered}")?;
    Ok(())
}

fn write_deletion(mut out: impl Write, deletion: &Deletion) -> Result<(), CliError> {
    writeln!(
        out,
        "deleted {} {} (provider response: {})",
        deletion.kind, deletion.id, deletion.response
    )?;
    Ok(())
}

fn report_error(err: &CliError) {
    write_error(io::stderr(), err);
}

fn write_error(mut target: impl Write, err: &CliError) {
    writeln!(target, "{err}").ok();
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use serde_json::json;
    use softlayer_builder::TemplateSet;
    use softlayer_builder::softlayer::Credentials;
    use softlayer_builder::test_support::ScriptedTransport;

    use super::*;

    fn config() -> SoftlayerConfig {
        SoftlayerConfig {
            username: String::from("apiuser"),
            api_key: String::from("key"),
            api_host: String::from("api.test"),
            template_dir: None,
            poll_interval_secs: 3,
            ready_timeout_secs: 5,
            request_timeout_secs: 5,
        }
    }

    fn client(transport: &ScriptedTransport) -> SoftlayerClient {
        let templates = TemplateSet::builtin().unwrap_or_else(|err| panic!("templates: {err}"));
        SoftlayerClient::with_parts(
            Credentials::new("apiuser", "key"),
            "api.test",
            Arc::new(transport.clone()),
            Arc::new(templates),
        )
        .with_poll_interval(Duration::from_millis(1))
    }

    fn output(buf: Vec<u8>) -> String {
        String::from_utf8(buf).unwrap_or_else(|err| panic!("utf8: {err}"))
    }

    #[tokio::test]
    async fn create_instance_with_wait_polls_new_instance() {
        let transport = ScriptedTransport::new();
        transport.push_json(&json!({"id": 777, "hostname": "web"}));
        transport.push_json(&json!({"keyName": "RUNNING"}));
        transport.push_json(&json!({}));
        let cli = Cli::try_parse_from([
            "softlayer-builder",
            "create-instance",
            "--host-name",
            "web",
            "--domain",
            "example.com",
            "--datacenter",
            "ams01",
            "--os-code",
            "UBUNTU_LATEST",
            "--wait",
        ])
        .unwrap_or_else(|err| panic!("parse: {err}"));

        let mut buf = Vec::new();
        dispatch(cli, &client(&transport), &config(), &mut buf)
            .await
            .unwrap_or_else(|err| panic!("dispatch: {err}"));

        assert!(output(buf).contains("\"id\": 777"));
        let calls = transport.invocations();
        assert_eq!(calls.len(), 3);
        assert!(calls[1].url.ends_with("SoftLayer_Virtual_Guest/777/getPowerState.json"));
    }

    #[tokio::test]
    async fn call_rejects_unsupported_method_without_sending() {
        let transport = ScriptedTransport::new();
        let cli = Cli::try_parse_from(["softlayer-builder", "call", "PUT", "SoftLayer_Account.json"])
            .unwrap_or_else(|err| panic!("parse: {err}"));

        let err = dispatch(cli, &client(&transport), &config(), Vec::new())
            .await
            .expect_err("PUT is unsupported");
        assert!(
            matches!(err, CliError::Softlayer(SoftlayerError::UnsupportedMethod(ref method)) if method == "PUT"),
            "unexpected error: {err}"
        );
        assert_eq!(transport.call_count(), 0);
    }

    #[tokio::test]
    async fn destroy_ssh_key_prints_provider_response() {
        let transport = ScriptedTransport::new();
        transport.push_body("true");
        let cli = Cli::try_parse_from(["softlayer-builder", "destroy-ssh-key", "42"])
            .unwrap_or_else(|err| panic!("parse: {err}"));

        let mut buf = Vec::new();
        dispatch(cli, &client(&transport), &config(), &mut buf)
            .await
            .unwrap_or_else(|err| panic!("dispatch: {err}"));

        assert_eq!(output(buf), "deleted ssh key 42 (provider response: true)\n");
    }

    #[test]
    fn create_instance_requires_a_boot_source() {
        let parsed = Cli::try_parse_from([
            "softlayer-builder",
            "create-instance",
            "--host-name",
            "web",
            "--domain",
            "example.com",
            "--datacenter",
            "ams01",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn write_error_writes_cli_error() {
        let mut buf = Vec::new();
        write_error(&mut buf, &CliError::MissingInstanceId);
        assert_eq!(output(buf), "creation response carried no instance id\n");
    }
}
