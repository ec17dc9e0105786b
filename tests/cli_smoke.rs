//! Behavioural smoke tests for the CLI entrypoint.

use assert_cmd::cargo::cargo_bin_cmd;
use predicates::prelude::*;
use softlayer_builder::config::CONFIG_ENV_VARS;

#[test]
fn help_lists_subcommands() {
    let mut cmd = cargo_bin_cmd!("softlayer-builder");
    cmd.arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("create-instance"))
        .stdout(predicate::str::contains("wait-ready"))
        .stdout(predicate::str::contains("capture-image"));
}

#[test]
fn missing_credentials_fail_with_configuration_error() {
    let mut cmd = cargo_bin_cmd!("softlayer-builder");
    for var in CONFIG_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.args(["public-ip", "12345"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("configuration error"));
}

#[test]
fn unsupported_method_fails_before_any_request() {
    let mut cmd = cargo_bin_cmd!("softlayer-builder");
    for var in CONFIG_ENV_VARS {
        cmd.env_remove(var);
    }
    cmd.env("SOFTLAYER_USERNAME", "apiuser")
        .env("SOFTLAYER_API_KEY", "apikey")
        .env("SOFTLAYER_API_HOST", "127.0.0.1:9/rest/v3")
        .args(["call", "PUT", "SoftLayer_Account.json"])
        .assert()
        .failure()
        .code(1)
        .stderr(predicate::str::contains("undefined request type 'PUT'"));
}
