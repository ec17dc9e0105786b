//! Integration tests for configuration loading and validation.

use std::time::Duration;

use rstest::{fixture, rstest};
use softlayer_builder::test_support::ConfigEnvGuard;
use softlayer_builder::{
    ConfigError, DEFAULT_API_HOST, SoftlayerClient, SoftlayerConfig, SoftlayerError,
};

#[fixture]
fn valid_config() -> SoftlayerConfig {
    SoftlayerConfig {
        username: String::from("SL123456"),
        api_key: String::from("0123456789abcdef"),
        api_host: String::from(DEFAULT_API_HOST),
        template_dir: None,
        poll_interval_secs: 3,
        ready_timeout_secs: 600,
        request_timeout_secs: 30,
    }
}

#[rstest]
fn valid_config_passes_validation(valid_config: SoftlayerConfig) {
    assert_eq!(valid_config.validate(), Ok(()));
    assert_eq!(valid_config.poll_interval(), Duration::from_secs(3));
    assert_eq!(valid_config.ready_timeout(), Duration::from_secs(600));
}

#[rstest]
#[case::username(|cfg: &mut SoftlayerConfig| cfg.username.clear(), "SOFTLAYER_USERNAME", "username")]
#[case::api_key(|cfg: &mut SoftlayerConfig| cfg.api_key = String::from("   "), "SOFTLAYER_API_KEY", "api_key")]
#[case::api_host(|cfg: &mut SoftlayerConfig| cfg.api_host.clear(), "SOFTLAYER_API_HOST", "api_host")]
fn missing_fields_produce_actionable_errors(
    valid_config: SoftlayerConfig,
    #[case] mutate: fn(&mut SoftlayerConfig),
    #[case] env_var: &str,
    #[case] toml_key: &str,
) {
    let mut cfg = valid_config;
    mutate(&mut cfg);

    let error = cfg.validate().expect_err("validation should fail");
    let ConfigError::MissingField(ref message) = error else {
        panic!("expected MissingField error, got {error:?}");
    };
    assert!(
        message.contains(env_var),
        "error should mention env var {env_var}: {message}"
    );
    assert!(
        message.contains(toml_key),
        "error should mention key {toml_key}: {message}"
    );
}

#[rstest]
fn zero_poll_interval_is_invalid(valid_config: SoftlayerConfig) {
    let cfg = SoftlayerConfig {
        poll_interval_secs: 0,
        ..valid_config
    };

    let error = cfg.validate().expect_err("zero interval");
    assert!(
        matches!(error, ConfigError::Invalid(ref message) if message.contains("SOFTLAYER_POLL_INTERVAL_SECS")),
        "unexpected error: {error:?}"
    );
}

#[rstest]
fn client_construction_rejects_invalid_config(valid_config: SoftlayerConfig) {
    let cfg = SoftlayerConfig {
        api_key: String::new(),
        ..valid_config
    };

    let Err(error) = SoftlayerClient::new(&cfg) else {
        panic!("client built from invalid configuration");
    };
    assert!(
        matches!(error, SoftlayerError::Config(ref message) if message.contains("SOFTLAYER_API_KEY")),
        "unexpected error: {error:?}"
    );
}

#[rstest]
fn client_construction_reports_missing_template_dir(valid_config: SoftlayerConfig) {
    let cfg = SoftlayerConfig {
        template_dir: Some(String::from("/nonexistent/softlayer-templates")),
        ..valid_config
    };

    let Err(error) = SoftlayerClient::new(&cfg) else {
        panic!("client built without templates");
    };
    assert!(
        matches!(error, SoftlayerError::Template(_)),
        "unexpected error: {error:?}"
    );
}

#[tokio::test]
async fn environment_variables_populate_config() {
    let _guard = ConfigEnvGuard::isolate(&[
        ("SOFTLAYER_USERNAME", "envuser"),
        ("SOFTLAYER_API_KEY", "envkey"),
        ("SOFTLAYER_POLL_INTERVAL_SECS", "7"),
    ])
    .await;

    let cfg = SoftlayerConfig::load_without_cli_args()
        .unwrap_or_else(|err| panic!("load config: {err}"));

    assert_eq!(cfg.username, "envuser");
    assert_eq!(cfg.api_key, "envkey");
    assert_eq!(cfg.api_host, DEFAULT_API_HOST);
    assert_eq!(cfg.poll_interval(), Duration::from_secs(7));
    assert_eq!(cfg.validate(), Ok(()));
}

#[tokio::test]
async fn missing_environment_leaves_credentials_unset() {
    let _guard = ConfigEnvGuard::isolate(&[("SOFTLAYER_USERNAME", "envuser")]).await;

    let outcome = SoftlayerConfig::load_without_cli_args();

    // The loader may reject the missing key itself.
    let rejected = match outcome {
        Err(ConfigError::Parse(_)) => true,
        Ok(cfg) => matches!(cfg.validate(), Err(ConfigError::MissingField(ref message)) if message.contains("SOFTLAYER_API_KEY")),
        Err(_) => false,
    };
    assert!(rejected, "api key must be required");
}
