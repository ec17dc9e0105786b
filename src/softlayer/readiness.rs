//! Waiting for a newly created instance to become usable.
//!
//! An instance is ready once its power state is `RUNNING` *and* it has no
//! active provisioning transaction: the provider reports guests as running
//! while post-boot transactions are still executing.
//!
//! [`SoftlayerClient::wait_for_ready`] spawns one background task that polls
//! both conditions and hands its single outcome over a one-slot channel. The
//! caller races that channel against its timeout. When the timeout wins, the
//! task is signalled through a cancellation token and stops at its next sleep;
//! the send of a late result never blocks because the channel is a oneshot.

use std::time::Duration;

use serde_json::Value;
use tokio::sync::oneshot;
use tokio::time::{sleep, timeout};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::InstanceId;
use super::{DecodedResponse, HttpMethod, SoftlayerClient, SoftlayerError, decode_object};

/// Power state key reported for a running guest.
pub const RUNNING: &str = "RUNNING";

/// Readiness of one poll cycle: powered on and no active transaction.
#[must_use]
pub fn is_ready(key_name: &str, active_transaction: &DecodedResponse) -> bool {
    key_name == RUNNING && active_transaction.is_empty()
}

/// Reads the `keyName` of a power-state answer.
///
/// # Errors
///
/// Returns [`SoftlayerError::MissingField`] when the answer carries no string
/// `keyName`, which is how the provider's error objects look.
pub fn power_state_key<'a>(
    power_state: &'a DecodedResponse,
    path: &str,
) -> Result<&'a str, SoftlayerError> {
    power_state
        .get("keyName")
        .and_then(Value::as_str)
        .ok_or_else(|| {
            if let Some(reported) = power_state.get("error") {
                warn!(path, error = %reported, "SoftLayer reported an error for the power state");
            }
            SoftlayerError::MissingField {
                field: "keyName".to_owned(),
                path: path.to_owned(),
            }
        })
}

/// Decodes an active-transaction answer. The provider answers with an empty
/// body or `null` when nothing is running, so both mean "no transaction".
fn decode_active_transaction(body: &[u8]) -> Result<DecodedResponse, SoftlayerError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(DecodedResponse::new());
    }
    decode_object(body)
}

impl SoftlayerClient {
    /// Runs one poll cycle: power state first, then the active transaction.
    ///
    /// # Errors
    ///
    /// Returns the first transport or decode failure, or
    /// [`SoftlayerError::MissingField`] when the power state has no `keyName`.
    /// The transaction query is not issued when the power-state query fails.
    pub async fn check_ready(&self, instance_id: &InstanceId) -> Result<bool, SoftlayerError> {
        let power_path = format!("SoftLayer_Virtual_Guest/{instance_id}/getPowerState.json");
        let power_state = self.send(HttpMethod::Get, &power_path, None).await?;
        let key_name = power_state_key(&power_state, &power_path)?;

        let transaction = self
            .fetch(
                HttpMethod::Get,
                &format!("SoftLayer_Virtual_Guest/{instance_id}/getActiveTransaction.json"),
                None,
            )
            .await?;
        let active_transaction = decode_active_transaction(&transaction)?;
        Ok(is_ready(key_name, &active_transaction))
    }

    /// Blocks until the instance is ready or `wait_timeout` elapses.
    ///
    /// # Errors
    ///
    /// Returns [`SoftlayerError::Timeout`] when the budget is exhausted (the
    /// instance may still become ready), [`SoftlayerError::Provider`] wrapping
    /// the failure when a poll query fails, and
    /// [`SoftlayerError::PollerAborted`] if the poll task dies.
    pub async fn wait_for_ready(
        &self,
        instance_id: &InstanceId,
        wait_timeout: Duration,
    ) -> Result<(), SoftlayerError> {
        let done = CancellationToken::new();
        // Stops the poll loop however this future ends, including being dropped.
        let _stop_on_exit = done.clone().drop_guard();

        let (result_tx, result_rx) = oneshot::channel();
        let poller = self.clone();
        let polled_id = instance_id.clone();
        let loop_done = done.clone();
        tokio::spawn(async move {
            if let Some(outcome) = poller.poll_until_ready(&polled_id, &loop_done).await {
                // The receiver is gone once the caller timed out; dropping the
                // outcome is the intended behaviour then.
                result_tx.send(outcome).ok();
            }
        });

        info!(
            %instance_id,
            timeout_secs = wait_timeout.as_secs(),
            "waiting for instance to become ready"
        );

        match timeout(wait_timeout, result_rx).await {
            Ok(Ok(Ok(()))) => {
                info!(%instance_id, "instance is ready");
                Ok(())
            }
            Ok(Ok(Err(source))) => Err(SoftlayerError::Provider {
                instance_id: instance_id.to_string(),
                source: Box::new(source),
            }),
            Ok(Err(_closed)) => Err(SoftlayerError::PollerAborted {
                instance_id: instance_id.to_string(),
            }),
            Err(_elapsed) => {
                done.cancel();
                Err(SoftlayerError::Timeout {
                    action: "wait_for_ready".to_owned(),
                    instance_id: instance_id.to_string(),
                })
            }
        }
    }

    /// Polls until ready or failed. Returns `None` when cancelled.
    async fn poll_until_ready(
        &self,
        instance_id: &InstanceId,
        done: &CancellationToken,
    ) -> Option<Result<(), SoftlayerError>> {
        let mut attempts: u64 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            debug!(%instance_id, attempts, "checking instance status");

            match self.check_ready(instance_id).await {
                Ok(true) => return Some(Ok(())),
                Ok(false) => {}
                Err(err) => return Some(Err(err)),
            }

            tokio::select! {
                () = done.cancelled() => {
                    debug!(%instance_id, attempts, "readiness polling cancelled");
                    return None;
                }
                () = sleep(self.poll_interval) => {}
            }

            if done.is_cancelled() {
                return None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use serde_json::json;

    use super::*;

    const POWER_PATH: &str = "SoftLayer_Virtual_Guest/42/getPowerState.json";

    fn mapping(value: &serde_json::Value) -> DecodedResponse {
        value.as_object().cloned().unwrap_or_default()
    }

    #[rstest]
    #[case("RUNNING", json!({}), true)]
    #[case("RUNNING", json!({"id": 1, "name": "OS Reload"}), false)]
    #[case("HALTED", json!({}), false)]
    #[case("HALTED", json!({"id": 1}), false)]
    fn readiness_requires_running_and_no_transaction(
        #[case] key_name: &str,
        #[case] transaction: serde_json::Value,
        #[case] expected: bool,
    ) {
        assert_eq!(is_ready(key_name, &mapping(&transaction)), expected);
    }

    #[test]
    fn power_state_key_reads_key_name() {
        let power = mapping(&json!({"keyName": "HALTED", "name": "Halted"}));
        assert_eq!(power_state_key(&power, POWER_PATH), Ok("HALTED"));
    }

    #[rstest]
    #[case(json!({}))]
    #[case(json!({"keyName": 1}))]
    #[case(json!({"error": "Access Denied.", "code": "SoftLayer_Exception_Public"}))]
    fn power_state_without_key_name_is_missing_field(#[case] power: serde_json::Value) {
        assert_eq!(
            power_state_key(&mapping(&power), POWER_PATH),
            Err(SoftlayerError::MissingField {
                field: "keyName".to_owned(),
                path: POWER_PATH.to_owned(),
            })
        );
    }

    #[rstest]
    #[case(b"")]
    #[case(b" \n")]
    #[case(b"null")]
    fn blank_transaction_answers_mean_no_transaction(#[case] body: &[u8]) {
        let transaction = decode_active_transaction(body).expect("no transaction");
        assert!(transaction.is_empty());
    }

    #[test]
    fn malformed_transaction_answer_is_decode_error() {
        let err = decode_active_transaction(b"<html>").expect_err("not json");
        assert!(matches!(err, SoftlayerError::Decode { .. }), "unexpected error: {err:?}");
    }
}
