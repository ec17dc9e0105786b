//! Test support utilities shared across unit and integration tests.

use std::collections::VecDeque;
use std::env;
use std::ffi::OsString;
use std::sync::{Arc, Mutex as StdMutex, PoisonError};
use std::time::Duration;

use tokio::sync::{Mutex, MutexGuard};

use crate::config::CONFIG_ENV_VARS;
use crate::softlayer::{HttpMethod, Transport, TransportError, TransportFuture};

/// Response replayed by [`ScriptedTransport`].
#[derive(Clone, Debug)]
pub enum ScriptedResponse {
    /// Answer with this body.
    Body(Vec<u8>),
    /// Fail at the network layer.
    Failure(TransportError),
    /// Answer with this body after a delay.
    Delayed(Duration, Vec<u8>),
}

/// Records a single request made through [`ScriptedTransport`].
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct TransportInvocation {
    /// Method used.
    pub method: HttpMethod,
    /// Full request target, credentials included.
    pub url: String,
    /// Request body, if any.
    pub body: Option<Vec<u8>>,
}

impl TransportInvocation {
    /// Returns the request body as text (empty when there was none).
    #[must_use]
    pub fn body_text(&self) -> String {
        self.body
            .as_deref()
            .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
            .unwrap_or_default()
    }
}

#[derive(Debug, Default)]
struct Script {
    responses: VecDeque<ScriptedResponse>,
    fallback: Option<ScriptedResponse>,
    invocations: Vec<TransportInvocation>,
}

/// Transport that replays pre-seeded responses in FIFO order.
///
/// Once the queue is empty the fallback response (if any) is repeated;
/// without one, every further request fails at the network layer.
#[derive(Clone, Debug, Default)]
pub struct ScriptedTransport {
    script: Arc<StdMutex<Script>>,
}

impl ScriptedTransport {
    /// Creates a transport with no queued responses.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn with_script<T>(&self, action: impl FnOnce(&mut Script) -> T) -> T {
        let mut script = self.script.lock().unwrap_or_else(PoisonError::into_inner);
        action(&mut script)
    }

    /// Queues a raw response body.
    pub fn push_body(&self, body: impl Into<Vec<u8>>) {
        let response = ScriptedResponse::Body(body.into());
        self.with_script(|script| script.responses.push_back(response));
    }

    /// Queues a JSON response body.
    pub fn push_json(&self, value: &serde_json::Value) {
        self.push_body(value.to_string());
    }

    /// Queues a network-level failure.
    pub fn push_failure(&self, message: impl Into<String>) {
        let response = ScriptedResponse::Failure(TransportError::new(message));
        self.with_script(|script| script.responses.push_back(response));
    }

    /// Queues a response body delivered after `delay`.
    pub fn push_delayed(&self, delay: Duration, body: impl Into<Vec<u8>>) {
        let response = ScriptedResponse::Delayed(delay, body.into());
        self.with_script(|script| script.responses.push_back(response));
    }

    /// Sets the response repeated once the queue is exhausted.
    pub fn set_fallback(&self, response: ScriptedResponse) {
        self.with_script(|script| script.fallback = Some(response));
    }

    /// Returns a snapshot of all requests recorded so far.
    #[must_use]
    pub fn invocations(&self) -> Vec<TransportInvocation> {
        self.with_script(|script| script.invocations.clone())
    }

    /// Returns how many requests were made.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.with_script(|script| script.invocations.len())
    }
}

impl Transport for ScriptedTransport {
    fn send<'a>(
        &'a self,
        method: HttpMethod,
        url: &'a str,
        body: Option<Vec<u8>>,
    ) -> TransportFuture<'a> {
        let next = self.with_script(|script| {
            script.invocations.push(TransportInvocation {
                method,
                url: url.to_owned(),
                body,
            });
            script
                .responses
                .pop_front()
                .or_else(|| script.fallback.clone())
        });

        Box::pin(async move {
            match next {
                Some(ScriptedResponse::Body(body)) => Ok(body),
                Some(ScriptedResponse::Failure(err)) => Err(err),
                Some(ScriptedResponse::Delayed(delay, body)) => {
                    tokio::time::sleep(delay).await;
                    Ok(body)
                }
                None => Err(TransportError::new("no scripted response available")),
            }
        })
    }
}

/// Serialises every test that touches the process environment.
pub static ENV_LOCK: Mutex<()> = Mutex::const_new(());

/// Gives a test a private set of `SOFTLAYER_*` configuration variables.
///
/// Creating the guard takes [`ENV_LOCK`], snapshots and clears every variable
/// in [`CONFIG_ENV_VARS`], then applies the requested values. Dropping it
/// puts the snapshot back, so values from the developer's shell never leak
/// into a configuration test.
pub struct ConfigEnvGuard {
    saved: Vec<(&'static str, Option<OsString>)>,
    _lock: MutexGuard<'static, ()>,
}

impl ConfigEnvGuard {
    /// Isolates the configuration variables and sets `values`.
    ///
    /// Every key must be one of [`CONFIG_ENV_VARS`].
    pub async fn isolate(values: &[(&str, &str)]) -> Self {
        debug_assert!(
            values
                .iter()
                .all(|(key, _)| CONFIG_ENV_VARS.contains(key)),
            "ConfigEnvGuard only manages SOFTLAYER_* configuration variables"
        );

        let lock = ENV_LOCK.lock().await;
        let saved = CONFIG_ENV_VARS
            .iter()
            .map(|key| (*key, env::var_os(key)))
            .collect();
        for key in CONFIG_ENV_VARS {
            // SAFETY: environment mutation is serialised by `ENV_LOCK`.
            unsafe { env::remove_var(key) };
        }
        for (key, value) in values {
            // SAFETY: as above.
            unsafe { env::set_var(key, value) };
        }

        Self { saved, _lock: lock }
    }
}

impl Drop for ConfigEnvGuard {
    fn drop(&mut self) {
        for (key, previous) in &self.saved {
            // SAFETY: the guard still holds `ENV_LOCK`.
            unsafe {
                match previous {
                    Some(value) => env::set_var(key, value),
                    None => env::remove_var(key),
                }
            }
        }
    }
}
