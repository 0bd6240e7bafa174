//! Pairing handshake: obtaining a token by polling while the user presses
//! the bridge's link button.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use log::{debug, info, warn};
use serde_json::{Value, json};

use crate::config::BridgeConfig;
use crate::credentials::{AuthorizationToken, BridgeAddress, CredentialStore};
use crate::endpoint::{CommandKind, resolve};
use crate::errors::Error;
use crate::response::{ResponseEntry, entries};
use crate::runtime::{self, Instant, JoinHandle};
use crate::transport::{Method, Transport};

/// How one pairing session ended.
#[derive(Debug)]
pub enum PairingOutcome {
    /// The bridge issued a token.
    Authorized(AuthorizationToken),
    /// The deadline passed while the link button was still unpressed.
    TimedOut,
    /// The bridge rejected the registration, answered with something
    /// unreadable, or could not be reached.
    DeviceError(Error),
    /// The session's [`CancelToken`] fired.
    Cancelled,
}

impl PairingOutcome {
    /// Whether the bridge issued a token.
    pub fn is_authorized(&self) -> bool {
        matches!(self, PairingOutcome::Authorized(_))
    }

    /// Convert into a result, reporting a timeout as
    /// [`Error::PairingTimedOut`] with the given duration.
    pub fn into_result(self, timeout: Duration) -> Result<AuthorizationToken, Error> {
        match self {
            PairingOutcome::Authorized(token) => Ok(token),
            PairingOutcome::TimedOut => Err(Error::PairingTimedOut(timeout)),
            PairingOutcome::DeviceError(e) => Err(e),
            PairingOutcome::Cancelled => Err(Error::PairingCancelled),
        }
    }
}

/// Cooperative cancellation flag for a pairing loop.
///
/// Checked before each attempt and again before each backoff, so a cancel
/// that lands during a request ends the loop without another sleep.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask every session sharing this token to stop.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a single registration attempt.
enum Attempt {
    Authorized(AuthorizationToken),
    Pending,
    Failed(Error),
}

/// Polls the bridge's registration endpoint until it issues a token.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use hue_bridge_rs::{BridgeAddress, BridgeConfig, FileStore, HttpTransport, PairingSession};
///
/// let config = BridgeConfig::default();
/// let store = Arc::new(FileStore::new("bridge.json"));
/// let session = PairingSession::new(HttpTransport::new(&config)?, store, &config);
///
/// println!("Press the link button on the bridge...");
/// let token = session
///     .pair(&BridgeAddress::new("192.168.1.2"), config.pairing_timeout)
///     .await
///     .into_result(config.pairing_timeout)?;
/// ```
pub struct PairingSession<T> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    device_type: String,
    backoff: Duration,
    cancel: CancelToken,
}

impl<T: Transport> PairingSession<T> {
    /// Create a session that writes the issued token to `store`.
    pub fn new(transport: T, store: Arc<dyn CredentialStore>, config: &BridgeConfig) -> Self {
        PairingSession {
            transport,
            store,
            device_type: config.device_type.clone(),
            backoff: config.pairing_backoff,
            cancel: CancelToken::new(),
        }
    }

    /// Share an existing cancellation flag with this session.
    pub fn with_cancel_token(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// A handle that cancels this session.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Poll until the bridge issues a token or `timeout` elapses.
    ///
    /// Only the "link button not pressed" error (101) is retried, after a
    /// fixed backoff. Any other error ends the session immediately. Each
    /// attempt is also bounded by the time left before the deadline. On
    /// success the token is written to the credential store.
    pub async fn pair(&self, address: &BridgeAddress, timeout: Duration) -> PairingOutcome {
        let url = match resolve(CommandKind::Register, Some(address), None, None) {
            Ok(url) => url,
            Err(e) => return PairingOutcome::DeviceError(e),
        };
        let body = json!({ "devicetype": self.device_type });

        let start = Instant::now();
        let mut attempts = 0u32;

        loop {
            if self.cancel.is_cancelled() {
                return self.cancelled(attempts);
            }
            let Some(left) = runtime::remaining(&start, timeout) else {
                return self.timed_out(attempts);
            };

            attempts += 1;
            let request = self.transport.execute(&url, Method::Post, Some(&body));
            let response = match runtime::timeout(left, request).await {
                Ok(Ok(response)) => response,
                Ok(Err(e)) => {
                    warn!("Pairing request to {} failed: {}", address, e);
                    return PairingOutcome::DeviceError(Error::transport(CommandKind::Register, e));
                }
                Err(_) => return self.timed_out(attempts),
            };

            match interpret(&response) {
                Attempt::Authorized(token) => {
                    info!("Paired with bridge {} after {} attempt(s)", address, attempts);
                    if let Err(e) = self.store.save_token(&token) {
                        warn!("Failed to persist bridge token: {}", e);
                    }
                    return PairingOutcome::Authorized(token);
                }
                Attempt::Failed(e) => {
                    warn!("Pairing with {} failed: {}", address, e);
                    return PairingOutcome::DeviceError(e);
                }
                Attempt::Pending => debug!("Link button not pressed yet (attempt {})", attempts),
            }

            if runtime::remaining(&start, timeout).is_none() {
                return self.timed_out(attempts);
            }
            if self.cancel.is_cancelled() {
                return self.cancelled(attempts);
            }
            runtime::sleep(self.backoff).await;
        }
    }

    fn cancelled(&self, attempts: u32) -> PairingOutcome {
        debug!("Pairing cancelled after {} attempt(s)", attempts);
        PairingOutcome::Cancelled
    }

    fn timed_out(&self, attempts: u32) -> PairingOutcome {
        warn!("Pairing timed out after {} attempt(s)", attempts);
        PairingOutcome::TimedOut
    }
}

impl<T: Transport + 'static> PairingSession<T> {
    /// Run [`pair`](Self::pair) as a background task.
    ///
    /// Await the returned handle for the outcome; use
    /// [`cancel_token`](Self::cancel_token) beforehand to keep a way of
    /// stopping it.
    pub fn spawn(self, address: BridgeAddress, timeout: Duration) -> JoinHandle<PairingOutcome> {
        runtime::spawn(async move { self.pair(&address, timeout).await })
    }
}

fn interpret(response: &Value) -> Attempt {
    let first = entries(response).and_then(|entries| entries.into_iter().next());
    match first {
        Some(ResponseEntry::Success(success)) => {
            match success.get("username").and_then(Value::as_str) {
                Some(token) if !token.is_empty() => {
                    Attempt::Authorized(AuthorizationToken::new(token))
                }
                _ => Attempt::Failed(Error::unexpected(
                    CommandKind::Register,
                    "success entry without a username",
                )),
            }
        }
        Some(ResponseEntry::Error(e)) if e.is_link_button_pending() => Attempt::Pending,
        Some(ResponseEntry::Error(e)) => Attempt::Failed(Error::device(CommandKind::Register, e)),
        None => Attempt::Failed(Error::unexpected(
            CommandKind::Register,
            format!("unrecognized pairing response: {response}"),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryStore;
    use crate::testing::ScriptedTransport;

    const BACKOFF: Duration = Duration::from_millis(20);

    fn pending() -> Value {
        json!([{"error": {"type": 101, "address": "", "description": "link button not pressed"}}])
    }

    fn granted(token: &str) -> Value {
        json!([{"success": {"username": token}}])
    }

    fn session(transport: &ScriptedTransport, store: &MemoryStore) -> PairingSession<ScriptedTransport> {
        let config = BridgeConfig::default()
            .with_pairing_backoff(BACKOFF)
            .with_device_type("tests#unit");
        PairingSession::new(transport.clone(), Arc::new(store.clone()), &config)
    }

    fn address() -> BridgeAddress {
        BridgeAddress::new("10.0.0.9")
    }

    #[tokio::test]
    async fn test_authorized_on_nth_attempt() {
        let transport =
            ScriptedTransport::new([Ok(pending()), Ok(pending()), Ok(granted("new-token"))]);
        let store = MemoryStore::new();

        let outcome = session(&transport, &store)
            .pair(&address(), Duration::from_secs(5))
            .await;

        match outcome {
            PairingOutcome::Authorized(token) => assert_eq!(token.as_str(), "new-token"),
            other => panic!("unexpected outcome {other:?}"),
        }
        let requests = transport.requests();
        assert_eq!(requests.len(), 3);
        assert_eq!(requests[0].url, "http://10.0.0.9/api/");
        assert_eq!(requests[0].method, Method::Post);
        assert_eq!(requests[0].body, Some(json!({"devicetype": "tests#unit"})));
        assert_eq!(store.snapshot().token, Some(AuthorizationToken::new("new-token")));
    }

    #[tokio::test]
    async fn test_times_out_within_one_backoff() {
        let transport = ScriptedTransport::repeating(pending());
        let store = MemoryStore::new();
        let timeout = Duration::from_millis(150);

        let start = std::time::Instant::now();
        let outcome = session(&transport, &store).pair(&address(), timeout).await;
        let elapsed = start.elapsed();

        assert!(matches!(outcome, PairingOutcome::TimedOut));
        assert!(elapsed >= timeout, "returned early: {elapsed:?}");
        // generous slack for scheduler jitter on top of one backoff
        assert!(elapsed < timeout + BACKOFF + Duration::from_millis(100), "{elapsed:?}");
        assert!(transport.requests().len() > 1);
        assert!(store.snapshot().token.is_none());
    }

    #[tokio::test]
    async fn test_other_errors_are_not_retried() {
        let transport = ScriptedTransport::new([Ok(json!([
            {"error": {"type": 7, "address": "/devicetype", "description": "invalid value"}}
        ]))])
        .then_repeat(granted("never"));
        let store = MemoryStore::new();

        let outcome = session(&transport, &store)
            .pair(&address(), Duration::from_secs(5))
            .await;

        match outcome {
            PairingOutcome::DeviceError(e) => assert_eq!(e.device_code(), Some(7)),
            other => panic!("unexpected outcome {other:?}"),
        }
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_response_is_device_error() {
        let transport = ScriptedTransport::new([Ok(json!({"weird": true}))]);
        let outcome = session(&transport, &MemoryStore::new())
            .pair(&address(), Duration::from_secs(5))
            .await;
        assert!(matches!(
            outcome,
            PairingOutcome::DeviceError(Error::UnexpectedResponse { .. })
        ));
        assert_eq!(transport.requests().len(), 1);
    }

    #[tokio::test]
    async fn test_transport_failure_ends_session() {
        let transport = ScriptedTransport::new([Err(ScriptedTransport::network_error())]);
        let outcome = session(&transport, &MemoryStore::new())
            .pair(&address(), Duration::from_secs(5))
            .await;
        assert!(matches!(
            outcome,
            PairingOutcome::DeviceError(Error::Transport { kind: CommandKind::Register, .. })
        ));
    }

    #[tokio::test]
    async fn test_spawned_session_can_be_cancelled() {
        let transport = ScriptedTransport::repeating(pending());
        let session = session(&transport, &MemoryStore::new());
        let cancel = session.cancel_token();

        let handle = session.spawn(address(), Duration::from_secs(30));
        runtime::sleep(BACKOFF * 2).await;
        cancel.cancel();

        let outcome = runtime::timeout(BACKOFF * 10, handle).await.unwrap();
        assert!(matches!(outcome, PairingOutcome::Cancelled));
    }

    /// Fires the cancel flag while a request is in flight.
    #[derive(Clone)]
    struct CancelDuringRequest {
        inner: ScriptedTransport,
        cancel: CancelToken,
    }

    impl Transport for CancelDuringRequest {
        async fn execute(
            &self,
            url: &str,
            method: Method,
            body: Option<&Value>,
        ) -> Result<Value, crate::transport::TransportError> {
            self.cancel.cancel();
            self.inner.execute(url, method, body).await
        }
    }

    #[tokio::test]
    async fn test_cancel_during_request_skips_backoff() {
        let scripted = ScriptedTransport::repeating(pending());
        let cancel = CancelToken::new();
        let transport = CancelDuringRequest {
            inner: scripted.clone(),
            cancel: cancel.clone(),
        };
        let config = BridgeConfig::default().with_pairing_backoff(Duration::from_secs(30));
        let session = PairingSession::new(transport, Arc::new(MemoryStore::new()), &config)
            .with_cancel_token(cancel);

        let outcome = runtime::timeout(
            Duration::from_secs(1),
            session.pair(&address(), Duration::from_secs(60)),
        )
        .await
        .unwrap();

        assert!(matches!(outcome, PairingOutcome::Cancelled));
        assert_eq!(scripted.requests().len(), 1);
    }

    #[test]
    fn test_into_result() {
        let timeout = Duration::from_secs(1);
        assert_eq!(
            PairingOutcome::TimedOut.into_result(timeout).unwrap_err(),
            Error::PairingTimedOut(timeout)
        );
        let token = PairingOutcome::Authorized(AuthorizationToken::new("t"))
            .into_result(timeout)
            .unwrap();
        assert_eq!(token.as_str(), "t");
    }
}
