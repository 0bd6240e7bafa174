//! Command dispatch against a paired bridge.

use std::sync::Arc;

use log::debug;
use serde_json::{Value, json};

use crate::credentials::{AuthorizationToken, BridgeAddress, CredentialStore, Credentials};
use crate::endpoint::{CommandKind, resolve};
use crate::errors::Error;
use crate::history::{MessageHistory, MessageType};
use crate::response::{self, RawDeviceRecord};
use crate::runtime::Mutex;
use crate::transport::{Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// Reads and mutates bridge resources on behalf of the entity layer.
///
/// A client is either configured (address and token both present) or not;
/// every operation on an unconfigured client fails with [`Error::NotReady`].
/// Nothing is retried: failures are returned tagged with the command kind.
/// Each call addresses exactly one resource.
///
/// # Example
///
/// ```
/// use hue_bridge_rs::{AuthorizationToken, BridgeAddress, BridgeClient, BridgeConfig, HttpTransport};
///
/// let transport = HttpTransport::new(&BridgeConfig::default()).unwrap();
/// let client = BridgeClient::new(
///     transport,
///     BridgeAddress::new("192.168.1.2"),
///     AuthorizationToken::new("token"),
/// );
/// assert!(client.is_ready());
/// ```
#[derive(Debug, Clone)]
pub struct BridgeClient<T> {
    transport: T,
    credentials: Credentials,
    history: Arc<Mutex<MessageHistory>>,
}

impl<T: Transport> BridgeClient<T> {
    /// Create a client for an already paired bridge.
    pub fn new(transport: T, address: BridgeAddress, token: AuthorizationToken) -> Self {
        Self::with_credentials(transport, Credentials::new(address, token))
    }

    /// Create a client from stored credentials, which may be incomplete.
    pub fn with_credentials(transport: T, credentials: Credentials) -> Self {
        BridgeClient {
            transport,
            credentials,
            history: Arc::new(Mutex::new(MessageHistory::new())),
        }
    }

    /// Build a client from whatever the store holds.
    ///
    /// An empty store yields an unconfigured client, not an error.
    pub fn from_store(transport: T, store: &dyn CredentialStore) -> Result<Self> {
        Ok(Self::with_credentials(transport, store.load()?))
    }

    /// Address of the bridge, if known.
    pub fn address(&self) -> Option<&BridgeAddress> {
        self.credentials.address.as_ref()
    }

    /// Token issued by the bridge, if paired.
    pub fn token(&self) -> Option<&AuthorizationToken> {
        self.credentials.token.as_ref()
    }

    /// Whether both address and token are present.
    pub fn is_ready(&self) -> bool {
        self.credentials.is_configured()
    }

    /// Install a freshly paired token.
    ///
    /// Not synchronized with in-flight requests; call it between operations.
    pub fn authorize(&mut self, address: BridgeAddress, token: AuthorizationToken) {
        self.credentials = Credentials::new(address, token);
    }

    /// Copy of the message history.
    pub async fn history(&self) -> MessageHistory {
        self.history.lock().await.clone()
    }

    /// Drop all recorded messages and the last error.
    pub async fn clear_history(&self) {
        self.history.lock().await.clear();
    }

    /// Snapshot of the client state and message history; the token is
    /// redacted.
    pub async fn diagnostics(&self) -> Value {
        let history = self.history.lock().await;
        json!({
            "address": self.address().map(BridgeAddress::as_str),
            "token": self.token().map(AuthorizationToken::to_string),
            "ready": self.is_ready(),
            "history": serde_json::to_value(history.summary()).unwrap_or(Value::Null),
        })
    }

    /// Liveness check: reads the lights collection.
    ///
    /// Any failure (unconfigured client, unreachable bridge, revoked token)
    /// reports `false`; use [`fetch_collection`](Self::fetch_collection) to
    /// see the underlying error.
    pub async fn is_connected(&self) -> bool {
        match self.send(CommandKind::Connected, None, Method::Get, None).await {
            Ok(body) => body.is_object(),
            Err(e) => {
                debug!("Bridge not connected: {}", e);
                false
            }
        }
    }

    /// Read a collection (`Lights` or `Scenes`).
    ///
    /// The bridge keys records by id without repeating the id inside the
    /// record, so each returned record carries its key as identifier.
    /// Numeric ids come first in numeric order, followed by any other ids
    /// in text order.
    pub async fn fetch_collection(&self, kind: CommandKind) -> Result<Vec<RawDeviceRecord>> {
        if !matches!(kind, CommandKind::Lights | CommandKind::Scenes) {
            return Err(Error::UnsupportedCommand(kind));
        }

        let body = self.send(kind, None, Method::Get, None).await?;
        let Value::Object(map) = body else {
            return Err(Error::unexpected(kind, "collection is not an object"));
        };

        let mut records = map
            .into_iter()
            .map(|(id, value)| RawDeviceRecord::from_value(kind, &id, value))
            .collect::<Result<Vec<_>>>()?;
        records.sort_by(|a, b| id_order(a.id()).cmp(&id_order(b.id())));
        Ok(records)
    }

    /// Read one resource (`Light` or `Scene`).
    pub async fn fetch_one(&self, kind: CommandKind, id: &str) -> Result<RawDeviceRecord> {
        if !matches!(kind, CommandKind::Light | CommandKind::Scene) {
            return Err(Error::UnsupportedCommand(kind));
        }

        let body = self.send(kind, Some(id), Method::Get, None).await?;
        RawDeviceRecord::from_value(kind, id, body)
    }

    /// Switch a light on or off.
    pub async fn set_on_off(&self, id: &str, on: bool) -> Result<()> {
        self.write(CommandKind::LightState, Some(id), json!({ "on": on }))
            .await
    }

    /// Set hue, saturation, and brightness. This also turns the light on,
    /// as the bridge API expects.
    pub async fn set_color(&self, id: &str, hue: u16, saturation: u8, brightness: u8) -> Result<()> {
        let body = json!({
            "hue": hue,
            "sat": saturation,
            "bri": brightness,
            "on": true,
        });
        self.write(CommandKind::LightState, Some(id), body).await
    }

    /// Set brightness only; the power state is left alone.
    pub async fn set_brightness(&self, id: &str, brightness: u8) -> Result<()> {
        self.write(CommandKind::LightState, Some(id), json!({ "bri": brightness }))
            .await
    }

    /// Recall a scene on the broadcast group.
    pub async fn activate_scene(&self, scene_id: &str) -> Result<()> {
        let body = json!({ "scene": scene_id, "on": true });
        self.write(CommandKind::GroupAction, None, body).await
    }

    async fn write(&self, kind: CommandKind, id: Option<&str>, body: Value) -> Result<()> {
        self.send(kind, id, Method::Put, Some(body)).await?;
        Ok(())
    }

    async fn send(
        &self,
        kind: CommandKind,
        id: Option<&str>,
        method: Method,
        body: Option<Value>,
    ) -> Result<Value> {
        let Some((address, token)) = self.credentials.pair() else {
            return Err(Error::NotReady);
        };
        let url = resolve(kind, Some(address), Some(token), id)?;

        debug!("{} {} {}", method, kind, id.unwrap_or("-"));
        self.history.lock().await.record(
            MessageType::Send,
            kind,
            method,
            body.as_ref().unwrap_or(&Value::Null),
        );

        let result = match self.transport.execute(&url, method, body.as_ref()).await {
            Ok(reply) => {
                self.history
                    .lock()
                    .await
                    .record(MessageType::Receive, kind, method, &reply);
                response::check(kind, reply)
            }
            Err(e) => Err(Error::transport(kind, e)),
        };

        if let Err(e) = &result {
            self.history.lock().await.record_error(&e.to_string());
        }
        result
    }
}

/// Numeric ids first in numeric order, then every other id in text order.
fn id_order(id: &str) -> (bool, u64, &str) {
    match id.parse::<u64>() {
        Ok(n) => (false, n, id),
        Err(_) => (true, 0, id),
    }
}
