//! Bridge credentials and their persistence.

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Network address (host or IP) of a bridge on the local network.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BridgeAddress(String);

impl BridgeAddress {
    /// Wrap a host or `host:port` string.
    pub fn new(address: impl Into<String>) -> Self {
        BridgeAddress(address.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }
}

impl fmt::Display for BridgeAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Opaque credential minted by the bridge during pairing.
///
/// `Debug` and `Display` only show a short prefix so tokens do not end up in
/// logs.
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuthorizationToken(String);

impl AuthorizationToken {
    /// Wrap a token issued by the bridge.
    pub fn new(token: impl Into<String>) -> Self {
        AuthorizationToken(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.trim().is_empty()
    }

    pub(crate) fn redacted(&self) -> String {
        let prefix: String = self.0.chars().take(4).collect();
        format!("{prefix}…")
    }
}

impl fmt::Debug for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AuthorizationToken")
            .field(&self.redacted())
            .finish()
    }
}

impl fmt::Display for AuthorizationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.redacted())
    }
}

/// Last known address/token pair.
///
/// The two fields are independent; a usable pair needs both.
#[serde_with::skip_serializing_none]
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(rename = "HUE_ADDR")]
    pub address: Option<BridgeAddress>,
    #[serde(rename = "API_KEY")]
    pub token: Option<AuthorizationToken>,
}

impl Credentials {
    /// Fully configured credentials.
    pub fn new(address: BridgeAddress, token: AuthorizationToken) -> Self {
        Credentials {
            address: Some(address),
            token: Some(token),
        }
    }

    /// Returns the pair only when both parts are present and non-empty.
    pub fn pair(&self) -> Option<(&BridgeAddress, &AuthorizationToken)> {
        match (&self.address, &self.token) {
            (Some(a), Some(t)) if !a.is_empty() && !t.is_empty() => Some((a, t)),
            _ => None,
        }
    }

    /// Whether both the address and the token are present and non-empty.
    pub fn is_configured(&self) -> bool {
        self.pair().is_some()
    }
}

/// Persisted storage for the last known address and token.
///
/// Read once when a client is built, written once after a successful
/// discovery and once after a successful pairing.
pub trait CredentialStore: Send + Sync {
    /// Load whatever is stored. An empty or missing store is not an error.
    fn load(&self) -> Result<Credentials>;

    fn save_address(&self, address: &BridgeAddress) -> Result<()>;

    fn save_token(&self, token: &AuthorizationToken) -> Result<()>;
}

/// In-process store, mostly useful for tests and short-lived tools.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Credentials>>,
}

impl MemoryStore {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// A store pre-seeded with `credentials`.
    pub fn with_credentials(credentials: Credentials) -> Self {
        MemoryStore {
            inner: Arc::new(Mutex::new(credentials)),
        }
    }

    /// Copy of what the store currently holds.
    pub fn snapshot(&self) -> Credentials {
        self.lock().clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Credentials> {
        // A poisoned guard still holds valid credentials.
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

impl CredentialStore for MemoryStore {
    fn load(&self) -> Result<Credentials> {
        Ok(self.snapshot())
    }

    fn save_address(&self, address: &BridgeAddress) -> Result<()> {
        self.lock().address = Some(address.clone());
        Ok(())
    }

    fn save_token(&self, token: &AuthorizationToken) -> Result<()> {
        self.lock().token = Some(token.clone());
        Ok(())
    }
}

/// Store backed by a JSON file.
///
/// # Example
///
/// ```no_run
/// use hue_bridge_rs::{CredentialStore, FileStore};
///
/// let store = FileStore::new("/tmp/hue-bridge.json");
/// let credentials = store.load().unwrap();
/// assert!(!credentials.is_configured() || credentials.address.is_some());
/// ```
#[derive(Debug, Clone)]
pub struct FileStore {
    path: PathBuf,
}

impl FileStore {
    /// A store backed by the JSON file at `path`; the file need not exist yet.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        FileStore { path: path.into() }
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn update(&self, f: impl FnOnce(&mut Credentials)) -> Result<()> {
        let mut credentials = self.load()?;
        f(&mut credentials);
        let data = serde_json::to_vec_pretty(&credentials).map_err(Error::JsonDump)?;
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| Error::store("create_dir", e))?;
        }
        fs::write(&self.path, data).map_err(|e| Error::store("write", e))
    }
}

impl CredentialStore for FileStore {
    fn load(&self) -> Result<Credentials> {
        match fs::read(&self.path) {
            Ok(data) if data.iter().all(u8::is_ascii_whitespace) => Ok(Credentials::default()),
            Ok(data) => serde_json::from_slice(&data).map_err(Error::JsonLoad),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Credentials::default()),
            Err(e) => Err(Error::store("read", e)),
        }
    }

    fn save_address(&self, address: &BridgeAddress) -> Result<()> {
        self.update(|c| c.address = Some(address.clone()))
    }

    fn save_token(&self, token: &AuthorizationToken) -> Result<()> {
        self.update(|c| c.token = Some(token.clone()))
    }
}
