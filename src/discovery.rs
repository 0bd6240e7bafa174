//! Bridge discovery via the cloud lookup service.

use std::sync::Arc;

use log::{debug, info, warn};
use serde::Deserialize;
use serde_json::Value;

use crate::config::BridgeConfig;
use crate::credentials::{BridgeAddress, CredentialStore};
use crate::endpoint::CommandKind;
use crate::errors::Error;
use crate::transport::{Method, Transport};

type Result<T> = std::result::Result<T, Error>;

/// A bridge reported by the discovery service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct DiscoveredBridge {
    /// Bridge identifier, when the service reports one
    #[serde(default)]
    pub id: Option<String>,
    /// Address of the bridge on the local network
    #[serde(rename = "internalipaddress")]
    pub address: BridgeAddress,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Finds the bridge on the caller's network.
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use hue_bridge_rs::{BridgeConfig, BridgeLocator, FileStore, HttpTransport};
///
/// let config = BridgeConfig::default();
/// let store = Arc::new(FileStore::new("bridge.json"));
/// let locator = BridgeLocator::new(HttpTransport::new(&config)?, store, &config);
/// match locator.discover().await {
///     Some(address) => println!("bridge at {address}"),
///     None => println!("no bridge found"),
/// }
/// ```
pub struct BridgeLocator<T> {
    transport: T,
    store: Arc<dyn CredentialStore>,
    discovery_url: String,
}

impl<T: Transport> BridgeLocator<T> {
    /// Create a locator that queries `config.discovery_url` and saves the found address to `store`.
    pub fn new(transport: T, store: Arc<dyn CredentialStore>, config: &BridgeConfig) -> Self {
        BridgeLocator {
            transport,
            store,
            discovery_url: config.discovery_url.clone(),
        }
    }

    /// Issue one discovery request and return every reported bridge.
    ///
    /// Records without a usable address are skipped.
    pub async fn candidates(&self) -> Result<Vec<DiscoveredBridge>> {
        let body = self
            .transport
            .execute(&self.discovery_url, Method::Get, None)
            .await
            .map_err(|e| Error::transport(CommandKind::Discover, e))?;

        let Value::Array(records) = body else {
            return Err(Error::unexpected(
                CommandKind::Discover,
                "discovery response is not an array",
            ));
        };

        Ok(records
            .into_iter()
            .filter_map(|record| serde_json::from_value::<DiscoveredBridge>(record).ok())
            .filter(|bridge| !bridge.address.is_empty())
            .collect())
    }

    /// Address of the first reported bridge, persisted to the credential
    /// store.
    ///
    /// Returns `None` when nothing was found or the request failed; the
    /// caller decides whether to retry.
    pub async fn discover(&self) -> Option<BridgeAddress> {
        let candidates = match self.candidates().await {
            Ok(candidates) => candidates,
            Err(e) => {
                warn!("Bridge discovery failed: {}", e);
                return None;
            }
        };
        debug!("Discovery returned {} bridge(s)", candidates.len());

        let address = candidates.into_iter().next()?.address;
        info!("Discovered bridge at {}", address);

        if let Err(e) = self.store.save_address(&address) {
            warn!("Failed to persist bridge address: {}", e);
        }
        Some(address)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credentials::MemoryStore;
    use crate::testing::ScriptedTransport;
    use serde_json::json;

    fn locator(transport: ScriptedTransport, store: &MemoryStore) -> BridgeLocator<ScriptedTransport> {
        let config = BridgeConfig::default().with_discovery_url("http://discovery.test/");
        BridgeLocator::new(transport, Arc::new(store.clone()), &config)
    }

    #[tokio::test]
    async fn test_discover_takes_first_record() {
        let transport = ScriptedTransport::new([Ok(json!([
            {"id": "001788fffe100491", "internalipaddress": "192.168.2.23"},
            {"id": "001788fffe09dddb", "internalipaddress": "192.168.2.24", "port": 443}
        ]))]);
        let store = MemoryStore::new();

        let address = locator(transport.clone(), &store).discover().await;

        assert_eq!(address, Some(BridgeAddress::new("192.168.2.23")));
        assert_eq!(store.snapshot().address, address);
        assert!(store.snapshot().token.is_none());

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].url, "http://discovery.test/");
        assert_eq!(requests[0].method, Method::Get);
    }

    #[tokio::test]
    async fn test_empty_discovery_returns_none() {
        let store = MemoryStore::new();
        let found = locator(ScriptedTransport::new([Ok(json!([]))]), &store)
            .discover()
            .await;
        assert_eq!(found, None);
        assert!(store.snapshot().address.is_none());
    }

    #[tokio::test]
    async fn test_failed_discovery_returns_none() {
        let store = MemoryStore::new();
        let transport = ScriptedTransport::new([Err(ScriptedTransport::network_error())]);
        assert_eq!(locator(transport, &store).discover().await, None);
    }

    #[tokio::test]
    async fn test_candidates_reports_shape_errors() {
        let store = MemoryStore::new();
        let err = locator(ScriptedTransport::new([Ok(json!({"error": "nope"}))]), &store)
            .candidates()
            .await
            .unwrap_err();
        assert!(matches!(err, Error::UnexpectedResponse { kind: CommandKind::Discover, .. }));
    }
}
