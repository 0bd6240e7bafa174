//! First-run setup: cached credentials, else discovery and pairing.

use std::sync::Arc;

use log::info;

use crate::client::BridgeClient;
use crate::config::BridgeConfig;
use crate::credentials::CredentialStore;
use crate::discovery::BridgeLocator;
use crate::errors::Error;
use crate::pairing::PairingSession;
use crate::transport::Transport;

type Result<T> = std::result::Result<T, Error>;

/// Produce a configured [`BridgeClient`].
///
/// Cached credentials are used as-is. Otherwise a cached address is reused
/// (or one is discovered) and a pairing session runs for
/// `config.pairing_timeout`, so the user has that long to press the link
/// button. Discovery and pairing persist their results to `store`.
///
/// The errors tell the setup flows apart:
/// - [`Error::BridgeNotFound`]: run discovery again
/// - [`Error::PairingTimedOut`]: press the link button and retry
/// - [`Error::Device`] / [`Error::Transport`]: diagnostic detail
///
/// # Examples
///
/// ```ignore
/// use std::sync::Arc;
/// use hue_bridge_rs::{setup, BridgeConfig, FileStore, HttpTransport};
///
/// let config = BridgeConfig::default();
/// let store = Arc::new(FileStore::new("bridge.json"));
/// let client = setup::connect(HttpTransport::new(&config)?, store, &config).await?;
/// ```
pub async fn connect<T: Transport + Clone>(
    transport: T,
    store: Arc<dyn CredentialStore>,
    config: &BridgeConfig,
) -> Result<BridgeClient<T>> {
    let cached = store.load()?;
    if cached.is_configured() {
        return Ok(BridgeClient::with_credentials(transport, cached));
    }

    let address = match cached.address.filter(|a| !a.is_empty()) {
        Some(address) => address,
        None => BridgeLocator::new(transport.clone(), Arc::clone(&store), config)
            .discover()
            .await
            .ok_or(Error::BridgeNotFound)?,
    };

    info!("Pairing with bridge at {}; press the link button", address);
    let token = PairingSession::new(transport.clone(), store, config)
        .pair(&address, config.pairing_timeout)
        .await
        .into_result(config.pairing_timeout)?;

    Ok(BridgeClient::new(transport, address, token))
}
