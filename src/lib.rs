//! # hue_bridge_rs
//!
//! An async Rust client for the local REST API of Hue-style lighting bridges.
//!
//! This crate covers the bridge connection lifecycle: finding the bridge on
//! the network, pairing with it (the link-button handshake), checking that it
//! is reachable, and reading or changing light and scene state.
//!
//! ## Quick Start
//!
//! ```ignore
//! use std::sync::Arc;
//! use hue_bridge_rs::{setup, BridgeConfig, CommandKind, FileStore, HttpTransport};
//!
//! async fn control_lights() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BridgeConfig::default();
//!     let store = Arc::new(FileStore::new("bridge.json"));
//!
//!     // Uses cached credentials, or discovers and pairs (press the link button!)
//!     let client = setup::connect(HttpTransport::new(&config)?, store, &config).await?;
//!
//!     for light in client.fetch_collection(CommandKind::Lights).await? {
//!         println!("{} {:?}", light.id(), light.name());
//!     }
//!     client.set_color("1", 46920, 254, 200).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Components
//!
//! - **Endpoint resolution**: [`resolve`] maps a [`CommandKind`] to a URL
//! - **Transport**: the [`Transport`] trait, with a reqwest-backed [`HttpTransport`]
//! - **Discovery**: [`BridgeLocator`] asks the cloud lookup service for the bridge address
//! - **Pairing**: [`PairingSession`] polls until the link button is pressed
//! - **Commands**: [`BridgeClient`] reads collections and single resources and
//!   writes light state
//! - **Persistence**: [`CredentialStore`] with [`MemoryStore`] and [`FileStore`]
//! - **Fan-out**: [`Target`] and the helpers in [`target`] apply one command to many lights
//!
//! ## Feature Flags
//!
//! - `runtime-tokio` (default): Use the tokio async runtime
//! - `runtime-async-std`: Use the async-std runtime
//! - `runtime-smol`: Use the smol runtime
//! - `http` (default): Built-in [`HttpTransport`] (needs `runtime-tokio`)

mod client;
mod config;
mod credentials;
mod discovery;
mod endpoint;
mod errors;
mod history;
mod pairing;
mod response;
pub mod runtime;
pub mod setup;
pub mod target;
mod transport;

#[cfg(test)]
mod testing;

// Re-export public API
pub use client::BridgeClient;
pub use config::BridgeConfig;
pub use credentials::{AuthorizationToken, BridgeAddress, CredentialStore, Credentials, FileStore, MemoryStore};
pub use discovery::{BridgeLocator, DiscoveredBridge};
pub use endpoint::{BROADCAST_GROUP, CommandKind, DISCOVERY_URL, resolve};
pub use errors::Error;
pub use history::{HistoryEntry, HistorySummary, MessageHistory, MessageType};
pub use pairing::{CancelToken, PairingOutcome, PairingSession};
pub use response::{BridgeError, LINK_BUTTON_NOT_PRESSED, RawDeviceRecord, ResponseEntry, UNAUTHORIZED_USER};
pub use target::{Target, TargetResult};
#[cfg(feature = "http")]
pub use transport::HttpTransport;
pub use transport::{BoxError, Method, Transport, TransportError};
