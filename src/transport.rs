//! Single HTTP request/response exchange with a bridge.

use std::future::Future;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use strum_macros::Display;

/// Boxed error preserved as the opaque cause of a transport failure.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP methods used by the bridge API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE")]
#[serde(rename_all = "UPPERCASE")]
pub enum Method {
    Get,
    Post,
    Put,
}

impl Method {
    /// Only mutating methods carry a body.
    pub fn carries_body(&self) -> bool {
        matches!(self, Method::Post | Method::Put)
    }

    /// The body to actually send for this method.
    pub fn body<'a>(&self, body: Option<&'a Value>) -> Option<&'a Value> {
        body.filter(|_| self.carries_body())
    }
}

/// Failure to obtain a decoded response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// No response before the transport-level timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection, DNS, or protocol failure.
    #[error("request to {url} failed: {source}")]
    Network {
        url: String,
        #[source]
        source: BoxError,
    },

    /// The bridge answered with a non-success HTTP status.
    #[error("request to {url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The body was not valid JSON.
    #[error("undecodable response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl TransportError {
    /// Create a new network error
    pub fn network(url: &str, source: impl Into<BoxError>) -> Self {
        TransportError::Network {
            url: url.to_string(),
            source: source.into(),
        }
    }

    /// Create a new decode error
    pub fn decode(url: &str, source: serde_json::Error) -> Self {
        TransportError::Decode {
            url: url.to_string(),
            source,
        }
    }
}

/// Performs one request and returns the decoded body.
///
/// Each call resolves to exactly one result; no partial results are exposed.
/// The body is only sent for methods where [`Method::carries_body`] holds.
/// No schema validation happens here.
pub trait Transport: Send + Sync {
    fn execute(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send;
}

impl<T: Transport> Transport for std::sync::Arc<T> {
    fn execute(
        &self,
        url: &str,
        method: Method,
        body: Option<&Value>,
    ) -> impl Future<Output = Result<Value, TransportError>> + Send {
        (**self).execute(url, method, body)
    }
}

#[cfg(feature = "http")]
pub use http::HttpTransport;

#[cfg(feature = "http")]
mod http {
    use log::debug;
    use reqwest::Client;
    use serde_json::Value;

    use super::{Method, Transport, TransportError};
    use crate::config::BridgeConfig;

    /// [`Transport`] backed by a pooled `reqwest` client.
    ///
    /// # Example
    ///
    /// ```
    /// use hue_bridge_rs::{BridgeConfig, HttpTransport};
    ///
    /// let transport = HttpTransport::new(&BridgeConfig::default()).unwrap();
    /// ```
    #[derive(Debug, Clone)]
    pub struct HttpTransport {
        client: Client,
    }

    impl HttpTransport {
        /// Build a client with the request and connect timeouts from `config`.
        pub fn new(config: &BridgeConfig) -> Result<Self, TransportError> {
            let client = Client::builder()
                .timeout(config.request_timeout)
                .connect_timeout(config.connect_timeout)
                .build()
                .map_err(|e| TransportError::network("<client>", e))?;
            Ok(HttpTransport { client })
        }

        /// Wrap an already configured client.
        pub fn with_client(client: Client) -> Self {
            HttpTransport { client }
        }

        fn map_error(url: &str, err: reqwest::Error) -> TransportError {
            if err.is_timeout() {
                TransportError::Timeout {
                    url: url.to_string(),
                }
            } else {
                TransportError::network(url, err)
            }
        }
    }

    impl Transport for HttpTransport {
        async fn execute(
            &self,
            url: &str,
            method: Method,
            body: Option<&Value>,
        ) -> Result<Value, TransportError> {
            let http_method = match method {
                Method::Get => reqwest::Method::GET,
                Method::Post => reqwest::Method::POST,
                Method::Put => reqwest::Method::PUT,
            };

            let mut request = self.client.request(http_method, url);
            if let Some(body) = method.body(body) {
                request = request.json(body);
            }

            let response = request
                .send()
                .await
                .map_err(|e| Self::map_error(url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(TransportError::Status {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| Self::map_error(url, e))?;
            debug!("{method} response: {} bytes", bytes.len());

            serde_json::from_slice(&bytes).map_err(|e| TransportError::decode(url, e))
        }
    }
}
