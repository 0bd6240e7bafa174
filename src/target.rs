//! Applying one command to one or many lights.

use crate::client::BridgeClient;
use crate::errors::Error;
use crate::response::RawDeviceRecord;
use crate::transport::Transport;

/// The lights a command applies to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Single(String),
    List(Vec<String>),
}

impl Target {
    /// Light ids in this target, in order.
    pub fn ids(&self) -> Vec<&str> {
        match self {
            Target::Single(id) => vec![id.as_str()],
            Target::List(ids) => ids.iter().map(String::as_str).collect(),
        }
    }
}

impl From<&str> for Target {
    fn from(id: &str) -> Self {
        Target::Single(id.to_string())
    }
}

impl From<&RawDeviceRecord> for Target {
    fn from(record: &RawDeviceRecord) -> Self {
        Target::Single(record.id().to_string())
    }
}

impl From<&[RawDeviceRecord]> for Target {
    fn from(records: &[RawDeviceRecord]) -> Self {
        records.iter().map(|r| r.id().to_string()).collect()
    }
}

impl FromIterator<String> for Target {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Target::List(iter.into_iter().collect())
    }
}

/// Result of a command for one light of a [`Target`].
#[derive(Debug)]
pub struct TargetResult {
    pub id: String,
    pub result: Result<(), Error>,
}

/// Switch every light in `target`, one request per light.
///
/// Failures do not stop the remaining lights.
pub async fn set_on_off<T: Transport>(
    client: &BridgeClient<T>,
    target: &Target,
    on: bool,
) -> Vec<TargetResult> {
    let mut results = Vec::new();
    for id in target.ids() {
        let result = client.set_on_off(id, on).await;
        results.push(TargetResult {
            id: id.to_string(),
            result,
        });
    }
    results
}

/// Set the color of every light in `target`, one request per light.
pub async fn set_color<T: Transport>(
    client: &BridgeClient<T>,
    target: &Target,
    hue: u16,
    saturation: u8,
    brightness: u8,
) -> Vec<TargetResult> {
    let mut results = Vec::new();
    for id in target.ids() {
        let result = client.set_color(id, hue, saturation, brightness).await;
        results.push(TargetResult {
            id: id.to_string(),
            result,
        });
    }
    results
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::credentials::{AuthorizationToken, BridgeAddress};
    use crate::testing::ScriptedTransport;

    fn client(transport: &ScriptedTransport) -> BridgeClient<ScriptedTransport> {
        BridgeClient::new(
            transport.clone(),
            BridgeAddress::new("10.0.0.9"),
            AuthorizationToken::new("tok"),
        )
    }

    #[tokio::test]
    async fn test_list_target_fans_out() {
        let transport = ScriptedTransport::new([
            Ok(json!([{"success": {}}])),
            Err(ScriptedTransport::network_error()),
            Ok(json!([{"success": {}}])),
        ]);
        let target: Target = ["1", "2", "3"].into_iter().map(String::from).collect();

        let results = set_on_off(&client(&transport), &target, true).await;

        assert_eq!(results.len(), 3);
        assert!(results[0].result.is_ok());
        assert!(results[1].result.is_err());
        assert_eq!(results[2].id, "3");

        let urls: Vec<_> = transport.requests().into_iter().map(|r| r.url).collect();
        assert_eq!(urls[2], "http://10.0.0.9/api/tok/lights/3/state");
    }

    #[tokio::test]
    async fn test_single_target() {
        let transport = ScriptedTransport::repeating(json!([{"success": {}}]));
        let results = set_color(&client(&transport), &Target::from("7"), 100, 50, 25).await;

        assert_eq!(results.len(), 1);
        assert_eq!(
            transport.requests()[0].body,
            Some(json!({"hue": 100, "sat": 50, "bri": 25, "on": true}))
        );
    }

    #[test]
    fn test_target_from_records() {
        let records = vec![
            RawDeviceRecord::new("1", Default::default()),
            RawDeviceRecord::new("4", Default::default()),
        ];
        assert_eq!(Target::from(records.as_slice()).ids(), ["1", "4"]);
        assert_eq!(Target::from(&records[1]), Target::Single("4".to_string()));
    }
}
