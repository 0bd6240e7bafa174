//! URL construction for bridge commands.

use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumIter};

use crate::credentials::{AuthorizationToken, BridgeAddress};
use crate::errors::Error;

type Result<T> = std::result::Result<T, Error>;

/// Well-known cloud service listing the bridges on the caller's network.
pub const DISCOVERY_URL: &str = "https://discovery.meethue.com/";

/// Group index the bridge reserves for "all lights".
pub const BROADCAST_GROUP: u32 = 0;

/// The bridge resource or operation a request targets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CommandKind {
    /// Cloud lookup of bridges on the local network
    Discover,
    /// Pairing request that mints a new token
    Register,
    /// Liveness check (reads the lights collection)
    Connected,
    /// All lights known to the bridge
    Lights,
    /// A single light
    Light,
    /// Write form of a single light's state
    LightState,
    /// All scenes stored on the bridge
    Scenes,
    /// A single scene
    Scene,
    /// Action on the broadcast group, used for scene activation
    GroupAction,
}

impl CommandKind {
    /// Whether the URL for this kind needs a resource identifier.
    pub fn needs_id(&self) -> bool {
        matches!(
            self,
            CommandKind::Light | CommandKind::LightState | CommandKind::Scene
        )
    }

    /// Whether the URL for this kind embeds the authorization token.
    pub fn needs_token(&self) -> bool {
        !matches!(self, CommandKind::Discover | CommandKind::Register)
    }

    fn resource_path(&self) -> String {
        match self {
            CommandKind::Connected
            | CommandKind::Lights
            | CommandKind::Light
            | CommandKind::LightState => "lights".to_string(),
            CommandKind::Scenes | CommandKind::Scene => "scenes".to_string(),
            CommandKind::GroupAction => format!("groups/{BROADCAST_GROUP}/action"),
            CommandKind::Discover | CommandKind::Register => String::new(),
        }
    }
}

/// Resolve the URL for a command.
///
/// Pure: the same inputs always produce the same URL. Missing credentials, a
/// missing identifier, or an identifier that is not a single path segment is
/// reported as an error rather than producing a malformed URL.
///
/// # Examples
///
/// ```
/// use hue_bridge_rs::{resolve, AuthorizationToken, BridgeAddress, CommandKind};
///
/// let addr = BridgeAddress::new("192.168.1.2");
/// let token = AuthorizationToken::new("abc");
/// let url = resolve(CommandKind::LightState, Some(&addr), Some(&token), Some("5")).unwrap();
/// assert_eq!(url, "http://192.168.1.2/api/abc/lights/5/state");
/// ```
pub fn resolve(
    kind: CommandKind,
    address: Option<&BridgeAddress>,
    token: Option<&AuthorizationToken>,
    id: Option<&str>,
) -> Result<String> {
    if kind == CommandKind::Discover {
        return Ok(DISCOVERY_URL.to_string());
    }

    let address = address
        .filter(|a| !a.is_empty())
        .ok_or_else(|| Error::missing_credential(kind, "address"))?;

    if !kind.needs_token() {
        return Ok(format!("http://{}/api/", address.as_str()));
    }

    let token = token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| Error::missing_credential(kind, "token"))?;

    let mut url = format!(
        "http://{}/api/{}/{}",
        address.as_str(),
        token.as_str(),
        kind.resource_path()
    );

    if kind.needs_id() {
        let id = id
            .filter(|id| !id.is_empty())
            .ok_or(Error::MissingIdentifier(kind))?;
        if !is_path_segment(id) {
            return Err(Error::InvalidIdentifier {
                kind,
                id: id.to_string(),
            });
        }
        url.push('/');
        url.push_str(id);
    }

    if kind == CommandKind::LightState {
        url.push_str("/state");
    }

    Ok(url)
}

/// Bridge ids are plain tokens: unreserved URL characters only, and never a
/// dot segment.
fn is_path_segment(id: &str) -> bool {
    id != "."
        && id != ".."
        && id
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.' | b'~'))
}
