//! Startup arguments and known servers.

use serde::{Deserialize, Serialize};

use crate::action::BridgeAction;

/// Fixed argument set handed to the embedded application at start.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LaunchArgs {
    /// Music driver selection.
    pub music: String,
    /// Sound driver selection.
    pub sound: String,
    /// Video driver and input mode selection.
    pub video: String,
}

impl Default for LaunchArgs {
    fn default() -> Self {
        Self {
            music: "-mnull".to_string(),
            sound: "-snull".to_string(),
            video: "-vsdl:relative_mode".to_string(),
        }
    }
}

impl LaunchArgs {
    /// Arguments in the order the application expects them.
    pub fn to_argv(&self) -> Vec<String> {
        vec![self.music.clone(), self.sound.clone(), self.video.clone()]
    }
}

/// Servers reachable through a WebSocket proxy, offered to the application's
/// server browser.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct KnownServers {
    servers: Vec<String>,
}

impl KnownServers {
    /// Empty list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append `address` (`host:port`) unless already listed.
    ///
    /// Returns `true` if it was added.
    pub fn add(&mut self, address: impl Into<String>) -> bool {
        let address = address.into();
        if self.servers.contains(&address) {
            return false;
        }
        self.servers.push(address);
        true
    }

    /// Listed servers in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.servers.iter().map(String::as_str)
    }

    /// One `AddServer` per listed server.
    pub fn prepare(&self) -> Vec<BridgeAction> {
        self.servers
            .iter()
            .map(|address| BridgeAction::AddServer { address: address.clone() })
            .collect()
    }
}

impl<S: Into<String>> FromIterator<S> for KnownServers {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        let mut servers = Self::new();
        for address in iter {
            servers.add(address);
        }
        servers
    }
}
