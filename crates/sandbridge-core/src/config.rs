//! Bridge configuration.

use serde::{Deserialize, Serialize};

use crate::{
    bootstrap::AssetBundle,
    endpoint::ResolverConfig,
    launch::{KnownServers, LaunchArgs},
    storage::StorageLayout,
};

/// Everything a [`crate::BridgeSession`] needs to know up front.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Persistent directory layout.
    pub layout: StorageLayout,
    /// Mandatory asset bundle.
    pub bundle: AssetBundle,
    /// Endpoint resolution policy.
    pub resolver: ResolverConfig,
    /// Startup argument set.
    pub launch: LaunchArgs,
    /// Servers offered to the server browser.
    pub servers: KnownServers,
}
