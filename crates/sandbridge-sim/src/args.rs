//! Command-line arguments.

use std::{path::PathBuf, str::FromStr};

use clap::Parser;
use sandbridge_core::{
    AssetBundle, BridgeConfig, BridgeEvent, EndpointSpec, PageTransport, PinnedEndpoint, Protocol,
    ResolverConfig, StorageLayout,
};
use sandbridge_harness::FaultPlan;
use thiserror::Error;

/// Run simulated browser sessions through the bridge.
#[derive(Debug, Clone, Parser)]
#[command(name = "sandbridge-sim", version, about)]
pub struct Args {
    /// Number of sessions sharing one backing store.
    #[arg(long, default_value_t = 2)]
    pub sessions: usize,

    /// Treat the hosting page as served over https.
    #[arg(long)]
    pub secure_page: bool,

    /// WebSocket proxy for the content service.
    #[arg(long, default_value = ResolverConfig::CONTENT_SERVICE_PROXY)]
    pub content_proxy: String,

    /// Persistent personal directory (the mount point).
    #[arg(long, default_value = "/home/web_user/.openttd")]
    pub personal_dir: PathBuf,

    /// Asset bundle file name; carries the version.
    #[arg(long, default_value = "opengfx-0.6.0.tar")]
    pub bundle: String,

    /// Asset bundle source URL.
    #[arg(long, default_value = "https://installer.cdn.openttd.org/emscripten/opengfx-0.6.0.tar")]
    pub bundle_url: String,

    /// Proxied server to offer to the server browser (repeatable).
    #[arg(long = "server", value_name = "HOST:PORT")]
    pub servers: Vec<String>,

    /// Connection attempt to resolve in each session (repeatable).
    #[arg(long = "connect", value_name = "HOST:PORT/PROTO")]
    pub connect: Vec<ConnectTarget>,

    /// Manual syncs requested in each session after start.
    #[arg(long, default_value_t = 0)]
    pub syncs: usize,

    /// End each session through the exit hook.
    #[arg(long)]
    pub exit: bool,

    /// Probability the initial load fails.
    #[arg(long, default_value_t = 0.0)]
    pub load_failure_rate: f64,

    /// Probability a flush fails.
    #[arg(long, default_value_t = 0.0)]
    pub flush_failure_rate: f64,

    /// Probability the bundle download fails.
    #[arg(long, default_value_t = 0.0)]
    pub download_failure_rate: f64,

    /// Seed for fault injection.
    #[arg(long, default_value_t = 0)]
    pub seed: u64,
}

impl Args {
    /// Bridge configuration described by the flags.
    pub fn bridge_config(&self) -> BridgeConfig {
        let layout = StorageLayout { personal_dir: self.personal_dir.clone(), ..Default::default() };
        let resolver = ResolverConfig {
            pinned: vec![PinnedEndpoint {
                host: ResolverConfig::CONTENT_SERVICE_HOST.to_string(),
                port: ResolverConfig::CONTENT_SERVICE_PORT,
                protocol: Protocol::Tcp,
                endpoint: self.content_proxy.clone(),
            }],
            page: if self.secure_page { PageTransport::Secure } else { PageTransport::Insecure },
            ..ResolverConfig::default()
        };

        BridgeConfig {
            layout,
            bundle: AssetBundle { file_name: self.bundle.clone(), url: self.bundle_url.clone() },
            resolver,
            servers: self.servers.iter().cloned().collect(),
            ..BridgeConfig::default()
        }
    }

    /// Fault plan described by the flags.
    pub fn fault_plan(&self) -> FaultPlan {
        FaultPlan {
            load_failure_rate: self.load_failure_rate,
            flush_failure_rate: self.flush_failure_rate,
            download_failure_rate: self.download_failure_rate,
            seed: self.seed,
        }
    }

    /// Hooks delivered in each session after start, in order.
    pub fn hooks(&self) -> Vec<BridgeEvent> {
        let mut hooks = Vec::new();
        if !self.servers.is_empty() {
            hooks.push(BridgeEvent::PrepareServerList);
        }
        hooks.extend((0..self.syncs).map(|_| BridgeEvent::RequestSync { acknowledge: true }));
        if self.exit {
            hooks.push(BridgeEvent::RequestExit);
        }
        hooks
    }
}

/// Malformed `--connect` value.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseTargetError {
    /// Missing `:` or `/` separator.
    #[error("expected HOST:PORT/PROTO, got {0:?}")]
    Format(String),
    /// Port is not a number in range.
    #[error("invalid port {0:?}")]
    Port(String),
    /// Protocol is neither `tcp` nor `udp`.
    #[error("unknown protocol {0:?}")]
    Protocol(String),
}

/// A `HOST:PORT/PROTO` connection target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectTarget(pub EndpointSpec);

impl FromStr for ConnectTarget {
    type Err = ParseTargetError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (address, protocol) =
            s.rsplit_once('/').ok_or_else(|| ParseTargetError::Format(s.to_string()))?;
        let (host, port) =
            address.rsplit_once(':').ok_or_else(|| ParseTargetError::Format(s.to_string()))?;
        if host.is_empty() {
            return Err(ParseTargetError::Format(s.to_string()));
        }

        let port = port.parse::<u16>().map_err(|_| ParseTargetError::Port(port.to_string()))?;
        let protocol = match protocol.to_ascii_lowercase().as_str() {
            "tcp" => Protocol::Tcp,
            "udp" => Protocol::Udp,
            _ => return Err(ParseTargetError::Protocol(protocol.to_string())),
        };

        Ok(Self(EndpointSpec::new(host, port, protocol)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_connect_target() {
        let target: ConnectTarget = "content.openttd.org:3978/tcp".parse().unwrap();
        assert_eq!(target.0, EndpointSpec::new("content.openttd.org", 3978, Protocol::Tcp));

        let target: ConnectTarget = "[::1]:3979/UDP".parse().unwrap();
        assert_eq!(target.0, EndpointSpec::new("[::1]", 3979, Protocol::Udp));
    }

    #[test]
    fn reject_malformed_targets() {
        assert!(matches!(
            "example.net/tcp".parse::<ConnectTarget>(),
            Err(ParseTargetError::Format(_))
        ));
        assert!(matches!(
            "example.net:99999/tcp".parse::<ConnectTarget>(),
            Err(ParseTargetError::Port(_))
        ));
        assert!(matches!(
            "example.net:3979/sctp".parse::<ConnectTarget>(),
            Err(ParseTargetError::Protocol(_))
        ));
        assert!(matches!(":3979/tcp".parse::<ConnectTarget>(), Err(ParseTargetError::Format(_))));
    }

    #[test]
    fn defaults_match_bridge_defaults() {
        let args = Args::parse_from(["sandbridge-sim"]);
        assert_eq!(args.bridge_config(), BridgeConfig::default());
        assert_eq!(args.fault_plan(), FaultPlan::default());
        assert!(args.hooks().is_empty());
    }

    #[test]
    fn flags_shape_config_and_hooks() {
        let args = Args::parse_from([
            "sandbridge-sim",
            "--secure-page",
            "--content-proxy",
            "wss://content.openttd.org/",
            "--server",
            "localhost:3979",
            "--syncs",
            "2",
            "--exit",
        ]);
        let config = args.bridge_config();

        assert_eq!(config.resolver.page, PageTransport::Secure);
        assert_eq!(config.resolver.pinned[0].endpoint, "wss://content.openttd.org/");
        assert_eq!(config.servers.iter().collect::<Vec<_>>(), ["localhost:3979"]);
        assert_eq!(
            args.hooks(),
            vec![
                BridgeEvent::PrepareServerList,
                BridgeEvent::RequestSync { acknowledge: true },
                BridgeEvent::RequestSync { acknowledge: true },
                BridgeEvent::RequestExit,
            ]
        );
    }
}
