//! Endpoint resolution for sandboxed connections.
//!
//! The sandbox cannot open raw sockets; every connection is carried over a
//! WebSocket. The resolver maps a requested destination to the WebSocket
//! endpoint to dial, or to `None` when the sandbox's default mapping applies.
//!
//! # Policy
//!
//! 1. A destination matching a pinned `(host, port, protocol)` triple goes to
//!    its configured proxy, regardless of page transport.
//! 2. Otherwise, if the hosting page was served over a secure transport, the
//!    secure scheme is forced. Browsers silently block insecure WebSockets
//!    from secure pages.
//! 3. Otherwise `None`.
//!
//! The protocol is an explicit argument. Resolution holds no mutable state
//! and may be called any number of times.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Transport protocol of a requested connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Stream socket.
    Tcp,
    /// Datagram socket.
    Udp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Tcp => f.write_str("tcp"),
            Self::Udp => f.write_str("udp"),
        }
    }
}

/// Transport the hosting page itself was loaded over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PageTransport {
    /// `https:` page.
    Secure,
    /// `http:` or `file:` page.
    #[default]
    Insecure,
}

/// Requested destination of one connection attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EndpointSpec {
    /// Destination host name or address.
    pub host: String,
    /// Destination port.
    pub port: u16,
    /// Socket type.
    pub protocol: Protocol,
}

impl EndpointSpec {
    /// Create a destination.
    pub fn new(host: impl Into<String>, port: u16, protocol: Protocol) -> Self {
        Self { host: host.into(), port, protocol }
    }
}

impl fmt::Display for EndpointSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}/{}", self.host, self.port, self.protocol)
    }
}

/// A destination redirected to a fixed proxy endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PinnedEndpoint {
    /// Destination host the override applies to.
    pub host: String,
    /// Destination port the override applies to.
    pub port: u16,
    /// Socket type the override applies to.
    pub protocol: Protocol,
    /// WebSocket URL to dial instead.
    pub endpoint: String,
}

impl PinnedEndpoint {
    /// Host names compare case-insensitively, the way DNS does.
    fn matches(&self, host: &str, port: u16, protocol: Protocol) -> bool {
        self.port == port && self.protocol == protocol && self.host.eq_ignore_ascii_case(host)
    }
}

/// Resolver configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolverConfig {
    /// Pinned overrides, checked in order.
    pub pinned: Vec<PinnedEndpoint>,
    /// Transport of the hosting page.
    pub page: PageTransport,
    /// Endpoint prefix forced for secure pages.
    pub secure_scheme: String,
}

impl ResolverConfig {
    /// Host of the content distribution service.
    pub const CONTENT_SERVICE_HOST: &'static str = "content.openttd.org";
    /// Port of the content distribution service.
    pub const CONTENT_SERVICE_PORT: u16 = 3978;
    /// WebSocket proxy in front of the content distribution service.
    pub const CONTENT_SERVICE_PROXY: &'static str = "wss://bananas-server.openttd.org/";
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            pinned: vec![PinnedEndpoint {
                host: Self::CONTENT_SERVICE_HOST.to_string(),
                port: Self::CONTENT_SERVICE_PORT,
                protocol: Protocol::Tcp,
                endpoint: Self::CONTENT_SERVICE_PROXY.to_string(),
            }],
            page: PageTransport::Insecure,
            secure_scheme: "wss://".to_string(),
        }
    }
}

/// Maps requested destinations to transport endpoints.
#[derive(Debug, Clone, Default)]
pub struct EndpointResolver {
    config: ResolverConfig,
}

impl EndpointResolver {
    /// Create a resolver from configuration.
    pub fn new(config: ResolverConfig) -> Self {
        Self { config }
    }

    /// Active configuration.
    pub fn config(&self) -> &ResolverConfig {
        &self.config
    }

    /// Resolve one connection attempt.
    ///
    /// Returns the endpoint to dial, or `None` to let the sandbox apply its
    /// default resolution.
    pub fn resolve(&self, host: &str, port: u16, protocol: Protocol) -> Option<String> {
        if let Some(pinned) =
            self.config.pinned.iter().find(|pinned| pinned.matches(host, port, protocol))
        {
            return Some(pinned.endpoint.clone());
        }

        match self.config.page {
            PageTransport::Secure => Some(self.config.secure_scheme.clone()),
            PageTransport::Insecure => None,
        }
    }

    /// Resolve a destination given as an [`EndpointSpec`].
    pub fn resolve_spec(&self, spec: &EndpointSpec) -> Option<String> {
        self.resolve(&spec.host, spec.port, spec.protocol)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolver(page: PageTransport) -> EndpointResolver {
        EndpointResolver::new(ResolverConfig { page, ..ResolverConfig::default() })
    }

    #[test]
    fn pinned_triple_goes_to_proxy() {
        for page in [PageTransport::Secure, PageTransport::Insecure] {
            let endpoint = resolver(page).resolve("content.openttd.org", 3978, Protocol::Tcp);
            assert_eq!(endpoint.as_deref(), Some("wss://bananas-server.openttd.org/"));
        }
    }

    #[test]
    fn pinned_host_matches_case_insensitively() {
        let endpoint =
            resolver(PageTransport::Insecure).resolve("Content.OpenTTD.org", 3978, Protocol::Tcp);
        assert_eq!(endpoint.as_deref(), Some(ResolverConfig::CONTENT_SERVICE_PROXY));
    }

    #[test]
    fn near_misses_fall_through() {
        let insecure = resolver(PageTransport::Insecure);
        assert_eq!(insecure.resolve("content.openttd.org", 3978, Protocol::Udp), None);
        assert_eq!(insecure.resolve("content.openttd.org", 3979, Protocol::Tcp), None);
        assert_eq!(insecure.resolve("openttd.org", 3978, Protocol::Tcp), None);
    }

    #[test]
    fn secure_page_forces_secure_scheme() {
        let secure = resolver(PageTransport::Secure);
        assert_eq!(secure.resolve("example.net", 3979, Protocol::Tcp).as_deref(), Some("wss://"));
        assert_eq!(secure.resolve("example.net", 3979, Protocol::Udp).as_deref(), Some("wss://"));
    }

    #[test]
    fn proxy_endpoint_is_configuration() {
        let config = ResolverConfig {
            pinned: vec![PinnedEndpoint {
                host: ResolverConfig::CONTENT_SERVICE_HOST.to_string(),
                port: ResolverConfig::CONTENT_SERVICE_PORT,
                protocol: Protocol::Tcp,
                endpoint: "wss://content.openttd.org/".to_string(),
            }],
            ..ResolverConfig::default()
        };
        let resolver = EndpointResolver::new(config);
        let spec = EndpointSpec::new("content.openttd.org", 3978, Protocol::Tcp);
        assert_eq!(resolver.resolve_spec(&spec).as_deref(), Some("wss://content.openttd.org/"));
    }

    #[test]
    fn first_matching_pin_wins() {
        let pin = |endpoint: &str| PinnedEndpoint {
            host: "game.example".to_string(),
            port: 3979,
            protocol: Protocol::Tcp,
            endpoint: endpoint.to_string(),
        };
        let config = ResolverConfig {
            pinned: vec![pin("wss://first.example/"), pin("wss://second.example/")],
            ..ResolverConfig::default()
        };
        let resolver = EndpointResolver::new(config);
        assert_eq!(
            resolver.resolve("game.example", 3979, Protocol::Tcp).as_deref(),
            Some("wss://first.example/")
        );
    }

    #[test]
    fn spec_displays_as_triple() {
        let spec = EndpointSpec::new("content.openttd.org", 3978, Protocol::Tcp);
        assert_eq!(spec.to_string(), "content.openttd.org:3978/tcp");
    }
}
