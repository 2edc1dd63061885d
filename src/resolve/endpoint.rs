//! Upstream resolver endpoint parsing.

use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::str::FromStr;

use hickory_resolver::config::Protocol;

use crate::errors::ConfigError;

const DEFAULT_DNS_PORT: u16 = 53;

/// A canonicalized upstream resolver address.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ResolverEndpoint {
    /// Socket address of the upstream server.
    pub addr: SocketAddr,
    /// Transport protocol used to reach it.
    pub protocol: Protocol,
}

impl FromStr for ResolverEndpoint {
    type Err = ConfigError;

    /// Parses `[udp:|tcp:]ip[:port]`, defaulting to UDP and port 53.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let lower = trimmed.to_lowercase();
        let (protocol, rest) = if let Some(rest) = lower.strip_prefix("udp:") {
            (Protocol::Udp, rest)
        } else if let Some(rest) = lower.strip_prefix("tcp:") {
            (Protocol::Tcp, rest)
        } else {
            (Protocol::Udp, lower.as_str())
        };

        if let Ok(addr) = SocketAddr::from_str(rest) {
            return Ok(Self { addr, protocol });
        }
        if let Ok(ip) = IpAddr::from_str(rest) {
            return Ok(Self {
                addr: SocketAddr::new(ip, DEFAULT_DNS_PORT),
                protocol,
            });
        }
        Err(ConfigError::InvalidResolver(trimmed.to_string()))
    }
}

impl fmt::Display for ResolverEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scheme = match self.protocol {
            Protocol::Tcp => "tcp",
            _ => "udp",
        };
        write!(f, "{}:{}", scheme, self.addr)
    }
}

/// Loads resolver endpoints from a file path (one per line) or a
/// comma-separated inline value.
pub fn load_resolvers(arg: &str) -> Result<Vec<ResolverEndpoint>, ConfigError> {
    let path = Path::new(arg);
    let entries: Vec<String> = if path.is_file() {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::UnreadableResolverFile {
                path: path.to_path_buf(),
                source: e,
            })?;
        contents.lines().map(str::to_string).collect()
    } else {
        arg.split(',').map(str::to_string).collect()
    };

    entries
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(ResolverEndpoint::from_str)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bare_ip_gets_default_port() {
        let ep: ResolverEndpoint = "1.1.1.1".parse().unwrap();
        assert_eq!(ep.addr, "1.1.1.1:53".parse().unwrap());
        assert_eq!(ep.protocol, Protocol::Udp);
    }

    #[test]
    fn test_explicit_port_and_scheme() {
        let ep: ResolverEndpoint = "tcp:8.8.8.8:5353".parse().unwrap();
        assert_eq!(ep.addr, "8.8.8.8:5353".parse().unwrap());
        assert_eq!(ep.protocol, Protocol::Tcp);

        let ep: ResolverEndpoint = "udp:9.9.9.9".parse().unwrap();
        assert_eq!(ep.addr.port(), 53);
    }

    #[test]
    fn test_invalid_endpoint_rejected() {
        assert!(matches!(
            "not-an-ip".parse::<ResolverEndpoint>(),
            Err(ConfigError::InvalidResolver(_))
        ));
    }

    #[test]
    fn test_display_round_trips() {
        let ep: ResolverEndpoint = "tcp:1.0.0.1:53".parse().unwrap();
        assert_eq!(ep.to_string().parse::<ResolverEndpoint>().unwrap(), ep);
    }

    #[test]
    fn test_load_resolvers_inline_commas() {
        let eps = load_resolvers("1.1.1.1, 8.8.8.8:53,").unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[0].addr.port(), 53);
    }

    #[test]
    fn test_load_resolvers_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "1.1.1.1").unwrap();
        writeln!(file, "tcp:9.9.9.9:853").unwrap();
        writeln!(file).unwrap();
        let eps = load_resolvers(file.path().to_str().unwrap()).unwrap();
        assert_eq!(eps.len(), 2);
        assert_eq!(eps[1].protocol, Protocol::Tcp);
    }
}
