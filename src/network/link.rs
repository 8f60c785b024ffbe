use super::{Link, ReportError};
use crate::config::NetworkConfig;
use log::{debug, info, warn};
use reqwest::Url;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Treats the node as online when the ingestion server accepts a TCP connection.
///
/// On the host the radio is not ours to manage, so joining `ssid` is logged
/// and the reconnect is a fresh connection attempt to the server.
///
/// The server name is resolved in `new` and again on `reconnect` only while
/// unresolved, so a periodic `check` never blocks on DNS.
pub struct TcpReachLink {
    ssid: String,
    host: String,
    port: u16,
    address: Option<SocketAddr>,
    timeout: Duration,
    connected: bool,
}

impl TcpReachLink {
    pub fn new(config: &NetworkConfig) -> Result<Self, ReportError> {
        let url = Url::parse(&config.server_url).map_err(|e| {
            ReportError::NetworkUnavailable(format!("invalid server url {}: {}", config.server_url, e))
        })?;
        let host = url
            .host_str()
            .ok_or_else(|| ReportError::NetworkUnavailable(format!("no host in {}", config.server_url)))?
            .to_string();
        let port = url.port_or_known_default().unwrap_or(80);
        let address = resolve(&host, port);
        if address.is_none() {
            warn!("cannot resolve {}:{} yet, will retry on reconnect", host, port);
        }

        Ok(Self {
            ssid: config.ssid.clone(),
            host,
            port,
            address,
            timeout: Duration::from_millis(config.request_timeout_ms),
            connected: false,
        })
    }

    /// Server address as resolved so far.
    pub fn address(&self) -> Option<SocketAddr> {
        self.address
    }

    fn reachable(&self) -> bool {
        match self.address {
            Some(addr) => TcpStream::connect_timeout(&addr, self.timeout).is_ok(),
            None => false,
        }
    }
}

fn resolve(host: &str, port: u16) -> Option<SocketAddr> {
    (host, port)
        .to_socket_addrs()
        .ok()
        .and_then(|mut addrs| addrs.next())
}

impl Link for TcpReachLink {
    fn check(&mut self) -> bool {
        let reachable = self.reachable();
        if reachable != self.connected {
            if reachable {
                info!("link up: {}:{} reachable", self.host, self.port);
            } else {
                warn!("link down: {}:{} unreachable", self.host, self.port);
            }
        }
        self.connected = reachable;
        reachable
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn reconnect(&mut self) -> Result<(), ReportError> {
        debug!("joining network '{}'", self.ssid);
        if self.address.is_none() {
            self.address = resolve(&self.host, self.port);
        }
        if self.check() {
            Ok(())
        } else {
            Err(ReportError::NetworkUnavailable(format!(
                "{}:{} not reachable via '{}'",
                self.host, self.port, self.ssid
            )))
        }
    }
}

/// Link for offline runs, always up.
#[derive(Debug, Default)]
pub struct OfflineLink;

impl Link for OfflineLink {
    fn check(&mut self) -> bool {
        true
    }

    fn is_connected(&self) -> bool {
        true
    }

    fn reconnect(&mut self) -> Result<(), ReportError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    fn config(url: String) -> NetworkConfig {
        NetworkConfig {
            server_url: url,
            request_timeout_ms: 500,
            ..NetworkConfig::default()
        }
    }

    #[test]
    fn parses_host_and_port_from_url() {
        let link = TcpReachLink::new(&NetworkConfig::default()).unwrap();
        assert_eq!(link.host, "192.168.1.100");
        assert_eq!(link.port, 3000);

        let link = TcpReachLink::new(&config("http://localhost/ingest".to_string())).unwrap();
        assert_eq!(link.port, 80);
        assert!(!link.is_connected());
    }

    #[test]
    fn address_is_resolved_once_at_construction() {
        let link = TcpReachLink::new(&config("http://127.0.0.1:3000/api/ingest/hr".to_string())).unwrap();
        assert_eq!(link.address(), Some("127.0.0.1:3000".parse().unwrap()));
    }

    #[test]
    fn unresolved_host_fails_check_and_reconnect() {
        let mut link = TcpReachLink::new(&config("http://pulse-node.invalid:3000/".to_string())).unwrap();
        assert_eq!(link.address(), None);
        assert!(!link.check());
        assert!(matches!(link.reconnect(), Err(ReportError::NetworkUnavailable(_))));
        assert_eq!(link.address(), None);
    }

    #[test]
    fn check_tracks_listener_state() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        let mut link = TcpReachLink::new(&config(format!("http://{}/api/ingest/hr", addr))).unwrap();

        assert!(link.check());
        assert!(link.is_connected());
        assert!(link.reconnect().is_ok());

        drop(listener);
        assert!(!link.check());
        assert!(!link.is_connected());
        assert!(matches!(link.reconnect(), Err(ReportError::NetworkUnavailable(_))));
    }
}
