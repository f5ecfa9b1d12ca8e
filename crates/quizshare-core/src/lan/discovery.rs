//! Best-effort LAN server discovery.
//!
//! Learns this machine's IPv4 address, builds a short list of candidate hosts
//! and probes `/api/server-info` on each one in turn. A server on an
//! unexpected address is simply not found.

use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use tokio::net::UdpSocket;

use super::client::{build_http_client, fetch_server_info, ServerInfo};
use super::url::ServerUrl;
use crate::error::Result;

/// Number of low host addresses probed on the local subnet.
pub const SUBNET_HOSTS: u8 = 10;

const ROUTE_PROBE_TARGET: (Ipv4Addr, u16) = (Ipv4Addr::new(8, 8, 8, 8), 80);

/// Source of this machine's LAN address.
pub trait AddressProbe: Send + Sync {
    fn local_ipv4(&self) -> impl Future<Output = Option<Ipv4Addr>> + Send;
}

/// Reads the source address the OS would route outbound traffic from.
///
/// Connecting a UDP socket sends no packets.
#[derive(Debug, Clone, Copy)]
pub struct UdpRouteProbe {
    timeout: Duration,
}

impl UdpRouteProbe {
    pub const fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl AddressProbe for UdpRouteProbe {
    async fn local_ipv4(&self) -> Option<Ipv4Addr> {
        let lookup = async {
            let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.ok()?;
            socket.connect(ROUTE_PROBE_TARGET).await.ok()?;
            match socket.local_addr().ok()? {
                SocketAddr::V4(addr) if !addr.ip().is_unspecified() && !addr.ip().is_loopback() => {
                    Some(*addr.ip())
                }
                _ => None,
            }
        };

        match tokio::time::timeout(self.timeout, lookup).await {
            Ok(address) => address,
            Err(_) => {
                tracing::debug!("Local address probe timed out");
                None
            }
        }
    }
}

/// Always reports the same address.
#[derive(Debug, Clone, Copy, Default)]
pub struct FixedAddressProbe(pub Option<Ipv4Addr>);

impl AddressProbe for FixedAddressProbe {
    async fn local_ipv4(&self) -> Option<Ipv4Addr> {
        self.0
    }
}

/// Hosts to probe, in order, without duplicates.
///
/// Without a known own address only the loopback names are returned.
pub fn candidate_hosts(own: Option<Ipv4Addr>) -> Vec<String> {
    let mut hosts = vec!["localhost".to_string(), "127.0.0.1".to_string()];

    if let Some(own) = own {
        hosts.push(own.to_string());
        let [a, b, c, _] = own.octets();
        hosts.extend((1..=SUBNET_HOSTS).map(|last| Ipv4Addr::new(a, b, c, last).to_string()));
    }

    let mut seen = std::collections::HashSet::new();
    hosts.retain(|host| seen.insert(host.clone()));
    hosts
}

/// A server that answered a probe.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredServer {
    pub host: String,
    pub server: ServerUrl,
    pub info: ServerInfo,
}

pub struct ServerDiscovery<P> {
    probe: P,
    client: reqwest::Client,
    port: u16,
    probe_timeout: Duration,
}

impl<P: AddressProbe> ServerDiscovery<P> {
    pub fn new(probe: P, port: u16, probe_timeout: Duration) -> Result<Self> {
        Ok(Self {
            probe,
            client: build_http_client()?,
            port,
            probe_timeout,
        })
    }

    /// Probe every candidate host; `None` when nothing answered.
    pub async fn discover(&self) -> Option<DiscoveredServer> {
        let own = self.probe.local_ipv4().await;
        match own {
            Some(address) => tracing::debug!("Local address: {address}"),
            None => tracing::debug!("Local address unknown, probing loopback only"),
        }
        self.discover_among(&candidate_hosts(own)).await
    }

    /// Probe `hosts` sequentially, stopping at the first answer.
    pub async fn discover_among(&self, hosts: &[String]) -> Option<DiscoveredServer> {
        for host in hosts {
            let server = ServerUrl::from_host(host, self.port);
            match fetch_server_info(&self.client, &server, self.probe_timeout).await {
                Ok(info) => {
                    tracing::info!("Found quiz server at {server}");
                    return Some(DiscoveredServer {
                        host: host.clone(),
                        server,
                        info,
                    });
                }
                Err(error) => tracing::debug!("No server at {server}: {error}"),
            }
        }

        tracing::info!("No quiz server found among {} candidates", hosts.len());
        None
    }
}
