//! LAN quiz server access

mod client;
pub mod discovery;
mod url;

pub use client::{LanServerClient, ServerInfo};
pub use discovery::{
    candidate_hosts, AddressProbe, DiscoveredServer, FixedAddressProbe, ServerDiscovery,
    UdpRouteProbe,
};
pub use url::ServerUrl;
