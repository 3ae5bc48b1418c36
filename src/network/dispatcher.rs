//! Packet delivery to the configured controllers

use std::net::{Ipv4Addr, SocketAddr, ToSocketAddrs, UdpSocket};

use crate::config::WledConfig;
use crate::error::NetworkError;
use crate::network::udp::{create_socket, Transport};

/// Where packets go. Fixed after startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DestinationSet {
    /// One send per packet to a multicast group
    Multicast(SocketAddr),
    /// One send per address, in order
    Unicast(Vec<SocketAddr>),
}

impl DestinationSet {
    /// Resolve destinations from config. Unresolvable hosts fail startup.
    pub fn from_config(config: &WledConfig) -> Result<Self, NetworkError> {
        if config.use_multicast {
            let group: Ipv4Addr = config.multicast_ip.parse().map_err(|_| {
                NetworkError::AddressResolution(config.multicast_ip.clone())
            })?;
            return Ok(DestinationSet::Multicast(SocketAddr::from((group, config.port))));
        }

        let mut targets = Vec::with_capacity(config.addresses.len());
        for host in &config.addresses {
            targets.push(resolve(host, config.port)?);
        }
        Ok(DestinationSet::Unicast(targets))
    }

    pub fn is_multicast(&self) -> bool {
        matches!(self, DestinationSet::Multicast(_))
    }

    /// Every address a packet is sent to, in send order
    pub fn targets(&self) -> &[SocketAddr] {
        match self {
            DestinationSet::Multicast(group) => std::slice::from_ref(group),
            DestinationSet::Unicast(targets) => targets,
        }
    }
}

/// First IPv4 address for `host:port`
fn resolve(host: &str, port: u16) -> Result<SocketAddr, NetworkError> {
    (host, port)
        .to_socket_addrs()
        .map_err(|e| NetworkError::AddressResolution(format!("{}: {}", host, e)))?
        .find(SocketAddr::is_ipv4)
        .ok_or_else(|| NetworkError::AddressResolution(format!("{}: no IPv4 address", host)))
}

/// Outcome of sending one packet
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Destinations the packet was handed to
    pub delivered: usize,
    /// One entry per failed destination
    pub failures: Vec<NetworkError>,
}

impl DispatchReport {
    pub fn all_delivered(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Dispatcher statistics
#[derive(Debug, Clone, Default)]
pub struct DispatcherStats {
    pub packets_sent: u64,
    pub bytes_sent: u64,
    pub send_failures: u64,
}

/// Sends each packet to every destination.
///
/// Owns the socket for the whole run; it is closed when the dispatcher is
/// dropped, whichever way the stream loop exits.
pub struct Dispatcher<T: Transport = UdpSocket> {
    transport: T,
    destinations: DestinationSet,
    stats: DispatcherStats,
}

impl Dispatcher<UdpSocket> {
    /// Open a UDP socket suited to `destinations`
    pub fn open(destinations: DestinationSet) -> Result<Self, NetworkError> {
        let socket = create_socket(destinations.is_multicast())?;
        tracing::debug!("Opened UDP socket on {:?}", socket.local_addr().ok());
        Ok(Self::with_transport(socket, destinations))
    }
}

impl<T: Transport> Dispatcher<T> {
    pub fn with_transport(transport: T, destinations: DestinationSet) -> Self {
        Self {
            transport,
            destinations,
            stats: DispatcherStats::default(),
        }
    }

    /// Send `packet` to every destination.
    ///
    /// Failures are logged and collected; they never stop the remaining
    /// sends.
    pub fn dispatch(&mut self, packet: &[u8]) -> DispatchReport {
        let mut report = DispatchReport::default();

        for &addr in self.destinations.targets() {
            match self.transport.send_to(packet, addr) {
                Ok(sent) => {
                    report.delivered += 1;
                    self.stats.packets_sent += 1;
                    self.stats.bytes_sent += sent as u64;
                }
                Err(e) => {
                    tracing::warn!("Failed to send packet to {}: {}", addr, e);
                    self.stats.send_failures += 1;
                    report.failures.push(NetworkError::SendFailed {
                        addr,
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }

    pub fn destinations(&self) -> &DestinationSet {
        &self.destinations
    }

    /// Get statistics
    pub fn stats(&self) -> DispatcherStats {
        self.stats.clone()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

impl<T: Transport> Drop for Dispatcher<T> {
    fn drop(&mut self) {
        tracing::info!(
            "Closing UDP socket ({} packets sent, {} failures)",
            self.stats.packets_sent,
            self.stats.send_failures
        );
    }
}
