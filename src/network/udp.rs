//! Outbound UDP socket setup

use socket2::{Domain, Protocol, Socket, Type};
use std::net::{Ipv4Addr, SocketAddr, UdpSocket};

use crate::constants::MULTICAST_TTL;
use crate::error::NetworkError;

/// Anything that can send a datagram to an address.
///
/// Implemented for [`UdpSocket`]; tests substitute their own.
pub trait Transport {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> std::io::Result<usize>;
}

impl Transport for UdpSocket {
    fn send_to(&self, buf: &[u8], addr: SocketAddr) -> std::io::Result<usize> {
        UdpSocket::send_to(self, buf, addr)
    }
}

/// Create the sending socket, bound to an ephemeral port.
///
/// With `multicast` set, outgoing multicast TTL is 1 so packets stay on
/// the local segment.
pub fn create_socket(multicast: bool) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::SocketSetup(format!("create: {}", e)))?;

    if multicast {
        socket
            .set_multicast_ttl_v4(MULTICAST_TTL)
            .map_err(|e| NetworkError::SocketSetup(format!("multicast ttl: {}", e)))?;
    }

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, 0));
    socket
        .bind(&bind_addr.into())
        .map_err(|e| NetworkError::SocketSetup(format!("bind: {}", e)))?;

    Ok(socket.into())
}

/// Create a listening socket, joining `group` when given
pub fn create_listener(port: u16, group: Option<Ipv4Addr>) -> Result<UdpSocket, NetworkError> {
    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))
        .map_err(|e| NetworkError::SocketSetup(format!("create: {}", e)))?;

    socket
        .set_reuse_address(true)
        .map_err(|e| NetworkError::SocketSetup(format!("reuse address: {}", e)))?;

    let bind_addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, port));
    socket
        .bind(&bind_addr.into())
        .map_err(|e| NetworkError::SocketSetup(format!("bind {}: {}", bind_addr, e)))?;

    if let Some(group) = group {
        socket
            .join_multicast_v4(&group, &Ipv4Addr::UNSPECIFIED)
            .map_err(|e| NetworkError::SocketSetup(format!("join {}: {}", group, e)))?;
    }

    Ok(socket.into())
}
