//! Packet Monitor Application
//!
//! Listens for WLED audio sync packets and logs their contents. Useful for
//! checking a feeder without a controller attached.
//!
//! ```text
//! monitor [port] [multicast-group]
//! ```

use anyhow::{Context, Result};
use std::net::Ipv4Addr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use wled_audio_feeder::{
    constants::DEFAULT_UDP_PORT,
    network::udp::create_listener,
    protocol::{AudioSyncPacket, PACKET_SIZE},
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let port: u16 = match args.next() {
        Some(port) => port.parse().context("invalid port")?,
        None => DEFAULT_UDP_PORT,
    };
    let group: Option<Ipv4Addr> = args
        .next()
        .map(|g| g.parse())
        .transpose()
        .context("invalid multicast group")?;

    let socket = create_listener(port, group)?;
    socket.set_nonblocking(true)?;
    let socket = tokio::net::UdpSocket::from_std(socket)?;

    match group {
        Some(group) => tracing::info!("Listening on port {} (group {})", port, group),
        None => tracing::info!("Listening on port {}", port),
    }

    let mut buf = [0u8; 128];
    let mut received: u64 = 0;
    let mut invalid: u64 = 0;

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            result = socket.recv_from(&mut buf) => {
                let (len, src) = result?;
                match AudioSyncPacket::decode(&buf[..len]) {
                    Ok(packet) => {
                        received += 1;
                        tracing::info!(
                            "#{} from {}: raw {:.2}, smoothed {:.2}, peak {}, {:.0} Hz, bands {:?}",
                            received,
                            src,
                            packet.raw_level,
                            packet.smoothed_level,
                            packet.peak_level,
                            packet.peak_frequency,
                            packet.bands
                        );
                    }
                    Err(e) => {
                        invalid += 1;
                        tracing::warn!(
                            "Ignoring {} byte datagram from {} (expected {}): {}",
                            len,
                            src,
                            PACKET_SIZE,
                            e
                        );
                    }
                }
            }
        }
    }

    tracing::info!("Monitor stopped: {} packets, {} invalid", received, invalid);
    Ok(())
}
