//! Best-effort discovery of the agent's outbound address.
use std::net::{IpAddr, UdpSocket};

use tracing::debug;

use crate::constants::{ADDRESS_PROBE_TARGET, LOOPBACK_ADDRESS};

/// The local address the OS would route external traffic from.
///
/// `connect` on a UDP socket only consults the routing table, so no packet
/// reaches the probe target. Falls back to 127.0.0.1 on any failure.
pub fn local_address() -> String {
    match probe(ADDRESS_PROBE_TARGET) {
        Ok(ip) => ip.to_string(),
        Err(e) => {
            debug!(error = %e, "local address probe failed, using loopback");
            LOOPBACK_ADDRESS.to_string()
        }
    }
}

fn probe(target: &str) -> std::io::Result<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect(target)?;
    Ok(socket.local_addr()?.ip())
}
