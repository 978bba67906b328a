use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use socket2::{Domain, Protocol, Socket, Type};
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::processor::TsDemux;

/// Largest datagram we expect: 7 × 208-byte packets fit comfortably.
const RECV_BUF_LEN: usize = 2048;
const SOCKET_RCVBUF: usize = 4 * 1024 * 1024;

/// Creates and configures a UDP socket for TS packet reception
/// Handles both unicast and multicast addresses
pub fn create_udp_socket(addr: &str) -> anyhow::Result<Socket> {
    let sock_addr: SocketAddr = addr.parse()?;
    let ip = match sock_addr.ip() {
        IpAddr::V4(v4) => v4,
        _ => anyhow::bail!("only IPv4 is supported"),
    };

    let socket = Socket::new(Domain::IPV4, Type::DGRAM, Some(Protocol::UDP))?;
    socket.set_reuse_address(true)?;
    if let Err(e) = socket.set_recv_buffer_size(SOCKET_RCVBUF) {
        warn!(error = %e, "could not enlarge receive buffer");
    }
    socket.bind(&sock_addr.into())?;

    // Join multicast group if the address is multicast
    if ip.is_multicast() {
        let iface = Ipv4Addr::UNSPECIFIED; // default interface
        socket.join_multicast_v4(&ip, &iface)?;
        info!(group = %ip, "joined multicast group");
    }

    socket.set_nonblocking(true)?;
    Ok(socket)
}

/// Feeds datagrams from `addr` into `demux` until a socket or fatal flow
/// error. `on_refresh` runs every `refresh`.
pub async fn receive_into(
    addr: &str,
    demux: &mut TsDemux,
    refresh: Duration,
    mut on_refresh: impl FnMut(&TsDemux),
) -> anyhow::Result<()> {
    let sock = UdpSocket::from_std(create_udp_socket(addr)?.into())?;
    info!(%addr, "listening");

    let mut buf = [0u8; RECV_BUF_LEN];
    let mut ticker = tokio::time::interval(refresh);
    ticker.tick().await;

    loop {
        tokio::select! {
            res = sock.recv(&mut buf) => {
                let n = res?;
                if n == 0 {
                    continue;
                }
                debug!(bytes = n, "datagram");
                demux.push(&buf[..n])?;
            }
            _ = ticker.tick() => on_refresh(demux),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bad_addresses() {
        assert!(create_udp_socket("not-an-address").is_err());
        assert!(create_udp_socket("[::1]:5000").is_err());
    }

    #[test]
    fn binds_unicast_loopback() {
        let socket = create_udp_socket("127.0.0.1:0").unwrap();
        let local = socket.local_addr().unwrap().as_socket().unwrap();
        assert!(local.ip().is_loopback());
    }
}
