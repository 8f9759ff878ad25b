//! Robot IP discovery via UDP broadcast
//!
//! An idle robot announces itself roughly once a second with an ASCII
//! datagram `robot ip <dotted-quad>` on the broadcast port.

use crate::error::{Error, Result};
use crate::proto::{DEFAULT_BUF_SIZE, IP_PORT};
use std::io::ErrorKind;
use std::net::UdpSocket;
use std::time::{Duration, Instant};

const ANNOUNCEMENT_PREFIX: &str = "robot ip ";

/// Poll interval while waiting for an announcement
const RECV_SLICE: Duration = Duration::from_millis(250);

/// Wait up to `timeout` for the robot to announce its IP.
pub fn discover_ip(timeout: Duration) -> Result<String> {
    let socket = UdpSocket::bind(("0.0.0.0", IP_PORT))?;
    wait_for_announcement(&socket, timeout)
}

fn wait_for_announcement(socket: &UdpSocket, timeout: Duration) -> Result<String> {
    let deadline = Instant::now() + timeout;
    let mut buf = [0u8; DEFAULT_BUF_SIZE];
    loop {
        let remaining = match deadline.checked_duration_since(Instant::now()) {
            Some(d) if !d.is_zero() => d,
            _ => return Err(Error::DiscoveryTimeout),
        };
        socket.set_read_timeout(Some(remaining.min(RECV_SLICE)))?;
        match socket.recv_from(&mut buf) {
            Ok((n, peer)) => {
                let payload = String::from_utf8_lossy(&buf[..n]);
                match payload.strip_prefix(ANNOUNCEMENT_PREFIX) {
                    Some(rest) if !rest.trim().is_empty() => {
                        let ip = rest.trim().to_string();
                        // the reported address must be the packet's origin
                        if ip != peer.ip().to_string() {
                            return Err(Error::Parse(format!(
                                "announcement from {} reports mismatched address {:?}",
                                peer, ip
                            )));
                        }
                        log::info!("robot announced itself from {}: {}", peer, ip);
                        return Ok(ip);
                    }
                    Some(_) => {
                        return Err(Error::Parse(format!(
                            "truncated announcement from {}: {:?}",
                            peer, payload
                        )));
                    }
                    None => {
                        // some other chatter on the port, keep listening
                        log::debug!("ignoring datagram from {}: {:?}", peer, payload);
                    }
                }
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {}
            Err(e) => return Err(Error::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bound_pair() -> (UdpSocket, UdpSocket) {
        let listener = UdpSocket::bind("127.0.0.1:0").unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(listener.local_addr().unwrap()).unwrap();
        (listener, sender)
    }

    #[test]
    fn test_announcement_extracted() {
        let (listener, sender) = bound_pair();
        sender.send(b"robot ip 127.0.0.1").unwrap();
        let ip = wait_for_announcement(&listener, Duration::from_secs(2)).unwrap();
        assert_eq!(ip, "127.0.0.1");
    }

    #[test]
    fn test_foreign_chatter_ignored() {
        let (listener, sender) = bound_pair();
        sender.send(b"hello there").unwrap();
        sender.send(b"robot ip 127.0.0.1").unwrap();
        let ip = wait_for_announcement(&listener, Duration::from_secs(2)).unwrap();
        assert_eq!(ip, "127.0.0.1");
    }

    #[test]
    fn test_spoofed_source_rejected() {
        // announced address differs from the packet's actual origin
        let (listener, sender) = bound_pair();
        sender.send(b"robot ip 192.168.42.2").unwrap();
        let err = wait_for_announcement(&listener, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }

    #[test]
    fn test_times_out_without_announcement() {
        let (listener, _sender) = bound_pair();
        let err = wait_for_announcement(&listener, Duration::from_millis(300)).unwrap_err();
        assert!(matches!(err, Error::DiscoveryTimeout));
    }

    #[test]
    fn test_truncated_announcement_rejected() {
        let (listener, sender) = bound_pair();
        sender.send(b"robot ip ").unwrap();
        let err = wait_for_announcement(&listener, Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, Error::Parse(_)));
    }
}
