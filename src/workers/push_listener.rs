//! Push listener: drains the robot's telemetry pushes into a queue

use super::{log_segment_issue, RECV_TIMEOUT};
use crate::error::Result;
use crate::proto::push::{self, Push};
use crate::proto::{DEFAULT_BUF_SIZE, PUSH_PORT};
use crate::runtime::queue::Outlet;
use crate::runtime::worker::{Context, Flow, Worker};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

/// Listens on the push port and emits typed [`Push`] records.
///
/// Pushes must be enabled first via
/// [`Commander::chassis_push_on`](crate::Commander::chassis_push_on) /
/// [`gimbal_push_on`](crate::Commander::gimbal_push_on). Malformed
/// telegrams are logged and dropped; the listener stays alive.
pub struct PushListener {
    bind_addr: SocketAddr,
    socket: Option<UdpSocket>,
    outlet: Outlet<Push>,
    warned: HashSet<String>,
}

impl PushListener {
    /// Listen on the standard push port on all interfaces.
    pub fn new(outlet: Outlet<Push>) -> PushListener {
        PushListener::at(SocketAddr::from(([0, 0, 0, 0], PUSH_PORT)), outlet)
    }

    /// Listen on an explicit address.
    pub fn at(bind_addr: SocketAddr, outlet: Outlet<Push>) -> PushListener {
        PushListener {
            bind_addr,
            socket: None,
            outlet,
            warned: HashSet::new(),
        }
    }

    /// The bound address, once set up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }
}

impl Worker for PushListener {
    fn setup(&mut self, ctx: &Context) -> Result<()> {
        let socket = UdpSocket::bind(self.bind_addr)?;
        socket.set_read_timeout(Some(RECV_TIMEOUT))?;
        log::info!("{}: listening on {}", ctx.name(), socket.local_addr()?);
        self.socket = Some(socket);
        Ok(())
    }

    fn tick(&mut self, ctx: &Context) -> Result<Flow> {
        let Some(socket) = self.socket.as_ref() else {
            return Ok(Flow::Break);
        };
        let mut buf = [0u8; DEFAULT_BUF_SIZE];
        match socket.recv_from(&mut buf) {
            Ok((n, _peer)) => {
                let received_at = Instant::now();
                let text = String::from_utf8_lossy(&buf[..n]);
                for segment in push::parse(&text) {
                    match segment {
                        Ok(data) => self.outlet.send(Push { received_at, data }),
                        Err(issue) => log_segment_issue(ctx.name(), &mut self.warned, issue),
                    }
                }
                Ok(Flow::Continue)
            }
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                Ok(Flow::Continue)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn teardown(&mut self, ctx: &Context) {
        self.socket = None;
        log::debug!("{}: stopped", ctx.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::push::PushData;
    use crate::runtime::queue::{bounded, Overflow};
    use crate::runtime::worker::ShutdownToken;
    use std::time::Duration;

    fn listener_under_test(
        capacity: usize,
    ) -> (PushListener, crossbeam_channel::Receiver<Push>, Context, UdpSocket) {
        let (outlet, rx) = bounded("push", capacity, Overflow::DropNewest);
        let mut listener =
            PushListener::at(SocketAddr::from(([127, 0, 0, 1], 0)), outlet);
        let ctx = Context::new("push-listener".to_string(), ShutdownToken::new());
        listener.setup(&ctx).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(listener.local_addr().unwrap()).unwrap();
        (listener, rx, ctx, sender)
    }

    #[test]
    fn test_datagram_records_arrive_in_order() {
        let (mut listener, rx, ctx, sender) = listener_under_test(16);
        sender
            .send(b"chassis position 1.0 2.5 0.0;chassis attitude -0.1 0.0 90.0;")
            .unwrap();
        let before = Instant::now();
        listener.tick(&ctx).unwrap();

        let first = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        match first.data {
            PushData::ChassisPosition(p) => {
                assert_eq!((p.x, p.y, p.z), (1.0, 2.5, Some(0.0)));
            }
            other => panic!("unexpected record {:?}", other),
        }
        assert!(first.received_at >= before);
        assert!(first.received_at.elapsed() < Duration::from_millis(500));

        let second = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        match second.data {
            PushData::ChassisAttitude(a) => {
                assert_eq!((a.pitch, a.roll, a.yaw), (-0.1, 0.0, 90.0));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_malformed_datagram_emits_nothing_and_listener_survives() {
        let (mut listener, rx, ctx, sender) = listener_under_test(16);
        sender.send(b"chassis position broken data;").unwrap();
        listener.tick(&ctx).unwrap();
        assert!(rx.try_recv().is_err());

        // still alive: a good datagram afterwards comes through
        sender.send(b"gimbal attitude 1.0 2.0;").unwrap();
        listener.tick(&ctx).unwrap();
        let push = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(push.data, PushData::GimbalAttitude(_)));
    }

    #[test]
    fn test_unknown_key_warned_once_and_dropped() {
        let (mut listener, rx, ctx, sender) = listener_under_test(16);
        sender.send(b"chassis wobble 1 2;").unwrap();
        listener.tick(&ctx).unwrap();
        sender.send(b"chassis wobble 3 4;").unwrap();
        listener.tick(&ctx).unwrap();
        assert!(rx.try_recv().is_err());
        assert_eq!(listener.warned.len(), 1);
    }

    #[test]
    fn test_quiet_socket_just_keeps_polling() {
        let (mut listener, _rx, ctx, _sender) = listener_under_test(16);
        assert_eq!(listener.tick(&ctx).unwrap(), Flow::Continue);
    }

    #[test]
    fn test_queue_overflow_never_exceeds_capacity() {
        let (mut listener, rx, ctx, sender) = listener_under_test(2);
        for _ in 0..5 {
            sender.send(b"gimbal attitude 1 2;").unwrap();
            listener.tick(&ctx).unwrap();
        }
        assert_eq!(rx.len(), 2);
    }
}
