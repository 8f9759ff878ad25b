//! Event listener: drains armor and sound events into a queue

use super::{log_segment_issue, RECV_TIMEOUT};
use crate::commander::Commander;
use crate::error::Result;
use crate::proto::event::{self, Event, EventContext, EventData};
use crate::proto::{DEFAULT_BUF_SIZE, EVENT_PORT};
use crate::runtime::queue::Outlet;
use crate::runtime::worker::{Context, Flow, Worker};
use std::collections::HashSet;
use std::io::ErrorKind;
use std::net::{SocketAddr, UdpSocket};
use std::time::Instant;

/// Listens on the event port and emits typed [`Event`] records.
///
/// Reporting must be enabled first via
/// [`Commander::armor_event`](crate::Commander::armor_event) /
/// [`sound_event`](crate::Commander::sound_event). With a companion
/// Commander attached, armor hits are enriched with a snapshot of chassis
/// position and gimbal attitude; a failed snapshot degrades to the bare
/// event plus a warning.
pub struct EventListener {
    bind_addr: SocketAddr,
    socket: Option<UdpSocket>,
    outlet: Outlet<Event>,
    companion: Option<Commander>,
    warned: HashSet<String>,
}

impl EventListener {
    /// Listen on the standard event port on all interfaces.
    pub fn new(outlet: Outlet<Event>) -> EventListener {
        EventListener::at(SocketAddr::from(([0, 0, 0, 0], EVENT_PORT)), outlet)
    }

    /// Listen on an explicit address.
    pub fn at(bind_addr: SocketAddr, outlet: Outlet<Event>) -> EventListener {
        EventListener {
            bind_addr,
            socket: None,
            outlet,
            companion: None,
            warned: HashSet::new(),
        }
    }

    /// Attach a companion Commander used to snapshot robot state when an
    /// armor hit arrives.
    pub fn with_companion(mut self, commander: Commander) -> EventListener {
        self.companion = Some(commander);
        self
    }

    /// The bound address, once set up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.socket.as_ref().and_then(|s| s.local_addr().ok())
    }

    fn snapshot(commander: &Commander) -> Result<EventContext> {
        Ok(EventContext {
            chassis_position: commander.get_chassis_position()?,
            gimbal_attitude: commander.get_gimbal_attitude()?,
        })
    }

    fn enrich(&self, ctx: &Context, data: &EventData) -> Option<EventContext> {
        let commander = self.companion.as_ref()?;
        if !matches!(data, EventData::ArmorHit(_)) {
            return None;
        }
        match Self::snapshot(commander) {
            Ok(context) => Some(context),
            Err(e) => {
                log::warn!("{}: context snapshot failed, emitting bare event: {}", ctx.name(), e);
                None
            }
        }
    }
}

impl Worker for EventListener {
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
        let (n, _peer) = match socket.recv_from(&mut buf) {
            Ok(received) => received,
            Err(e) if e.kind() == ErrorKind::WouldBlock || e.kind() == ErrorKind::TimedOut => {
                return Ok(Flow::Continue);
            }
            Err(e) => return Err(e.into()),
        };
        let received_at = Instant::now();
        let text = String::from_utf8_lossy(&buf[..n]).into_owned();
        for segment in event::parse(&text) {
            match segment {
                Ok(data) => {
                    let context = self.enrich(ctx, &data);
                    self.outlet.send(Event {
                        received_at,
                        data,
                        context,
                    });
                }
                Err(issue) => log_segment_issue(ctx.name(), &mut self.warned, issue),
            }
        }
        Ok(Flow::Continue)
    }

    fn teardown(&mut self, ctx: &Context) {
        if let Some(commander) = self.companion.take() {
            commander.close();
        }
        self.socket = None;
        log::debug!("{}: stopped", ctx.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::event::ArmorHitEvent;
    use crate::runtime::queue::{bounded, Overflow};
    use crate::runtime::worker::ShutdownToken;
    use crate::transport::MockTransport;
    use std::time::Duration;

    fn listener_under_test(
        companion: Option<Commander>,
    ) -> (EventListener, crossbeam_channel::Receiver<Event>, Context, UdpSocket) {
        let (outlet, rx) = bounded("event", 16, Overflow::DropNewest);
        let mut listener = EventListener::at(SocketAddr::from(([127, 0, 0, 1], 0)), outlet);
        if let Some(commander) = companion {
            listener = listener.with_companion(commander);
        }
        let ctx = Context::new("event-listener".to_string(), ShutdownToken::new());
        listener.setup(&ctx).unwrap();
        let sender = UdpSocket::bind("127.0.0.1:0").unwrap();
        sender.connect(listener.local_addr().unwrap()).unwrap();
        (listener, rx, ctx, sender)
    }

    fn mock_commander() -> (Commander, MockTransport) {
        let mock = MockTransport::new();
        mock.inject_read(b"ok;");
        let commander =
            Commander::with_transport(Box::new(mock.clone()), "test".to_string()).unwrap();
        mock.clear_written();
        (commander, mock)
    }

    #[test]
    fn test_armor_hit_emitted_with_fresh_timestamp() {
        let (mut listener, rx, ctx, sender) = listener_under_test(None);
        sender.send(b"armor hit 2 1;").unwrap();
        let before = Instant::now();
        listener.tick(&ctx).unwrap();
        let after = Instant::now();

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(
            event.data,
            EventData::ArmorHit(ArmorHitEvent { index: 2, kind: 1 })
        );
        assert!(event.context.is_none());
        // stamped at receipt, inside the tick that read the datagram
        assert!(event.received_at >= before && event.received_at <= after);
    }

    #[test]
    fn test_armor_hit_enriched_from_companion() {
        let (commander, mock) = mock_commander();
        mock.inject_read(b"1 2 3;-5 10;");
        let (mut listener, rx, ctx, sender) = listener_under_test(Some(commander));
        sender.send(b"armor hit 1 1;").unwrap();
        listener.tick(&ctx).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        let context = event.context.expect("context should be attached");
        assert_eq!(context.chassis_position.x, 1.0);
        assert_eq!(context.gimbal_attitude.pitch, -5.0);
        assert_eq!(
            mock.get_written(),
            b"chassis position ?;gimbal attitude ?;"
        );
    }

    #[test]
    fn test_enrichment_failure_degrades_to_bare_event() {
        let (commander, _mock) = mock_commander();
        // no replies injected: the snapshot queries time out
        let (mut listener, rx, ctx, sender) = listener_under_test(Some(commander));
        sender.send(b"armor hit 3 2;").unwrap();
        listener.tick(&ctx).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(
            event.data,
            EventData::ArmorHit(ArmorHitEvent { index: 3, kind: 2 })
        );
        assert!(event.context.is_none());
    }

    #[test]
    fn test_applause_is_not_enriched() {
        let (commander, mock) = mock_commander();
        let (mut listener, rx, ctx, sender) = listener_under_test(Some(commander));
        sender.send(b"sound applause 2;").unwrap();
        listener.tick(&ctx).unwrap();

        let event = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert!(matches!(event.data, EventData::Applause(_)));
        assert!(event.context.is_none());
        assert!(mock.get_written().is_empty());
    }

    #[test]
    fn test_unknown_kind_dropped_listener_survives() {
        let (mut listener, rx, ctx, sender) = listener_under_test(None);
        sender.send(b"sound whistle 1;").unwrap();
        listener.tick(&ctx).unwrap();
        assert!(rx.try_recv().is_err());

        sender.send(b"armor hit 1 1;").unwrap();
        listener.tick(&ctx).unwrap();
        assert!(rx.recv_timeout(Duration::from_secs(1)).is_ok());
    }
}
