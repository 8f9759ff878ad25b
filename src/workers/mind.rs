//! Mind: user control logic with its own command session

use crate::commander::{Commander, ConnectConfig};
use crate::error::Result;
use crate::runtime::worker::{Context, Flow, Worker};

/// Worker whose body is a user-supplied control function.
///
/// Owns a private [`Commander`] connected during setup, so a slow motion
/// command here never stalls telemetry listeners or other Minds. Queue
/// ends are captured by the closure; return [`Flow::Break`] when the
/// upstream queues disconnect or the job is done.
pub struct Mind<F> {
    config: ConnectConfig,
    commander: Option<Commander>,
    logic: F,
}

impl<F> Mind<F>
where
    F: FnMut(&Context, &Commander) -> Result<Flow> + Send,
{
    pub fn new(config: ConnectConfig, logic: F) -> Mind<F> {
        Mind {
            config,
            commander: None,
            logic,
        }
    }
}

impl<F> Worker for Mind<F>
where
    F: FnMut(&Context, &Commander) -> Result<Flow> + Send,
{
    fn setup(&mut self, ctx: &Context) -> Result<()> {
        let commander = Commander::connect(self.config.clone())?;
        log::info!("{}: commanding {}", ctx.name(), commander.host());
        self.commander = Some(commander);
        Ok(())
    }

    fn tick(&mut self, ctx: &Context) -> Result<Flow> {
        let Some(commander) = self.commander.as_ref() else {
            return Ok(Flow::Break);
        };
        (self.logic)(ctx, commander)
    }

    fn teardown(&mut self, ctx: &Context) {
        if let Some(commander) = self.commander.take() {
            commander.close();
        }
        log::debug!("{}: stopped", ctx.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proto::push::Push;
    use crate::runtime::hub::Hub;
    use crate::runtime::queue::{bounded, Overflow};
    use crate::workers::PushListener;
    use std::io::{Read, Write};
    use std::net::{SocketAddr, TcpListener};
    use std::thread;
    use std::time::{Duration, Instant};

    /// Robot stub that acknowledges every command
    fn spawn_agreeable_robot() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || {
            let (mut stream, _) = match listener.accept() {
                Ok(conn) => conn,
                Err(_) => return,
            };
            let mut chunk = [0u8; 256];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => return,
                    Ok(n) => {
                        let acks = chunk[..n].iter().filter(|&&b| b == b';').count();
                        for _ in 0..acks {
                            if stream.write_all(b"ok;").is_err() {
                                return;
                            }
                        }
                    }
                }
            }
        });
        addr
    }

    /// A listener feeding a mind that blocks on the push queue: on close,
    /// both must drain within the graceful deadline.
    #[test]
    fn test_listener_and_mind_drain_on_close() {
        let robot = spawn_agreeable_robot();
        let (outlet, rx) = bounded::<Push>("push", 16, Overflow::DropNewest);

        let deadline = Duration::from_secs(5);
        let mut hub = Hub::new().with_graceful_deadline(deadline);
        hub.worker(
            "push-listener",
            PushListener::at(SocketAddr::from(([127, 0, 0, 1], 0)), outlet),
        )
        .unwrap();

        let config = ConnectConfig {
            host: Some("127.0.0.1".to_string()),
            port: robot.port(),
            timeout: Duration::from_secs(5),
        };
        hub.worker(
            "mind",
            Mind::new(config, move |_ctx: &Context, _cmd: &Commander| {
                // blocks until the listener hands over a record or goes away
                match rx.recv() {
                    Ok(_push) => Ok(Flow::Continue),
                    Err(_) => Ok(Flow::Break),
                }
            }),
        )
        .unwrap();

        let closer = hub.closer();
        let stopper = thread::spawn(move || {
            thread::sleep(Duration::from_millis(300));
            closer.close();
        });

        let started = Instant::now();
        hub.run().unwrap();
        stopper.join().unwrap();
        assert!(started.elapsed() < Duration::from_millis(300) + deadline + Duration::from_secs(1));
    }

    #[test]
    fn test_unreachable_robot_fails_setup_and_hub_returns() {
        // a port with nothing listening
        let vacant = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = vacant.local_addr().unwrap();
        drop(vacant);

        let mut hub = Hub::new().with_graceful_deadline(Duration::from_secs(2));
        let config = ConnectConfig {
            host: Some("127.0.0.1".to_string()),
            port: addr.port(),
            timeout: Duration::from_millis(500),
        };
        hub.worker(
            "mind",
            Mind::new(config, |_ctx: &Context, _cmd: &Commander| Ok(Flow::Continue)),
        )
        .unwrap();

        let started = Instant::now();
        hub.run().unwrap();
        assert!(started.elapsed() < Duration::from_secs(5));
    }
}
