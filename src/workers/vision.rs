//! Vision: drains decoded video frames through a user callback

use crate::error::{Error, Result};
use crate::runtime::queue::{bounded, Outlet, Overflow};
use crate::runtime::worker::{Context, Flow, Worker};
use crate::video::{self, Decoder, Frame, FrameStream, STREAM_TIMEOUT};
use crossbeam_channel::Receiver;

/// Queue for vision products: capacity one, newest frame wins.
///
/// A slow consumer only ever sees the latest product; older ones are
/// evicted instead of queueing up behind it.
pub fn frame_outlet<T>(label: &str) -> (Outlet<T>, Receiver<T>) {
    bounded(label, 1, Overflow::DropOldest)
}

/// Pulls the robot's video stream and runs a callback per decoded frame.
///
/// The stream must be enabled first via
/// [`Commander::stream`](crate::Commander::stream). The callback's
/// products (if any) go through `outlet`; pair it with [`frame_outlet`]
/// so backpressure drops stale frames rather than stalling the pull.
pub struct Vision<D: Decoder, F, T> {
    host: String,
    port: u16,
    decoder: Option<D>,
    stream: Option<D::Stream>,
    callback: F,
    outlet: Option<Outlet<T>>,
}

impl<D, F, T> Vision<D, F, T>
where
    D: Decoder,
    F: FnMut(&Context, Frame) -> Result<Option<T>> + Send,
    T: Send,
{
    /// Pull from the standard video port of `host`.
    pub fn new(host: &str, decoder: D, callback: F, outlet: Option<Outlet<T>>) -> Vision<D, F, T> {
        Vision::at(host, crate::proto::VIDEO_PORT, decoder, callback, outlet)
    }

    /// Pull from an explicit host and port.
    pub fn at(
        host: &str,
        port: u16,
        decoder: D,
        callback: F,
        outlet: Option<Outlet<T>>,
    ) -> Vision<D, F, T> {
        Vision {
            host: host.to_string(),
            port,
            decoder: Some(decoder),
            stream: None,
            callback,
            outlet,
        }
    }
}

impl<D, F, T> Worker for Vision<D, F, T>
where
    D: Decoder,
    F: FnMut(&Context, Frame) -> Result<Option<T>> + Send,
    T: Send,
{
    fn setup(&mut self, ctx: &Context) -> Result<()> {
        let Some(decoder) = self.decoder.take() else {
            return Err(Error::Closed);
        };
        let stream = video::connect_to(&self.host, self.port, STREAM_TIMEOUT)?;
        log::info!(
            "{}: pulling video from {}:{}",
            ctx.name(),
            self.host,
            self.port
        );
        self.stream = Some(decoder.open(stream)?);
        Ok(())
    }

    fn tick(&mut self, ctx: &Context) -> Result<Flow> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(Flow::Break);
        };
        match stream.next_frame() {
            Ok(Some(frame)) => {
                if let Some(product) = (self.callback)(ctx, frame)? {
                    if let Some(outlet) = &self.outlet {
                        outlet.send(product);
                    }
                }
                Ok(Flow::Continue)
            }
            Ok(None) => {
                log::info!("{}: video stream ended", ctx.name());
                Ok(Flow::Break)
            }
            // a pull deadline during shutdown is just the exit path
            Err(Error::Timeout) if ctx.is_cancelled() => Ok(Flow::Break),
            Err(e) => Err(e),
        }
    }

    fn teardown(&mut self, ctx: &Context) {
        self.stream = None;
        log::debug!("{}: stopped", ctx.name());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::worker::ShutdownToken;
    use crate::video::PixelFormat;
    use std::net::{TcpListener, TcpStream};

    /// Synthetic decoder: ignores the byte stream, yields numbered frames
    struct TestDecoder {
        frames: u32,
    }

    struct TestStream {
        // hold the connection so the accept side stays valid
        _raw: TcpStream,
        remaining: u32,
        next_index: u32,
    }

    impl Decoder for TestDecoder {
        type Stream = TestStream;

        fn open(self, stream: TcpStream) -> crate::Result<TestStream> {
            Ok(TestStream {
                _raw: stream,
                remaining: self.frames,
                next_index: 0,
            })
        }
    }

    impl FrameStream for TestStream {
        fn next_frame(&mut self) -> crate::Result<Option<Frame>> {
            if self.remaining == 0 {
                return Ok(None);
            }
            self.remaining -= 1;
            let index = self.next_index;
            self.next_index += 1;
            Ok(Some(Frame {
                width: 4,
                height: 2,
                format: PixelFormat::Bgr8,
                data: vec![index as u8; 4 * 2 * 3],
            }))
        }
    }

    fn video_endpoint() -> (TcpListener, u16) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        (listener, port)
    }

    #[test]
    fn test_frames_flow_through_callback_in_order() {
        let (listener, port) = video_endpoint();
        let accepter = std::thread::spawn(move || listener.accept().unwrap().0);

        let (outlet, rx) = bounded("frames", 16, Overflow::DropOldest);
        let mut vision = Vision::at(
            "127.0.0.1",
            port,
            TestDecoder { frames: 3 },
            |_ctx: &Context, frame: Frame| Ok(Some(frame.data[0])),
            Some(outlet),
        );
        let ctx = Context::new("vision".to_string(), ShutdownToken::new());
        vision.setup(&ctx).unwrap();
        let _server_side = accepter.join().unwrap();

        assert_eq!(vision.tick(&ctx).unwrap(), Flow::Continue);
        assert_eq!(vision.tick(&ctx).unwrap(), Flow::Continue);
        assert_eq!(vision.tick(&ctx).unwrap(), Flow::Continue);
        // end of stream
        assert_eq!(vision.tick(&ctx).unwrap(), Flow::Break);

        let seen: Vec<u8> = rx.try_iter().collect();
        assert_eq!(seen, vec![0, 1, 2]);
    }

    #[test]
    fn test_slow_consumer_only_sees_latest_frame() {
        let (listener, port) = video_endpoint();
        let accepter = std::thread::spawn(move || listener.accept().unwrap().0);

        let (outlet, rx) = frame_outlet("frames");
        let mut vision = Vision::at(
            "127.0.0.1",
            port,
            TestDecoder { frames: 5 },
            |_ctx: &Context, frame: Frame| Ok(Some(frame.data[0])),
            Some(outlet),
        );
        let ctx = Context::new("vision".to_string(), ShutdownToken::new());
        vision.setup(&ctx).unwrap();
        let _server_side = accepter.join().unwrap();

        // consumer never drains while five frames arrive
        for _ in 0..5 {
            vision.tick(&ctx).unwrap();
        }
        let seen: Vec<u8> = rx.try_iter().collect();
        assert_eq!(seen, vec![4]);
    }

    #[test]
    fn test_callback_error_escalates() {
        let (listener, port) = video_endpoint();
        let accepter = std::thread::spawn(move || listener.accept().unwrap().0);

        let mut vision = Vision::at(
            "127.0.0.1",
            port,
            TestDecoder { frames: 1 },
            |_ctx: &Context, _frame: Frame| -> crate::Result<Option<u8>> { Err(Error::Closed) },
            None,
        );
        let ctx = Context::new("vision".to_string(), ShutdownToken::new());
        vision.setup(&ctx).unwrap();
        let _server_side = accepter.join().unwrap();

        assert!(vision.tick(&ctx).is_err());
    }
}
