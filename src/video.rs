//! Video stream interfaces
//!
//! The robot serves H.264 over TCP once `stream on` is issued. Decoding is
//! delegated to the embedding application through the [`Decoder`] seam;
//! this crate only owns the pull connection and the worker that drains
//! decoded frames.

use crate::error::{Error, Result};
use crate::proto::VIDEO_PORT;
use std::io::ErrorKind;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Frame pull deadline; also the cancellation latency bound for a stalled
/// stream
pub const STREAM_TIMEOUT: Duration = Duration::from_secs(5);

/// Pixel layout of a decoded frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PixelFormat {
    Bgr8,
    Rgb8,
    Nv12,
}

/// One decoded video frame
#[derive(Debug, Clone)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: Vec<u8>,
}

/// Turns the robot's raw byte stream into decoded frames.
///
/// Implemented outside this crate (ffmpeg, openh264, ...). Consumed on
/// open because decoders typically own codec state for exactly one stream.
pub trait Decoder: Send {
    type Stream: FrameStream;

    fn open(self, stream: TcpStream) -> Result<Self::Stream>;
}

/// A sequence of decoded frames in presentation order
pub trait FrameStream: Send {
    /// Pull the next frame; `Ok(None)` on orderly end of stream.
    fn next_frame(&mut self) -> Result<Option<Frame>>;
}

/// Open the raw video connection. The stream must already be enabled via
/// [`Commander::stream`](crate::Commander::stream).
pub fn connect(host: &str, timeout: Duration) -> Result<TcpStream> {
    connect_to(host, VIDEO_PORT, timeout)
}

/// Open the raw video connection on a non-standard port.
pub fn connect_to(host: &str, port: u16, timeout: Duration) -> Result<TcpStream> {
    let addr = (host, port)
        .to_socket_addrs()?
        .next()
        .ok_or_else(|| {
            Error::Io(std::io::Error::new(
                ErrorKind::InvalidInput,
                "address resolved to nothing",
            ))
        })?;
    let stream = TcpStream::connect_timeout(&addr, timeout)?;
    stream.set_read_timeout(Some(timeout))?;
    Ok(stream)
}
