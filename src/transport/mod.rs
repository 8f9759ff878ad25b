//! Transport layer for I/O abstraction

use crate::error::Result;

mod mock;
mod tcp;

pub use mock::MockTransport;
pub use tcp::TcpTransport;

/// Transport trait for the command session
///
/// Implementations map their deadline expiry onto
/// [`Error::Timeout`](crate::Error::Timeout) so the session layer can
/// distinguish a poisoned exchange from a broken socket.
pub trait Transport: Send {
    /// Read data into buffer, returns number of bytes read (0 = EOF)
    fn read(&mut self, buffer: &mut [u8]) -> Result<usize>;

    /// Write data from buffer, returns number of bytes written
    fn write(&mut self, data: &[u8]) -> Result<usize>;

    /// Flush any pending writes
    fn flush(&mut self) -> Result<()>;
}
