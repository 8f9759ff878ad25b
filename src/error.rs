//! Error types for YantraIO
//!
//! # Error Recovery Strategies
//!
//! Different error types require different recovery approaches:
//!
//! ## Session Errors (Reconstruct the Commander)
//!
//! - **`Timeout`**: A command read deadline expired. The reply may still be
//!   in flight, so the session is poisoned and every later call fails with
//!   `Closed`. Construct a new [`Commander`](crate::Commander) to recover.
//!
//! - **`Closed`**: The session was closed or poisoned by an earlier failure.
//!   Construct a new Commander.
//!
//! - **`Handshake`**: The robot did not acknowledge SDK mode. Usually a
//!   stale peer session or a non-robot endpoint; retry against the right
//!   address.
//!
//! ## Command Errors (Fix the Call Site)
//!
//! - **`InvalidArg`**: A value was outside the robot's documented envelope.
//!   Nothing was sent on the wire.
//!
//! - **`Remote`**: The robot rejected the command. The session stays usable.
//!
//! ## Protocol Errors (Log and Continue)
//!
//! - **`Parse`**: A telegram or reply did not match the documented grammar.
//!   Listeners log and drop these; the socket remains usable.
//!
//! ## Transient Errors
//!
//! - **`Io`**: Socket-level error. Retryable for UDP listeners; fatal for
//!   an established Commander session.
//!
//! - **`DiscoveryTimeout`**: No robot announcement arrived in time. Check
//!   that host and robot share a LAN segment, then retry.
//!
//! ## Supervision Errors
//!
//! - **`HubShuttingDown`**: Registration was attempted after shutdown had
//!   begun. Workers must be registered before `run()`.
//!
//! - **`Config`**: Configuration file is invalid. Fix the file and restart.

use thiserror::Error;

/// Errors that can occur in YantraIO
///
/// See module-level documentation for recovery strategies.
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("read deadline expired")]
    Timeout,

    #[error("unexpected reply to SDK-mode handshake: {0}")]
    Handshake(String),

    #[error("robot rejected command: {0}")]
    Remote(String),

    #[error("invalid {field}: {reason}")]
    InvalidArg {
        field: &'static str,
        reason: String,
    },

    #[error("malformed telegram: {0}")]
    Parse(String),

    #[error("session is closed")]
    Closed,

    #[error("no robot announcement received")]
    DiscoveryTimeout,

    #[error("hub is shutting down")]
    HubShuttingDown,

    #[error("config error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, Error>;
