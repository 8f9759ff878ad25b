//! Preconfigured workers for the common roles: telemetry listeners, the
//! video drain, and user control logic
//!
//! Each of these is a thin composition of a socket or session, a parser,
//! and a bounded queue, packaged as a [`Worker`](crate::runtime::Worker)
//! for the hub to supervise.

mod event_listener;
mod mind;
mod push_listener;
mod vision;

pub use event_listener::EventListener;
pub use mind::Mind;
pub use push_listener::PushListener;
pub use vision::{frame_outlet, Vision};

use crate::proto::SegmentIssue;
use std::collections::HashSet;
use std::time::Duration;

/// UDP receive timeout; bounds how long a listener can take to notice
/// shutdown
pub(crate) const RECV_TIMEOUT: Duration = Duration::from_millis(250);

/// Log a dropped telegram segment. Unknown dispatch keys are reported once
/// per distinct key so a chatty firmware cannot flood the log.
pub(crate) fn log_segment_issue(worker: &str, warned: &mut HashSet<String>, issue: SegmentIssue) {
    match issue.dispatch_key {
        Some(key) => {
            if warned.insert(key.clone()) {
                log::warn!("{}: dropping telegrams with key {}: {}", worker, key, issue.reason);
            }
        }
        None => log::warn!("{}: dropped malformed telegram: {}", worker, issue.reason),
    }
}
