//! Concurrency runtime: bounded queues, the worker lifecycle, and the hub
//! supervisor
//!
//! Every worker runs on its own OS thread so a blocking socket read in one
//! cannot stall another; the command session, both UDP listeners, and the
//! video pull all make progress simultaneously. Workers never share
//! mutable state directly: all cross-worker data flow goes through
//! bounded [`queue`]s.

pub mod hub;
pub mod queue;
pub mod worker;

pub use hub::{Hub, HubCloser, DEFAULT_GRACEFUL_DEADLINE};
pub use queue::{bounded, Outlet, Overflow, DEFAULT_CAPACITY};
pub use worker::{Context, Flow, ShutdownToken, Worker, WorkerOptions};
