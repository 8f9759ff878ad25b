//! YantraIO - client SDK and control framework for RoboMaster EP robots
//!
//! This library drives a RoboMaster EP-class robot over its LAN protocol
//! suite and provides the concurrency scaffolding for reactive control:
//!
//! - [`Commander`]: synchronous, single-flight client for the TCP text
//!   command API, with typed methods for chassis, gimbal, blaster,
//!   sensors, LEDs, and stream switches
//! - [`proto`]: push/event telegram parsers producing strongly typed
//!   records
//! - [`runtime`]: the [`Hub`] supervisor, the [`Worker`](runtime::Worker)
//!   lifecycle, and bounded queues with overflow policies
//! - [`workers`]: preconfigured workers: [`PushListener`](workers::PushListener),
//!   [`EventListener`](workers::EventListener), [`Vision`](workers::Vision),
//!   and [`Mind`](workers::Mind)
//!
//! Every worker runs on its own OS thread, so the command session's
//! blocking read, both UDP listeners, and the video pull all make
//! progress simultaneously.

pub mod commander;
pub mod config;
pub mod discovery;
pub mod error;
pub mod proto;
pub mod runtime;
pub mod transport;
pub mod video;
pub mod workers;

pub use commander::{Commander, ConnectConfig};
pub use config::Config;
pub use discovery::discover_ip;
pub use error::{Error, Result};
pub use runtime::{Flow, Hub, Worker, WorkerOptions};
