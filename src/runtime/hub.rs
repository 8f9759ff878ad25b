//! Hub: the supervisor that owns workers and mediates shutdown
//!
//! Lifecycle: workers are registered while the hub is idle, spawned in
//! registration order by [`Hub::run`], and supervised until a signal, an
//! explicit [`Hub::close`], or a fatal worker exit starts the shutdown.
//! Shutdown trips the shared token, waits up to the graceful deadline for
//! every worker to finish, then abandons stragglers and returns.

use crate::error::{Error, Result};
use crate::runtime::worker::{run_worker, Context, ExitCause, ShutdownToken, Worker, WorkerOptions};
use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use std::collections::HashSet;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// How long Stopping waits before abandoning workers
pub const DEFAULT_GRACEFUL_DEADLINE: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Idle,
    Starting,
    Running,
    Stopping,
    Killing,
    Stopped,
}

enum HubEvent {
    Started { name: String },
    Exited { name: String, cause: ExitCause },
    Signal(i32),
    Close,
}

struct Registration {
    name: String,
    options: WorkerOptions,
    worker: Box<dyn Worker + 'static>,
}

/// Clonable handle that can stop a running hub from any thread
#[derive(Clone)]
pub struct HubCloser {
    token: ShutdownToken,
    events: Sender<HubEvent>,
}

impl HubCloser {
    pub fn close(&self) {
        self.token.cancel();
        let _ = self.events.send(HubEvent::Close);
    }
}

/// Supervisor for a set of workers
pub struct Hub {
    state: State,
    registry: Vec<Registration>,
    token: ShutdownToken,
    graceful_deadline: Duration,
    events_tx: Sender<HubEvent>,
    events_rx: Receiver<HubEvent>,
    handles: Vec<(String, JoinHandle<()>)>,
    /// Spawned workers that have not reported their exit yet
    live: Vec<String>,
    one_shots: HashSet<String>,
}

impl Hub {
    pub fn new() -> Hub {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();
        Hub {
            state: State::Idle,
            registry: Vec::new(),
            token: ShutdownToken::new(),
            graceful_deadline: DEFAULT_GRACEFUL_DEADLINE,
            events_tx,
            events_rx,
            handles: Vec::new(),
            live: Vec::new(),
            one_shots: HashSet::new(),
        }
    }

    /// Override the Stopping patience (default 5 s).
    pub fn with_graceful_deadline(mut self, deadline: Duration) -> Hub {
        self.graceful_deadline = deadline;
        self
    }

    /// Register a looping worker.
    pub fn worker(&mut self, name: &str, worker: impl Worker + 'static) -> Result<()> {
        self.worker_with(name, WorkerOptions::default(), worker)
    }

    /// Register a worker with explicit scheduling options.
    pub fn worker_with(
        &mut self,
        name: &str,
        options: WorkerOptions,
        worker: impl Worker + 'static,
    ) -> Result<()> {
        if self.state != State::Idle || self.token.is_cancelled() {
            return Err(Error::HubShuttingDown);
        }
        if self.registry.iter().any(|r| r.name == name) {
            return Err(Error::InvalidArg {
                field: "name",
                reason: format!("worker {:?} is already registered", name),
            });
        }
        self.registry.push(Registration {
            name: name.to_string(),
            options,
            worker: Box::new(worker),
        });
        Ok(())
    }

    /// Handle for stopping the hub from another thread.
    pub fn closer(&self) -> HubCloser {
        HubCloser {
            token: self.token.clone(),
            events: self.events_tx.clone(),
        }
    }

    /// Start the shutdown sequence.
    pub fn close(&self) {
        self.closer().close();
    }

    /// Spawn every registered worker and supervise until shutdown
    /// completes.
    ///
    /// Returns `Ok` after a clean shutdown even when a worker failure
    /// drove it; the failure has been logged and is not re-raised.
    pub fn run(&mut self) -> Result<()> {
        if self.state != State::Idle {
            return Err(Error::HubShuttingDown);
        }
        if self.registry.is_empty() {
            return Err(Error::InvalidArg {
                field: "workers",
                reason: "no worker registered".to_string(),
            });
        }

        self.state = State::Starting;
        let mut signals = Signals::new([SIGINT, SIGTERM])?;
        let signal_handle = signals.handle();
        let signal_tx = self.events_tx.clone();
        let signal_thread = thread::Builder::new()
            .name("hub-signals".to_string())
            .spawn(move || {
                for sig in signals.forever() {
                    if signal_tx.send(HubEvent::Signal(sig)).is_err() {
                        break;
                    }
                }
            })?;

        let keep_running = self.start_workers();
        if keep_running {
            self.state = State::Running;
            log::info!("hub: running with {} workers", self.live.len());
            self.supervise();
        }

        self.shut_down();

        self.state = State::Stopped;
        signal_handle.close();
        let _ = signal_thread.join();
        log::info!("hub: stopped");
        Ok(())
    }

    /// Spawn workers in registration order, waiting for each to finish
    /// its setup before starting the next. Returns false when something
    /// already forced a shutdown.
    fn start_workers(&mut self) -> bool {
        let registry = std::mem::take(&mut self.registry);
        let total = registry.len();
        for (position, registration) in registry.into_iter().enumerate() {
            let name = registration.name.clone();
            if let Err(e) = self.spawn(registration) {
                log::error!("hub: failed to spawn worker {}: {}", name, e);
                return false;
            }
            loop {
                match self.events_rx.recv() {
                    Ok(HubEvent::Started { name: started }) => {
                        log::info!(
                            "hub: worker {} started ({}/{})",
                            started,
                            position + 1,
                            total
                        );
                        break;
                    }
                    Ok(HubEvent::Exited { name: exited, cause }) => {
                        let fatal = self.note_exit(&exited, cause);
                        if fatal {
                            return false;
                        }
                        if exited == name {
                            // a benign one-shot finished before we moved on
                            break;
                        }
                    }
                    Ok(HubEvent::Signal(sig)) => {
                        log::info!("hub: received signal {} during startup", sig);
                        return false;
                    }
                    Ok(HubEvent::Close) => {
                        log::info!("hub: close requested during startup");
                        return false;
                    }
                    Err(_) => return false,
                }
            }
        }
        true
    }

    /// Wait on the union of signals, worker exits, and close requests.
    fn supervise(&mut self) {
        loop {
            match self.events_rx.recv() {
                Ok(HubEvent::Signal(sig)) => {
                    log::info!("hub: received signal {}, shutting down", sig);
                    return;
                }
                Ok(HubEvent::Close) => {
                    log::info!("hub: close requested, shutting down");
                    return;
                }
                Ok(HubEvent::Exited { name, cause }) => {
                    if self.note_exit(&name, cause) {
                        return;
                    }
                    if self.live.is_empty() {
                        log::info!("hub: all workers finished");
                        return;
                    }
                }
                Ok(HubEvent::Started { .. }) => {}
                Err(_) => return,
            }
        }
    }

    /// Record a worker exit. Returns true when the exit must bring the
    /// hub down.
    fn note_exit(&mut self, name: &str, cause: ExitCause) -> bool {
        self.live.retain(|n| n != name);
        match cause {
            ExitCause::Completed => {
                if self.one_shots.contains(name) || self.token.is_cancelled() {
                    log::info!("hub: worker {} finished", name);
                    false
                } else {
                    log::error!("hub: worker {} exited unexpectedly, shutting down", name);
                    true
                }
            }
            ExitCause::Cancelled => {
                log::debug!("hub: worker {} observed shutdown", name);
                false
            }
            ExitCause::SetupFailed(e) => {
                log::error!("hub: worker {} failed to set up: {}", name, e);
                true
            }
            ExitCause::TickFailed(e) => {
                log::error!("hub: worker {} failed: {}", name, e);
                true
            }
        }
    }

    fn spawn(&mut self, registration: Registration) -> Result<()> {
        let Registration {
            name,
            options,
            mut worker,
        } = registration;
        let one_shot = options.one_shot;
        let ctx = Context::new(name.clone(), self.token.clone());
        let events = self.events_tx.clone();
        let worker_name = name.clone();
        let handle = thread::Builder::new().name(name.clone()).spawn(move || {
            let started_events = events.clone();
            let started_name = worker_name.clone();
            let cause = run_worker(worker.as_mut(), &ctx, &options, move || {
                let _ = started_events.send(HubEvent::Started { name: started_name });
            });
            let _ = events.send(HubEvent::Exited {
                name: worker_name,
                cause,
            });
        })?;
        if one_shot {
            self.one_shots.insert(name.clone());
        }
        self.live.push(name.clone());
        self.handles.push((name, handle));
        Ok(())
    }

    /// Stopping: trip the token, wait for exits up to the deadline.
    /// Killing: abandon whatever is left. OS threads cannot be forced to
    /// die; abandoned workers are logged with their identity and their
    /// handles dropped so `run` can return on time.
    fn shut_down(&mut self) {
        self.state = State::Stopping;
        self.token.cancel();
        let deadline = Instant::now() + self.graceful_deadline;

        while !self.live.is_empty() {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                break;
            };
            match self.events_rx.recv_timeout(remaining) {
                Ok(HubEvent::Exited { name, cause }) => {
                    self.note_exit(&name, cause);
                }
                Ok(_) => {}
                Err(RecvTimeoutError::Timeout) => break,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        if !self.live.is_empty() {
            self.state = State::Killing;
            for name in &self.live {
                log::error!(
                    "hub: worker {} did not stop within {:?}, abandoning its thread",
                    name,
                    self.graceful_deadline
                );
            }
        }

        let live = std::mem::take(&mut self.live);
        for (name, handle) in self.handles.drain(..) {
            if live.contains(&name) {
                drop(handle);
            } else {
                let _ = handle.join();
            }
        }
        self.live = live;
    }
}

impl Default for Hub {
    fn default() -> Self {
        Hub::new()
    }
}
