//! Worker lifecycle: trait, context, and the loop driver
//!
//! A worker is a supervised long-running task. Its thread runs
//! `setup` once, `tick` in a loop (or exactly once for one-shot workers),
//! and `teardown` on every exit path. Cancellation is cooperative: the
//! shutdown token is observed between ticks, and blocking reads inside a
//! tick must be bounded by short timeouts.

use crate::error::{Error, Result};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// What a tick wants to happen next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
    Continue,
    /// End the worker cleanly. Outside shutdown this is fatal to the hub
    /// unless the worker was registered one-shot.
    Break,
}

/// Per-worker scheduling knobs
#[derive(Debug, Clone)]
pub struct WorkerOptions {
    /// Run `tick` exactly once instead of looping
    pub one_shot: bool,
    /// Pause between ticks
    pub interval: Duration,
}

impl Default for WorkerOptions {
    fn default() -> Self {
        WorkerOptions {
            one_shot: false,
            interval: Duration::ZERO,
        }
    }
}

/// Shared cancellation latch, tripped once at shutdown
#[derive(Debug, Clone, Default)]
pub struct ShutdownToken(Arc<AtomicBool>);

impl ShutdownToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// What a worker sees of its runtime
pub struct Context {
    name: String,
    token: ShutdownToken,
}

impl Context {
    pub fn new(name: String, token: ShutdownToken) -> Self {
        Context { name, token }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn token(&self) -> &ShutdownToken {
        &self.token
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A supervised task with lifecycle hooks
pub trait Worker: Send {
    /// Runs once on the worker thread before the first tick. A failure
    /// here aborts hub startup.
    fn setup(&mut self, _ctx: &Context) -> Result<()> {
        Ok(())
    }

    /// One unit of work. Blocking calls inside must be bounded so
    /// cancellation stays prompt.
    fn tick(&mut self, ctx: &Context) -> Result<Flow>;

    /// Runs exactly once on every exit path: clean, error, or cancelled.
    fn teardown(&mut self, _ctx: &Context) {}
}

/// Why a worker's thread ended
#[derive(Debug)]
pub(crate) enum ExitCause {
    /// `tick` returned `Break` or a one-shot finished
    Completed,
    /// The shutdown token was observed
    Cancelled,
    SetupFailed(Error),
    TickFailed(Error),
}

/// Drive a worker to completion on the current thread.
///
/// `on_started` fires after `setup` succeeds so the supervisor can keep
/// its ordered-startup promise. `teardown` is called exactly once.
pub(crate) fn run_worker(
    worker: &mut dyn Worker,
    ctx: &Context,
    options: &WorkerOptions,
    on_started: impl FnOnce(),
) -> ExitCause {
    if let Err(e) = worker.setup(ctx) {
        worker.teardown(ctx);
        return ExitCause::SetupFailed(e);
    }
    on_started();

    let cause = loop {
        if ctx.is_cancelled() {
            break ExitCause::Cancelled;
        }
        match worker.tick(ctx) {
            Ok(Flow::Continue) => {}
            Ok(Flow::Break) => break ExitCause::Completed,
            Err(e) => break ExitCause::TickFailed(e),
        }
        if options.one_shot {
            break ExitCause::Completed;
        }
        if !options.interval.is_zero() {
            sleep_cancellable(ctx, options.interval);
        }
    };
    worker.teardown(ctx);
    cause
}

/// Sleep in short slices so a shutdown during the pause is noticed fast.
fn sleep_cancellable(ctx: &Context, interval: Duration) {
    const SLICE: Duration = Duration::from_millis(50);
    let mut remaining = interval;
    while !remaining.is_zero() && !ctx.is_cancelled() {
        let step = remaining.min(SLICE);
        thread::sleep(step);
        remaining -= step;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Counting {
        ticks: usize,
        teardowns: usize,
        fail_setup: bool,
        break_after: Option<usize>,
    }

    impl Counting {
        fn new() -> Self {
            Counting {
                ticks: 0,
                teardowns: 0,
                fail_setup: false,
                break_after: None,
            }
        }
    }

    impl Worker for Counting {
        fn setup(&mut self, _ctx: &Context) -> crate::Result<()> {
            if self.fail_setup {
                return Err(Error::Closed);
            }
            Ok(())
        }

        fn tick(&mut self, _ctx: &Context) -> crate::Result<Flow> {
            self.ticks += 1;
            if self.break_after == Some(self.ticks) {
                return Ok(Flow::Break);
            }
            Ok(Flow::Continue)
        }

        fn teardown(&mut self, _ctx: &Context) {
            self.teardowns += 1;
        }
    }

    fn ctx() -> Context {
        Context::new("test".to_string(), ShutdownToken::new())
    }

    #[test]
    fn test_one_shot_ticks_once() {
        let mut worker = Counting::new();
        let options = WorkerOptions {
            one_shot: true,
            ..WorkerOptions::default()
        };
        let cause = run_worker(&mut worker, &ctx(), &options, || {});
        assert!(matches!(cause, ExitCause::Completed));
        assert_eq!(worker.ticks, 1);
        assert_eq!(worker.teardowns, 1);
    }

    #[test]
    fn test_break_ends_loop_with_teardown() {
        let mut worker = Counting::new();
        worker.break_after = Some(3);
        let cause = run_worker(&mut worker, &ctx(), &WorkerOptions::default(), || {});
        assert!(matches!(cause, ExitCause::Completed));
        assert_eq!(worker.ticks, 3);
        assert_eq!(worker.teardowns, 1);
    }

    #[test]
    fn test_setup_failure_still_tears_down_and_never_ticks() {
        let mut worker = Counting::new();
        worker.fail_setup = true;
        let mut started = false;
        let cause = run_worker(&mut worker, &ctx(), &WorkerOptions::default(), || {
            started = true
        });
        assert!(matches!(cause, ExitCause::SetupFailed(_)));
        assert!(!started);
        assert_eq!(worker.ticks, 0);
        assert_eq!(worker.teardowns, 1);
    }

    #[test]
    fn test_cancelled_token_stops_loop() {
        let context = ctx();
        context.token().cancel();
        let mut worker = Counting::new();
        let cause = run_worker(&mut worker, &context, &WorkerOptions::default(), || {});
        assert!(matches!(cause, ExitCause::Cancelled));
        assert_eq!(worker.ticks, 0);
        assert_eq!(worker.teardowns, 1);
    }
}
