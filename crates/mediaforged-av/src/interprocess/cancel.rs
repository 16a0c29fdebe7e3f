//! Cooperative cancellation of running children.

use super::{LogSink, Severity};
use parking_lot::Mutex;
use std::io::{self, Write};
use std::process::Child;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

/// A shared, set-once cancellation flag.
///
/// Clones observe the same flag. Once cancelled a token never resets.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

static PROCESS_TOKEN: LazyLock<CancellationToken> = LazyLock::new(CancellationToken::new);

/// The token every executor observes unless given another one.
pub fn process_token() -> CancellationToken {
    PROCESS_TOKEN.clone()
}

/// Request cancellation of every in-flight and future child run that was
/// started with a cancel action and the process-wide token.
pub fn abort_external_commands() {
    if !PROCESS_TOKEN.is_cancelled() {
        tracing::info!("Aborting external commands");
    }
    PROCESS_TOKEN.cancel();
}

/// What the watchdog does to a child once cancellation is requested.
pub enum CancelAction<'a> {
    /// Kill the child.
    Kill,
    /// Write these bytes to the child's standard input, e.g. ffmpeg's `q`.
    WriteStdin(Vec<u8>),
    /// Arbitrary action against the child handle.
    Custom(Box<dyn FnMut(&mut Child) -> io::Result<()> + Send + 'a>),
}

impl<'a> CancelAction<'a> {
    /// Send a single quit keystroke.
    pub fn quit_key(key: u8) -> Self {
        Self::WriteStdin(vec![key])
    }

    pub fn custom(action: impl FnMut(&mut Child) -> io::Result<()> + Send + 'a) -> Self {
        Self::Custom(Box::new(action))
    }

    /// Whether the child's stdin has to stay open for this action.
    pub(crate) fn needs_stdin(&self) -> bool {
        !matches!(self, Self::Kill)
    }

    fn invoke(&mut self, child: &mut Child) -> io::Result<()> {
        match self {
            Self::Kill => child.kill(),
            Self::WriteStdin(bytes) => {
                let stdin = child
                    .stdin
                    .as_mut()
                    .ok_or_else(|| io::Error::new(io::ErrorKind::BrokenPipe, "stdin is not available"))?;
                stdin.write_all(bytes)?;
                stdin.flush()
            }
            Self::Custom(action) => action(child),
        }
    }
}

impl std::fmt::Debug for CancelAction<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Kill => f.write_str("Kill"),
            Self::WriteStdin(bytes) => f.debug_tuple("WriteStdin").field(bytes).finish(),
            Self::Custom(_) => f.write_str("Custom"),
        }
    }
}

/// Polling cadence of the watchdog.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchdogTimings {
    /// How often the flag and the child's liveness are checked.
    pub poll_interval: Duration,
    /// How long to wait for the child to exit before repeating the cancel action.
    pub retry_interval: Duration,
}

impl Default for WatchdogTimings {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_millis(250),
            retry_interval: Duration::from_secs(10),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum WatchdogOutcome {
    ChildExited,
    Cancelled { attempts: u32 },
}

enum WatchState {
    Watching,
    CancelRequested { attempts: u32 },
}

pub(crate) struct Watchdog<'a> {
    token: CancellationToken,
    action: CancelAction<'a>,
    timings: WatchdogTimings,
}

impl<'a> Watchdog<'a> {
    pub(crate) fn new(token: CancellationToken, action: CancelAction<'a>, timings: WatchdogTimings) -> Self {
        Self {
            token,
            action,
            timings,
        }
    }

    /// Watch `child` until it exits.
    ///
    /// Once the token is cancelled the action is repeated every
    /// `retry_interval` for as long as the child keeps running; a child that
    /// never honours it keeps this loop alive. The exit check and the action
    /// run under the same lock, so a child that exited on its own is never
    /// sent the action and the run is not reported as cancelled.
    pub(crate) fn run(mut self, child: &Mutex<Child>, log: &dyn LogSink) -> io::Result<WatchdogOutcome> {
        let mut state = WatchState::Watching;
        loop {
            state = match state {
                WatchState::Watching => {
                    if self.token.is_cancelled() {
                        WatchState::CancelRequested { attempts: 0 }
                    } else if child.lock().try_wait()?.is_some() {
                        return Ok(WatchdogOutcome::ChildExited);
                    } else {
                        std::thread::sleep(self.timings.poll_interval);
                        WatchState::Watching
                    }
                }
                WatchState::CancelRequested { attempts } => {
                    {
                        let mut guard = child.lock();
                        if guard.try_wait()?.is_some() {
                            return Ok(match attempts {
                                0 => WatchdogOutcome::ChildExited,
                                n => WatchdogOutcome::Cancelled { attempts: n },
                            });
                        }
                        tracing::debug!(pid = guard.id(), attempt = attempts + 1, "cancelling child process");
                        if let Err(e) = self.action.invoke(&mut guard) {
                            log.log(
                                Severity::Warning,
                                &format!("Failed to cancel child process {}: {}", guard.id(), e),
                            );
                        }
                    }
                    wait_for_exit(child, self.timings)?;
                    WatchState::CancelRequested {
                        attempts: attempts + 1,
                    }
                }
            };
        }
    }
}

/// Block until the child exits or `retry_interval` elapses.
fn wait_for_exit(child: &Mutex<Child>, timings: WatchdogTimings) -> io::Result<()> {
    let deadline = Instant::now() + timings.retry_interval;
    loop {
        if child.lock().try_wait()?.is_some() {
            return Ok(());
        }
        let now = Instant::now();
        if now >= deadline {
            return Ok(());
        }
        std::thread::sleep(timings.poll_interval.min(deadline - now));
    }
}
