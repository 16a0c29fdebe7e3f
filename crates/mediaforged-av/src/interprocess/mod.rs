//! Child-process execution with concurrent stream redirection.
//!
//! [`CommandExecutor`] starts one child, drains its stdout and stderr on
//! separate workers, optionally feeds its stdin from a producer closure, and
//! optionally watches a [`CancellationToken`] to stop the child. The call is
//! synchronous: it returns once the child has exited and every worker has
//! finished.
//!
//! ```no_run
//! use mediaforged_av::interprocess::{ChildProcessSpec, CommandExecutor, OutputRedirect, RunOutcome};
//!
//! let mut lines = Vec::new();
//! let outcome = CommandExecutor::new(ChildProcessSpec::new("/usr/bin/ffprobe", "-version"))
//!     .stdout(OutputRedirect::text(|line| lines.push(line.to_string())))
//!     .execute()?;
//! assert_eq!(outcome, RunOutcome::Completed(0));
//! # Ok::<(), mediaforged_av::Error>(())
//! ```

mod cancel;
pub mod ffmpeg;
mod redirect;

pub use cancel::{abort_external_commands, process_token, CancelAction, CancellationToken, WatchdogTimings};
pub use ffmpeg::{execute_ffmpeg, FfmpegExecution, FfmpegLogScanner, FfmpegLogState, ProgressSample};
pub use redirect::{InputRedirect, OutputRedirect, IO_BUFFER_SIZE};

use crate::{Error, Result};
use cancel::{Watchdog, WatchdogOutcome};
use parking_lot::Mutex;
use redirect::{feed_input, pump_output};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Instant;

/// How text output is decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TextEncoding {
    /// UTF-8; an invalid sequence fails the stream.
    Utf8,
    /// UTF-8 with invalid sequences replaced by U+FFFD.
    #[default]
    Utf8Lossy,
}

/// What to run: executable, argument string and output decoding.
///
/// The argument string is split with POSIX shell quoting rules, so paths
/// containing spaces are written as `-i "my movie.mkv"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildProcessSpec {
    program: PathBuf,
    arguments: String,
    output_encoding: TextEncoding,
}

impl ChildProcessSpec {
    pub fn new(program: impl Into<PathBuf>, arguments: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            arguments: arguments.into(),
            output_encoding: TextEncoding::default(),
        }
    }

    /// Build a spec from individual arguments, quoting each as needed.
    pub fn from_args<I, S>(program: impl Into<PathBuf>, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self::new(program, shell_words::join(args))
    }

    pub fn output_encoding(mut self, encoding: TextEncoding) -> Self {
        self.output_encoding = encoding;
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn arguments(&self) -> &str {
        &self.arguments
    }

    fn argv(&self) -> Result<Vec<String>> {
        shell_words::split(&self.arguments)
            .map_err(|e| Error::InvalidInput(format!("malformed argument string {:?}: {}", self.arguments, e)))
    }
}

/// Result of one child run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    /// The child exited on its own with this code. A child killed by a
    /// signal reports `128 + signal`.
    Completed(i32),
    /// The watchdog had to stop the child; its exit code is meaningless.
    Cancelled,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Completed(0))
    }

    pub fn exit_code(&self) -> Option<i32> {
        match self {
            Self::Completed(code) => Some(*code),
            Self::Cancelled => None,
        }
    }
}

/// Severity of an executor log event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Information,
    Warning,
    Error,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Information => write!(f, "INFORMATION"),
            Severity::Warning => write!(f, "WARNING"),
            Severity::Error => write!(f, "ERROR"),
        }
    }
}

/// Receiver of executor lifecycle events.
pub trait LogSink: Sync {
    fn log(&self, severity: Severity, message: &str);
}

impl<F> LogSink for F
where
    F: Fn(Severity, &str) + Sync,
{
    fn log(&self, severity: Severity, message: &str) {
        self(severity, message)
    }
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl LogSink for TracingLogSink {
    fn log(&self, severity: Severity, message: &str) {
        match severity {
            Severity::Information => tracing::info!("{}", message),
            Severity::Warning => tracing::warn!("{}", message),
            Severity::Error => tracing::error!("{}", message),
        }
    }
}

/// Builder for one child-process invocation.
pub struct CommandExecutor<'a> {
    spec: ChildProcessSpec,
    input: Option<InputRedirect<'a>>,
    stdout: Option<OutputRedirect<'a>>,
    stderr: Option<OutputRedirect<'a>>,
    log: &'a dyn LogSink,
    cancel_action: Option<CancelAction<'a>>,
    token: CancellationToken,
    timings: WatchdogTimings,
}

impl<'a> CommandExecutor<'a> {
    /// Create an executor with default policies: no input, both output
    /// streams logged line by line, no cancellation, process-wide token.
    pub fn new(spec: ChildProcessSpec) -> Self {
        Self {
            spec,
            input: None,
            stdout: None,
            stderr: None,
            log: &TracingLogSink,
            cancel_action: None,
            token: process_token(),
            timings: WatchdogTimings::default(),
        }
    }

    pub fn input(mut self, input: InputRedirect<'a>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn stdout(mut self, output: OutputRedirect<'a>) -> Self {
        self.stdout = Some(output);
        self
    }

    pub fn stderr(mut self, output: OutputRedirect<'a>) -> Self {
        self.stderr = Some(output);
        self
    }

    pub fn log_sink(mut self, log: &'a dyn LogSink) -> Self {
        self.log = log;
        self
    }

    /// Install a watchdog that applies `action` once the token is cancelled.
    ///
    /// [`CancelAction::WriteStdin`] cannot be combined with an input policy,
    /// since the feeder owns the child's stdin; [`CommandExecutor::execute`]
    /// rejects that pairing. A [`CancelAction::Custom`] action run alongside
    /// an input policy sees the child without its stdin handle.
    pub fn cancel_action(mut self, action: CancelAction<'a>) -> Self {
        self.cancel_action = Some(action);
        self
    }

    /// Observe `token` instead of the process-wide one.
    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn watchdog_timings(mut self, timings: WatchdogTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Run the child to completion.
    ///
    /// # Errors
    ///
    /// - [`Error::FileNotFound`] if the program is not an existing file.
    /// - [`Error::InvalidInput`] if the argument string is malformed, or an
    ///   input policy is combined with [`CancelAction::WriteStdin`].
    /// - [`Error::SpawnFailed`] if the OS refuses to start it.
    /// - [`Error::Stream`] if a pipe fails mid-run. The child is killed so
    ///   the remaining workers can finish, and it is always reaped before
    ///   the error is returned.
    ///
    /// A non-zero exit code is not an error.
    pub fn execute(self) -> Result<RunOutcome> {
        let CommandExecutor {
            spec,
            input,
            stdout,
            stderr,
            log,
            cancel_action,
            token,
            timings,
        } = self;

        if !spec.program.is_file() {
            return Err(Error::file_not_found(&spec.program));
        }
        let argv = spec.argv()?;
        if input.is_some() && matches!(cancel_action, Some(CancelAction::WriteStdin(_))) {
            return Err(Error::InvalidInput(
                "an input policy and a stdin-writing cancel action cannot share the child's stdin".to_string(),
            ));
        }

        let keep_stdin = input.is_some() || cancel_action.as_ref().is_some_and(CancelAction::needs_stdin);
        let mut child = Command::new(&spec.program)
            .args(&argv)
            .stdin(if keep_stdin { Stdio::piped() } else { Stdio::null() })
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|source| Error::SpawnFailed {
                program: spec.program.clone(),
                source,
            })?;

        let pid = child.id();
        let started = Instant::now();
        log.log(
            Severity::Information,
            &format!(
                "Child process started: pid={} \"{}\" {}",
                pid,
                spec.program.display(),
                spec.arguments
            ),
        );

        let stdin = if input.is_some() { child.stdin.take() } else { None };
        let child_stdout = child.stdout.take();
        let child_stderr = child.stderr.take();
        let child = Mutex::new(child);

        let stdout = stdout.unwrap_or_else(|| OutputRedirect::log_lines("stdout"));
        let stderr = stderr.unwrap_or_else(|| OutputRedirect::log_lines("stderr"));
        let encoding = spec.output_encoding;

        let results = thread::scope(|scope| {
            let child = &child;

            let feeder = input.zip(stdin).map(|(redirect, sink)| {
                scope.spawn(move || {
                    feed_input(redirect, sink).map_err(|e| {
                        let _ = child.lock().kill();
                        Error::stream("stdin", e)
                    })
                })
            });
            let stdout_pump =
                scope.spawn(move || drain(stdout, child_stdout, encoding, "stdout", child, log));
            let stderr_pump =
                scope.spawn(move || drain(stderr, child_stderr, encoding, "stderr", child, log));
            let watchdog = cancel_action.map(|action| {
                let watchdog = Watchdog::new(token, action, timings);
                scope.spawn(move || watchdog.run(child, log))
            });

            let stderr_result = stderr_pump.join().map_err(|_| Error::WorkerPanicked("stderr"));
            let stdout_result = stdout_pump.join().map_err(|_| Error::WorkerPanicked("stdout"));
            let watchdog_result = match watchdog {
                Some(handle) => handle
                    .join()
                    .map_err(|_| Error::WorkerPanicked("watchdog"))
                    .and_then(|r| r.map_err(Error::Io)),
                None => Ok(WatchdogOutcome::ChildExited),
            };
            let feeder_result = match feeder {
                Some(handle) => handle.join().map_err(|_| Error::WorkerPanicked("stdin")),
                None => Ok(Ok(())),
            };
            (stderr_result, stdout_result, watchdog_result, feeder_result)
        });

        let mut child = child.into_inner();
        let status = reap(&mut child, pid)?;
        log.log(
            Severity::Information,
            &format!(
                "Child process exited: pid={}, wall_time={:.2}[sec], \"{}\" {}",
                pid,
                started.elapsed().as_secs_f64(),
                spec.program.display(),
                spec.arguments
            ),
        );

        let (stderr_result, stdout_result, watchdog_result, feeder_result) = results;
        stderr_result??;
        stdout_result??;
        let watchdog_outcome = watchdog_result?;
        feeder_result??;

        Ok(match watchdog_outcome {
            WatchdogOutcome::Cancelled { attempts } => {
                log.log(
                    Severity::Information,
                    &format!("Child process cancelled: pid={} after {} attempt(s)", pid, attempts),
                );
                RunOutcome::Cancelled
            }
            WatchdogOutcome::ChildExited => RunOutcome::Completed(exit_code(status)),
        })
    }
}

/// Run a child with the given policies, observing the process-wide token.
///
/// `stdout`/`stderr` default to logging each line; `cancel_action`, when
/// given, installs a watchdog. See [`CommandExecutor::execute`] for errors.
pub fn execute_command<'a>(
    spec: ChildProcessSpec,
    input: Option<InputRedirect<'a>>,
    stdout: Option<OutputRedirect<'a>>,
    stderr: Option<OutputRedirect<'a>>,
    log: &'a dyn LogSink,
    cancel_action: Option<CancelAction<'a>>,
) -> Result<RunOutcome> {
    let mut executor = CommandExecutor::new(spec).log_sink(log);
    executor.input = input;
    executor.stdout = stdout;
    executor.stderr = stderr;
    executor.cancel_action = cancel_action;
    executor.execute()
}

/// Pump one output stream; on a read failure kill the child so the other
/// workers reach end-of-stream.
fn drain<R: Read>(
    redirect: OutputRedirect<'_>,
    source: Option<R>,
    encoding: TextEncoding,
    stream: &'static str,
    child: &Mutex<Child>,
    log: &dyn LogSink,
) -> Result<()> {
    let Some(source) = source else {
        return Ok(());
    };
    pump_output(redirect, source, encoding, stream).map_err(|e| {
        let pid = child.lock().id();
        log.log(
            Severity::Error,
            &format!("Reading {} of child process {} failed: {}", stream, pid, e),
        );
        let _ = child.lock().kill();
        Error::stream(stream, e)
    })
}

fn reap(child: &mut Child, pid: u32) -> Result<ExitStatus> {
    child.wait().map_err(|e| {
        tracing::error!("Waiting for child process {} failed: {}", pid, e);
        Error::Io(e)
    })
}

fn exit_code(status: ExitStatus) -> i32 {
    if let Some(code) = status.code() {
        return code;
    }
    #[cfg(unix)]
    {
        use std::os::unix::process::ExitStatusExt;
        if let Some(signal) = status.signal() {
            return 128 + signal;
        }
    }
    -1
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use std::io::Write;
    use std::os::unix::fs::PermissionsExt;
    use std::time::Duration;
    use tempfile::TempDir;

    /// Write an executable shell script into `dir`.
    fn script(dir: &TempDir, name: &str, body: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "#!/bin/sh\n{}", body).unwrap();
        drop(file);
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        path
    }

    fn fast() -> WatchdogTimings {
        WatchdogTimings {
            poll_interval: Duration::from_millis(20),
            retry_interval: Duration::from_secs(2),
        }
    }

    fn quiet(_: Severity, _: &str) {}

    #[test]
    fn test_missing_program_is_not_found() {
        let result = CommandExecutor::new(ChildProcessSpec::new("/no/such/program", "")).execute();
        assert_matches!(result, Err(Error::FileNotFound { .. }));
    }

    #[test]
    fn test_malformed_arguments_rejected() {
        let result = CommandExecutor::new(ChildProcessSpec::new("/bin/sh", "-c \"unterminated")).execute();
        assert_matches!(result, Err(Error::InvalidInput(_)));
    }

    #[test]
    fn test_exit_code_is_reported() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "fail.sh", "exit 3");
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .execute()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(3));
        assert_eq!(outcome.exit_code(), Some(3));
    }

    #[test]
    fn test_quoted_arguments_reach_child() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "args.sh", r#"for a in "$@"; do echo "[$a]"; done"#);
        let mut lines = Vec::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::from_args(&program, ["-i", "my movie.mkv"]))
            .stdout(OutputRedirect::text(|line| lines.push(line.to_string())))
            .execute()
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(lines, vec!["[-i]", "[my movie.mkv]"]);
    }

    #[test]
    fn test_stdout_and_stderr_drain_independently() {
        let dir = TempDir::new().unwrap();
        // Far more stderr than a pipe buffer holds, interleaved with stdout.
        let program = script(
            &dir,
            "noisy.sh",
            r#"i=0
while [ $i -lt 2000 ]; do
  echo "out $i"
  echo "err $i err err err err err err err err err err err err err err err" >&2
  i=$((i+1))
done"#,
        );
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .stdout(OutputRedirect::text(|line| out.push(line.to_string())))
            .stderr(OutputRedirect::text(|line| err.push(line.to_string())))
            .execute()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(0));
        assert_eq!(out.len(), 2000);
        assert_eq!(err.len(), 2000);
        assert_eq!(out[1999], "out 1999");
        assert!(out.iter().enumerate().all(|(i, line)| *line == format!("out {i}")));
    }

    #[test]
    fn test_text_input_is_closed_after_last_line() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "cat.sh", "cat");
        let mut produced = vec!["first", "second", "third"].into_iter();
        let mut echoed = Vec::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .input(InputRedirect::text(move || produced.next().map(str::to_string)))
            .stdout(OutputRedirect::text(|line| echoed.push(line.to_string())))
            .execute()
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(echoed, vec!["first", "second", "third"]);
    }

    #[test]
    fn test_null_input_gives_immediate_eof() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "count.sh", "wc -c");
        let mut counted = String::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .input(InputRedirect::Null)
            .stdout(OutputRedirect::text(|line| counted = line.trim().to_string()))
            .execute()
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(counted, "0");
    }

    #[test]
    fn test_binary_round_trip_through_child() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "cat.sh", "cat");
        let payload: Vec<u8> = (0..300_000u32).map(|i| (i * 7 % 256) as u8).collect();
        let mut chunks = payload.chunks(10_000).map(<[u8]>::to_vec).collect::<Vec<_>>().into_iter();
        let mut received = Vec::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .input(InputRedirect::binary(move || chunks.next().unwrap_or_default()))
            .stdout(OutputRedirect::binary(|chunk| received.extend_from_slice(chunk)))
            .execute()
            .unwrap();
        assert!(outcome.is_success());
        assert_eq!(received, payload);
    }

    #[test]
    fn test_start_and_end_events_are_logged() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "ok.sh", "exit 0");
        let events = std::sync::Mutex::new(Vec::new());
        let sink = |severity: Severity, message: &str| {
            events.lock().unwrap().push((severity, message.to_string()));
        };
        CommandExecutor::new(ChildProcessSpec::new(program, "--flag"))
            .log_sink(&sink)
            .execute()
            .unwrap();
        let events = events.into_inner().unwrap();
        assert_eq!(events.len(), 2);
        assert!(events[0].1.starts_with("Child process started: pid="));
        assert!(events[0].1.ends_with("--flag"));
        assert!(events[1].1.starts_with("Child process exited: pid="));
        assert!(events[1].1.contains(", wall_time="));
    }

    #[test]
    fn test_cancel_action_stops_child() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "sleepy.sh", "exec sleep 30");
        let token = CancellationToken::new();
        let canceller = token.clone();
        let trigger = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(200));
            canceller.cancel();
        });
        let started = Instant::now();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .cancel_action(CancelAction::Kill)
            .cancellation_token(token)
            .watchdog_timings(fast())
            .execute()
            .unwrap();
        trigger.join().unwrap();
        assert_eq!(outcome, RunOutcome::Cancelled);
        assert_eq!(outcome.exit_code(), None);
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_run_without_cancel_action_ignores_token() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "short.sh", "sleep 0.2; exit 0");
        let token = CancellationToken::new();
        token.cancel();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .cancellation_token(token)
            .execute()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(0));
    }

    #[test]
    fn test_natural_exit_with_watchdog_is_completed() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "ok.sh", "exit 7");
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .cancel_action(CancelAction::Kill)
            .cancellation_token(CancellationToken::new())
            .watchdog_timings(fast())
            .execute()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(7));
    }

    #[test]
    fn test_execute_command_free_function() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "hello.sh", "echo hello; echo oops >&2");
        let mut out = Vec::new();
        let mut err = Vec::new();
        let outcome = execute_command(
            ChildProcessSpec::new(program, ""),
            None,
            Some(OutputRedirect::text(|line| out.push(line.to_string()))),
            Some(OutputRedirect::text(|line| err.push(line.to_string()))),
            &quiet,
            None,
        )
        .unwrap();
        assert!(outcome.is_success());
        assert_eq!(out, vec!["hello"]);
        assert_eq!(err, vec!["oops"]);
    }

    #[test]
    fn test_invalid_utf8_is_a_stream_fault() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "bad.sh", r"printf '\377\376\n'");
        let result = CommandExecutor::new(ChildProcessSpec::new(program, "").output_encoding(TextEncoding::Utf8))
            .log_sink(&quiet)
            .stdout(OutputRedirect::text(|_| {}))
            .execute();
        assert_matches!(result, Err(Error::Stream { stream: "stdout", .. }));
    }

    #[test]
    fn test_stream_fault_kills_running_child() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "bad_then_sleep.sh", r"printf '\377\n'; exec sleep 30");
        let started = Instant::now();
        let result = CommandExecutor::new(ChildProcessSpec::new(program, "").output_encoding(TextEncoding::Utf8))
            .log_sink(&quiet)
            .stdout(OutputRedirect::text(|_| {}))
            .execute();
        assert_matches!(result, Err(Error::Stream { stream: "stdout", .. }));
        assert!(started.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_input_with_stdin_cancel_action_is_rejected() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "cat.sh", "cat");
        let result = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .input(InputRedirect::Null)
            .cancel_action(CancelAction::quit_key(b'q'))
            .execute();
        assert_matches!(result, Err(Error::InvalidInput(ref m)) if m.contains("stdin"));
    }

    #[test]
    fn test_input_with_kill_action_is_allowed() {
        let dir = TempDir::new().unwrap();
        let program = script(&dir, "cat.sh", "cat");
        let mut echoed = Vec::new();
        let outcome = CommandExecutor::new(ChildProcessSpec::new(program, ""))
            .log_sink(&quiet)
            .input(InputRedirect::lines(vec!["only".to_string()]))
            .stdout(OutputRedirect::text(|line| echoed.push(line.to_string())))
            .cancel_action(CancelAction::Kill)
            .cancellation_token(CancellationToken::new())
            .watchdog_timings(fast())
            .execute()
            .unwrap();
        assert_eq!(outcome, RunOutcome::Completed(0));
        assert_eq!(echoed, vec!["only"]);
    }

    #[test]
    fn test_spawn_failure_for_non_executable_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plain.txt");
        std::fs::write(&path, "not a program").unwrap();
        let result = CommandExecutor::new(ChildProcessSpec::new(&path, "")).execute();
        assert_matches!(result, Err(Error::SpawnFailed { .. }));
    }
}
