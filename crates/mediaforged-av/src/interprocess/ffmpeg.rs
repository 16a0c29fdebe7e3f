//! Running ffmpeg and scraping its stderr for progress.
//!
//! ffmpeg has no machine-readable log; the patterns below follow the human
//! readable output of current releases and may drift between versions. Any
//! line that does not match is treated as an ordinary log line.

use super::{
    process_token, CancelAction, CancellationToken, ChildProcessSpec, CommandExecutor, InputRedirect, LogSink,
    OutputRedirect, RunOutcome, Severity, TextEncoding, TracingLogSink, WatchdogTimings,
};
use crate::time::parse_time_lazy;
use crate::Result;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use std::time::Duration;

/// Printed by ffmpeg after it reads `q` from stdin.
pub const QUIT_ACKNOWLEDGED_MARKER: &str = "[q] command received. Exiting.";

/// Prefix of ffmpeg's periodic statistics line.
pub const PROGRESS_MARKER: &str = "frame=";

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\s*(?:Duration|DURATION)\s*:\s*(?P<time>\d+:\d+:\d+(?:\.\d+)?)").expect("valid regex")
});

static PROGRESS_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r" time=(?P<time>\d+:\d+:\d+(?:\.\d+)?) ").expect("valid regex"));

/// Fraction of the conversion done, always within `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct ProgressSample(f64);

impl ProgressSample {
    /// Clamp `elapsed / total` into `[0, 1]`.
    pub fn new(elapsed_secs: f64, total_secs: f64) -> Self {
        let fraction = elapsed_secs / total_secs;
        Self(if fraction.is_nan() { 0.0 } else { fraction.clamp(0.0, 1.0) })
    }

    pub fn fraction(&self) -> f64 {
        self.0
    }
}

/// How one stderr line is interpreted.
#[derive(Debug, Clone, PartialEq)]
pub enum LogLine<'a> {
    /// ffmpeg confirmed our quit keystroke.
    QuitAcknowledged,
    /// A statistics line; `elapsed` is `None` if no `time=` could be read.
    Progress { elapsed: Option<Duration> },
    /// Anything else, with the `Duration:` value it announces, if any.
    Message {
        text: &'a str,
        duration: Option<Duration>,
    },
}

/// Classify a single line of ffmpeg stderr.
pub fn classify_line(line: &str) -> LogLine<'_> {
    if line.starts_with(QUIT_ACKNOWLEDGED_MARKER) {
        LogLine::QuitAcknowledged
    } else if line.starts_with(PROGRESS_MARKER) {
        LogLine::Progress {
            elapsed: capture_time(&PROGRESS_PATTERN, line),
        }
    } else {
        LogLine::Message {
            text: line,
            duration: capture_time(&DURATION_PATTERN, line),
        }
    }
}

fn capture_time(pattern: &Regex, line: &str) -> Option<Duration> {
    let caps = pattern.captures(line)?;
    parse_time_lazy(&caps["time"]).ok()
}

/// Per-run state accumulated from ffmpeg's log.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FfmpegLogState {
    quit_acknowledged: bool,
    max_duration_secs: Option<f64>,
}

impl FfmpegLogState {
    pub fn quit_acknowledged(&self) -> bool {
        self.quit_acknowledged
    }

    /// Longest input duration announced so far.
    pub fn max_duration_secs(&self) -> Option<f64> {
        self.max_duration_secs
    }

    /// Fold one classified line into the state, returning a progress sample
    /// when the line is a statistics line and a duration is known.
    pub fn apply(&mut self, line: &LogLine<'_>) -> Option<ProgressSample> {
        match line {
            LogLine::QuitAcknowledged => {
                self.quit_acknowledged = true;
                None
            }
            LogLine::Progress { elapsed } => {
                let total = self.max_duration_secs?;
                let elapsed = (*elapsed)?;
                Some(ProgressSample::new(elapsed.as_secs_f64(), total))
            }
            LogLine::Message { duration, .. } => {
                // A multi-input run announces one duration per input; the
                // longest one bounds the whole conversion.
                if let Some(duration) = duration {
                    let secs = duration.as_secs_f64();
                    if self.max_duration_secs.is_none_or(|max| secs > max) {
                        self.max_duration_secs = Some(secs);
                    }
                }
                None
            }
        }
    }
}

/// Stateful stderr line handler: ordinary lines go to the log-line sink,
/// statistics lines become progress samples, the quit acknowledgement is
/// swallowed.
pub struct FfmpegLogScanner<'a> {
    state: FfmpegLogState,
    log_line: Box<dyn FnMut(&str) + Send + 'a>,
    progress: Box<dyn FnMut(ProgressSample) + Send + 'a>,
}

impl<'a> FfmpegLogScanner<'a> {
    pub fn new(
        log_line: impl FnMut(&str) + Send + 'a,
        progress: impl FnMut(ProgressSample) + Send + 'a,
    ) -> Self {
        Self {
            state: FfmpegLogState::default(),
            log_line: Box::new(log_line),
            progress: Box::new(progress),
        }
    }

    pub fn scan(&mut self, line: &str) {
        let classified = classify_line(line);
        if let LogLine::Message { text, .. } = &classified {
            (self.log_line)(text);
        }
        if let Some(sample) = self.state.apply(&classified) {
            (self.progress)(sample);
        }
    }

    pub fn state(&self) -> &FfmpegLogState {
        &self.state
    }
}

/// Builder for an ffmpeg run with progress reporting.
///
/// Unless the caller redirects stdin, a watchdog is installed that asks
/// ffmpeg to quit by writing `q` to its input once cancellation is
/// requested.
pub struct FfmpegExecution<'a> {
    ffmpeg: PathBuf,
    args: String,
    input: Option<InputRedirect<'a>>,
    output: Option<OutputRedirect<'a>>,
    log: &'a dyn LogSink,
    token: CancellationToken,
    timings: WatchdogTimings,
}

impl<'a> FfmpegExecution<'a> {
    pub fn new(ffmpeg: impl Into<PathBuf>, args: impl Into<String>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            args: args.into(),
            input: None,
            output: None,
            log: &TracingLogSink,
            token: process_token(),
            timings: WatchdogTimings::default(),
        }
    }

    pub fn input(mut self, input: InputRedirect<'a>) -> Self {
        self.input = Some(input);
        self
    }

    pub fn output(mut self, output: OutputRedirect<'a>) -> Self {
        self.output = Some(output);
        self
    }

    pub fn log_sink(mut self, log: &'a dyn LogSink) -> Self {
        self.log = log;
        self
    }

    pub fn cancellation_token(mut self, token: CancellationToken) -> Self {
        self.token = token;
        self
    }

    pub fn watchdog_timings(mut self, timings: WatchdogTimings) -> Self {
        self.timings = timings;
        self
    }

    /// Run ffmpeg. Non-progress lines of its stderr go to `log_line`,
    /// progress to `progress`.
    pub fn execute(
        self,
        log_line: impl FnMut(&str) + Send,
        progress: impl FnMut(ProgressSample) + Send,
    ) -> Result<RunOutcome> {
        let mut scanner = FfmpegLogScanner::new(log_line, progress);
        let spec = ChildProcessSpec::new(&self.ffmpeg, self.args).output_encoding(TextEncoding::Utf8Lossy);

        let mut executor = CommandExecutor::new(spec)
            .log_sink(self.log)
            .cancellation_token(self.token)
            .watchdog_timings(self.timings)
            .stderr(OutputRedirect::text(|line| scanner.scan(line)));
        executor = match self.input {
            Some(input) => executor.input(input),
            None => executor.cancel_action(CancelAction::quit_key(b'q')),
        };
        if let Some(output) = self.output {
            executor = executor.stdout(output);
        }

        let outcome = executor.execute()?;
        if scanner.state().quit_acknowledged() {
            self.log.log(Severity::Information, "ffmpeg acknowledged the quit request.");
        }
        Ok(outcome)
    }
}

/// Run ffmpeg with the given argument string, observing the process-wide
/// cancellation token.
pub fn execute_ffmpeg<'a>(
    ffmpeg: &Path,
    args: &str,
    input: Option<InputRedirect<'a>>,
    output: Option<OutputRedirect<'a>>,
    log_line: impl FnMut(&str) + Send + 'a,
    log: &'a dyn LogSink,
    progress: impl FnMut(ProgressSample) + Send + 'a,
) -> Result<RunOutcome> {
    let mut execution = FfmpegExecution::new(ffmpeg, args).log_sink(log);
    execution.input = input;
    execution.output = output;
    execution.execute(log_line, progress)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan_all(lines: &[&str]) -> (Vec<String>, Vec<f64>, FfmpegLogState) {
        let mut logged = Vec::new();
        let mut samples = Vec::new();
        let mut scanner = FfmpegLogScanner::new(
            |line| logged.push(line.to_string()),
            |sample| samples.push(sample.fraction()),
        );
        for line in lines {
            scanner.scan(line);
        }
        let state = scanner.state().clone();
        drop(scanner);
        (logged, samples, state)
    }

    #[test]
    fn test_classify_progress_line() {
        let line = "frame=  240 fps= 48 q=28.0 size=    1024kB time=00:00:10.00 bitrate= 838.9kbits/s speed=2.0x";
        assert_eq!(
            classify_line(line),
            LogLine::Progress {
                elapsed: Some(Duration::from_secs(10))
            }
        );
    }

    #[test]
    fn test_classify_duration_line() {
        let line = "  Duration: 00:01:40.00, start: 0.000000, bitrate: 5000 kb/s";
        assert_eq!(
            classify_line(line),
            LogLine::Message {
                text: line,
                duration: Some(Duration::from_secs(100))
            }
        );
        let tag = "      DURATION        : 00:00:30.500000000";
        assert_eq!(
            classify_line(tag),
            LogLine::Message {
                text: tag,
                duration: Some(Duration::from_millis(30_500))
            }
        );
    }

    #[test]
    fn test_no_progress_before_duration() {
        let (logged, samples, _) = scan_all(&[
            "frame=  1 fps=0.0 q=0.0 size=0kB time=00:00:01.00 bitrate=N/A",
            "Input #0, matroska,webm, from 'in.mkv':",
            "  Duration: 00:00:10.00, start: 0.000000, bitrate: 1 kb/s",
            "frame=  2 fps=0.0 q=0.0 size=0kB time=00:00:05.00 bitrate=N/A",
        ]);
        assert_eq!(samples, vec![0.5]);
        assert_eq!(logged.len(), 2);
    }

    #[test]
    fn test_longest_duration_wins() {
        let (_, samples, state) = scan_all(&[
            "  Duration: 00:00:50.00, start: 0.0",
            "  Duration: 00:01:40.00, start: 0.0",
            "  Duration: 00:00:20.00, start: 0.0",
            "frame=1 time=00:00:50.00 bitrate=N/A",
        ]);
        assert_eq!(state.max_duration_secs(), Some(100.0));
        assert_eq!(samples, vec![0.5]);
    }

    #[test]
    fn test_progress_is_clamped() {
        let (_, samples, _) = scan_all(&[
            "  Duration: 00:00:10.00, start: 0.0",
            "frame=1 time=00:00:30.00 bitrate=N/A",
        ]);
        assert_eq!(samples, vec![1.0]);
        assert_eq!(ProgressSample::new(1.0, 0.0).fraction(), 1.0);
        assert_eq!(ProgressSample::new(0.0, 0.0).fraction(), 0.0);
    }

    #[test]
    fn test_malformed_progress_is_dropped() {
        let (logged, samples, _) = scan_all(&[
            "  Duration: 00:00:10.00, start: 0.0",
            "frame=1 time=N/A bitrate=N/A",
            "frame=1 time=-00:00:00.02 bitrate=N/A",
        ]);
        assert!(samples.is_empty());
        assert_eq!(logged.len(), 1);
    }

    #[test]
    fn test_quit_acknowledgement_is_swallowed() {
        let (logged, samples, state) = scan_all(&["[q] command received. Exiting.", "Exiting normally"]);
        assert!(state.quit_acknowledged());
        assert_eq!(logged, vec!["Exiting normally"]);
        assert!(samples.is_empty());
    }
}
