use super::check_outcome;
use crate::config::{self, Config};
use anyhow::Result;
use mediaforged_av::interprocess::{FfmpegExecution, ProgressSample};
use mediaforged_av::TracingLogSink;
use std::io::Write;

/// Run ffmpeg with `args`, echoing its log and optionally its progress to
/// stderr. Ctrl-C asks ffmpeg to quit.
pub fn run(config: &Config, args: &[String], show_progress: bool) -> Result<()> {
    let ffmpeg = config::ffmpeg_path(config)?;
    let args = shell_words::join(args);
    tracing::info!("Running {:?} {}", ffmpeg, args);

    let mut meter = ProgressMeter::default();
    let outcome = FfmpegExecution::new(&ffmpeg, args)
        .watchdog_timings(config.execution.watchdog_timings())
        .log_sink(&TracingLogSink)
        .execute(
            |line| eprintln!("{}", line),
            |sample| {
                if show_progress {
                    meter.update(sample);
                }
            },
        )?;
    meter.finish();

    check_outcome("ffmpeg", outcome)
}

/// Prints whole-percent progress, only when it changes.
#[derive(Debug, Default)]
struct ProgressMeter {
    last_percent: Option<u32>,
}

impl ProgressMeter {
    fn update(&mut self, sample: ProgressSample) {
        let percent = percent(sample);
        if self.last_percent != Some(percent) {
            self.last_percent = Some(percent);
            let mut stderr = std::io::stderr();
            let _ = write!(stderr, "\rprogress: {:3}%", percent);
            let _ = stderr.flush();
        }
    }

    fn finish(&self) {
        if self.last_percent.is_some() {
            eprintln!();
        }
    }
}

fn percent(sample: ProgressSample) -> u32 {
    (sample.fraction() * 100.0).floor() as u32
}
