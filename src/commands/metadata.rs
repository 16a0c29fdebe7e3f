use super::check_outcome;
use crate::config::{self, Config};
use anyhow::{Context, Result};
use mediaforged_av::ffmetadata::render_chapters;
use mediaforged_av::interprocess::{FfmpegExecution, InputRedirect};
use mediaforged_av::metadata::MetadataEdit;
use mediaforged_av::probe::{get_movie_information, ProbeSections};
use mediaforged_av::TracingLogSink;
use std::path::Path;

/// Remux `input` into `output` with `edit` applied. Streams are copied, not
/// re-encoded. With `clear_chapters` the output has no chapters; otherwise
/// the (retitled) chapters are streamed to ffmpeg as ffmetadata.
pub fn run(
    config: &Config,
    input: &Path,
    output: &Path,
    edit: &MetadataEdit,
    clear_chapters: bool,
    force: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    if output.exists() && !force {
        anyhow::bail!("Output file already exists: {:?} (use --force to overwrite)", output);
    }

    let ffprobe = config::ffprobe_path(config)?;
    let info = get_movie_information(
        &ffprobe,
        None,
        input,
        ProbeSections::ALL,
        &config.probe.options(),
        &TracingLogSink,
    )?;

    let edits = edit.ffmpeg_arguments(&info).context("Invalid metadata edit")?;
    let chapters = if clear_chapters {
        None
    } else {
        Some(edit.chapters(&info).context("Invalid chapter title edit")?)
    };

    let args = edit_args(input, output, &edits, chapters.is_some());
    tracing::debug!("ffmpeg {}", args);

    let ffmpeg = config::ffmpeg_path(config)?;
    let mut execution = FfmpegExecution::new(&ffmpeg, args)
        .watchdog_timings(config.execution.watchdog_timings())
        .log_sink(&TracingLogSink);
    if let Some(chapters) = chapters {
        execution = execution.input(InputRedirect::lines(render_chapters(&chapters)));
    }
    let outcome = execution.execute(|line| tracing::info!("{}", line), |_| {})?;

    check_outcome("ffmpeg", outcome)
}

fn edit_args(input: &Path, output: &Path, edits: &[String], with_chapters: bool) -> String {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();

    let mut args: Vec<&str> = vec!["-hide_banner", "-y", "-i", &*input];
    if with_chapters {
        args.extend(["-f", "ffmetadata", "-i", "-"]);
    }
    args.extend(["-c", "copy", "-map", "0"]);
    args.extend(edits.iter().map(String::as_str));
    args.extend(["-map_chapters", if with_chapters { "1" } else { "-1" }]);
    args.push(&*output);
    shell_words::join(args)
}
