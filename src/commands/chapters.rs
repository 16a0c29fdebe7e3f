use super::check_outcome;
use crate::config::{self, Config};
use anyhow::{Context, Result};
use mediaforged_av::ffmetadata::{render_chapters, ChapterFormat};
use mediaforged_av::interprocess::{FfmpegExecution, InputRedirect};
use mediaforged_av::probe::{get_movie_information, ProbeSections};
use mediaforged_av::TracingLogSink;
use std::path::Path;

/// Print the chapters of `file` in the given format.
pub fn export(config: &Config, file: &Path, format: ChapterFormat) -> Result<()> {
    if !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let ffprobe = config::ffprobe_path(config)?;
    let info = get_movie_information(
        &ffprobe,
        None,
        file,
        ProbeSections::CHAPTERS,
        &config.probe.options(),
        &TracingLogSink,
    )?;

    for line in format.render(&info.chapters) {
        println!("{}", line);
    }
    Ok(())
}

/// Copy `input` to `output` with its chapters replaced by the entries of
/// `chapter_list`. Without an explicit `format` it is detected from the
/// document's first line. The chapters reach ffmpeg as ffmetadata on stdin.
pub fn import(
    config: &Config,
    input: &Path,
    chapter_list: &Path,
    format: Option<ChapterFormat>,
    output: &Path,
    force: bool,
) -> Result<()> {
    if !input.exists() {
        anyhow::bail!("Input file does not exist: {:?}", input);
    }
    if output.exists() && !force {
        anyhow::bail!("Output file already exists: {:?} (use --force to overwrite)", output);
    }

    let text = std::fs::read_to_string(chapter_list)
        .with_context(|| format!("Failed to read chapter list: {:?}", chapter_list))?;

    let ffprobe = config::ffprobe_path(config)?;
    let info = get_movie_information(
        &ffprobe,
        None,
        input,
        ProbeSections {
            format: true,
            streams: false,
            chapters: false,
        },
        &config.probe.options(),
        &TracingLogSink,
    )?;
    let duration = info
        .duration()
        .with_context(|| format!("Duration of {:?} is unknown", input))?;

    let format = format.unwrap_or_else(|| ChapterFormat::detect(&text));
    let chapters = format
        .parse(&text, duration)
        .with_context(|| format!("Invalid chapter list: {:?}", chapter_list))?;
    tracing::info!("Writing {} chapters to {:?}", chapters.len(), output);

    let ffmpeg = config::ffmpeg_path(config)?;
    let outcome = FfmpegExecution::new(&ffmpeg, import_args(input, output))
        .input(InputRedirect::lines(render_chapters(&chapters)))
        .watchdog_timings(config.execution.watchdog_timings())
        .log_sink(&TracingLogSink)
        .execute(|line| tracing::info!("{}", line), |_| {})?;

    check_outcome("ffmpeg", outcome)
}

fn import_args(input: &Path, output: &Path) -> String {
    let input = input.to_string_lossy();
    let output = output.to_string_lossy();
    shell_words::join([
        "-hide_banner",
        "-y",
        "-i",
        &*input,
        "-f",
        "ffmetadata",
        "-i",
        "-",
        "-map",
        "0",
        "-map_chapters",
        "1",
        "-c",
        "copy",
        &*output,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_import_args_quote_paths() {
        let args = import_args(Path::new("/movies/my movie.mkv"), Path::new("/out/new.mkv"));
        assert_eq!(
            args,
            "-hide_banner -y -i '/movies/my movie.mkv' -f ffmetadata -i - -map 0 -map_chapters 1 -c copy /out/new.mkv"
        );
        assert_eq!(shell_words::split(&args).unwrap()[3], "/movies/my movie.mkv");
    }
}
