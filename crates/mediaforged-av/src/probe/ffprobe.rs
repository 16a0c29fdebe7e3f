//! FFprobe-based movie information.

use super::types::*;
use crate::interprocess::{ChildProcessSpec, CommandExecutor, LogSink, OutputRedirect, RunOutcome, TextEncoding};
use crate::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: Option<FfprobeFormat>,
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    #[serde(default)]
    chapters: Vec<FfprobeChapter>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    format_name: String,
    format_long_name: Option<String>,
    duration: Option<String>,
    size: Option<String>,
    bit_rate: Option<String>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    width: Option<u32>,
    height: Option<u32>,
    channels: Option<u32>,
    sample_rate: Option<String>,
    #[serde(default)]
    disposition: BTreeMap<String, u8>,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeChapter {
    id: i64,
    time_base: String,
    start: i64,
    end: i64,
    #[serde(default)]
    tags: BTreeMap<String, String>,
}

/// Build the ffprobe argument list.
fn ffprobe_args(input_format: Option<&str>, file: &Path, sections: ProbeSections, options: &ProbeOptions) -> Vec<String> {
    let mut args: Vec<String> = vec![
        "-hide_banner".into(),
        "-v".into(),
        "error".into(),
        "-analyzeduration".into(),
        options.analyze_duration.clone(),
        "-probesize".into(),
        options.probe_size.clone(),
        "-print_format".into(),
        "json".into(),
    ];
    if sections.format {
        args.push("-show_format".into());
    }
    if sections.streams {
        args.push("-show_streams".into());
    }
    if sections.chapters {
        args.push("-show_chapters".into());
    }
    if let Some(format) = input_format {
        args.push("-f".into());
        args.push(format.to_string());
    }
    args.push("-i".into());
    args.push(file.to_string_lossy().into_owned());
    args
}

/// Query movie information of `file` by running `ffprobe`.
///
/// `input_format` forces the demuxer (`-f`). The child's stderr is captured
/// and becomes the message of [`Error::ToolFailed`] when ffprobe exits
/// non-zero.
///
/// # Errors
///
/// - [`Error::FileNotFound`] if `file` or `ffprobe` does not exist.
/// - [`Error::ToolFailed`] if ffprobe fails or is cancelled.
/// - [`Error::ParseError`] if its output is not the expected JSON.
pub fn get_movie_information(
    ffprobe: &Path,
    input_format: Option<&str>,
    file: &Path,
    sections: ProbeSections,
    options: &ProbeOptions,
    log: &dyn LogSink,
) -> Result<MovieInformation> {
    if input_format.is_none() && !file.exists() {
        return Err(Error::file_not_found(file));
    }

    let spec = ChildProcessSpec::from_args(ffprobe, ffprobe_args(input_format, file, sections, options))
        .output_encoding(TextEncoding::Utf8);

    let mut json = String::new();
    let mut diagnostics = Vec::new();
    let outcome = CommandExecutor::new(spec)
        .stdout(OutputRedirect::text(|line| {
            json.push_str(line);
            json.push('\n');
        }))
        .stderr(OutputRedirect::text(|line| diagnostics.push(line.to_string())))
        .log_sink(log)
        .execute()?;

    match outcome {
        RunOutcome::Completed(0) => {}
        RunOutcome::Completed(code) => {
            let message = if diagnostics.is_empty() {
                format!("exit code {}", code)
            } else {
                diagnostics.join("\n")
            };
            return Err(Error::tool_failed("ffprobe", message));
        }
        RunOutcome::Cancelled => return Err(Error::tool_failed("ffprobe", "cancelled")),
    }

    parse_ffprobe_json(&json)
}

/// Decode ffprobe's `-print_format json` output.
pub fn parse_ffprobe_json(json: &str) -> Result<MovieInformation> {
    let output: FfprobeOutput =
        serde_json::from_str(json).map_err(|e| Error::parse_error("ffprobe", e.to_string()))?;
    convert_ffprobe_output(output)
}

fn convert_ffprobe_output(output: FfprobeOutput) -> Result<MovieInformation> {
    let format = output.format.map(|format| MovieFormat {
        format_name: format.format_name,
        format_long_name: format.format_long_name,
        duration: format.duration.as_deref().and_then(parse_seconds),
        size: format.size.and_then(|s| s.parse().ok()),
        bit_rate: format.bit_rate.and_then(|s| s.parse().ok()),
        tags: format.tags,
    });

    let mut per_kind: BTreeMap<StreamKind, u32> = BTreeMap::new();
    let streams = output
        .streams
        .into_iter()
        .map(|stream| {
            let kind = StreamKind::from_codec_type(stream.codec_type.as_deref().unwrap_or_default());
            let counter = per_kind.entry(kind).or_default();
            let index_within_kind = *counter;
            *counter += 1;
            StreamInfo {
                index: stream.index,
                index_within_kind,
                kind,
                codec_name: stream.codec_name,
                width: stream.width,
                height: stream.height,
                channels: stream.channels,
                sample_rate: stream.sample_rate.and_then(|s| s.parse().ok()),
                tags: split_tags(stream.tags),
                disposition: convert_disposition(&stream.disposition),
            }
        })
        .collect();

    let chapters = output
        .chapters
        .into_iter()
        .map(|chapter| {
            let time_base = parse_time_base(&chapter.time_base).ok_or_else(|| {
                Error::parse_error("ffprobe", format!("invalid chapter time base: {}", chapter.time_base))
            })?;
            let title = chapter
                .tags
                .into_iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("title"))
                .map(|(_, value)| value)
                .unwrap_or_default();
            Ok(ChapterInfo {
                id: chapter.id,
                time_base,
                start: chapter.start,
                end: chapter.end,
                title,
            })
        })
        .collect::<Result<Vec<_>>>()?;

    Ok(MovieInformation {
        format,
        streams,
        chapters,
    })
}

fn parse_seconds(s: &str) -> Option<Duration> {
    s.parse::<f64>().ok().and_then(|secs| Duration::try_from_secs_f64(secs).ok())
}

/// Parse `num/den`.
fn parse_time_base(s: &str) -> Option<(u64, u64)> {
    let (numerator, denominator) = s.split_once('/')?;
    let numerator = numerator.trim().parse().ok()?;
    let denominator: u64 = denominator.trim().parse().ok()?;
    (denominator != 0).then_some((numerator, denominator))
}

fn split_tags(tags: BTreeMap<String, String>) -> StreamTags {
    let mut result = StreamTags::default();
    for (key, value) in tags {
        if key.eq_ignore_ascii_case("language") {
            result.language = Some(value);
        } else if key.eq_ignore_ascii_case("title") {
            result.title = Some(value);
        } else {
            result.other.insert(key, value);
        }
    }
    result
}

fn convert_disposition(flags: &BTreeMap<String, u8>) -> StreamDisposition {
    let flag = |name: &str| flags.get(name).is_some_and(|v| *v != 0);
    StreamDisposition {
        default: flag("default"),
        forced: flag("forced"),
        dub: flag("dub"),
        original: flag("original"),
        comment: flag("comment"),
        lyrics: flag("lyrics"),
        karaoke: flag("karaoke"),
        hearing_impaired: flag("hearing_impaired"),
        visual_impaired: flag("visual_impaired"),
        captions: flag("captions"),
        descriptions: flag("descriptions"),
        attached_pic: flag("attached_pic"),
    }
}
