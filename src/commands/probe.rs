use crate::config::{self, Config};
use anyhow::Result;
use mediaforged_av::probe::{get_movie_information, MovieInformation, ProbeSections, StreamInfo, StreamKind};
use mediaforged_av::time::format_time;
use mediaforged_av::TracingLogSink;
use std::path::Path;

pub fn run(config: &Config, file: &Path, json: bool, input_format: Option<&str>) -> Result<()> {
    if input_format.is_none() && !file.exists() {
        anyhow::bail!("File does not exist: {:?}", file);
    }

    let ffprobe = config::ffprobe_path(config)?;
    let info = get_movie_information(
        &ffprobe,
        input_format,
        file,
        ProbeSections::ALL,
        &config.probe.options(),
        &TracingLogSink,
    )?;

    if json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        print!("{}", describe(file, &info));
    }

    Ok(())
}

/// Human-readable report of one movie.
pub fn describe(file: &Path, info: &MovieInformation) -> String {
    let mut out = String::new();
    out.push_str(&format!("File: {}\n", file.display()));
    if let Some(ref format) = info.format {
        out.push_str(&format!("Container: {}\n", format.format_name));
        if let Some(size) = format.size {
            out.push_str(&format!("Size: {} bytes\n", size));
        }
        if let Some(duration) = format.duration {
            out.push_str(&format!("Duration: {}\n", format_time(duration)));
        }
        if let Some(title) = format.tags.get("title") {
            out.push_str(&format!("Title: {}\n", title));
        }
    }

    for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
        let streams: Vec<&StreamInfo> = info.streams_of(kind).collect();
        if streams.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{} streams: {}\n", kind, streams.len()));
        for stream in streams {
            out.push_str(&format!("  [{}] {}", stream.index_within_kind, stream.codec_name.as_deref().unwrap_or("?")));
            match kind {
                StreamKind::Video => {
                    if let (Some(w), Some(h)) = (stream.width, stream.height) {
                        out.push_str(&format!(" {}x{}", w, h));
                    }
                }
                StreamKind::Audio => {
                    if let Some(channels) = stream.channels {
                        out.push_str(&format!(" {}ch", channels));
                    }
                }
                _ => {}
            }
            if let Some(ref lang) = stream.tags.language {
                out.push_str(&format!(" ({})", lang));
            }
            if let Some(ref title) = stream.tags.title {
                out.push_str(&format!(" \"{}\"", title));
            }
            if stream.disposition.default {
                out.push_str(" [default]");
            }
            if stream.disposition.forced {
                out.push_str(" [forced]");
            }
            out.push('\n');
        }
    }

    if !info.chapters.is_empty() {
        out.push_str(&format!("\nChapters: {}\n", info.chapters.len()));
        for chapter in &info.chapters {
            out.push_str(&format!(
                "  {} - {} {}\n",
                format_time(chapter.start_time()),
                format_time(chapter.end_time()),
                chapter.title
            ));
        }
    }

    out
}
