//! # mediaforged-av
//!
//! Child-process plumbing for ffmpeg-family movie tools.
//!
//! This crate provides functionality for:
//! - Running an external program with concurrent stdin/stdout/stderr
//!   redirection and cooperative cancellation ([`interprocess`])
//! - Driving ffmpeg with progress reporting and graceful `q` shutdown
//! - Reading format, stream and chapter information with ffprobe ([`probe`])
//! - Rendering and parsing ffmetadata and OGM chapter lists ([`ffmetadata`])
//! - Turning tag, disposition and chapter title edits into ffmpeg
//!   arguments ([`metadata`])
//!
//! ## Example
//!
//! ```no_run
//! use mediaforged_av::probe::{get_movie_information, ProbeOptions, ProbeSections};
//! use mediaforged_av::interprocess::TracingLogSink;
//! use std::path::Path;
//!
//! let ffprobe = mediaforged_av::require_tool("ffprobe")?;
//! let info = get_movie_information(
//!     &ffprobe,
//!     None,
//!     Path::new("/path/to/movie.mkv"),
//!     ProbeSections::ALL,
//!     &ProbeOptions::default(),
//!     &TracingLogSink,
//! )?;
//! for chapter in &info.chapters {
//!     println!("{:?} {}", chapter.start_time(), chapter.title);
//! }
//! # Ok::<(), mediaforged_av::Error>(())
//! ```

mod error;
pub mod ffmetadata;
pub mod interprocess;
pub mod metadata;
pub mod probe;
pub mod time;
pub mod tools;

// Re-exports
pub use error::{Error, Result};
pub use interprocess::{
    abort_external_commands, execute_command, execute_ffmpeg, CancelAction, CancellationToken, ChildProcessSpec,
    CommandExecutor, InputRedirect, LogSink, OutputRedirect, RunOutcome, Severity, TextEncoding, TracingLogSink,
};
pub use probe::{ChapterInfo, MovieInformation, StreamInfo, StreamKind};
pub use tools::{check_tool_with_arg, check_tools, get_tool_path, require_tool, ToolInfo};
