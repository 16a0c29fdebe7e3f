//! Movie information via ffprobe.
//!
//! ffprobe runs through the interprocess executor with its JSON report
//! captured from stdout; the report is decoded into [`MovieInformation`].

mod ffprobe;
mod types;

pub use ffprobe::{get_movie_information, parse_ffprobe_json};
pub use types::*;
