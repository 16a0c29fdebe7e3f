//! Movie information types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

/// Which sections of movie information to request from ffprobe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSections {
    pub format: bool,
    pub streams: bool,
    pub chapters: bool,
}

impl ProbeSections {
    pub const ALL: Self = Self {
        format: true,
        streams: true,
        chapters: true,
    };

    pub const CHAPTERS: Self = Self {
        format: false,
        streams: false,
        chapters: true,
    };
}

impl Default for ProbeSections {
    fn default() -> Self {
        Self::ALL
    }
}

/// Knobs passed to ffprobe's demuxer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeOptions {
    /// Value for `-analyzeduration`.
    pub analyze_duration: String,
    /// Value for `-probesize`.
    pub probe_size: String,
}

impl Default for ProbeOptions {
    fn default() -> Self {
        Self {
            analyze_duration: "100M".to_string(),
            probe_size: "100M".to_string(),
        }
    }
}

/// Everything ffprobe reported about one file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MovieInformation {
    /// Container level information, if requested.
    pub format: Option<MovieFormat>,
    /// All streams in file order.
    pub streams: Vec<StreamInfo>,
    /// Chapters in file order.
    pub chapters: Vec<ChapterInfo>,
}

/// Container level information.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MovieFormat {
    /// Short demuxer name(s), e.g. `matroska,webm`.
    pub format_name: String,
    pub format_long_name: Option<String>,
    pub duration: Option<Duration>,
    pub size: Option<u64>,
    pub bit_rate: Option<u64>,
    /// Container tags (`title`, `encoder`, ...).
    pub tags: BTreeMap<String, String>,
}

/// Kind of a stream.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
    Data,
    Attachment,
    Unknown,
}

impl StreamKind {
    pub(crate) fn from_codec_type(codec_type: &str) -> Self {
        match codec_type {
            "video" => Self::Video,
            "audio" => Self::Audio,
            "subtitle" => Self::Subtitle,
            "data" => Self::Data,
            "attachment" => Self::Attachment,
            _ => Self::Unknown,
        }
    }

    /// ffmpeg stream specifier letter (`v`, `a`, `s`, `d`, `t`).
    pub fn specifier(&self) -> Option<char> {
        match self {
            Self::Video => Some('v'),
            Self::Audio => Some('a'),
            Self::Subtitle => Some('s'),
            Self::Data => Some('d'),
            Self::Attachment => Some('t'),
            Self::Unknown => None,
        }
    }

    pub fn from_specifier(specifier: char) -> Option<Self> {
        match specifier {
            'v' => Some(Self::Video),
            'a' => Some(Self::Audio),
            's' => Some(Self::Subtitle),
            'd' => Some(Self::Data),
            't' => Some(Self::Attachment),
            _ => None,
        }
    }
}

impl std::fmt::Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StreamKind::Video => write!(f, "video"),
            StreamKind::Audio => write!(f, "audio"),
            StreamKind::Subtitle => write!(f, "subtitle"),
            StreamKind::Data => write!(f, "data"),
            StreamKind::Attachment => write!(f, "attachment"),
            StreamKind::Unknown => write!(f, "unknown"),
        }
    }
}

/// One stream of the file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamInfo {
    /// Index among all streams.
    pub index: u32,
    /// Index among streams of the same kind, as used in `-map 0:a:1`.
    pub index_within_kind: u32,
    pub kind: StreamKind,
    pub codec_name: Option<String>,
    /// Video only.
    pub width: Option<u32>,
    /// Video only.
    pub height: Option<u32>,
    /// Audio only.
    pub channels: Option<u32>,
    /// Audio only, in Hz.
    pub sample_rate: Option<u32>,
    pub tags: StreamTags,
    pub disposition: StreamDisposition,
}

/// Stream tags; the two common ones are lifted out.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamTags {
    pub language: Option<String>,
    pub title: Option<String>,
    /// Every other tag, keyed by its name as reported.
    pub other: BTreeMap<String, String>,
}

/// Disposition flags of a stream.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StreamDisposition {
    pub default: bool,
    pub forced: bool,
    pub dub: bool,
    pub original: bool,
    pub comment: bool,
    pub lyrics: bool,
    pub karaoke: bool,
    pub hearing_impaired: bool,
    pub visual_impaired: bool,
    pub captions: bool,
    pub descriptions: bool,
    pub attached_pic: bool,
}

impl StreamDisposition {
    /// Render as an ffmpeg `-disposition` value that pins `default` and
    /// `forced`, e.g. `+default-forced`.
    pub fn to_ffmpeg_flags(&self) -> String {
        format!(
            "{}default{}forced",
            if self.default { '+' } else { '-' },
            if self.forced { '+' } else { '-' }
        )
    }
}

/// One chapter.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChapterInfo {
    pub id: i64,
    /// Time base as `(numerator, denominator)`.
    pub time_base: (u64, u64),
    /// Start in time-base units.
    pub start: i64,
    /// End in time-base units.
    pub end: i64,
    pub title: String,
}

impl ChapterInfo {
    pub fn start_time(&self) -> Duration {
        units_to_duration(self.start, self.time_base)
    }

    pub fn end_time(&self) -> Duration {
        units_to_duration(self.end, self.time_base)
    }

    pub fn duration(&self) -> Duration {
        self.end_time().saturating_sub(self.start_time())
    }
}

fn units_to_duration(units: i64, (numerator, denominator): (u64, u64)) -> Duration {
    if units <= 0 || denominator == 0 {
        return Duration::ZERO;
    }
    let nanos = units as u128 * numerator as u128 * 1_000_000_000 / denominator as u128;
    Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
}

impl MovieInformation {
    pub fn streams_of(&self, kind: StreamKind) -> impl Iterator<Item = &StreamInfo> {
        self.streams.iter().filter(move |s| s.kind == kind)
    }

    pub fn duration(&self) -> Option<Duration> {
        self.format.as_ref().and_then(|f| f.duration)
    }
}
