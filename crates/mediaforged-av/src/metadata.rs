//! Metadata edits applied by remuxing with ffmpeg.
//!
//! A [`MetadataEdit`] describes changes to container tags, per-stream tags,
//! the `default`/`forced` dispositions and chapter titles. Given the
//! [`MovieInformation`] of the source, it produces the `-metadata`,
//! `-metadata:s:<spec>` and `-disposition:<spec>` arguments for a
//! `-c copy -map 0` run, plus the edited chapter list to feed as ffmetadata.

use crate::probe::{ChapterInfo, MovieInformation, StreamInfo, StreamKind};
use crate::{Error, Result};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

/// Tags the muxer writes itself.
const MUXER_OWNED_TAGS: [&str; 2] = ["encoder", "duration"];

fn is_muxer_owned(name: &str) -> bool {
    MUXER_OWNED_TAGS.iter().any(|owned| owned.eq_ignore_ascii_case(name))
}

/// A stream addressed as `<kind>:<index within kind>`, e.g. `a:1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StreamSelector {
    pub kind: StreamKind,
    pub index: u32,
}

impl StreamSelector {
    pub fn matches(&self, stream: &StreamInfo) -> bool {
        stream.kind == self.kind && stream.index_within_kind == self.index
    }
}

impl fmt::Display for StreamSelector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind.specifier() {
            Some(specifier) => write!(f, "{}:{}", specifier, self.index),
            None => write!(f, "{}:{}", self.kind, self.index),
        }
    }
}

impl FromStr for StreamSelector {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("stream must look like `a:0` (kinds v, a, s, d, t): {:?}", s));
        let (kind, index) = s.split_once(':').ok_or_else(invalid)?;
        let mut chars = kind.chars();
        let kind = match (chars.next(), chars.next()) {
            (Some(c), None) => StreamKind::from_specifier(c).ok_or_else(invalid)?,
            _ => return Err(invalid()),
        };
        let index = index.parse().map_err(|_| invalid())?;
        Ok(Self { kind, index })
    }
}

/// Set one stream tag: `<stream>:<name>=<value>`. An empty value removes
/// the tag.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagEdit {
    pub stream: StreamSelector,
    pub name: String,
    pub value: String,
}

impl FromStr for TagEdit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("tag must look like `a:0:language=jpn`: {:?}", s));
        let (target, value) = s.split_once('=').ok_or_else(invalid)?;
        let (stream, name) = target.rsplit_once(':').ok_or_else(invalid)?;
        if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
            return Err(invalid());
        }
        Ok(Self {
            stream: stream.parse()?,
            name: name.to_string(),
            value: value.to_string(),
        })
    }
}

/// Change the `default` and/or `forced` flag of one stream:
/// `<stream>:+default-forced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispositionEdit {
    pub stream: StreamSelector,
    pub default: Option<bool>,
    pub forced: Option<bool>,
}

impl FromStr for DispositionEdit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("disposition must look like `s:0:+default-forced`: {:?}", s));
        let (stream, flags) = s.rsplit_once(':').ok_or_else(invalid)?;
        let mut edit = Self {
            stream: stream.parse()?,
            default: None,
            forced: None,
        };

        let mut rest = flags;
        if rest.is_empty() {
            return Err(invalid());
        }
        while let Some(sign) = rest.chars().next() {
            let value = match sign {
                '+' => true,
                '-' => false,
                _ => return Err(invalid()),
            };
            let name_end = rest[1..].find(['+', '-']).map_or(rest.len(), |i| i + 1);
            match &rest[1..name_end] {
                "default" => edit.default = Some(value),
                "forced" => edit.forced = Some(value),
                _ => return Err(invalid()),
            }
            rest = &rest[name_end..];
        }
        Ok(edit)
    }
}

/// Retitle one chapter: `<index>=<title>`, index counted from 0.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterTitleEdit {
    pub index: usize,
    pub title: String,
}

impl FromStr for ChapterTitleEdit {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || Error::InvalidInput(format!("chapter title must look like `0=Prologue`: {:?}", s));
        let (index, title) = s.split_once('=').ok_or_else(invalid)?;
        Ok(Self {
            index: index.trim().parse().map_err(|_| invalid())?,
            title: title.to_string(),
        })
    }
}

/// Everything to change in one remux.
#[derive(Debug, Clone, Default)]
pub struct MetadataEdit {
    pub tags: Vec<TagEdit>,
    pub dispositions: Vec<DispositionEdit>,
    pub chapter_titles: Vec<ChapterTitleEdit>,
    /// Drop container tags and stream tags other than `title`/`language`.
    pub clear_metadata: bool,
    /// Drop every tag, `title`/`language` and chapter titles included.
    pub clear_all_metadata: bool,
    pub clear_chapter_titles: bool,
    /// Turn `default` and `forced` off on every stream before applying
    /// [`MetadataEdit::dispositions`].
    pub clear_disposition: bool,
}

impl MetadataEdit {
    fn clears_other_tags(&self) -> bool {
        self.clear_metadata || self.clear_all_metadata
    }

    /// Container and stream arguments for ffmpeg, in stream order.
    ///
    /// Only tags whose value changes are emitted; `default` and `forced`
    /// are pinned on every stream because ffmpeg otherwise marks the first
    /// stream of each kind as default.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if a tag or disposition edit names a stream
    /// the movie does not have.
    pub fn ffmpeg_arguments(&self, info: &MovieInformation) -> Result<Vec<String>> {
        let selectors = self
            .tags
            .iter()
            .map(|edit| edit.stream)
            .chain(self.dispositions.iter().map(|edit| edit.stream));
        for selector in selectors {
            if !info.streams.iter().any(|stream| selector.matches(stream)) {
                return Err(Error::InvalidInput(format!("the movie has no stream {}", selector)));
            }
        }

        let mut args = Vec::new();

        if self.clears_other_tags() {
            if let Some(format) = &info.format {
                for (name, value) in &format.tags {
                    if !is_muxer_owned(name) && !value.is_empty() {
                        args.push("-metadata".to_string());
                        args.push(format!("{}=", name));
                    }
                }
            }
        }

        for stream in &info.streams {
            let Some(specifier) = stream.kind.specifier() else {
                continue;
            };
            let target = format!("{}:{}", specifier, stream.index_within_kind);

            let original = stream_tags(stream);
            for (name, value) in self.edited_tags(stream, &original) {
                if original.get(&name).map(String::as_str).unwrap_or("") != value {
                    args.push(format!("-metadata:s:{}", target));
                    args.push(format!("{}={}", name, value));
                }
            }

            let mut disposition = stream.disposition;
            if self.clear_disposition {
                disposition.default = false;
                disposition.forced = false;
            }
            for edit in self.dispositions.iter().filter(|edit| edit.stream.matches(stream)) {
                if let Some(default) = edit.default {
                    disposition.default = default;
                }
                if let Some(forced) = edit.forced {
                    disposition.forced = forced;
                }
            }
            args.push(format!("-disposition:{}", target));
            args.push(disposition.to_ffmpeg_flags());
        }

        Ok(args)
    }

    fn edited_tags(&self, stream: &StreamInfo, original: &BTreeMap<String, String>) -> BTreeMap<String, String> {
        let mut tags = original.clone();
        for (name, value) in tags.iter_mut() {
            let basic = name.eq_ignore_ascii_case("title") || name.eq_ignore_ascii_case("language");
            if (basic && self.clear_all_metadata) || (!basic && self.clears_other_tags()) {
                value.clear();
            }
        }
        for edit in self.tags.iter().filter(|edit| edit.stream.matches(stream)) {
            let key = tags
                .keys()
                .find(|key| key.eq_ignore_ascii_case(&edit.name))
                .cloned()
                .unwrap_or_else(|| edit.name.clone());
            tags.insert(key, edit.value.clone());
        }
        tags.retain(|name, _| !is_muxer_owned(name));
        tags
    }

    /// The source chapters with title edits applied.
    ///
    /// # Errors
    ///
    /// [`Error::InvalidInput`] if a title edit names a chapter the movie
    /// does not have.
    pub fn chapters(&self, info: &MovieInformation) -> Result<Vec<ChapterInfo>> {
        let mut chapters = info.chapters.clone();
        if self.clear_chapter_titles || self.clear_all_metadata {
            for chapter in &mut chapters {
                chapter.title.clear();
            }
        }
        let count = chapters.len();
        for edit in &self.chapter_titles {
            let chapter = chapters.get_mut(edit.index).ok_or_else(|| {
                Error::InvalidInput(format!("the movie has no chapter {} ({} chapters)", edit.index, count))
            })?;
            chapter.title = edit.title.clone();
        }
        Ok(chapters)
    }
}

fn stream_tags(stream: &StreamInfo) -> BTreeMap<String, String> {
    let mut tags = stream.tags.other.clone();
    if let Some(language) = &stream.tags.language {
        tags.insert("language".to_string(), language.clone());
    }
    if let Some(title) = &stream.tags.title {
        tags.insert("title".to_string(), title.clone());
    }
    tags
}
