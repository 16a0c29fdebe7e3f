//! Chapter documents: ffmetadata and OGM style chapter lists.
//!
//! Both formats can be rendered from and parsed into [`ChapterInfo`]. An
//! ffmetadata document is what `ffmpeg -f ffmetadata -i -` reads; a chapter
//! list is the `CHAPTERnn=` / `CHAPTERnnNAME=` pair format used by OGM
//! tooling and most chapter editors.

use crate::probe::ChapterInfo;
use crate::time::{format_time, parse_time_lazy};
use crate::{Error, Result};
use regex::Regex;
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::LazyLock;
use std::time::Duration;

/// Header line every ffmetadata document starts with.
pub const FFMETADATA_HEADER: &str = ";FFMETADATA1";

/// ffmpeg's default chapter time base when `TIMEBASE` is omitted.
const NANOSECOND_TIME_BASE: (u64, u64) = (1, 1_000_000_000);

static CHAPTER_TIME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CHAPTER(?P<index>\d+)=(?P<time>[\d.:]+)$").expect("valid regex"));

static CHAPTER_NAME_LINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^CHAPTER(?P<index>\d+)NAME=(?P<name>.*)$").expect("valid regex"));

/// A textual chapter format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterFormat {
    /// `;FFMETADATA1` with `[CHAPTER]` sections.
    FfMetadata,
    /// `CHAPTER01=00:00:00.000` / `CHAPTER01NAME=Title` pairs.
    ChapterList,
}

impl ChapterFormat {
    /// Guess the format of `text` from its first line.
    pub fn detect(text: &str) -> Self {
        if text.trim_start_matches('\u{feff}').starts_with(FFMETADATA_HEADER) {
            Self::FfMetadata
        } else {
            Self::ChapterList
        }
    }

    pub fn render(&self, chapters: &[ChapterInfo]) -> Vec<String> {
        match self {
            Self::FfMetadata => render_chapters(chapters),
            Self::ChapterList => render_chapter_list(chapters),
        }
    }

    pub fn parse(&self, text: &str, movie_duration: Duration) -> Result<Vec<ChapterInfo>> {
        match self {
            Self::FfMetadata => parse_ffmetadata(text, movie_duration),
            Self::ChapterList => parse_chapter_list(text, movie_duration),
        }
    }
}

/// Render chapters as ffmetadata lines, ready to be fed to
/// `ffmpeg -f ffmetadata -i -`.
pub fn render_chapters(chapters: &[ChapterInfo]) -> Vec<String> {
    let mut lines = vec![FFMETADATA_HEADER.to_string()];
    for chapter in chapters {
        lines.push("[CHAPTER]".to_string());
        lines.push(format!("TIMEBASE={}/{}", chapter.time_base.0, chapter.time_base.1));
        lines.push(format!("START={}", chapter.start));
        lines.push(format!("END={}", chapter.end));
        if !chapter.title.is_empty() {
            lines.push(format!("title={}", escape_value(&chapter.title)));
        }
    }
    lines
}

/// Backslash-escape the characters ffmetadata treats specially.
pub fn escape_value(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        if matches!(c, '=' | ';' | '#' | '\\' | '\n') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Render chapters as a chapter list. Indices start at 0 and are padded to
/// the width of the chapter count.
pub fn render_chapter_list(chapters: &[ChapterInfo]) -> Vec<String> {
    let width = chapters.len().to_string().len();
    chapters
        .iter()
        .enumerate()
        .flat_map(|(index, chapter)| {
            [
                format!("CHAPTER{:0width$}={}", index, format_time(chapter.start_time())),
                format!("CHAPTER{:0width$}NAME={}", index, chapter.title.replace(['\r', '\n'], " ")),
            ]
        })
        .collect()
}

/// Parse a chapter list of `CHAPTERnn=<time>` and `CHAPTERnnNAME=<title>`
/// lines.
///
/// Chapters are ordered by index, and the times must ascend with it. Each
/// chapter ends where the next one starts; the last one ends at
/// `movie_duration`. A chapter without a name line gets an empty title.
///
/// # Errors
///
/// [`Error::InvalidInput`] if a line is malformed, an index appears twice
/// for the same kind of line, a name has no matching time, the times are
/// out of order, or a chapter starts at or after `movie_duration`.
pub fn parse_chapter_list(text: &str, movie_duration: Duration) -> Result<Vec<ChapterInfo>> {
    let mut times: BTreeMap<u32, (Duration, &str)> = BTreeMap::new();
    let mut names: BTreeMap<u32, (String, &str)> = BTreeMap::new();

    for line in text.split(['\r', '\n']).filter(|line| !line.is_empty()) {
        let malformed = || Error::InvalidInput(format!("malformed chapter list line: {:?}", line));

        if let Some(caps) = CHAPTER_TIME_LINE.captures(line) {
            let index: u32 = caps["index"].parse().map_err(|_| malformed())?;
            let start = parse_time_lazy(&caps["time"]).map_err(|_| malformed())?;
            if start >= movie_duration {
                return Err(Error::InvalidInput(format!(
                    "chapter starts at or after the end of the movie: {:?}",
                    line
                )));
            }
            let misordered = times
                .range(..index)
                .find(|(_, (time, _))| *time > start)
                .or_else(|| times.range(index.saturating_add(1)..).find(|(_, (time, _))| *time < start));
            if let Some((_, (_, other))) = misordered {
                return Err(Error::InvalidInput(format!(
                    "chapters are not in ascending order: {:?}, {:?}",
                    line, other
                )));
            }
            match times.entry(index) {
                Entry::Occupied(existing) => {
                    return Err(Error::InvalidInput(format!(
                        "duplicate chapter entry: {:?}, {:?}",
                        line,
                        existing.get().1
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert((start, line));
                }
            }
        } else if let Some(caps) = CHAPTER_NAME_LINE.captures(line) {
            let index: u32 = caps["index"].parse().map_err(|_| malformed())?;
            match names.entry(index) {
                Entry::Occupied(existing) => {
                    return Err(Error::InvalidInput(format!(
                        "duplicate chapter entry: {:?}, {:?}",
                        line,
                        existing.get().1
                    )));
                }
                Entry::Vacant(slot) => {
                    slot.insert((caps["name"].trim().to_string(), line));
                }
            }
        } else {
            return Err(malformed());
        }
    }

    if let Some((_, (_, line))) = names.iter().find(|(index, _)| !times.contains_key(*index)) {
        return Err(Error::InvalidInput(format!("chapter name has no matching time line: {:?}", line)));
    }

    if times.values().next().is_some_and(|(start, _)| !start.is_zero()) {
        tracing::warn!("The first chapter does not start at zero");
    }

    let starts: Vec<(u32, Duration)> = times.iter().map(|(index, (start, _))| (*index, *start)).collect();
    let ends = starts
        .iter()
        .skip(1)
        .map(|(_, start)| *start)
        .chain(std::iter::once(movie_duration));

    Ok(starts
        .iter()
        .zip(ends)
        .enumerate()
        .map(|(id, ((index, start), end))| ChapterInfo {
            id: id as i64,
            time_base: NANOSECOND_TIME_BASE,
            start: start.as_nanos() as i64,
            end: end.as_nanos() as i64,
            title: names.remove(index).map(|(name, _)| name).unwrap_or_default(),
        })
        .collect())
}

/// Parse the chapters of an ffmetadata document.
///
/// Global metadata and `[STREAM]` sections are skipped. Values are
/// unescaped; a chapter without `TIMEBASE` uses ffmpeg's 1/1000000000.
///
/// # Errors
///
/// [`Error::InvalidInput`] if the header is missing, a chapter lacks
/// `START` or `END` or has a malformed value, a chapter ends before it
/// starts, the first chapter does not start at zero, the chapters are out
/// of order or leave gaps, or a chapter starts at or after `movie_duration`.
pub fn parse_ffmetadata(text: &str, movie_duration: Duration) -> Result<Vec<ChapterInfo>> {
    if ChapterFormat::detect(text) != ChapterFormat::FfMetadata {
        return Err(Error::InvalidInput("input is not in ffmetadata format".to_string()));
    }

    let mut chapters: Vec<ChapterInfo> = Vec::new();
    let mut current: Option<PendingChapter> = None;
    for entry in metadata_entries(text) {
        match entry {
            MetadataEntry::Section(name) => {
                if let Some(pending) = current.take() {
                    let number = chapters.len();
                    chapters.push(pending.finish(number)?);
                }
                if name == "CHAPTER" {
                    current = Some(PendingChapter::default());
                }
            }
            MetadataEntry::Value(key, value) => {
                if let Some(pending) = current.as_mut() {
                    pending.set(&key, value, chapters.len())?;
                }
            }
        }
    }
    if let Some(pending) = current.take() {
        let number = chapters.len();
        chapters.push(pending.finish(number)?);
    }

    for chapter in &chapters {
        if chapter.start > chapter.end {
            return Err(Error::InvalidInput(format!(
                "chapter ends before it starts: START={}, END={}",
                chapter.start, chapter.end
            )));
        }
        if chapter.start_time() >= movie_duration {
            return Err(Error::InvalidInput(format!(
                "chapter starts at or after the end of the movie: START={}",
                chapter.start
            )));
        }
    }
    if chapters.first().is_some_and(|chapter| !chapter.start_time().is_zero()) {
        return Err(Error::InvalidInput("the first chapter does not start at zero".to_string()));
    }
    for pair in chapters.windows(2) {
        let (chapter, next) = (&pair[0], &pair[1]);
        if chapter.start_time() > next.start_time() {
            return Err(Error::InvalidInput(format!(
                "chapters are not in ascending order: (START={}, END={}), (START={}, END={})",
                chapter.start, chapter.end, next.start, next.end
            )));
        }
        if chapter.end_time() != next.start_time() {
            return Err(Error::InvalidInput(format!(
                "chapter end does not meet the next chapter start: (START={}, END={}), (START={}, END={})",
                chapter.start, chapter.end, next.start, next.end
            )));
        }
    }

    Ok(chapters)
}

#[derive(Debug, PartialEq, Eq)]
enum MetadataEntry {
    /// `[NAME]`
    Section(String),
    /// `key=value`, both unescaped.
    Value(String, String),
}

/// Split an ffmetadata document into unescaped entries. Comment lines start
/// with `;` or `#`; a backslash escapes the next character, newlines
/// included.
fn metadata_entries(text: &str) -> Vec<MetadataEntry> {
    let mut entries = Vec::new();
    let mut key = String::new();
    let mut value: Option<String> = None;
    let mut at_line_start = true;
    let mut chars = text.trim_start_matches('\u{feff}').chars();

    let mut finish = |key: &mut String, value: &mut Option<String>| {
        match value.take() {
            Some(value) => entries.push(MetadataEntry::Value(std::mem::take(key), value)),
            None => {
                let line = std::mem::take(key);
                if let Some(name) = line.strip_prefix('[').and_then(|l| l.strip_suffix(']')) {
                    entries.push(MetadataEntry::Section(name.to_string()));
                }
            }
        }
    };

    while let Some(c) = chars.next() {
        if at_line_start && matches!(c, ';' | '#') {
            for skipped in chars.by_ref() {
                if skipped == '\n' {
                    break;
                }
            }
            continue;
        }
        at_line_start = false;
        match c {
            '\\' => {
                if let Some(escaped) = chars.next() {
                    push_char(&mut key, &mut value, escaped);
                }
            }
            '\n' => {
                finish(&mut key, &mut value);
                at_line_start = true;
            }
            '\r' => {}
            '=' if value.is_none() => value = Some(String::new()),
            c => push_char(&mut key, &mut value, c),
        }
    }
    finish(&mut key, &mut value);
    entries
}

fn push_char(key: &mut String, value: &mut Option<String>, c: char) {
    match value {
        Some(value) => value.push(c),
        None => key.push(c),
    }
}

#[derive(Default)]
struct PendingChapter {
    time_base: Option<(u64, u64)>,
    start: Option<i64>,
    end: Option<i64>,
    title: String,
}

impl PendingChapter {
    fn set(&mut self, key: &str, value: String, number: usize) -> Result<()> {
        let invalid = || Error::InvalidInput(format!("chapter {}: invalid {}: {:?}", number, key, value));
        match key {
            "TIMEBASE" => {
                let (numerator, denominator) = value.split_once('/').ok_or_else(invalid)?;
                let numerator: u64 = numerator.trim().parse().map_err(|_| invalid())?;
                let denominator: u64 = denominator.trim().parse().map_err(|_| invalid())?;
                if numerator == 0 || denominator == 0 {
                    return Err(invalid());
                }
                self.time_base = Some((numerator, denominator));
            }
            "START" => self.start = Some(value.trim().parse().map_err(|_| invalid())?),
            "END" => self.end = Some(value.trim().parse().map_err(|_| invalid())?),
            _ if key.eq_ignore_ascii_case("title") => self.title = value,
            _ => {}
        }
        Ok(())
    }

    fn finish(self, number: usize) -> Result<ChapterInfo> {
        let missing = |key: &str| Error::InvalidInput(format!("chapter {}: {} is missing", number, key));
        Ok(ChapterInfo {
            id: number as i64,
            time_base: self.time_base.unwrap_or(NANOSECOND_TIME_BASE),
            start: self.start.ok_or_else(|| missing("START"))?,
            end: self.end.ok_or_else(|| missing("END"))?,
            title: self.title,
        })
    }
}
