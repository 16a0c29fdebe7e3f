use clap::{Parser, Subcommand, ValueEnum};
use mediaforged_av::ffmetadata::ChapterFormat;
use mediaforged_av::metadata::{ChapterTitleEdit, DispositionEdit, MetadataEdit, TagEdit};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "mediaforged")]
#[command(author, version, about = "Drive ffmpeg and ffprobe with progress, chapters and graceful cancellation")]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Probe a movie file and display its format, streams and chapters
    Probe {
        /// File to probe
        #[arg(required = true)]
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,

        /// Force the input format (ffprobe -f)
        #[arg(long)]
        input_format: Option<String>,
    },

    /// Run ffmpeg with the given arguments
    Convert {
        /// Print progress percentages
        #[arg(long)]
        progress: bool,

        /// Arguments passed to ffmpeg, after `--`
        #[arg(required = true, trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Export or replace chapters
    #[command(subcommand)]
    Chapters(ChaptersCommand),

    /// Copy a movie, editing stream tags, dispositions and chapter titles
    Metadata(MetadataArgs),

    /// Run any program, copying its stdout; Ctrl-C kills it
    Exec {
        /// Program to run
        program: PathBuf,

        /// Arguments for the program
        #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
        args: Vec<String>,
    },

    /// Check that required external tools are available
    CheckTools,

    /// Validate configuration file
    Validate {
        /// Config file to validate (uses default if not specified)
        config: Option<PathBuf>,
    },
}

#[derive(Subcommand)]
pub enum ChaptersCommand {
    /// Print the chapters of a movie
    Export {
        /// Movie file
        file: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value_t = ChapterFormatArg::Ffmetadata)]
        format: ChapterFormatArg,
    },

    /// Copy a movie, replacing its chapters with a chapter list
    Import {
        /// Source movie
        input: PathBuf,

        /// Chapter document: ffmetadata or `CHAPTERnn=` / `CHAPTERnnNAME=` lines
        chapters: PathBuf,

        /// Format of the chapter document (detected when omitted)
        #[arg(long, value_enum)]
        format: Option<ChapterFormatArg>,

        /// Destination movie
        output: PathBuf,

        /// Overwrite the destination if it exists
        #[arg(long)]
        force: bool,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ChapterFormatArg {
    /// `;FFMETADATA1` with `[CHAPTER]` sections
    Ffmetadata,
    /// `CHAPTER01=00:00:00.000` and `CHAPTER01NAME=...` pairs
    ChapterList,
}

impl From<ChapterFormatArg> for ChapterFormat {
    fn from(format: ChapterFormatArg) -> Self {
        match format {
            ChapterFormatArg::Ffmetadata => ChapterFormat::FfMetadata,
            ChapterFormatArg::ChapterList => ChapterFormat::ChapterList,
        }
    }
}

#[derive(clap::Args)]
pub struct MetadataArgs {
    /// Source movie
    pub input: PathBuf,

    /// Destination movie
    pub output: PathBuf,

    /// Set a stream tag, e.g. `a:0:language=jpn`; an empty value removes it
    #[arg(long = "tag", value_name = "STREAM:NAME=VALUE")]
    pub tags: Vec<TagEdit>,

    /// Set default/forced flags, e.g. `s:0:+default-forced`
    #[arg(long = "disposition", value_name = "STREAM:FLAGS", allow_hyphen_values = true)]
    pub dispositions: Vec<DispositionEdit>,

    /// Retitle a chapter by its index from 0, e.g. `1=Opening theme`
    #[arg(long = "chapter-title", value_name = "INDEX=TITLE")]
    pub chapter_titles: Vec<ChapterTitleEdit>,

    /// Remove container tags and stream tags other than title and language
    #[arg(long)]
    pub clear_metadata: bool,

    /// Remove every tag, including stream titles, languages and chapter titles
    #[arg(long)]
    pub clear_all_metadata: bool,

    /// Remove chapter titles
    #[arg(long)]
    pub clear_chapter_titles: bool,

    /// Turn default and forced off on every stream before applying --disposition
    #[arg(long)]
    pub clear_disposition: bool,

    /// Drop all chapters
    #[arg(long)]
    pub clear_chapters: bool,

    /// Overwrite the destination if it exists
    #[arg(long)]
    pub force: bool,
}

impl MetadataArgs {
    pub fn edit(&self) -> MetadataEdit {
        MetadataEdit {
            tags: self.tags.clone(),
            dispositions: self.dispositions.clone(),
            chapter_titles: self.chapter_titles.clone(),
            clear_metadata: self.clear_metadata,
            clear_all_metadata: self.clear_all_metadata,
            clear_chapter_titles: self.clear_chapter_titles,
            clear_disposition: self.clear_disposition,
        }
    }
}
