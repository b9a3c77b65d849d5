use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::types::{parse_tags, RefineRequest, Stage, ToolFamily, DEFAULT_REJECTION_REASON};

#[derive(Parser)]
#[command(name = "music-tracker")]
#[command(about = "Find, catalog and curate DAW projects scattered across your drives")]
#[command(version)]
pub struct Cli {
    /// Catalog database file (overrides config)
    #[arg(long, global = true, env = "MUSIC_TRACKER_DB")]
    pub db: Option<PathBuf>,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Discover projects under a directory and add new ones as raw entries
    Add(AddArgs),

    /// List projects in a stage
    List(ListArgs),

    /// Show one project by id or title
    Show(LookupArgs),

    /// Move a raw project to refined, with metadata
    Refine(RefineArgs),

    /// Move a raw project to rejected
    Reject(RejectArgs),

    /// Walk through raw projects one at a time
    Review(ReviewArgs),

    /// Open a project in its DAW
    Open(LookupArgs),

    /// Counts per stage and per DAW
    Stats,

    /// Text analytics over the refined catalog
    Analytics,

    /// Print the effective configuration
    Config,

    /// Print version information
    Version,
}

#[derive(Args)]
pub struct AddArgs {
    /// Directory to scan
    pub path: PathBuf,

    /// Report what would be added without writing to the catalog
    #[arg(long)]
    pub dry_run: bool,

    /// Follow symbolic links while scanning
    #[arg(long)]
    pub follow_symlinks: bool,

    /// Maximum directory depth below the scan root
    #[arg(long)]
    pub max_depth: Option<usize>,
}

#[derive(Args)]
pub struct ListArgs {
    /// raw, refined or rejected
    #[arg(short, long, default_value = "raw")]
    pub stage: Stage,

    /// Only this DAW (fl, logic, s1, bitwig)
    #[arg(short, long)]
    pub daw: Option<ToolFamily>,

    /// Maximum rows (defaults to output.page_size)
    #[arg(short, long)]
    pub limit: Option<usize>,

    #[arg(long, default_value_t = 0)]
    pub offset: usize,
}

#[derive(Args)]
pub struct LookupArgs {
    /// Numeric id or part of a title
    pub target: String,
}

#[derive(Args)]
pub struct RefineArgs {
    pub id: i64,

    /// Replace the discovered title
    #[arg(long)]
    pub title: Option<String>,

    #[arg(long)]
    pub description: Option<String>,

    #[arg(long)]
    pub genre: Option<String>,

    #[arg(long)]
    pub bpm: Option<u32>,

    #[arg(long)]
    pub key: Option<String>,

    /// Defaults to the year the project was created
    #[arg(long)]
    pub year: Option<i32>,

    /// Defaults to "complete"
    #[arg(long)]
    pub status: Option<String>,

    /// 1-10
    #[arg(long)]
    pub rating: Option<u8>,

    /// Comma-separated
    #[arg(long)]
    pub tags: Option<String>,

    #[arg(long)]
    pub collaboration: Option<String>,
}

impl RefineArgs {
    pub fn to_request(&self) -> RefineRequest {
        RefineRequest {
            title: self.title.clone(),
            description: self.description.clone(),
            genre: self.genre.clone(),
            bpm: self.bpm,
            key: self.key.clone(),
            year: self.year,
            status: self.status.clone(),
            rating: self.rating,
            tags: self.tags.as_deref().map(parse_tags).unwrap_or_default(),
            collaboration: self.collaboration.clone(),
        }
    }
}

#[derive(Args)]
pub struct RejectArgs {
    pub id: i64,

    #[arg(long, default_value = DEFAULT_REJECTION_REASON)]
    pub reason: String,
}

#[derive(Args)]
pub struct ReviewArgs {
    /// Review at most this many raw projects
    #[arg(short, long)]
    pub limit: Option<usize>,
}
