use chrono::NaiveDate;
use clap::Parser;
use std::path::PathBuf;

/// Tunle - guess the daily melody one bar at a time
#[derive(Parser)]
#[command(name = "tunle")]
#[command(author, version, about, long_about = None)]
pub(crate) struct Cli {
    /// Replay the melody published on this date (YYYY-MM-DD) instead of today's
    #[arg(short, long)]
    pub date: Option<NaiveDate>,

    /// Directory holding one dated folder per melody (overrides settings)
    #[arg(long)]
    pub melody_root: Option<PathBuf>,

    /// Directory holding instrument, cue and bundled clips (overrides settings)
    #[arg(long)]
    pub asset_root: Option<PathBuf>,

    /// Directory for settings, scores and streaks
    #[arg(long)]
    pub data_dir: Option<PathBuf>,

    /// Player id used when recording scores
    #[arg(short, long)]
    pub user: Option<String>,

    /// Log at debug level
    #[arg(short, long)]
    pub verbose: bool,
}
