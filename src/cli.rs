use std::path::PathBuf;

use clap::Parser;

/// Label and mux media tracks described by a stream manifest
#[derive(Parser, Clone, Debug)]
#[clap(version, about)]
pub struct Args {
    /// JSON manifest listing every input track
    #[clap(value_parser, value_hint = clap::ValueHint::FilePath)]
    pub manifest: PathBuf,

    #[clap(flatten)]
    pub mux_options: MuxOptions,

    #[clap(flatten)]
    pub log_options: LogOptions,
}

#[derive(Parser, Clone, Debug)]
#[clap(help_heading = "MUX OPTIONS")]
pub struct MuxOptions {
    /// Output file.
    /// Requires ffmpeg in $PATH.
    #[clap(short, long, value_parser, value_hint = clap::ValueHint::FilePath)]
    pub output: PathBuf,

    /// Language to prefer when no track of a kind is flagged as default
    #[clap(short, long, value_parser, value_name = "TAG")]
    pub preferred_language: Option<String>,

    /// Write the resolved stream descriptors to this file as JSON
    #[clap(long, value_parser, value_hint = clap::ValueHint::FilePath)]
    pub report: Option<PathBuf>,

    /// Print the ffmpeg command instead of running it
    #[clap(long, action)]
    pub dry_run: bool,
}

#[derive(Parser, Clone, Debug)]
#[clap(help_heading = "LOG OPTIONS")]
pub struct LogOptions {
    /// Emit logs as JSON lines
    #[clap(long, action)]
    pub json_logs: bool,
}
