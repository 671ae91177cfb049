mod cli;

use anyhow::Result;
use clap::Parser;
use tracing::{event, Level};
use tracing_subscriber::EnvFilter;
use transcoder_streams::{manifest, mux, select};

#[tokio::main]
async fn main() -> Result<()> {
    let args = cli::Args::parse();

    // Set up logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if args.log_options.json_logs {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    let options = &args.mux_options;
    let mut tracks = manifest::load(&args.manifest).await?;
    select::normalize_defaults(&mut tracks, options.preferred_language.as_deref());

    if options.dry_run {
        let cmd = mux::ffmpeg_command(&tracks, &options.output);
        println!("{:?}", cmd.as_std());
    } else {
        mux::remux(&tracks, &options.output).await?;
        select::assign_output_paths(&mut tracks, &options.output);
        event!(Level::INFO, "Muxed {} tracks", tracks.len());
    }

    if let Some(report) = &options.report {
        manifest::save_report(report, &tracks).await?;
    }

    Ok(())
}
