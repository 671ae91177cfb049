use std::collections::HashMap;
use std::fmt::Debug;
use std::path::Path;

use anyhow::Result;
use tokio::process;
use tracing::{event, instrument, Level};

use crate::error::Error;
use crate::language::to_iso639;
use crate::stream::{StreamDescriptor, Track};

/// Mux tracks into a single file with ffmpeg, labelling every stream from its descriptor
#[instrument(level = "trace", skip(tracks))]
pub async fn remux<P: AsRef<Path> + Debug>(tracks: &[Track], output_path: P) -> Result<()> {
    let mut cmd = ffmpeg_command(tracks, &output_path);

    event!(Level::INFO, "ffmpeg mux to {:?}", output_path.as_ref());
    event!(Level::TRACE, "{:?}", cmd);
    let output = cmd.output().await?;
    event!(
        Level::TRACE,
        "ffmpeg stdout: {:#?}",
        String::from_utf8_lossy(&output.stdout)
    );
    event!(
        Level::TRACE,
        "ffmpeg stderr: {:#?}",
        String::from_utf8_lossy(&output.stderr)
    );

    // Check ffmpeg exit status
    if !output.status.success() {
        return Err(Error::Ffmpeg(output.status).into());
    }

    Ok(())
}

/// Build the ffmpeg invocation muxing every track into `output_path`
pub fn ffmpeg_command(tracks: &[Track], output_path: impl AsRef<Path>) -> process::Command {
    let mut cmd = process::Command::new("ffmpeg");
    cmd.arg("-y");

    // Set ffmpeg input files
    for track in tracks {
        cmd.arg("-i").arg(&track.input);
    }

    // Map first stream of every input
    for i in 0..tracks.len() {
        cmd.arg("-map").arg(format!("{}:0", i));
    }

    // Add metadata
    cmd.args(metadata_args(tracks));

    // Set remaining ffmpeg args
    cmd.arg("-c:v")
        .arg("copy")
        .arg("-c:a")
        .arg("copy")
        .arg("-c:s")
        .arg("mov_text")
        .arg("-dn")
        .arg("-movflags")
        .arg("+faststart")
        .arg(output_path.as_ref())
        .kill_on_drop(true);

    cmd
}

/// Stream metadata and disposition arguments for every track
///
/// Streams are numbered per kind in input order. A language left as `"und"`, or one that cannot be
/// normalized, is not written so ffmpeg keeps its own default.
pub fn metadata_args(tracks: &[Track]) -> Vec<String> {
    let mut args = Vec::new();
    let mut counts = HashMap::new();

    for track in tracks {
        let count = counts.entry(track.kind).or_insert(0_usize);
        let spec = format!("{}:{}", track.kind.specifier(), count);
        *count += 1;

        add_stream_args(&mut args, &spec, &track.stream);
    }

    args
}

fn add_stream_args(args: &mut Vec<String>, spec: &str, stream: &StreamDescriptor) {
    // Language
    if stream.is_language_specified() {
        match to_iso639(&stream.language) {
            Ok(l) => {
                args.push(format!("-metadata:s:{}", spec));
                args.push(format!("language={}", l));
            }
            Err(e) => event!(Level::WARN, "Skipping language of stream {}: {}", spec, e),
        }
    }

    // Name
    if let Some(n) = &stream.title {
        args.push(format!("-metadata:s:{}", spec));
        args.push(format!("title={}", n));
        args.push(format!("-metadata:s:{}", spec));
        args.push(format!("handler={}", n));
    }

    // Flags
    let disposition = match (stream.is_default, stream.is_forced) {
        (true, true) => "default+forced",
        (true, false) => "default",
        (false, true) => "forced",
        (false, false) => "0",
    };
    args.push(format!("-disposition:{}", spec));
    args.push(disposition.to_owned());
}
