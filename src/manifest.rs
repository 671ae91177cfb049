use std::fmt::Debug;
use std::path::Path;

use anyhow::{Context, Result};
use tokio::fs;
use tracing::{event, instrument, Level};

use crate::error::Error;
use crate::stream::Track;

/// Read a JSON array of tracks
#[instrument(level = "trace")]
pub async fn load<P: AsRef<Path> + Debug>(path: P) -> Result<Vec<Track>> {
    let bytes = fs::read(path.as_ref())
        .await
        .with_context(|| format!("Failed to read manifest {:?}", path.as_ref()))?;
    let tracks: Vec<Track> = serde_json::from_slice(&bytes)
        .with_context(|| format!("Failed to parse manifest {:?}", path.as_ref()))?;

    if tracks.is_empty() {
        return Err(Error::EmptyManifest.into());
    }

    for track in &tracks {
        event!(
            Level::DEBUG,
            "{} track from {:?}: {}",
            track.kind,
            track.input,
            track.stream
        );
    }

    Ok(tracks)
}

/// Write the resolved tracks as pretty JSON
#[instrument(level = "trace", skip(tracks))]
pub async fn save_report<P: AsRef<Path> + Debug>(path: P, tracks: &[Track]) -> Result<()> {
    let json = serde_json::to_vec_pretty(tracks)?;
    fs::write(path.as_ref(), json).await?;
    Ok(())
}
