use std::process::ExitStatus;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("{field} contains an interior nul byte")]
    InteriorNul { field: &'static str },

    #[error("{field} is not valid UTF-8")]
    InvalidUtf8 { field: &'static str },

    #[error("unknown language: {0}")]
    UnknownLanguage(String),

    #[error("ffmpeg command failed with {0}")]
    Ffmpeg(ExitStatus),

    #[error("manifest contains no tracks")]
    EmptyManifest,
}
