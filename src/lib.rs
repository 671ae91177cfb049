//! Stream descriptors shared with a native transcoder.
//!
//! [`StreamDescriptor`] is the owned Rust form of a track description, [`ffi::RawStream`] its C
//! layout. The remaining modules label and mux tracks with ffmpeg from those descriptors.

mod error;
pub mod ffi;
pub mod language;
pub mod manifest;
pub mod mux;
pub mod select;
mod stream;

pub use error::Error;
pub use stream::{StreamDescriptor, StreamKind, Track};
