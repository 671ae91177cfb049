use std::fmt::Display;
use std::path::PathBuf;

use serde::{Deserialize, Deserializer, Serialize};

use crate::language::{self, UNDETERMINED};

/// Description of one audio, video or subtitle stream
///
/// Every text field is owned by the descriptor. Constructors copy their
/// arguments, so callers may reuse or drop their buffers right away.
#[derive(Clone, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default = "undetermined", deserialize_with = "deserialize_language")]
    pub language: String,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub is_default: bool,
    #[serde(default)]
    pub is_forced: bool,
    #[serde(default)]
    pub path: Option<String>,
}

fn undetermined() -> String {
    UNDETERMINED.to_owned()
}

/// Copy a tag, treating an absent or empty one as `"und"`
fn language_or_undetermined(tag: Option<&str>) -> String {
    match tag {
        Some(t) if !t.is_empty() => t.to_owned(),
        _ => undetermined(),
    }
}

fn deserialize_language<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    let tag = Option::<String>::deserialize(deserializer)?;
    Ok(language_or_undetermined(tag.as_deref()))
}

impl Default for StreamDescriptor {
    /// Blank placeholder. Language is `"und"` like any descriptor built
    /// without a tag, flags are off.
    fn default() -> Self {
        Self {
            title: None,
            language: undetermined(),
            codec: None,
            is_default: false,
            is_forced: false,
            path: None,
        }
    }
}

impl StreamDescriptor {
    /// Create a descriptor, substituting `"und"` when no language, or an empty one, is given.
    /// The output path is left unset.
    pub fn new(
        title: Option<&str>,
        language: Option<&str>,
        codec: Option<&str>,
        is_default: bool,
        is_forced: bool,
    ) -> Self {
        Self {
            title: title.map(str::to_owned),
            language: language_or_undetermined(language),
            codec: codec.map(str::to_owned),
            is_default,
            is_forced,
            path: None,
        }
    }

    /// False when the language was left as `"und"`
    pub fn is_language_specified(&self) -> bool {
        !language::is_undetermined(&self.language)
    }

    /// Replace the output path, dropping the previous one
    pub fn set_path(&mut self, path: Option<&str>) {
        self.path = path.map(str::to_owned);
    }
}

impl Display for StreamDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.title {
            Some(t) => write!(f, "{} ({})", t, self.language)?,
            None => write!(f, "{}", self.language)?,
        }
        if let Some(c) = &self.codec {
            write!(f, " [{}]", c)?;
        }
        match (self.is_default, self.is_forced) {
            (true, true) => write!(f, " default, forced"),
            (true, false) => write!(f, " default"),
            (false, true) => write!(f, " forced"),
            (false, false) => Ok(()),
        }
    }
}

/// Type of stream
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamKind {
    Video,
    Audio,
    Subtitle,
}

impl StreamKind {
    /// ffmpeg stream specifier letter
    pub fn specifier(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
            Self::Subtitle => "s",
        }
    }
}

impl Display for StreamKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Video => write!(f, "video"),
            Self::Audio => write!(f, "audio"),
            Self::Subtitle => write!(f, "subtitle"),
        }
    }
}

/// An input file together with the stream it provides
#[derive(Clone, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub struct Track {
    pub kind: StreamKind,
    pub input: PathBuf,
    #[serde(flatten)]
    pub stream: StreamDescriptor,
}
