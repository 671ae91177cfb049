use std::fmt::Debug;

use isolang::Language;
use oxilangtag::LanguageTag;
use tracing::instrument;

use crate::error::Error;

/// ISO 639 code for "language undetermined", stored when no tag is supplied
pub const UNDETERMINED: &str = "und";

/// Whether a tag carries no language information
pub fn is_undetermined(tag: &str) -> bool {
    let tag = tag.trim();
    tag.is_empty() || tag.eq_ignore_ascii_case(UNDETERMINED)
}

/// Convert rfc5646 language tag to iso639-3 format readable by ffmpeg
#[instrument(level = "trace")]
pub fn to_iso639(lang: impl AsRef<str> + Debug) -> Result<String, Error> {
    // Parse language tag string
    let tag = LanguageTag::parse(lang.as_ref().trim())
        .map_err(|_| Error::UnknownLanguage(lang.as_ref().to_owned()))?;
    let mut code = tag.primary_language().to_ascii_lowercase();

    // If tag is 2 letter iso639-1, convert to 3 letter iso639-3
    if code.len() == 2 {
        code = Language::from_639_1(&code)
            .ok_or_else(|| Error::UnknownLanguage(lang.as_ref().to_owned()))?
            .to_639_3()
            .to_owned();
    }

    // Append region code if necessary
    if let Some(r) = tag.region() {
        code.push('-');
        code.push_str(&r.to_ascii_uppercase());
    }

    Ok(code)
}

/// Primary language of a tag as a three letter code, region dropped
fn primary_code(tag: &str) -> Option<String> {
    if is_undetermined(tag) {
        return None;
    }
    let code = to_iso639(tag).ok()?;
    Some(code.split('-').next().unwrap_or_default().to_owned())
}

/// Whether two tags name the same language.
/// An undetermined tag never matches, not even another undetermined tag.
pub fn same_language(a: &str, b: &str) -> bool {
    match (primary_code(a), primary_code(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}
