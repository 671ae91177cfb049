use std::path::Path;

use tracing::{event, Level};

use crate::language::same_language;
use crate::stream::{StreamKind, Track};

/// Pick the track to play by default for `kind`
///
/// An explicitly flagged track wins. Otherwise the first track in the preferred language, then
/// the first track of that kind. Tracks tagged `"und"` never count as matching a language.
///
/// A default subtitle is shown automatically, so subtitles never take the last fallback: with no
/// flagged or matching subtitle track, none is default.
pub fn default_track(
    tracks: &[Track],
    kind: StreamKind,
    preferred: Option<&str>,
) -> Option<usize> {
    let mut of_kind = tracks
        .iter()
        .enumerate()
        .filter(|(_, t)| t.kind == kind);

    if let Some((i, _)) = of_kind.clone().find(|(_, t)| t.stream.is_default) {
        return Some(i);
    }

    if let Some(p) = preferred {
        if let Some((i, _)) = of_kind
            .clone()
            .find(|(_, t)| same_language(&t.stream.language, p))
        {
            return Some(i);
        }
    }

    if kind == StreamKind::Subtitle {
        return None;
    }
    of_kind.next().map(|(i, _)| i)
}

/// Leave exactly one default video and audio track, and at most one default subtitle track
pub fn normalize_defaults(tracks: &mut [Track], preferred: Option<&str>) {
    for kind in [StreamKind::Video, StreamKind::Audio, StreamKind::Subtitle] {
        let chosen = default_track(tracks, kind, preferred);
        match chosen {
            Some(i) => event!(Level::DEBUG, "Default {} track: {}", kind, tracks[i].stream),
            None => event!(Level::DEBUG, "No default {} track", kind),
        }

        for (i, track) in tracks.iter_mut().enumerate() {
            if track.kind == kind {
                track.stream.is_default = Some(i) == chosen;
            }
        }
    }
}

/// Record where every track was written
pub fn assign_output_paths(tracks: &mut [Track], output: impl AsRef<Path>) {
    let output = output.as_ref().to_string_lossy();
    for track in tracks {
        track.stream.set_path(Some(&*output));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::StreamDescriptor;

    fn track(kind: StreamKind, lang: Option<&str>, is_default: bool) -> Track {
        Track {
            kind,
            input: "in".into(),
            stream: StreamDescriptor::new(None, lang, None, is_default, false),
        }
    }

    #[test]
    fn flagged_track_wins() {
        let tracks = [
            track(StreamKind::Audio, Some("eng"), false),
            track(StreamKind::Audio, Some("jpn"), true),
        ];
        assert_eq!(default_track(&tracks, StreamKind::Audio, Some("en")), Some(1));
    }

    #[test]
    fn preferred_language_skips_und() {
        let tracks = [
            track(StreamKind::Video, None, false),
            track(StreamKind::Audio, None, false),
            track(StreamKind::Audio, Some("fre"), false),
        ];
        assert_eq!(default_track(&tracks, StreamKind::Audio, Some("fre")), Some(2));
        assert_eq!(default_track(&tracks, StreamKind::Audio, Some("und")), Some(1));
        assert_eq!(default_track(&tracks, StreamKind::Subtitle, None), None);
    }

    #[test]
    fn normalize_keeps_one_default_per_kind() {
        let mut tracks = [
            track(StreamKind::Video, None, false),
            track(StreamKind::Audio, Some("eng"), true),
            track(StreamKind::Audio, Some("jpn"), true),
            track(StreamKind::Subtitle, Some("eng"), false),
            track(StreamKind::Subtitle, Some("ja"), false),
        ];
        normalize_defaults(&mut tracks, Some("jpn"));

        let flags: Vec<bool> = tracks.iter().map(|t| t.stream.is_default).collect();
        assert_eq!(flags, [true, true, false, false, true]);
    }

    #[test]
    fn subtitles_without_match_get_no_default() {
        let mut tracks = [
            track(StreamKind::Audio, Some("jpn"), false),
            track(StreamKind::Subtitle, Some("eng"), false),
            track(StreamKind::Subtitle, None, false),
            track(StreamKind::Subtitle, Some("ger"), false),
        ];
        assert_eq!(default_track(&tracks, StreamKind::Subtitle, Some("fre")), None);
        assert_eq!(default_track(&tracks, StreamKind::Subtitle, None), None);

        normalize_defaults(&mut tracks, Some("fre"));
        let flags: Vec<bool> = tracks.iter().map(|t| t.stream.is_default).collect();
        assert_eq!(flags, [true, false, false, false]);

        tracks[3].stream.is_default = true;
        normalize_defaults(&mut tracks, Some("fre"));
        let flags: Vec<bool> = tracks.iter().map(|t| t.stream.is_default).collect();
        assert_eq!(flags, [true, false, false, true]);
    }

    #[test]
    fn paths_are_assigned() {
        let mut tracks = [
            track(StreamKind::Video, None, false),
            track(StreamKind::Audio, None, false),
        ];
        assert!(tracks.iter().all(|t| t.stream.path.is_none()));
        assign_output_paths(&mut tracks, "out/video.mp4");
        assert!(tracks
            .iter()
            .all(|t| t.stream.path.as_deref() == Some("out/video.mp4")));
    }
}
