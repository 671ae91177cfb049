//! C ABI for stream descriptors exchanged with the native transcoder.
//!
//! # Layout
//! [`RawStream`] is `#[repr(C)]` and mirrors the engine's record field for field:
//! ```c
//! struct Stream {
//!     char *title;
//!     char *language;
//!     char *codec;
//!     bool isDefault;
//!     bool isForced;
//!     char *path;
//! };
//! ```
//!
//! # Ownership
//! - Strings passed into these functions are borrowed for the duration of the call and copied.
//! - Records returned by `transcoder_stream_new`/`transcoder_stream_empty` must be released with
//!   `transcoder_stream_free`, arrays from `transcoder_streams_alloc` with
//!   `transcoder_streams_free`. Never hand them to a foreign `free`.
//! - Records allocated by the engine are only ever read through
//!   [`StreamDescriptor::from_raw`] and [`descriptors_from_raw`], never released here.
//! - Records allocated here, including arrays the engine fills in, only ever hold strings written
//!   through `transcoder_stream_init` and `transcoder_stream_set_path`. Storing a foreign pointer
//!   such as a `strdup` result directly into a field is undefined behavior, since the field is
//!   later released with this library's allocator.

use std::ffi::{c_char, c_int, CStr, CString};
use std::ptr;

use tracing::{event, Level};

use crate::error::Error;
use crate::stream::StreamDescriptor;

const UNDETERMINED: &CStr = c"und";

/// Boundary representation of a [`StreamDescriptor`]
///
/// Every non-null text pointer was produced by `CString::into_raw` and belongs to this record
/// alone; dropping the record releases them.
#[repr(C)]
#[derive(Debug)]
pub struct RawStream {
    title: *mut c_char,
    language: *mut c_char,
    codec: *mut c_char,
    is_default: bool,
    is_forced: bool,
    path: *mut c_char,
}

// Buffers are never shared between records, so a record may move to another thread with its
// single owner.
unsafe impl Send for RawStream {}

fn into_raw(s: Option<CString>) -> *mut c_char {
    s.map_or(ptr::null_mut(), CString::into_raw)
}

fn to_c_string(field: &'static str, s: Option<&str>) -> Result<Option<CString>, Error> {
    s.map(|s| CString::new(s).map_err(|_| Error::InteriorNul { field }))
        .transpose()
}

/// Copy a borrowed C string
///
/// # Safety
/// `p` must be null or point to a valid nul-terminated string.
unsafe fn copy_c_string(p: *const c_char) -> Option<CString> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p).to_owned())
    }
}

/// # Safety
/// `p` must be null or point to a valid nul-terminated string.
unsafe fn read_c_string(field: &'static str, p: *const c_char) -> Result<Option<String>, Error> {
    if p.is_null() {
        return Ok(None);
    }
    CStr::from_ptr(p)
        .to_str()
        .map(|s| Some(s.to_owned()))
        .map_err(|_| Error::InvalidUtf8 { field })
}

/// Release a buffer owned by a [`RawStream`] and null the slot
///
/// # Safety
/// `slot` must be null or hold a pointer from `CString::into_raw` not yet released.
unsafe fn release(slot: &mut *mut c_char) {
    if !slot.is_null() {
        drop(CString::from_raw(*slot));
        *slot = ptr::null_mut();
    }
}

/// View a text field owned by a record
///
/// # Safety
/// `p` must be null or point to a valid nul-terminated string living as long as `'a`.
unsafe fn view<'a>(p: *const c_char) -> Option<&'a CStr> {
    if p.is_null() {
        None
    } else {
        Some(CStr::from_ptr(p))
    }
}

impl RawStream {
    /// Placeholder record: every pointer null, flags off
    pub const fn empty() -> Self {
        Self {
            title: ptr::null_mut(),
            language: ptr::null_mut(),
            codec: ptr::null_mut(),
            is_default: false,
            is_forced: false,
            path: ptr::null_mut(),
        }
    }

    /// Build a record from already-copied buffers, substituting `"und"` for a missing or empty
    /// language
    fn from_parts(
        title: Option<CString>,
        language: Option<CString>,
        codec: Option<CString>,
        is_default: bool,
        is_forced: bool,
    ) -> Self {
        let language = language
            .filter(|l| !l.is_empty())
            .unwrap_or_else(|| UNDETERMINED.to_owned());
        Self {
            title: into_raw(title),
            language: into_raw(Some(language)),
            codec: into_raw(codec),
            is_default,
            is_forced,
            path: ptr::null_mut(),
        }
    }

    /// Create a record, copying every given string.
    ///
    /// All buffers are allocated before the record exists, so on error nothing is leaked and no
    /// partial record is returned.
    pub fn new(
        title: Option<&str>,
        language: Option<&str>,
        codec: Option<&str>,
        is_default: bool,
        is_forced: bool,
    ) -> Result<Self, Error> {
        let title = to_c_string("title", title)?;
        let language = to_c_string("language", language)?;
        let codec = to_c_string("codec", codec)?;
        Ok(Self::from_parts(title, language, codec, is_default, is_forced))
    }

    pub fn from_descriptor(stream: &StreamDescriptor) -> Result<Self, Error> {
        let path = to_c_string("path", stream.path.as_deref())?;
        let mut raw = Self::new(
            stream.title.as_deref(),
            Some(&stream.language),
            stream.codec.as_deref(),
            stream.is_default,
            stream.is_forced,
        )?;
        raw.path = into_raw(path);
        Ok(raw)
    }

    /// Copy this record back into a [`StreamDescriptor`]
    pub fn to_descriptor(&self) -> Result<StreamDescriptor, Error> {
        // SAFETY: pointers owned by a RawStream are null or live CString buffers
        unsafe { StreamDescriptor::from_raw(self) }
    }

    pub fn title(&self) -> Option<&CStr> {
        unsafe { view(self.title) }
    }

    /// Null only for a placeholder from [`RawStream::empty`]
    pub fn language(&self) -> Option<&CStr> {
        unsafe { view(self.language) }
    }

    pub fn codec(&self) -> Option<&CStr> {
        unsafe { view(self.codec) }
    }

    pub fn path(&self) -> Option<&CStr> {
        unsafe { view(self.path) }
    }

    pub fn is_default(&self) -> bool {
        self.is_default
    }

    pub fn is_forced(&self) -> bool {
        self.is_forced
    }

    /// Replace the output path. The old buffer is released before the new one is stored.
    pub fn set_path(&mut self, path: Option<&str>) -> Result<(), Error> {
        let path = to_c_string("path", path)?;
        self.replace_path(path);
        Ok(())
    }

    fn replace_path(&mut self, path: Option<CString>) {
        unsafe { release(&mut self.path) };
        self.path = into_raw(path);
    }

    /// Release every text field and reset the record to the placeholder state.
    /// Clearing an already cleared record does nothing.
    pub fn clear(&mut self) {
        unsafe {
            release(&mut self.title);
            release(&mut self.language);
            release(&mut self.codec);
            release(&mut self.path);
        }
        self.is_default = false;
        self.is_forced = false;
    }
}

impl Default for RawStream {
    fn default() -> Self {
        Self::empty()
    }
}

impl Drop for RawStream {
    fn drop(&mut self) {
        self.clear();
    }
}

impl StreamDescriptor {
    /// Copy a record handed over the boundary. A null language reads back as `"und"`.
    ///
    /// # Safety
    /// Every text pointer of `raw` must be null or point to a valid nul-terminated string for the
    /// duration of the call. `raw` stays owned by the caller.
    pub unsafe fn from_raw(raw: &RawStream) -> Result<Self, Error> {
        let title = read_c_string("title", raw.title)?;
        let language = read_c_string("language", raw.language)?;
        let codec = read_c_string("codec", raw.codec)?;
        let path = read_c_string("path", raw.path)?;

        let mut stream = Self::new(
            title.as_deref(),
            language.as_deref(),
            codec.as_deref(),
            raw.is_default,
            raw.is_forced,
        );
        stream.path = path;
        Ok(stream)
    }
}

/// Copy an array of records returned by the engine
///
/// # Safety
/// `streams` must be null or point to `len` initialized records meeting the requirements of
/// [`StreamDescriptor::from_raw`].
pub unsafe fn descriptors_from_raw(
    streams: *const RawStream,
    len: usize,
) -> Result<Vec<StreamDescriptor>, Error> {
    if streams.is_null() || len == 0 {
        return Ok(Vec::new());
    }
    std::slice::from_raw_parts(streams, len)
        .iter()
        .map(|s| StreamDescriptor::from_raw(s))
        .collect()
}

/// Convert descriptors into an array to hand to the engine.
/// Release it with [`transcoder_streams_free`].
pub fn descriptors_into_raw(
    streams: &[StreamDescriptor],
) -> Result<(*mut RawStream, usize), Error> {
    let raw = streams
        .iter()
        .map(RawStream::from_descriptor)
        .collect::<Result<Box<[_]>, _>>()?;
    let len = raw.len();
    event!(Level::TRACE, "Handing {} streams over the boundary", len);
    Ok((Box::into_raw(raw) as *mut RawStream, len))
}

/// Create a record. `title`, `language` and `codec` may be null; a null or empty language is
/// stored as `"und"`.
///
/// # Safety
/// Every non-null argument must be a valid nul-terminated string.
#[no_mangle]
pub unsafe extern "C" fn transcoder_stream_new(
    title: *const c_char,
    language: *const c_char,
    codec: *const c_char,
    is_default: bool,
    is_forced: bool,
) -> *mut RawStream {
    let stream = RawStream::from_parts(
        copy_c_string(title),
        copy_c_string(language),
        copy_c_string(codec),
        is_default,
        is_forced,
    );
    Box::into_raw(Box::new(stream))
}

/// Create a placeholder record with every field null
#[no_mangle]
pub extern "C" fn transcoder_stream_empty() -> *mut RawStream {
    Box::into_raw(Box::new(RawStream::empty()))
}

/// Fill a record in place, releasing whatever it held before.
///
/// Returns 0 on success, -1 if `stream` is null.
///
/// # Safety
/// `stream` must be null or a record allocated by this library. Every non-null string argument
/// must be a valid nul-terminated string.
#[no_mangle]
pub unsafe extern "C" fn transcoder_stream_init(
    stream: *mut RawStream,
    title: *const c_char,
    language: *const c_char,
    codec: *const c_char,
    is_default: bool,
    is_forced: bool,
) -> c_int {
    let Some(stream) = stream.as_mut() else {
        return -1;
    };
    // Assigning drops the old record, releasing its buffers
    *stream = RawStream::from_parts(
        copy_c_string(title),
        copy_c_string(language),
        copy_c_string(codec),
        is_default,
        is_forced,
    );
    0
}

/// Replace the output path of a record. A null `path` clears it.
///
/// Returns 0 on success, -1 if `stream` is null.
///
/// # Safety
/// `stream` must be null or a record allocated by this library. `path` must be null or a valid
/// nul-terminated string.
#[no_mangle]
pub unsafe extern "C" fn transcoder_stream_set_path(
    stream: *mut RawStream,
    path: *const c_char,
) -> c_int {
    let Some(stream) = stream.as_mut() else {
        return -1;
    };
    stream.replace_path(copy_c_string(path));
    0
}

/// Release the text fields of a record without freeing the record itself.
///
/// # Safety
/// `stream` must be null or a record allocated by this library whose non-null fields were all
/// set through `transcoder_stream_init`/`transcoder_stream_set_path` or its constructor.
#[no_mangle]
pub unsafe extern "C" fn transcoder_stream_clear(stream: *mut RawStream) {
    if let Some(stream) = stream.as_mut() {
        stream.clear();
    }
}

/// Free a record and every string it owns. Null is ignored.
///
/// # Safety
/// `stream` must be null or come from `transcoder_stream_new`/`transcoder_stream_empty`, and must
/// not be used afterwards. Every non-null field must have been set by its constructor or through
/// `transcoder_stream_init`/`transcoder_stream_set_path`.
#[no_mangle]
pub unsafe extern "C" fn transcoder_stream_free(stream: *mut RawStream) {
    if stream.is_null() {
        return;
    }
    drop(Box::from_raw(stream));
}

/// Allocate `len` placeholder records.
///
/// The engine may fill them in, but only through `transcoder_stream_init` and
/// `transcoder_stream_set_path`: every string field is released by `transcoder_streams_free`.
#[no_mangle]
pub extern "C" fn transcoder_streams_alloc(len: usize) -> *mut RawStream {
    let streams: Box<[RawStream]> = (0..len).map(|_| RawStream::empty()).collect();
    Box::into_raw(streams) as *mut RawStream
}

/// Free an array of records and every string they own. Null is ignored.
///
/// # Safety
/// `streams` must be null or come from `transcoder_streams_alloc` or
/// [`descriptors_into_raw`] with the same `len`, and must not be used afterwards. Every non-null
/// field must have been set by this library, i.e. through `transcoder_stream_init`/
/// `transcoder_stream_set_path`.
#[no_mangle]
pub unsafe extern "C" fn transcoder_streams_free(streams: *mut RawStream, len: usize) {
    if streams.is_null() {
        return;
    }
    event!(Level::TRACE, "Releasing {} streams", len);
    drop(Box::from_raw(ptr::slice_from_raw_parts_mut(streams, len)));
}

#[cfg(test)]
mod tests {
    use std::mem::{align_of, offset_of, size_of};

    use super::*;

    #[test]
    fn layout_matches_engine_record() {
        let p = size_of::<*mut c_char>();
        assert_eq!(offset_of!(RawStream, title), 0);
        assert_eq!(offset_of!(RawStream, language), p);
        assert_eq!(offset_of!(RawStream, codec), 2 * p);
        assert_eq!(offset_of!(RawStream, is_default), 3 * p);
        assert_eq!(offset_of!(RawStream, is_forced), 3 * p + 1);
        assert_eq!(offset_of!(RawStream, path), 4 * p);
        assert_eq!(size_of::<RawStream>(), 5 * p);
        assert_eq!(align_of::<RawStream>(), align_of::<*mut c_char>());
    }

    #[test]
    fn missing_language_is_und() {
        let raw = RawStream::new(None, None, None, false, false).unwrap();
        assert_eq!(raw.language(), Some(c"und"));
        assert!(raw.title().is_none());
        assert!(raw.codec().is_none());
        assert!(raw.path().is_none());
    }

    #[test]
    fn strings_are_copied() {
        let mut tag = CString::new("fre").unwrap();
        let codec = CString::new("h264").unwrap();
        let raw = unsafe {
            Box::from_raw(transcoder_stream_new(
                ptr::null(),
                tag.as_ptr(),
                codec.as_ptr(),
                true,
                false,
            ))
        };
        assert_ne!(raw.language as *const c_char, tag.as_ptr());
        tag = CString::new("eng").unwrap();
        drop(codec);

        assert_eq!(tag.as_c_str(), c"eng");
        assert_eq!(raw.language(), Some(c"fre"));
        assert_eq!(raw.codec(), Some(c"h264"));
        assert!(raw.title().is_none());
        assert!(raw.is_default());
        assert!(!raw.is_forced());
    }

    #[test]
    fn interior_nul_fails_without_partial_record() {
        let err = RawStream::new(Some("ok"), Some("en\0g"), None, false, false).unwrap_err();
        assert!(matches!(err, Error::InteriorNul { field: "language" }));

        let mut stream = StreamDescriptor::new(Some("Main"), None, None, false, false);
        stream.path = Some("bad\0path".into());
        assert!(matches!(
            RawStream::from_descriptor(&stream),
            Err(Error::InteriorNul { field: "path" })
        ));
    }

    #[test]
    fn empty_language_is_und() {
        let raw = RawStream::new(None, Some(""), None, false, false).unwrap();
        assert_eq!(raw.language(), Some(c"und"));

        let raw = unsafe {
            Box::from_raw(transcoder_stream_new(
                ptr::null(),
                c"".as_ptr(),
                ptr::null(),
                false,
                false,
            ))
        };
        assert_eq!(raw.language(), Some(c"und"));
    }

    #[test]
    fn empty_record_reads_back_as_und() {
        let raw = RawStream::empty();
        assert!(raw.language().is_none());
        assert!(!raw.is_default() && !raw.is_forced());

        let stream = raw.to_descriptor().unwrap();
        assert_eq!(stream, StreamDescriptor::default());
    }

    #[test]
    fn descriptor_round_trip_keeps_path() {
        let mut stream = StreamDescriptor::new(Some("Signs"), Some("eng"), Some("ass"), true, true);
        stream.set_path(Some("/out/video.mp4"));
        let raw = RawStream::from_descriptor(&stream).unwrap();
        assert_eq!(raw.path(), Some(c"/out/video.mp4"));
        assert_eq!(raw.to_descriptor().unwrap(), stream);
    }

    #[test]
    fn set_path_replaces_and_clears() {
        let mut raw = RawStream::new(None, Some("eng"), None, false, false).unwrap();
        raw.set_path(Some("a.mp4")).unwrap();
        raw.set_path(Some("b.mp4")).unwrap();
        assert_eq!(raw.path(), Some(c"b.mp4"));
        raw.set_path(None).unwrap();
        assert!(raw.path().is_none());

        let path = CString::new("c.mp4").unwrap();
        assert_eq!(unsafe { transcoder_stream_set_path(&mut raw, path.as_ptr()) }, 0);
        assert_eq!(raw.path(), Some(c"c.mp4"));
        assert_eq!(
            unsafe { transcoder_stream_set_path(ptr::null_mut(), path.as_ptr()) },
            -1
        );
    }

    #[test]
    fn clear_twice_is_harmless() {
        let raw = unsafe {
            transcoder_stream_new(c"T".as_ptr(), c"eng".as_ptr(), ptr::null(), true, true)
        };
        unsafe {
            transcoder_stream_clear(raw);
            assert!((*raw).title().is_none());
            assert!((*raw).language().is_none());
            assert!(!(*raw).is_default());
            transcoder_stream_clear(raw);
            transcoder_stream_free(raw);
            transcoder_stream_free(ptr::null_mut());
        }
    }

    #[test]
    fn identical_languages_release_independently() {
        let a = RawStream::new(None, Some("eng"), None, false, false).unwrap();
        let b = RawStream::new(None, Some("eng"), None, false, false).unwrap();
        assert_ne!(a.language, b.language);
        drop(a);
        assert_eq!(b.language(), Some(c"eng"));
    }

    #[test]
    fn arrays_fill_and_free() {
        unsafe {
            let streams = transcoder_streams_alloc(2);
            let second = streams.add(1);
            assert!((*second).language().is_none());

            assert_eq!(
                transcoder_stream_init(
                    second,
                    ptr::null(),
                    c"jpn".as_ptr(),
                    c"aac".as_ptr(),
                    true,
                    false,
                ),
                0
            );
            assert_eq!(
                transcoder_stream_init(
                    second,
                    ptr::null(),
                    ptr::null(),
                    c"opus".as_ptr(),
                    false,
                    false,
                ),
                0
            );

            let read = descriptors_from_raw(streams, 2).unwrap();
            assert_eq!(read[0], StreamDescriptor::default());
            assert_eq!(read[1].language, "und");
            assert_eq!(read[1].codec.as_deref(), Some("opus"));
            assert!(!read[1].is_default);

            transcoder_streams_free(streams, 2);
        }
    }

    #[test]
    fn engine_fills_allocated_array() {
        unsafe {
            let streams = transcoder_streams_alloc(3);
            for i in 0..3 {
                let stream = streams.add(i);
                assert_eq!(
                    transcoder_stream_init(
                        stream,
                        ptr::null(),
                        c"eng".as_ptr(),
                        ptr::null(),
                        i == 0,
                        false,
                    ),
                    0
                );
            }
            let path = CString::new("/out/video.mp4").unwrap();
            assert_eq!(transcoder_stream_set_path(streams, path.as_ptr()), 0);
            assert_eq!(transcoder_stream_set_path(streams.add(2), path.as_ptr()), 0);
            drop(path);

            let read = descriptors_from_raw(streams, 3).unwrap();
            assert_eq!(read[0].path.as_deref(), Some("/out/video.mp4"));
            assert!(read[0].is_default);
            assert_eq!(read[1].path, None);
            assert_eq!(read[2].path.as_deref(), Some("/out/video.mp4"));
            assert_ne!((*streams).path, (*streams.add(2)).path);

            transcoder_streams_free(streams, 3);
        }
    }

    #[test]
    fn descriptors_cross_and_come_back() {
        let streams = vec![
            StreamDescriptor::new(Some("Main"), Some("jpn"), Some("h264"), true, false),
            StreamDescriptor::new(None, None, Some("aac"), false, false),
        ];
        let (raw, len) = descriptors_into_raw(&streams).unwrap();
        assert_eq!(len, 2);
        let back = unsafe { descriptors_from_raw(raw, len) }.unwrap();
        assert_eq!(back, streams);
        unsafe { transcoder_streams_free(raw, len) };

        assert!(unsafe { descriptors_from_raw(ptr::null(), 3) }.unwrap().is_empty());
    }

    #[test]
    fn invalid_utf8_is_reported() {
        let bytes = CString::new(vec![0xff, 0xfe]).unwrap();
        let raw = unsafe {
            Box::from_raw(transcoder_stream_new(
                bytes.as_ptr(),
                ptr::null(),
                ptr::null(),
                false,
                false,
            ))
        };
        assert!(matches!(
            raw.to_descriptor(),
            Err(Error::InvalidUtf8 { field: "title" })
        ));
    }
}
