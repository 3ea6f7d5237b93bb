//! Tar event source: wraps a streaming `tar` parser and yields
//! `(header_offset, member_name)` events.
//!
//! This module is deliberately ignorant of block buffers and sequence
//! numbers — it only knows how to walk tar headers. The byte-offset half of
//! each event is supplied by the caller (the reader, see [`crate::reader`]),
//! which is the only party that knows the running count of bytes pulled
//! through the shared input reader. Immediately before each call to the
//! underlying iterator's `next()`, that count equals the position of the
//! upcoming header: `next()` is what consumes the previous entry's
//! remaining data, its padding, and the next header, in that order, with no
//! look-ahead.

use std::io;

use tar::Archive;

/// Drains every entry of a tar stream, invoking `on_header(offset, name)`
/// for each one, where `offset` is read from `current_offset` immediately
/// before the entry is parsed. Returns the underlying reader, so the caller
/// can keep reading past whatever the tar parser considered the end of the
/// archive (trailing padding beyond the two zero blocks it requires).
pub fn drive<R, F, O>(input: R, mut current_offset: O, mut on_header: F) -> io::Result<R>
where
    R: io::Read,
    F: FnMut(u64, &str),
    O: FnMut() -> u64,
{
    let mut archive = Archive::new(input);

    {
        let mut entries = archive.entries()?;

        loop {
            let offset = current_offset();

            let entry = match entries.next() {
                Some(entry) => entry?,
                None => break,
            };

            // `tar::Entry::path()` resolves PAX/GNU long-name extensions
            // transparently; the header offset we recorded above still
            // points at the first header block of the run (including any
            // such extension headers), which is what a random-access
            // reader needs to seek to.
            let path = entry.path()?;
            let name = match path.to_str() {
                Some(name) => name.to_string(),
                None => {
                    tracing::warn!(offset, "member name is not valid UTF-8, using lossy conversion");
                    path.to_string_lossy().into_owned()
                }
            };
            on_header(offset, &name);
        }
    }

    Ok(archive.into_inner())
}
