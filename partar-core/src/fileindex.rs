//! The file index: an auxiliary record of `(member name, uncompressed
//! offset)` pairs, unique to this format, that lets a random-access reader
//! locate a tar member without decompressing everything before it.
//!
//! The original design stores this as a singly-linked list built by the
//! reader thread and walked once by the writer at the very end. A `Vec` is
//! the natural Rust stand-in: the list is only ever appended to in order
//! and then iterated once, so there's no need for the pointer stability a
//! linked list would buy in a language without a growable array with that
//! property.

use std::io::{self, Write};

/// One entry: a tar member's name and the uncompressed byte offset at which
/// its (possibly multi-header-coalesced) run of header blocks begins.
///
/// The terminating sentinel has `name = None` and `offset` equal to the
/// total number of uncompressed bytes read, so that the last real member's
/// length is computable by subtracting its offset from the sentinel's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileIndexEntry {
    pub offset: u64,
    pub name: Option<String>,
}

impl FileIndexEntry {
    pub fn sentinel(total_uncompressed_size: u64) -> Self {
        Self {
            offset: total_uncompressed_size,
            name: None,
        }
    }
}

/// Tracks multi-header coalescing state and accumulates entries as the
/// reader walks tar headers. A member whose basename starts with `._`
/// (AppleDouble metadata) is never emitted on its own; instead its offset is
/// remembered and attached to the *next* non-`._` entry, keeping a file's
/// macOS extended-attribute sidecar adjacent to the file itself for
/// random-access purposes.
#[derive(Debug, Default)]
pub struct FileIndexBuilder {
    entries: Vec<FileIndexEntry>,
    pending_start: Option<u64>,
}

impl FileIndexBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a tar header event at the given uncompressed offset.
    pub fn add_file(&mut self, offset: u64, name: &str) {
        if is_multi_header(name) {
            if self.pending_start.is_none() {
                self.pending_start = Some(offset);
            }
            return;
        }

        let effective_offset = self.pending_start.take().unwrap_or(offset);
        self.entries.push(FileIndexEntry {
            offset: effective_offset,
            name: Some(name.to_string()),
        });
    }

    /// Finalizes the index with the end-of-archive sentinel. A `._` run
    /// that is never followed by a non-`._` entry (i.e. the archive ends
    /// mid-run) simply vanishes: the sentinel's own offset is the total
    /// size regardless, so there is nothing correct to attach the pending
    /// start to.
    pub fn finish(mut self, total_uncompressed_size: u64) -> Vec<FileIndexEntry> {
        self.entries
            .push(FileIndexEntry::sentinel(total_uncompressed_size));
        self.entries
    }
}

fn is_multi_header(name: &str) -> bool {
    let basename = name.rsplit('/').next().unwrap_or(name);
    basename.starts_with("._")
}

/// Serializes one record as `name_bytes || 0x00 || little_endian_u64(offset)`,
/// matching the on-disk file-index block payload format.
pub fn write_record<W: Write>(w: &mut W, entry: &FileIndexEntry) -> io::Result<()> {
    if let Some(name) = &entry.name {
        w.write_all(name.as_bytes())?;
    }
    w.write_all(&[0u8])?;
    w.write_all(&entry.offset.to_le_bytes())?;
    Ok(())
}

/// Serializes every entry (including the sentinel) in order.
pub fn serialize(entries: &[FileIndexEntry]) -> Vec<u8> {
    let mut out = Vec::new();
    for entry in entries {
        write_record(&mut out, entry).expect("writing to a Vec<u8> cannot fail");
    }
    out
}

/// Parses a serialized file-index block payload back into entries. Used by
/// tests and by out-of-crate random-access readers (not part of the core
/// compressor, but the inverse of `serialize` belongs next to it).
pub fn parse(mut data: &[u8]) -> io::Result<Vec<FileIndexEntry>> {
    let mut entries = Vec::new();

    while !data.is_empty() {
        let nul = data
            .iter()
            .position(|&b| b == 0)
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidData, "unterminated file-index name"))?;

        let name_bytes = &data[..nul];
        let rest = &data[nul + 1..];

        if rest.len() < 8 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "truncated file-index offset",
            ));
        }

        let offset = u64::from_le_bytes(rest[..8].try_into().unwrap());
        let name = if name_bytes.is_empty() {
            None
        } else {
            Some(
                String::from_utf8(name_bytes.to_vec())
                    .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?,
            )
        };

        entries.push(FileIndexEntry { offset, name });
        data = &rest[8..];
    }

    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_files_pass_through_untouched() {
        let mut b = FileIndexBuilder::new();
        b.add_file(0, "a");
        b.add_file(512, "b");
        let entries = b.finish(1024);

        assert_eq!(
            entries,
            vec![
                FileIndexEntry { offset: 0, name: Some("a".into()) },
                FileIndexEntry { offset: 512, name: Some("b".into()) },
                FileIndexEntry { offset: 1024, name: None },
            ]
        );
    }

    #[test]
    fn multi_header_run_attaches_to_next_real_entry() {
        // a, ._a, b — the second entry's offset should equal ._a's offset.
        let mut b = FileIndexBuilder::new();
        b.add_file(0, "a");
        b.add_file(512, "._a");
        b.add_file(1024, "b");
        let entries = b.finish(1536);

        assert_eq!(entries[0], FileIndexEntry { offset: 0, name: Some("a".into()) });
        assert_eq!(entries[1], FileIndexEntry { offset: 512, name: Some("b".into()) });
        assert_eq!(entries[2], FileIndexEntry { offset: 1536, name: None });
    }

    #[test]
    fn multi_header_run_in_nested_path_is_detected_by_basename() {
        let mut b = FileIndexBuilder::new();
        b.add_file(0, "dir/._meta");
        b.add_file(512, "dir/real");
        let entries = b.finish(1024);

        assert_eq!(entries[0], FileIndexEntry { offset: 0, name: Some("dir/real".into()) });
    }

    #[test]
    fn trailing_multi_header_run_vanishes_before_eof() {
        // ._a with nothing after it: no entry for it, sentinel offset is
        // still the total size, not the pending run's start.
        let mut b = FileIndexBuilder::new();
        b.add_file(0, "._a");
        let entries = b.finish(512);

        assert_eq!(entries, vec![FileIndexEntry { offset: 512, name: None }]);
    }

    #[test]
    fn empty_archive_has_only_the_sentinel() {
        let b = FileIndexBuilder::new();
        let entries = b.finish(1024);
        assert_eq!(entries, vec![FileIndexEntry { offset: 1024, name: None }]);
    }

    #[test]
    fn serialize_then_parse_round_trips() {
        let entries = vec![
            FileIndexEntry { offset: 0, name: Some("a".into()) },
            FileIndexEntry { offset: 512, name: Some("b/c".into()) },
            FileIndexEntry { offset: 1024, name: None },
        ];

        let bytes = serialize(&entries);
        let parsed = parse(&bytes).unwrap();
        assert_eq!(parsed, entries);
    }
}
