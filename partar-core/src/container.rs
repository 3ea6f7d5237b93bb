//! XZ container framing: stream header/footer, block header, block trailer,
//! and the block index.
//!
//! The LZMA2 codec itself stays a black box (`lzma_rust2::enc::LZMA2Writer`
//! / `lzma_rust2::dec::LZMA2Reader`, used directly by [`crate::encoder`] and
//! [`crate::reader`]'s test-only decode path); this module only speaks the
//! surrounding container format every block, the index, and the stream
//! edges are wrapped in. Every block in this format uses exactly one filter
//! (LZMA2, no BCJ/delta prefilters), which simplifies the block header
//! relative to a general-purpose xz writer.

use std::io::{self, Read, Write};

use crc::{Crc, CRC_32_ISO_HDLC, CRC_64_XZ};

use crate::config::CheckKind;

pub const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
pub const XZ_FOOTER_MAGIC: [u8; 2] = [0x59, 0x5A];

const LZMA2_FILTER_ID: u64 = 0x21;

static CRC32: Crc<u32> = Crc::<u32>::new(&CRC_32_ISO_HDLC);
static CRC64: Crc<u64> = Crc::<u64>::new(&CRC_64_XZ);

/// One block's contribution to the index: the exact quantities the xz index
/// records, in append order (which must equal on-disk order, which must
/// equal sequence-number order — enforced by the writer, not this module).
#[derive(Debug, Clone, Copy)]
pub struct IndexRecord {
    pub unpadded_size: u64,
    pub uncompressed_size: u64,
}

/// Running integrity check for one block's uncompressed content.
pub enum Checksum {
    None,
    Crc32(crc::Digest<'static, u32>),
    Crc64(crc::Digest<'static, u64>),
}

impl Checksum {
    pub fn new(kind: CheckKind) -> Self {
        match kind {
            CheckKind::None => Checksum::None,
            CheckKind::Crc32 => Checksum::Crc32(CRC32.digest()),
            CheckKind::Crc64 => Checksum::Crc64(CRC64.digest()),
        }
    }

    pub fn update(&mut self, data: &[u8]) {
        match self {
            Checksum::None => {}
            Checksum::Crc32(d) => d.update(data),
            Checksum::Crc64(d) => d.update(data),
        }
    }

    /// Finalizes into the little-endian bytes written after a block's
    /// compressed payload (and its padding).
    pub fn finish(self) -> Vec<u8> {
        match self {
            Checksum::None => Vec::new(),
            Checksum::Crc32(d) => d.finalize().to_le_bytes().to_vec(),
            Checksum::Crc64(d) => d.finalize().to_le_bytes().to_vec(),
        }
    }
}

/// Writes the 12-byte xz stream header: magic, stream flags (check kind),
/// CRC32 of the flags.
pub fn write_stream_header<W: Write>(w: &mut W, check: CheckKind) -> io::Result<()> {
    w.write_all(&XZ_MAGIC)?;

    let flags = [0u8, check.flag_byte()];
    w.write_all(&flags)?;
    w.write_all(&CRC32.checksum(&flags).to_le_bytes())?;

    Ok(())
}

/// Writes one block header (size byte, flags, the single LZMA2 filter's id
/// and dictionary-size property, padding, CRC32) and returns its size in
/// bytes — always a multiple of four, as required by the format.
pub fn write_block_header<W: Write>(w: &mut W, dict_size: u32) -> io::Result<u64> {
    let mut body = Vec::new();

    // Block flags: no compressed/uncompressed size present, 1 filter (the
    // "number of filters minus one" encoding means 0 here).
    body.push(0u8);

    body.extend(encode_vli(LZMA2_FILTER_ID));
    body.push(1); // filter property size: one byte (the dict-size property)
    body.push(encode_lzma2_dict_size(dict_size)?);

    // Total header size including the size byte itself and the trailing
    // CRC32, rounded up to a multiple of four.
    let raw_len = 1 + body.len() + 4;
    let header_len = raw_len.div_ceil(4) * 4;
    let size_byte = ((header_len / 4) - 1) as u8;
    let padding = header_len - 1 - body.len() - 4;

    w.write_all(&[size_byte])?;
    w.write_all(&body)?;
    write_zero_padding(w, padding)?;

    let mut digest = CRC32.digest();
    digest.update(&[size_byte]);
    digest.update(&body);
    digest.update(&ZEROES[..padding]);
    w.write_all(&digest.finalize().to_le_bytes())?;

    Ok(header_len as u64)
}

/// Writes a block's trailing padding (so the compressed payload ends on a
/// four-byte boundary) followed by its integrity check value. Returns the
/// number of bytes written (padding + check).
pub fn write_block_trailer<W: Write>(
    w: &mut W,
    compressed_len: u64,
    checksum: Checksum,
) -> io::Result<u64> {
    let padding = ((4 - (compressed_len % 4)) % 4) as usize;
    write_zero_padding(w, padding)?;

    let check_bytes = checksum.finish();
    w.write_all(&check_bytes)?;

    Ok(padding as u64 + check_bytes.len() as u64)
}

/// Writes the block index (indicator byte, record count, each record's
/// unpadded/uncompressed sizes as VLIs, padding, CRC32). Returns the total
/// number of bytes written, which the stream footer needs for its
/// backward-size field.
pub fn write_index<W: Write>(w: &mut W, records: &[IndexRecord]) -> io::Result<u64> {
    let mut body = Vec::new();
    body.push(0x00); // index indicator
    body.extend(encode_vli(records.len() as u64));

    for record in records {
        body.extend(encode_vli(record.unpadded_size));
        body.extend(encode_vli(record.uncompressed_size));
    }

    let padding = (4 - (body.len() % 4)) % 4;

    w.write_all(&body)?;
    write_zero_padding(w, padding)?;

    let mut digest = CRC32.digest();
    digest.update(&body);
    digest.update(&ZEROES[..padding]);
    w.write_all(&digest.finalize().to_le_bytes())?;

    Ok((body.len() + padding + 4) as u64)
}

/// Writes the 12-byte xz stream footer: CRC32 of (backward_size, flags),
/// backward_size, flags, footer magic.
pub fn write_stream_footer<W: Write>(
    w: &mut W,
    index_size_bytes: u64,
    check: CheckKind,
) -> io::Result<()> {
    let backward_size = ((index_size_bytes / 4) - 1) as u32;
    let flags = [0u8, check.flag_byte()];

    let mut digest = CRC32.digest();
    digest.update(&backward_size.to_le_bytes());
    digest.update(&flags);

    w.write_all(&digest.finalize().to_le_bytes())?;
    w.write_all(&backward_size.to_le_bytes())?;
    w.write_all(&flags)?;
    w.write_all(&XZ_FOOTER_MAGIC)?;

    Ok(())
}

const ZEROES: [u8; 4] = [0; 4];

fn write_zero_padding<W: Write>(w: &mut W, n: usize) -> io::Result<()> {
    if n > 0 {
        w.write_all(&ZEROES[..n])?;
    }
    Ok(())
}

/// Encodes a value as an xz-style variable-length integer: little-endian,
/// 7 bits per byte, continuation bit (0x80) set on every byte but the last.
pub fn encode_vli(mut value: u64) -> Vec<u8> {
    let mut out = Vec::new();
    loop {
        let mut byte = (value & 0x7F) as u8;
        value >>= 7;
        if value != 0 {
            byte |= 0x80;
        }
        out.push(byte);
        if value == 0 {
            break;
        }
    }
    out
}

/// The number of bytes [`encode_vli`] would produce, without allocating.
pub fn vli_size(mut value: u64) -> usize {
    let mut n = 1;
    value >>= 7;
    while value != 0 {
        n += 1;
        value >>= 7;
    }
    n
}

/// Decodes one xz-style variable-length integer from a reader.
pub fn decode_vli<R: Read>(r: &mut R) -> io::Result<u64> {
    let mut value: u64 = 0;
    let mut shift = 0u32;

    loop {
        let mut byte = [0u8; 1];
        r.read_exact(&mut byte)?;
        let b = byte[0];
        value |= ((b & 0x7F) as u64) << shift;

        if b & 0x80 == 0 {
            return Ok(value);
        }

        shift += 7;
        if shift >= 63 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "variable-length integer too large",
            ));
        }
    }
}

/// Maps a dictionary size onto the single-byte xz LZMA2 filter property, the
/// inverse of the table in the xz format spec (`2 | bit`, shifted).
fn encode_lzma2_dict_size(dict_size: u32) -> io::Result<u8> {
    if dict_size < 4096 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            "LZMA2 dictionary size too small",
        ));
    }

    if dict_size == 0xFFFF_FFFF {
        return Ok(40);
    }

    for prop in 0u8..40 {
        let base = 2 | (prop as u32 & 1);
        let size = base << (prop / 2 + 11);
        if size >= dict_size {
            return Ok(prop);
        }
    }

    Err(io::Error::new(
        io::ErrorKind::InvalidInput,
        "LZMA2 dictionary size too large",
    ))
}

/// The inverse of [`encode_lzma2_dict_size`], used when parsing a block
/// header back (tests, and any future random-access reader).
pub fn decode_lzma2_dict_size(prop: u8) -> io::Result<u32> {
    if prop > 40 {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid LZMA2 dictionary size property",
        ));
    }
    if prop == 40 {
        return Ok(0xFFFF_FFFF);
    }
    let base = 2 | (prop as u32 & 1);
    Ok(base << (prop / 2 + 11))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn vli_round_trips() {
        for value in [0u64, 1, 127, 128, 300, u32::MAX as u64, u64::MAX >> 2] {
            let encoded = encode_vli(value);
            assert_eq!(encoded.len(), vli_size(value));
            let decoded = decode_vli(&mut &encoded[..]).unwrap();
            assert_eq!(decoded, value);
        }
    }

    #[test]
    fn stream_header_is_twelve_bytes_and_starts_with_magic() {
        let mut buf = Vec::new();
        write_stream_header(&mut buf, CheckKind::Crc64).unwrap();
        assert_eq!(buf.len(), 12);
        assert_eq!(&buf[..6], &XZ_MAGIC);
    }

    #[test]
    fn block_header_size_is_multiple_of_four() {
        let mut buf = Vec::new();
        let written = write_block_header(&mut buf, 1 << 20).unwrap();
        assert_eq!(buf.len() as u64, written);
        assert_eq!(written % 4, 0);
    }

    #[test]
    fn dict_size_property_round_trips() {
        for dict_size in [1 << 20, 1 << 23, 1 << 26, 0xFFFF_FFFF] {
            let prop = encode_lzma2_dict_size(dict_size).unwrap();
            let back = decode_lzma2_dict_size(prop).unwrap();
            assert!(back >= dict_size || dict_size == 0xFFFF_FFFF);
        }
    }

    #[test]
    fn index_length_matches_backward_size_accounting() {
        let records = vec![
            IndexRecord { unpadded_size: 100, uncompressed_size: 1000 },
            IndexRecord { unpadded_size: 4000, uncompressed_size: 40000 },
        ];
        let mut buf = Vec::new();
        let written = write_index(&mut buf, &records).unwrap();
        assert_eq!(buf.len() as u64, written);
        assert_eq!(written % 4, 0);
    }
}
