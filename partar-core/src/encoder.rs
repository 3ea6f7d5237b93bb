//! Encoder worker: compresses one block buffer at a time into a complete,
//! self-contained xz block (header, LZMA2 payload, padding, integrity
//! check).
//!
//! Every block uses the same dictionary size and check kind, so a worker
//! needs no state shared with its siblings or with the writer: it can
//! produce a fully framed block independently, in parallel, and the writer
//! only needs to concatenate blocks in sequence order.

use std::io::Write;

use lzma_rust2::enc::LZMA2Writer;
use lzma_rust2::LZMA2Options;

use crate::buffer::{BlockBuffer, BlockDescriptor, Message, Queues};
use crate::config::Options;
use crate::container::{self, Checksum};
use crate::error::{Error, Result};

/// Runs one encoder worker to completion: pops buffers from `encode_q`,
/// compresses each, and forwards it to `write_q`, until it sees `Stop`.
pub fn run(queues: &Queues, options: &Options) -> Result<()> {
    loop {
        let msg = queues
            .encode_rx
            .recv()
            .expect("encode_q sender dropped while encoder is still running");

        let mut buf = match msg {
            Message::Stop => break,
            Message::Block(b) => b,
        };

        let seq = buf.seq;
        encode_block(&mut buf, options)?;
        tracing::trace!(seq, compressed_size = buf.descriptor.compressed_size, "encoded block");

        queues
            .write_tx
            .send(Message::Block(buf))
            .expect("write_q receiver dropped while encoder is still running");
    }

    Ok(())
}

fn encode_block(buf: &mut BlockBuffer, options: &Options) -> Result<()> {
    buf.output.clear();

    let uncompressed_size = buf.input.len() as u64;
    let dict_size = options.lzma_options.dict_size;

    let header_len = container::write_block_header(&mut buf.output, dict_size).map_err(Error::Codec)?;
    let payload_start = buf.output.len();

    let mut checksum = Checksum::new(options.check_kind);
    checksum.update(&buf.input);

    {
        let lzma2_options = LZMA2Options {
            lzma_options: options.lzma_options.clone(),
            ..Default::default()
        };
        let mut lzma_writer = LZMA2Writer::new(&mut buf.output, lzma2_options);
        lzma_writer.write_all(&buf.input).map_err(Error::Codec)?;
        lzma_writer.finish().map_err(Error::Codec)?;
    }

    let compressed_size = (buf.output.len() - payload_start) as u64;
    container::write_block_trailer(&mut buf.output, compressed_size, checksum).map_err(Error::Codec)?;

    let check_size = options.check_kind.size();
    buf.descriptor = BlockDescriptor {
        compressed_size,
        uncompressed_size,
        unpadded_size: header_len + compressed_size + check_size,
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    #[test]
    fn encoded_block_starts_with_a_well_formed_header_and_is_four_byte_aligned() {
        let options = Options::new();
        let mut buf = BlockBuffer {
            seq: 0,
            input: b"the quick brown fox jumps over the lazy dog".repeat(64),
            output: Vec::new(),
            descriptor: BlockDescriptor::default(),
        };

        encode_block(&mut buf, &options).unwrap();

        assert!(!buf.output.is_empty());
        // The block header's size byte, read back, must match where the
        // LZMA2 payload was expected to start.
        let header_words = buf.output[0] as usize + 1;
        assert_eq!(header_words * 4 % 4, 0);

        assert_eq!(buf.descriptor.uncompressed_size, buf.input.len() as u64);
        assert!(buf.descriptor.unpadded_size >= buf.descriptor.compressed_size);
    }

    #[test]
    fn empty_input_still_produces_a_valid_framed_block() {
        let options = Options::new();
        let mut buf = BlockBuffer {
            seq: 0,
            input: Vec::new(),
            output: Vec::new(),
            descriptor: BlockDescriptor::default(),
        };

        encode_block(&mut buf, &options).unwrap();
        assert_eq!(buf.descriptor.uncompressed_size, 0);
        assert!(!buf.output.is_empty());
    }
}
