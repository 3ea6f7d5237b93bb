//! The writer: restores sequence order among encoded blocks, streams them to
//! the output file, and writes the trailing file-index block, block index,
//! and stream footer once the reader has told it there is nothing left.
//!
//! Runs on the thread that called [`crate::pipeline::compress`] while the
//! reader and encoder workers run on their own threads, so the output file
//! gets bytes as soon as blocks are ready instead of only at the very end.

use std::collections::HashMap;
use std::io::Write;

use crossbeam_channel::{Receiver, Sender};

use crate::buffer::{BlockBuffer, Message};
use crate::config::Options;
use crate::container::{self, Checksum, IndexRecord};
use crate::error::{Error, Result};
use crate::fileindex::{self, FileIndexEntry};
use crate::reader::ReadOutcome;

/// Drives the writer role to completion: writes the stream header, then
/// reorders and streams every data block as it arrives, then (once
/// `finish_rx` delivers the reader's final outcome) appends the file-index
/// block, the block index, and the stream footer.
pub fn run<W: Write>(
    write_rx: &Receiver<Message>,
    read_tx: &Sender<Message>,
    finish_rx: Receiver<Result<ReadOutcome>>,
    out: &mut W,
    options: &Options,
) -> Result<()> {
    container::write_stream_header(out, options.check_kind).map_err(Error::Output)?;

    let mut records = Vec::new();
    let mut pending: HashMap<u64, Box<BlockBuffer>> = HashMap::new();
    let mut next_seq = 0u64;

    loop {
        let msg = write_rx
            .recv()
            .expect("write_q sender dropped before sending Stop");

        match msg {
            Message::Stop => break,
            Message::Block(buf) => {
                pending.insert(buf.seq, buf);
                while let Some(buf) = pending.remove(&next_seq) {
                    write_block(out, &buf, &mut records)?;
                    next_seq += 1;

                    // Buffers only flow back to read_q once their bytes are
                    // safely on disk in order; the reader resets them on
                    // reuse.
                    let _ = read_tx.send(Message::Block(buf));
                }
            }
        }
    }

    let outcome = finish_rx
        .recv()
        .expect("reader supervisor dropped without delivering its outcome")?;

    write_file_index_block(out, &outcome.file_index, options, &mut records)?;

    let index_size = container::write_index(out, &records).map_err(Error::Output)?;
    container::write_stream_footer(out, index_size, options.check_kind).map_err(Error::Output)?;

    tracing::debug!(blocks = records.len(), "wrote stream index and footer");

    Ok(())
}

fn write_block<W: Write>(
    out: &mut W,
    buf: &BlockBuffer,
    records: &mut Vec<IndexRecord>,
) -> Result<()> {
    out.write_all(&buf.output).map_err(Error::Output)?;
    records.push(IndexRecord {
        unpadded_size: buf.descriptor.unpadded_size,
        uncompressed_size: buf.descriptor.uncompressed_size,
    });
    Ok(())
}

/// Serializes and compresses the file index as one final block, following
/// the same framing every data block uses, so a random-access reader can
/// locate and decode it exactly like any other block.
fn write_file_index_block<W: Write>(
    out: &mut W,
    entries: &[FileIndexEntry],
    options: &Options,
    records: &mut Vec<IndexRecord>,
) -> Result<()> {
    use lzma_rust2::enc::LZMA2Writer;
    use lzma_rust2::LZMA2Options;

    let payload = fileindex::serialize(entries);
    let dict_size = options.lzma_options.dict_size;

    let mut block = Vec::new();
    let header_len = container::write_block_header(&mut block, dict_size).map_err(Error::Output)?;
    let payload_start = block.len();

    let mut checksum = Checksum::new(options.check_kind);
    checksum.update(&payload);

    {
        let lzma2_options = LZMA2Options {
            lzma_options: options.lzma_options.clone(),
            ..Default::default()
        };
        let mut lzma_writer = LZMA2Writer::new(&mut block, lzma2_options);
        lzma_writer.write_all(&payload).map_err(Error::Output)?;
        lzma_writer.finish().map_err(Error::Output)?;
    }

    let compressed_size = (block.len() - payload_start) as u64;
    container::write_block_trailer(&mut block, compressed_size, checksum).map_err(Error::Output)?;

    out.write_all(&block).map_err(Error::Output)?;

    let check_size = options.check_kind.size();
    records.push(IndexRecord {
        unpadded_size: header_len + compressed_size + check_size,
        uncompressed_size: payload.len() as u64,
    });

    Ok(())
}
