//! The reader thread: owns the input file, drives the tar event source,
//! fills block buffers, and hands full ones to the encoder pool.
//!
//! This is the single-threaded half of the pipeline that also builds the
//! file index, since both the byte-offset bookkeeping and the multi-header
//! coalescing rule need a strictly sequential view of the input.

use std::cell::Cell;
use std::io::{self, Read};
use std::rc::Rc;

use crate::buffer::{BlockBuffer, Message, Queues};
use crate::config::Options;
use crate::error::{Error, Result};
use crate::fileindex::{FileIndexBuilder, FileIndexEntry};
use crate::tarsource;

/// Intercepts every byte pulled through it by the tar parser, appending a
/// copy into whichever block buffer the reader currently has open, rotating
/// buffers through `read_q`/`encode_q` as they fill.
///
/// Capping each individual `read()` call at `CHUNKSIZE` keeps a single tar
/// header read from ever being split across two block buffers in a way that
/// would complicate accounting; it has no effect on correctness beyond that,
/// since `Read::read` is always allowed to return fewer bytes than asked.
const CHUNKSIZE: usize = 64 * 1024;

struct BlockFillingReader<'a, R: Read> {
    inner: R,
    queues: &'a Queues,
    block_in: usize,
    current: Option<Box<BlockBuffer>>,
    next_seq: u64,
    total_read: Rc<Cell<u64>>,
}

impl<'a, R: Read> BlockFillingReader<'a, R> {
    fn new(inner: R, queues: &'a Queues, block_in: usize, total_read: Rc<Cell<u64>>) -> Self {
        Self {
            inner,
            queues,
            block_in,
            current: None,
            next_seq: 0,
            total_read,
        }
    }

    fn ensure_current(&mut self) -> io::Result<()> {
        if self.current.is_none() {
            let msg = self
                .queues
                .read_rx
                .recv()
                .expect("read_q sender dropped while reader is still running");
            let mut buf = match msg {
                Message::Block(b) => b,
                Message::Stop => unreachable!("read_q never carries Stop"),
            };
            buf.reset(self.next_seq);
            self.next_seq += 1;
            self.current = Some(buf);
        }
        Ok(())
    }

    fn flush_current(&mut self) {
        if let Some(buf) = self.current.take() {
            if buf.input.is_empty() {
                // Nothing was ever written into this buffer (it was fetched
                // right before true input EOF); hand it straight back
                // instead of dropping it, so the fixed-cardinality pool
                // stays whole until teardown.
                self.queues
                    .read_tx
                    .send(Message::Block(buf))
                    .expect("read_q receiver dropped while reader is still running");
            } else {
                self.queues
                    .encode_tx
                    .send(Message::Block(buf))
                    .expect("encode_q receiver dropped while reader is still running");
            }
        }
    }

    /// Reads directly from the inner reader, bypassing block-buffer
    /// accounting, until EOF. Used after the tar parser has stopped
    /// consuming input to absorb any trailing padding beyond the two
    /// required zero blocks, so every byte of the input ends up inside some
    /// block and the decompressed output reproduces it exactly.
    fn drain_to_eof(&mut self) -> io::Result<()> {
        let mut scratch = [0u8; CHUNKSIZE];
        loop {
            let n = self.read(&mut scratch)?;
            if n == 0 {
                break;
            }
        }
        Ok(())
    }
}

impl<'a, R: Read> Read for BlockFillingReader<'a, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.ensure_current()?;

        let current = self.current.as_mut().expect("ensure_current just filled it");
        let room = self.block_in - current.input.len();
        let want = buf.len().min(CHUNKSIZE).min(room);

        if want == 0 {
            // Current buffer is full; hand it off and try again with a
            // fresh one so the caller still sees forward progress.
            self.flush_current();
            return self.read(buf);
        }

        let n = self.inner.read(&mut buf[..want])?;
        if n == 0 {
            return Ok(0);
        }

        current.input.extend_from_slice(&buf[..n]);
        self.total_read.set(self.total_read.get() + n as u64);

        if current.input.len() == self.block_in {
            self.flush_current();
        }

        Ok(n)
    }
}

/// Result of a complete read pass: the finished file index and the total
/// number of uncompressed bytes read (needed by the writer to size the
/// sentinel and sanity-check block accounting).
pub struct ReadOutcome {
    pub file_index: Vec<FileIndexEntry>,
    pub total_read: u64,
}

/// Drives the whole reader role: reads `input` to EOF through the tar
/// parser, filling and dispatching block buffers. Does not shut the encoder
/// pool down itself — [`crate::pipeline`] does that unconditionally after
/// this returns, success or error, so a read failure can never leave the
/// encoder or writer threads blocked forever.
pub fn run<R: Read>(input: R, queues: &Queues, options: &Options) -> Result<ReadOutcome> {
    let total_read = Rc::new(Cell::new(0u64));
    let mut filling = BlockFillingReader::new(input, queues, options.block_in, total_read.clone());

    let mut file_index = FileIndexBuilder::new();

    let offset_counter = total_read.clone();
    let remaining = tarsource::drive(
        &mut filling,
        || offset_counter.get(),
        |offset, name| file_index.add_file(offset, name),
    );

    match remaining {
        Ok(_) => {}
        Err(err) => {
            tracing::warn!(%err, "tar stream ended in error");
            return Err(Error::Tar(err));
        }
    }

    filling.drain_to_eof().map_err(Error::Input)?;
    filling.flush_current();

    let total = total_read.get();
    let entries = file_index.finish(total);
    tracing::debug!(total_read = total, files = entries.len().saturating_sub(1), "finished reading input");

    Ok(ReadOutcome {
        file_index: entries,
        total_read: total,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Options;

    fn make_tar(files: &[(&str, &[u8])]) -> Vec<u8> {
        let mut builder = tar::Builder::new(Vec::new());
        for (name, data) in files {
            let mut header = tar::Header::new_gnu();
            header.set_size(data.len() as u64);
            header.set_mode(0o644);
            header.set_cksum();
            builder.append_data(&mut header, name, *data).unwrap();
        }
        builder.into_inner().unwrap()
    }

    #[test]
    fn reads_every_byte_of_the_input_into_some_block() {
        let tar_bytes = make_tar(&[("a.txt", b"hello world")]);
        let expected_len = tar_bytes.len() as u64;

        let mut options = Options::new();
        options.block_in = 512; // force several small buffers
        options.workers = 2;

        let queues = Queues::new(options.pool_capacity(), options.block_in);
        let outcome = run(&tar_bytes[..], &queues, &options).unwrap();

        assert_eq!(outcome.total_read, expected_len);

        let mut seen_bytes = 0u64;
        while let Ok(Message::Block(b)) = queues.encode_rx.try_recv() {
            seen_bytes += b.input.len() as u64;
        }
        assert_eq!(seen_bytes, expected_len);
    }

    #[test]
    fn a_trailing_empty_buffer_is_returned_to_read_q_not_dropped() {
        // block_in evenly divides the tar length, so the reader fetches one
        // more buffer from read_q right before hitting true EOF, fills it
        // with nothing, and must hand it back rather than drop it.
        let tar_bytes = make_tar(&[]); // exactly 1024 zero bytes
        assert_eq!(tar_bytes.len(), 1024);

        let mut options = Options::new();
        options.block_in = 512;
        options.workers = 2;

        let pool_capacity = options.pool_capacity();
        let queues = Queues::new(pool_capacity, options.block_in);
        run(&tar_bytes[..], &queues, &options).unwrap();

        let mut accounted_for = 0usize;
        while queues.read_rx.try_recv().is_ok() {
            accounted_for += 1;
        }
        while queues.encode_rx.try_recv().is_ok() {
            accounted_for += 1;
        }
        assert_eq!(accounted_for, pool_capacity, "no buffer should vanish from the pool");
    }

    #[test]
    fn a_tar_parse_failure_surfaces_as_a_typed_error() {
        let garbage = vec![0xFFu8; 600]; // not a valid tar header

        let mut options = Options::new();
        options.block_in = 4096;
        options.workers = 2;

        let queues = Queues::new(options.pool_capacity(), options.block_in);
        let result = run(&garbage[..], &queues, &options);
        assert!(result.is_err());
    }
}
