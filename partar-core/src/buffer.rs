//! Block buffer pool and the typed queues that shuttle buffers between
//! pipeline stages.
//!
//! The pool is not a distinct object — as in the design notes, empty
//! buffers simply live inside the `read` queue between uses. A fixed
//! cardinality of `2N + 4` buffers (see [`crate::config::Options::pool_capacity`])
//! is allocated once at startup and recirculated for the lifetime of the
//! pipeline; no buffer is ever allocated or freed after that.

use crossbeam_channel::{Receiver, Sender};

/// Metadata describing how a block was framed on disk, filled in once the
/// encoder has compressed it.
#[derive(Debug, Clone, Default)]
pub struct BlockDescriptor {
    /// Size of the compressed payload, not counting the block header,
    /// padding, or integrity check.
    pub compressed_size: u64,
    /// Size of the original uncompressed data this block covers.
    pub uncompressed_size: u64,
    /// `header + payload + padding + check`, the quantity the xz index
    /// stores per block.
    pub unpadded_size: u64,
}

/// The unit of work passed between the reader, the encoder workers, and the
/// writer. Exactly one owner touches a buffer's `input`/`output` regions at
/// any instant; ownership transfers by moving the buffer through a queue.
pub struct BlockBuffer {
    /// Dense, monotonically increasing sequence number assigned by the
    /// reader. Used by the writer to restore on-disk order.
    pub seq: u64,
    /// Uncompressed tar bytes, up to `BLOCK_IN` long.
    pub input: Vec<u8>,
    /// Compressed LZMA2 block payload (header + compressed data + check),
    /// populated by an encoder worker.
    pub output: Vec<u8>,
    /// Populated after encoding.
    pub descriptor: BlockDescriptor,
}

impl BlockBuffer {
    fn new(block_in: usize) -> Self {
        Self {
            seq: 0,
            input: Vec::with_capacity(block_in),
            output: Vec::new(),
            descriptor: BlockDescriptor::default(),
        }
    }

    /// Resets a buffer for reuse by the reader after the writer has
    /// consumed it and returned it to `read_q`.
    pub fn reset(&mut self, seq: u64) {
        self.seq = seq;
        self.input.clear();
        self.output.clear();
        self.descriptor = BlockDescriptor::default();
    }
}

/// A message carried on a pipeline queue: either a buffer of work, or a
/// one-way shutdown signal. `Stop` carries no payload — sending N of them
/// down `encode_q` tells exactly N encoder workers to exit.
pub enum Message {
    Block(Box<BlockBuffer>),
    Stop,
}

/// The three typed queues the pipeline moves buffers through. `read_q`
/// holds buffers available for the reader to fill; `encode_q` holds full
/// buffers waiting on an encoder; `write_q` holds encoded buffers waiting
/// on the writer's reorder step.
pub struct Queues {
    pub read_tx: Sender<Message>,
    pub read_rx: Receiver<Message>,
    pub encode_tx: Sender<Message>,
    pub encode_rx: Receiver<Message>,
    pub write_tx: Sender<Message>,
    pub write_rx: Receiver<Message>,
}

impl Queues {
    /// Creates the three queues and pre-populates `read_q` with
    /// `pool_capacity` freshly allocated, empty buffers.
    pub fn new(pool_capacity: usize, block_in: usize) -> Self {
        let (read_tx, read_rx) = crossbeam_channel::unbounded();
        let (encode_tx, encode_rx) = crossbeam_channel::unbounded();
        let (write_tx, write_rx) = crossbeam_channel::unbounded();

        for _ in 0..pool_capacity {
            read_tx
                .send(Message::Block(Box::new(BlockBuffer::new(block_in))))
                .expect("read_q receiver dropped during pool initialization");
        }

        Self {
            read_tx,
            read_rx,
            encode_tx,
            encode_rx,
            write_tx,
            write_rx,
        }
    }
}
