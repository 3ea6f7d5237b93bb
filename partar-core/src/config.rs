//! Pipeline tunables, collected into one struct instead of process globals.
//!
//! The original design threads reader state and writer state through
//! process-global variables; per its own design notes, a re-implementation
//! should "bundle these into two structures... passed by owning reference to
//! each thread at startup". `Options` is the read-only half of that: the
//! stream-wide filter/preset/check configuration every thread needs a copy
//! of.

use lzma_rust2::LZMAOptions;

/// Integrity check appended to every block and declared in the stream
/// header/footer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckKind {
    None,
    Crc32,
    Crc64,
}

impl CheckKind {
    /// Size in bytes of the check value this kind produces.
    pub fn size(self) -> u64 {
        match self {
            CheckKind::None => 0,
            CheckKind::Crc32 => 4,
            CheckKind::Crc64 => 8,
        }
    }

    /// The stream-flags byte xz uses to tag this check kind.
    pub fn flag_byte(self) -> u8 {
        match self {
            CheckKind::None => 0x00,
            CheckKind::Crc32 => 0x01,
            CheckKind::Crc64 => 0x04,
        }
    }
}

/// Stream-wide configuration, shared read-only across the reader, every
/// encoder worker, and the writer.
#[derive(Debug, Clone)]
pub struct Options {
    /// LZMA2 dictionary/match-finder settings for every block.
    pub lzma_options: LZMAOptions,
    /// Integrity check kind declared in the stream header and used per block.
    pub check_kind: CheckKind,
    /// Uncompressed capacity of one block buffer (`BLOCK_IN` in the design).
    pub block_in: usize,
    /// Number of encoder worker threads.
    pub workers: usize,
}

/// Default LZMA2 preset, matching the xz command-line tool's own default.
pub const DEFAULT_PRESET: u32 = 6;

impl Options {
    /// Builds the default configuration: preset 6, CRC64 checks, and a
    /// worker count from `available_parallelism()` (or the `PARTAR_JOBS`
    /// environment override, used only by tests — the CLI itself exposes no
    /// flag for this, per the design's "no flags in the core" rule).
    pub fn new() -> Self {
        let lzma_options = LZMAOptions::with_preset(DEFAULT_PRESET);
        // BLOCK_IN is twice the dictionary size of the chosen preset.
        let block_in = (lzma_options.dict_size as usize).saturating_mul(2);

        Self {
            lzma_options,
            check_kind: CheckKind::Crc64,
            block_in,
            workers: detect_worker_count(),
        }
    }

    /// Capacity of a block buffer's pool: `2N + 4`, enough slack that the
    /// reader, N encoders, and the writer never deadlock on buffer
    /// starvation (see the design's liveness argument).
    pub fn pool_capacity(&self) -> usize {
        2 * self.workers + 4
    }
}

impl Default for Options {
    fn default() -> Self {
        Self::new()
    }
}

fn detect_worker_count() -> usize {
    if let Ok(raw) = std::env::var("PARTAR_JOBS") {
        if let Ok(n) = raw.parse::<usize>() {
            if n > 0 {
                return n;
            }
        }
    }

    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
