//! Parallel tar-to-xz compressor.
//!
//! Reads a tar stream and produces a single xz container compressed with
//! LZMA2, using a fixed pipeline of threads: one reader, a pool of encoder
//! workers, and a writer. Blocks are compressed independently and
//! concurrently, then reassembled into on-disk order. Alongside the
//! standard xz block index, the output carries an auxiliary file index
//! mapping each tar member's name to its uncompressed byte offset, enabling
//! random access without decompressing the whole stream.
//!
//! # Quick start
//!
//! ```no_run
//! use partar_core::{compress_file, config::Options};
//!
//! compress_file("archive.tar", "archive.tar.xz", Options::new()).unwrap();
//! ```
//!
//! # Architecture
//!
//! 1. **[`reader`]**: drives a streaming tar parser and fills block buffers.
//! 2. **[`encoder`]**: a pool of worker threads, each compressing one block
//!    buffer into a complete, self-contained xz block.
//! 3. **[`writer`]**: restores sequence order and streams blocks to the
//!    output file, then appends the file index, block index, and footer.
//!
//! [`pipeline::compress`] wires these together; [`compress_file`] is the
//! convenience entry point over paths.

pub mod buffer;
pub mod config;
pub mod container;
pub mod encoder;
pub mod error;
pub mod fileindex;
pub mod pipeline;
pub mod reader;
pub mod tarsource;
pub mod writer;

pub use config::Options;
pub use error::{Error, Result};

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

/// Compresses the tar file at `input_path` into a new xz container at
/// `output_path`, using `options` for the LZMA2 settings, check kind, and
/// worker count.
pub fn compress_file<P: AsRef<Path>, Q: AsRef<Path>>(
    input_path: P,
    output_path: Q,
    options: Options,
) -> Result<()> {
    let input = File::open(input_path).map_err(Error::Input)?;
    let output = File::create(output_path).map_err(Error::Output)?;
    let mut writer = BufWriter::new(output);

    pipeline::compress(input, &mut writer, options)?;

    use std::io::Write;
    writer.flush().map_err(Error::Output)?;

    Ok(())
}
