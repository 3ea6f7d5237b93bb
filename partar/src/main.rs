//! partar - parallel tar-to-xz compressor.
//!
//! Compresses a tar archive into a single xz container, using one reader
//! thread, a pool of encoder threads sized to the available cores, and one
//! writer thread, so large archives compress at close to full multi-core
//! throughput instead of bottlenecking on a single LZMA2 encoder.
//!
//! # Usage
//!
//! ```bash
//! compress input.tar output.tar.xz
//! ```
//!
//! There are no other flags: the worker count is always derived from the
//! host's available parallelism (overridable only via the `PARTAR_JOBS`
//! environment variable, for tests), and the LZMA2 preset, dictionary size,
//! and integrity check are fixed.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;

use partar_core::{compress_file, Options};

/// Compress a tar archive into an xz container.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Tar archive to read.
    input: PathBuf,

    /// Path to write the compressed xz container to.
    output: PathBuf,
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    let result = compress_file(&args.input, &args.output, Options::new()).with_context(|| {
        format!(
            "failed to compress {} to {}",
            args.input.display(),
            args.output.display()
        )
    });

    // `main() -> Result` would hand this to the default `Termination` impl,
    // which prints anyhow's multi-line "Caused by:" chain. §7 wants exactly
    // one diagnostic line, so the chain is flattened with `{:#}` instead.
    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}
