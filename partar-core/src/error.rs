//! Fatal error taxonomy for the compression pipeline.
//!
//! Every error the pipeline can produce is fatal (see the design's error
//! handling policy): there is no partial recovery path, so this enum exists
//! only to let the binary crate print one precise diagnostic line and exit
//! non-zero. It is not meant to be matched on for control flow.

use std::io;

/// A fatal error from one phase of the read → encode → write pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The input tar stream could not be opened or read.
    #[error("input error: {0}")]
    Input(#[source] io::Error),

    /// The tar parser reported a fatal (non-warning) error.
    #[error("tar parse error: {0}")]
    Tar(#[source] io::Error),

    /// The output file could not be created or written to.
    #[error("output error: {0}")]
    Output(#[source] io::Error),

    /// The LZMA2 codec rejected a block, or container framing failed.
    #[error("codec error: {0}")]
    Codec(#[source] io::Error),

    /// A worker or reader thread could not be spawned or joined.
    #[error("thread {0} failed: {1}")]
    Resource(&'static str, String),
}

impl Error {
    /// Names the phase in which the error occurred, for the single
    /// diagnostic line the CLI prints on a fatal error.
    pub fn phase(&self) -> &'static str {
        match self {
            Error::Input(_) => "read",
            Error::Tar(_) => "read",
            Error::Output(_) => "write",
            Error::Codec(_) => "encode",
            Error::Resource(..) => "thread management",
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
