//! Wires the reader, the encoder pool, and the writer into a running
//! pipeline and drives it to completion.
//!
//! Thread layout: one reader thread, `options.workers` encoder threads, and
//! the writer on the calling thread. A small supervisor closure runs
//! alongside the reader (on the same thread, after it finishes) so that the
//! "join every encoder, then tell the writer there's nothing left" step
//! happens without blocking the writer, which is busy consuming `write_q`
//! the whole time.

use std::io::{Read, Write};
use std::sync::Arc;
use std::thread;

use crate::buffer::{Message, Queues};
use crate::config::Options;
use crate::encoder;
use crate::error::{Error, Result};
use crate::reader::{self, ReadOutcome};
use crate::writer;

/// Compresses a tar byte stream into a complete xz container, written to
/// `out`. Blocks until the whole input has been read, compressed, and
/// written.
pub fn compress<R, W>(input: R, out: &mut W, options: Options) -> Result<()>
where
    R: Read + Send + 'static,
    W: Write,
{
    tracing::info!(workers = options.workers, block_in = options.block_in, "starting pipeline");

    let queues = Arc::new(Queues::new(options.pool_capacity(), options.block_in));

    // `thread::Builder::spawn` (not `thread::spawn`) so a thread-creation
    // failure surfaces as a typed `Error::Resource` instead of an unhandled
    // panic, per the Resource error taxonomy in §7.
    let mut encoder_handles = Vec::with_capacity(options.workers);
    for i in 0..options.workers {
        let queues = Arc::clone(&queues);
        let worker_options = options.clone();
        let spawned = thread::Builder::new()
            .name(format!("partar-encoder-{i}"))
            .spawn(move || encoder::run(&queues, &worker_options));

        match spawned {
            Ok(handle) => encoder_handles.push(handle),
            Err(err) => {
                // Shut down whatever encoders did start before giving up, so
                // this failure path never leaves threads blocked forever.
                for _ in 0..encoder_handles.len() {
                    let _ = queues.encode_tx.send(Message::Stop);
                }
                for handle in encoder_handles {
                    let _ = handle.join();
                }
                return Err(Error::Resource("encoder", err.to_string()));
            }
        }
    }

    let (finish_tx, finish_rx) = crossbeam_channel::bounded::<Result<ReadOutcome>>(1);

    let reader_spawn = {
        let queues = Arc::clone(&queues);
        let options = options.clone();
        thread::Builder::new().name("partar-reader".to_string()).spawn(move || {
            let mut read_result = reader::run(input, &queues, &options);

            // Shut the encoder pool down and unblock the writer regardless
            // of whether reading succeeded, so a read failure can never
            // leave either side of the pipeline waiting forever.
            for _ in 0..options.workers {
                let _ = queues.encode_tx.send(Message::Stop);
            }
            for handle in encoder_handles {
                let outcome = match handle.join() {
                    Ok(result) => result,
                    Err(_) => Err(Error::Resource("encoder", "thread panicked".to_string())),
                };
                if let (Err(err), true) = (outcome, read_result.is_ok()) {
                    read_result = Err(err);
                }
            }

            let _ = finish_tx.send(read_result);
            let _ = queues.write_tx.send(Message::Stop);
        })
    };

    let reader_handle = match reader_spawn {
        Ok(handle) => handle,
        Err(err) => {
            // The reader never started, so nothing will ever tell the
            // encoder pool to stop; do that ourselves before returning.
            for _ in 0..options.workers {
                let _ = queues.encode_tx.send(Message::Stop);
            }
            return Err(Error::Resource("reader", err.to_string()));
        }
    };

    let write_result = writer::run(&queues.write_rx, &queues.read_tx, finish_rx, out, &options);

    if reader_handle.join().is_err() {
        return Err(Error::Resource("reader", "thread panicked".to_string()));
    }

    match &write_result {
        Ok(()) => tracing::info!("pipeline finished"),
        Err(err) => tracing::warn!(%err, "pipeline failed"),
    }

    write_result
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn compresses_a_small_tar_into_a_well_formed_xz_stream() {
        let tar_bytes = make_tar(&[("hello.txt", b"hello, world")]);

        let mut options = Options::new();
        options.workers = 2;

        let mut out = Vec::new();
        compress(std::io::Cursor::new(tar_bytes), &mut out, options).unwrap();

        assert!(out.len() > 12 + 12, "stream must have at least header and footer");
        assert_eq!(&out[..6], &crate::container::XZ_MAGIC);
        assert_eq!(&out[out.len() - 2..], &crate::container::XZ_FOOTER_MAGIC);
    }

    #[test]
    fn compresses_an_empty_tar() {
        let tar_bytes = make_tar(&[]);

        let mut options = Options::new();
        options.workers = 1;

        let mut out = Vec::new();
        compress(std::io::Cursor::new(tar_bytes), &mut out, options).unwrap();

        assert_eq!(&out[..6], &crate::container::XZ_MAGIC);
    }

    #[test]
    fn a_reader_failure_does_not_deadlock_the_encoder_pool_or_the_writer() {
        struct Flaky;
        impl Read for Flaky {
            fn read(&mut self, _buf: &mut [u8]) -> std::io::Result<usize> {
                Err(std::io::Error::new(std::io::ErrorKind::Other, "simulated"))
            }
        }

        let mut options = Options::new();
        options.workers = 3;

        let mut out = Vec::new();
        let result = compress(Flaky, &mut out, options);
        assert!(result.is_err());
    }
}
