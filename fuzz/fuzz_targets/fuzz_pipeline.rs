#![no_main]

use std::io::Cursor;

use libfuzzer_sys::fuzz_target;
use partar_core::config::Options;
use partar_core::pipeline::compress;

fuzz_target!(|data: &[u8]| {
    // The input need not be a well-formed tar stream; a garbage byte soup
    // should end in a typed `Error::Tar`, never a panic or a hang. Keep
    // inputs small and worker count low so a corpus run stays fast.
    if data.len() > 2_000_000 {
        return;
    }

    let mut options = Options::new();
    options.workers = 2;
    options.block_in = 64 * 1024;

    let mut out = Vec::new();
    let _ = compress(Cursor::new(data.to_vec()), &mut out, options);
});
