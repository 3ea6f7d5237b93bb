#![no_main]

use libfuzzer_sys::fuzz_target;
use partar_core::fileindex::parse;

fuzz_target!(|data: &[u8]| {
    // A malformed file-index payload (truncated offset, missing NUL
    // terminator, invalid UTF-8 name) must surface as an error, not a panic
    // or an out-of-bounds read.
    let _ = parse(data);
});
