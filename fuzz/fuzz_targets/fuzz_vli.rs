#![no_main]

use libfuzzer_sys::fuzz_target;
use partar_core::container::decode_vli;

fuzz_target!(|data: &[u8]| {
    // Arbitrary byte soup must never panic: either a value comes out, or a
    // well-formed io::Error does, for truncated input or a value that never
    // terminates within the format's bit budget.
    let _ = decode_vli(&mut &data[..]);
});
