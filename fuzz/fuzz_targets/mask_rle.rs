#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: RLE mask expansion into a fixed-size bitmask.
//
// First byte picks the output size, the rest is the RLE stream.
fuzz_target!(|data: &[u8]| {
    let Some((&size, rle)) = data.split_first() else {
        return;
    };
    let mut out = vec![0u8; usize::from(size)];
    let _ = lerc_decoder::mask::rle_decompress(rle, &mut out);
});
