#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: bit_stuffer::encode -> BitUnstuffer::decode roundtrip.
fuzz_target!(|raw: Vec<u32>| {
    let values: Vec<u32> = raw.iter().map(|v| v & i32::MAX as u32).collect();
    let block = lerc_wire::bit_stuffer::encode(&values);
    let (decoded, end) = lerc_wire::BitUnstuffer::new(3).decode(&block, 0).unwrap();
    assert_eq!(decoded, values);
    assert_eq!(end, block.len());
});
