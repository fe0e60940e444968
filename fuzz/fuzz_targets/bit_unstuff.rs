#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: BitUnstuffer::decode on arbitrary bytes.
//
// The element limit keeps hostile counts from allocating gigabytes; the
// returned end offset must stay inside the input.
fuzz_target!(|data: &[u8]| {
    let unstuffer = lerc_wire::BitUnstuffer::new(3).with_max_elements(1 << 16);
    if let Ok((values, end)) = unstuffer.decode(data, 0) {
        assert!(end <= data.len());
        assert!(values.len() <= 1 << 16);
    }
});
