#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: HeaderInfo::read_from with arbitrary bytes.
//
// A header that parses must write back to the same 62 bytes.
fuzz_target!(|data: &[u8]| {
    if let Ok(header) = lerc_wire::HeaderInfo::read_from(data) {
        let mut buf = [0u8; lerc_wire::header::HEADER_SIZE];
        header.write_to(&mut buf).unwrap();
        assert_eq!(&buf[..], &data[..buf.len()]);
    }
});
