#![no_main]

use libfuzzer_sys::fuzz_target;

// Fuzz target: full LercDecoder entry point.
//
// Covers header validation, the mask section, the one-sweep path, the
// Huffman flag and every tile kind. The pixel ceiling keeps allocations
// small; checksum verification is on so the Fletcher-32 path runs too.
fuzz_target!(|data: &[u8]| {
    let options = lerc_decoder::DecodeOptions::default()
        .with_max_pixels(1 << 20)
        .with_checksum(data.first().is_some_and(|b| b & 1 == 1));
    if let Ok(raster) = lerc_decoder::LercDecoder::decode_with_options(data, &options) {
        assert!(raster.bytes_consumed <= raster.header.blob_size_usize());
        assert_eq!(
            raster.pixel_data().len(),
            raster.header.pixel_count() * raster.data_type().wire_width()
        );
    }
});
