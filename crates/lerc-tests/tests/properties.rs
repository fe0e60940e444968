//! Property tests over generated rasters, plus inline snapshots of the
//! diagnostic formats.

use lerc_decoder::{DecodeOptions, LercDecoder};
use lerc_tests::BlobBuilder;
use lerc_wire::DataType;
use proptest::prelude::*;

fn raster_with_mask() -> impl Strategy<Value = (usize, usize, Vec<bool>, Vec<u8>)> {
    (1usize..40, 1usize..40).prop_flat_map(|(w, h)| {
        (
            Just(w),
            Just(h),
            prop::collection::vec(any::<bool>(), w * h),
            prop::collection::vec(0u8..=200, w * h),
        )
    })
}

fn expected(values: &[f64], valid: &[bool]) -> Vec<f64> {
    values
        .iter()
        .zip(valid)
        .map(|(&v, &ok)| if ok { v } else { 0.0 })
        .collect()
}

proptest! {
    #[test]
    fn tiled_byte_rasters_decode_exactly(
        (w, h, valid, raw) in raster_with_mask(),
        micro_block_size in prop::sample::select(vec![4, 8, 16]),
    ) {
        let values: Vec<f64> = raw.iter().map(|&v| f64::from(v)).collect();
        let blob = BlobBuilder::new(w as i32, h as i32, DataType::Byte)
            .micro_block_size(micro_block_size)
            .valid_mask(valid.clone())
            .tiled_stuffed(&values)
            .build();

        let raster = LercDecoder::decode(&blob.bytes).unwrap();
        let decoded: Vec<f64> = (0..w * h).map(|k| raster.pixels.get(k).unwrap()).collect();
        prop_assert_eq!(decoded, expected(&values, &valid));
        for (k, &ok) in valid.iter().enumerate() {
            prop_assert_eq!(raster.is_valid(k), ok);
        }
    }

    #[test]
    fn one_sweep_int_rasters_decode_exactly(
        (w, h, valid, _) in raster_with_mask(),
        seed in any::<i32>(),
    ) {
        let values: Vec<f64> = (0..w * h)
            .map(|k| f64::from(seed.wrapping_mul(k as i32 + 1)))
            .collect();
        let blob = BlobBuilder::new(w as i32, h as i32, DataType::Int)
            .valid_mask(valid.clone())
            .one_sweep(&values)
            .build();

        let raster = LercDecoder::decode(&blob.bytes).unwrap();
        let decoded: Vec<f64> = (0..w * h).map(|k| raster.pixels.get(k).unwrap()).collect();
        prop_assert_eq!(decoded, expected(&values, &valid));
    }

    #[test]
    fn mutated_blobs_never_panic_and_decode_deterministically(
        (w, h, valid, raw) in raster_with_mask(),
        flips in prop::collection::vec((any::<prop::sample::Index>(), any::<u8>()), 1..8),
    ) {
        let values: Vec<f64> = raw.iter().map(|&v| f64::from(v)).collect();
        let mut bytes = BlobBuilder::new(w as i32, h as i32, DataType::UShort)
            .valid_mask(valid)
            .tiled_stuffed(&values)
            .build()
            .bytes;
        for (index, xor) in flips {
            let i = index.index(bytes.len());
            bytes[i] ^= xor;
        }

        let options = DecodeOptions::default().with_max_pixels(1 << 16);
        let first = format!("{:?}", LercDecoder::decode_with_options(&bytes, &options));
        let second = format!("{:?}", LercDecoder::decode_with_options(&bytes, &options));
        prop_assert_eq!(first, second);
    }
}

// ── Diagnostic formats ────────────────────────────────────────────────────────

#[test]
fn header_display() {
    let blob = BlobBuilder::new(3, 2, DataType::Float)
        .one_sweep(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0])
        .build();
    let header = LercDecoder::read_info(&blob.bytes).unwrap();
    insta::assert_snapshot!(
        header.to_string(),
        @"Lerc2 v3 FLOAT 3x2 valid=6 mb=8 blob=91 maxZError=0.5 z=[1, 6]"
    );
}

#[test]
fn tile_integrity_error_display() {
    let blob = BlobBuilder::new(16, 1, DataType::Int)
        .z_range(0.0, 1.0)
        .tiled([lerc_tests::zero_tile(0), lerc_tests::zero_tile(0)])
        .build();
    let err = LercDecoder::decode(&blob.bytes).unwrap_err();
    insta::assert_snapshot!(
        err.to_string(),
        @"tile at row 0, col 8: integrity code 0, expected 1"
    );
}
