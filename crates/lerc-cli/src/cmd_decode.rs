/// Implementation of `lerc decode`.
///
/// Decodes one blob and writes its pixel buffer, row-major and
/// little-endian at the blob's declared data type, to `--output`. Invalid
/// pixels are written as 0. A short summary goes to stdout.
///
/// # Example output
///
/// ```text
/// Decoded 256x256 Float (65536 valid) → dem.f32 (262144 bytes)
///   min:   -12.5
///   max:   811.25
///   next:  offset 140322
/// ```
use std::fs;

use anyhow::{Context, Result};
use lerc_decoder::{DecodeOptions, DecodedRaster, LercDecoder};
use tracing::info;

use crate::DecodeArgs;

/// Run the `lerc decode` command.
///
/// # Errors
///
/// Returns an error if the input cannot be read, the blob fails to decode,
/// or the output cannot be written.
pub fn run(args: &DecodeArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let mut options = DecodeOptions::default()
        .with_checksum(args.verify_checksum)
        .with_start_offset(args.offset);
    if let Some(max_pixels) = args.max_pixels {
        options = options.with_max_pixels(max_pixels);
    }

    let raster = LercDecoder::decode_with_options(&bytes, &options)
        .with_context(|| format!("failed to decode {}", args.file.display()))?;

    let stats = ValueRange::of(&raster);
    let next_offset = args.offset + raster.header.blob_size_usize();
    let width = raster.width();
    let height = raster.height();
    let data_type = raster.data_type();
    let valid = raster.valid_count();

    let pixels = raster.into_pixel_data();
    fs::write(&args.output, &pixels)
        .with_context(|| format!("cannot write {}", args.output.display()))?;
    info!(bytes = pixels.len(), path = %args.output.display(), "wrote pixel data");

    println!(
        "Decoded {width}x{height} {data_type} ({valid} valid) → {} ({} bytes)",
        args.output.display(),
        pixels.len()
    );
    if let Some(ValueRange { min, max }) = stats {
        println!("  min:   {min}");
        println!("  max:   {max}");
    }
    if next_offset < bytes.len() {
        println!("  next:  offset {next_offset}");
    }
    Ok(())
}

/// Smallest and largest value among the valid pixels.
struct ValueRange {
    min: f64,
    max: f64,
}

impl ValueRange {
    fn of(raster: &DecodedRaster) -> Option<Self> {
        (0..raster.header.pixel_count())
            .filter(|&k| raster.is_valid(k))
            .filter_map(|k| raster.pixels.get(k))
            .fold(None, |acc, v| match acc {
                None => Some(Self { min: v, max: v }),
                Some(r) => Some(Self {
                    min: r.min.min(v),
                    max: r.max.max(v),
                }),
            })
    }
}
