/// Implementation of `lerc validate`.
///
/// Runs a full decode with checksum verification (unless `--no-checksum`)
/// and prints `✓` lines on success or a single `✗` diagnostic on failure.
///
/// # Success output
///
/// ```text
/// ✓ Header: Lerc2 v3, Float, 256x256
/// ✓ Checksum: 0x5A1C09E3 matches
/// ✓ Mask: 65536 of 65536 pixels valid
/// ✓ Pixels: decoded, 140322 of 140322 bytes consumed
/// ```
///
/// # Failure output
///
/// ```text
/// ✗ Error: tile at row 8, col 16: integrity code 0, expected 2
/// ```
use std::fs;

use anyhow::{Context, Result, anyhow};
use lerc_decoder::{DecodeError, DecodeOptions, LercDecoder};
use lerc_wire::checksum::CHECKSUM_VERSION;

use crate::ValidateArgs;

/// Run the `lerc validate` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read or the blob fails to decode.
pub fn run(args: &ValidateArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;

    let options = DecodeOptions::default()
        .with_checksum(!args.no_checksum)
        .with_start_offset(args.offset);

    match LercDecoder::decode_with_options(&bytes, &options) {
        Ok(raster) => {
            let header = &raster.header;
            println!(
                "✓ Header: Lerc2 v{}, {}, {}x{}",
                header.version, header.data_type, header.width, header.height
            );
            if args.no_checksum {
                println!("- Checksum: skipped");
            } else if header.version >= CHECKSUM_VERSION {
                println!("✓ Checksum: {:#010X} matches", header.checksum);
            } else {
                println!("- Checksum: not present before v{CHECKSUM_VERSION}");
            }
            println!(
                "✓ Mask: {} of {} pixels valid",
                raster.valid_count(),
                header.pixel_count()
            );
            println!(
                "✓ Pixels: decoded, {} of {} bytes consumed",
                raster.bytes_consumed, header.blob_size
            );
            Ok(())
        }
        Err(e) => {
            println!("✗ Error: {}", diagnostic(&e));
            Err(anyhow!("validation failed"))
        }
    }
}

// ── Error formatting ──────────────────────────────────────────────────────────

fn diagnostic(e: &DecodeError) -> String {
    match e {
        DecodeError::Unsupported(feature) => {
            format!("well-formed header, but the body uses an unsupported encoding ({feature})")
        }
        DecodeError::Truncated {
            blob_size,
            available,
        } => format!("blob truncated: header declares {blob_size} bytes, file has {available}"),
        other => other.to_string(),
    }
}
