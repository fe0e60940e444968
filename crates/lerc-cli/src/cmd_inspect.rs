/// Implementation of `lerc inspect`.
///
/// Parses only the 62-byte header, so it works on blobs whose body is
/// damaged or uses an unsupported encoding.
///
/// # Output format
///
/// ```text
/// Lerc2 v3, Float, 256x256 (65536 pixels)
///   valid pixels:  65536 (all)
///   micro block:   8
///   blob size:     140322 bytes
///   max Z error:   0.001
///   Z range:       [-12.5, 811.25]
///   checksum:      0x5A1C09E3
/// ```
use std::fs;

use anyhow::{Context, Result};
use lerc_decoder::LercDecoder;
use lerc_wire::HeaderInfo;
use serde::Serialize;

use crate::InspectArgs;

/// JSON view of a header.
#[derive(Serialize)]
struct HeaderReport {
    version: i32,
    data_type: &'static str,
    width: i32,
    height: i32,
    num_valid_pixel: i32,
    micro_block_size: i32,
    blob_size: i32,
    max_z_error: f64,
    z_min: f64,
    z_max: f64,
    checksum: u32,
}

impl From<&HeaderInfo> for HeaderReport {
    fn from(h: &HeaderInfo) -> Self {
        Self {
            version: h.version,
            data_type: h.data_type.name(),
            width: h.width,
            height: h.height,
            num_valid_pixel: h.num_valid_pixel,
            micro_block_size: h.micro_block_size,
            blob_size: h.blob_size,
            max_z_error: h.max_z_error,
            z_min: h.z_min,
            z_max: h.z_max,
            checksum: h.checksum,
        }
    }
}

/// Run the `lerc inspect` command.
///
/// # Errors
///
/// Returns an error if the file cannot be read, the offset is past the end
/// of the file, or the header is invalid.
pub fn run(args: &InspectArgs) -> Result<()> {
    let bytes =
        fs::read(&args.file).with_context(|| format!("cannot read {}", args.file.display()))?;
    let blob = bytes.get(args.offset..).with_context(|| {
        format!("offset {} is past the end of {} ({} bytes)", args.offset, args.file.display(), bytes.len())
    })?;

    let header = LercDecoder::read_info(blob)
        .with_context(|| format!("failed to read header of {}", args.file.display()))?;

    if args.json {
        let json = serde_json::to_string_pretty(&HeaderReport::from(&header))?;
        println!("{json}");
        return Ok(());
    }

    println!(
        "Lerc2 v{}, {}, {}x{} ({} pixels)",
        header.version,
        header.data_type,
        header.width,
        header.height,
        header.pixel_count()
    );
    let coverage = if header.all_valid() {
        " (all)"
    } else if header.all_invalid() {
        " (none)"
    } else {
        ""
    };
    println!("  valid pixels:  {}{coverage}", header.num_valid_pixel);
    println!("  micro block:   {}", header.micro_block_size);
    println!("  blob size:     {} bytes", header.blob_size);
    println!("  max Z error:   {}", header.max_z_error);
    println!("  Z range:       [{}, {}]", header.z_min, header.z_max);
    if header.version >= lerc_wire::checksum::CHECKSUM_VERSION {
        println!("  checksum:      {:#010X}", header.checksum);
    }
    if bytes.len() > args.offset + header.blob_size_usize() {
        println!(
            "  trailing:      {} bytes after this blob",
            bytes.len() - args.offset - header.blob_size_usize()
        );
    }
    Ok(())
}
