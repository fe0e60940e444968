use crate::header::{CHECKSUM_START, HeaderInfo};

/// Largest number of 16-bit words that can be summed before `sum2` must be
/// folded back to 16 bits.
const BLOCK_WORDS: usize = 359;

/// Format version that introduced the checksum field.
pub const CHECKSUM_VERSION: i32 = 3;

/// Fletcher-32 over `bytes`, reading big-endian 16-bit words.
///
/// Both accumulators start at `0xFFFF`. A trailing odd byte is treated as
/// the high half of a final word. The sums are folded as
/// `(x & 0xFFFF) + (x >> 16)` after each block of at most 359 words and
/// once more at the end, then combined as `(sum2 << 16) | sum1`.
pub fn fletcher32(bytes: &[u8]) -> u32 {
    let mut sum1: u64 = 0xFFFF;
    let mut sum2: u64 = 0xFFFF;

    let mut words = bytes.chunks_exact(2);
    let mut blocks = words.by_ref().peekable();
    while blocks.peek().is_some() {
        for word in blocks.by_ref().take(BLOCK_WORDS) {
            sum1 += u64::from(word[0]) << 8;
            sum1 += u64::from(word[1]);
            sum2 += sum1;
        }
        sum1 = fold(sum1);
        sum2 = fold(sum2);
    }

    if let [straggler] = words.remainder() {
        sum1 += u64::from(*straggler) << 8;
        sum2 += sum1;
    }

    sum1 = fold(sum1);
    sum2 = fold(sum2);

    #[allow(clippy::cast_possible_truncation)]
    let checksum = ((sum2 << 16) | sum1) as u32;
    checksum
}

fn fold(sum: u64) -> u64 {
    (sum & 0xFFFF) + (sum >> 16)
}

/// Check the header's stored checksum against the blob body.
///
/// `blob` starts at the magic. The checksum covers
/// `blob[14..header.blob_size]`, i.e. everything after the checksum field.
/// Versions before 3 carry no checksum and always pass. A `blob_size` that
/// does not fit inside `blob` fails.
pub fn verify(blob: &[u8], header: &HeaderInfo) -> bool {
    if header.version < CHECKSUM_VERSION {
        return true;
    }
    compute(blob, header).is_some_and(|computed| computed == header.checksum)
}

/// Checksum of the blob body as declared by `header`, or `None` if
/// `blob_size` runs past the end of `blob`.
pub fn compute(blob: &[u8], header: &HeaderInfo) -> Option<u32> {
    let end = usize::try_from(header.blob_size).ok()?;
    blob.get(CHECKSUM_START..end).map(fletcher32)
}
