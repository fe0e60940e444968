#![warn(clippy::pedantic)]

pub mod config;
pub mod decoder;
pub mod error;
pub mod mask;
pub mod pixel;
pub mod tile;

pub use config::DecodeOptions;
pub use decoder::{DecodedRaster, LercDecoder};
pub use error::{DecodeError, UnsupportedFeature};
pub use mask::ValidityMask;
pub use pixel::PixelBuffer;
