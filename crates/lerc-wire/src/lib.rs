#![warn(clippy::pedantic)]

pub mod bit_stuffer;
pub mod checksum;
pub mod cursor;
pub mod data_type;
pub mod error;
pub mod header;

pub use bit_stuffer::BitUnstuffer;
pub use cursor::Cursor;
pub use data_type::DataType;
pub use error::WireError;
pub use header::HeaderInfo;
