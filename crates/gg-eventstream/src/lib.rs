//! Binary framing for the core bus: length-prefixed, CRC-checked messages
//! built from the same header encoding as AWS's event-stream format, plus a
//! recursive payload encoding for the `gg-object` value tree.

mod crc;
mod error;
mod header;
mod message;
mod payload;

pub use crc::crc32;
pub use error::EventStreamError;
pub use header::{Header, HeaderValue, HeaderValueType};
pub use message::{decode, encode, HeaderIter, Message};
pub use payload::{decode_object, encode_object};
