//! The Roomzin length-prefixed binary protocol.
//!
//! A frame is a fixed 9-byte header (`magic | clr_id | payload_len`, all
//! little-endian) followed by the payload. Request payloads carry a command
//! name and a flat list of typed fields; response payloads carry a status
//! string and the same field shape.

pub mod constants;
mod fields;
mod frame;
mod packed_date;
mod property_id;

pub use constants::*;
pub use fields::{encode_fields, parse_days_vector, parse_fields, DayEntry, Field};
pub use frame::{
    encode_command, encode_frame, FrameCodec, RawResponse, ServerReply, Status,
};
pub use packed_date::{date_to_packed, packed_to_date};
pub use property_id::decode_property_id;
