//! Wire protocol and core types for the Roomzin in-memory availability service.
//!
//! This crate contains everything that can be exercised without a socket:
//! the length-prefixed binary frame codec, the typed field list, the packed
//! date encoding, property-id decoding, the codec table published by the
//! server, and the error taxonomy shared with `roomzin-client`.

pub mod codecs;
pub mod error;
pub mod protocol;

pub use codecs::Codecs;
pub use error::{ErrorKind, Result, RoomzinError};
