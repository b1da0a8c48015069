//! Protocol constants for the Roomzin binary protocol.

/// Magic byte opening every frame.
pub const MAGIC: u8 = 0xFF;

/// Size of the fixed frame header: magic(1) + clr_id(4) + payload_len(4).
pub const FRAME_HEADER_SIZE: usize = 9;

/// Size of a field header: id(2) + type(1) + value_len(4).
pub const FIELD_HEADER_SIZE: usize = 7;

/// Field type: UTF-8/ASCII string bytes.
pub const FIELD_STRING: u8 = 0x01;

/// Field type: unsigned integer, 1 or 2 bytes little-endian.
pub const FIELD_UINT: u8 = 0x02;

/// Field type: unsigned integer of 4 or 8 bytes, or `f64` bits, little-endian.
pub const FIELD_WIDE: u8 = 0x03;

/// Field type: packed days vector (`count | {date, avail, price, rate_mask}*`).
pub const FIELD_DAYS_VECTOR: u8 = 0x08;

/// Field type: opaque codec blob (pipe-separated sections, comma-separated items).
pub const FIELD_CODEC_BLOB: u8 = 0x09;

/// Size of one entry in a days vector: date(2) + avail(1) + price(4) + mask(1).
pub const DAY_ENTRY_SIZE: usize = 8;

/// Response status for a completed request.
pub const STATUS_SUCCESS: &str = "SUCCESS";

/// Response status for a rejected request.
pub const STATUS_ERROR: &str = "ERROR";

/// In-band code: the leader changed; reconnect and resend.
pub const CODE_LEADER_CHANGED: &str = "308";

/// In-band code: this node no longer serves the requested role.
pub const CODE_METHOD_NOT_ALLOWED: &str = "405";

/// In-band code: the node is busy; back off and retry.
pub const CODE_BUSY: &str = "429";

/// In-band code: the node is temporarily unavailable.
pub const CODE_UNAVAILABLE: &str = "503";

/// Command name of the login handshake.
pub const LOGIN_COMMAND: &str = "LOGIN";

/// Correlation id reserved for login frames.
pub const LOGIN_CLR_ID: u32 = 0;

/// Plaintext banner the server sends on successful login.
pub const LOGIN_OK: &[u8] = b"LOGIN OK";
