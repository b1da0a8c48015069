//! Frame encoding and the response decoder.

use bytes::{Buf, BufMut, BytesMut};
use tokio_util::codec::Decoder;

use super::constants::*;
use super::fields::{encode_fields, parse_fields, Field};
use crate::error::{Result, RoomzinError};

/// Prepends the frame header to an already-serialized payload:
/// `magic(1) | clr_id(4 LE) | payload_len(4 LE) | payload`.
pub fn encode_frame(clr_id: u32, payload: &[u8]) -> BytesMut {
    let mut buf = BytesMut::with_capacity(FRAME_HEADER_SIZE + payload.len());
    buf.put_u8(MAGIC);
    buf.put_u32_le(clr_id);
    buf.put_u32_le(payload.len() as u32);
    buf.put_slice(payload);
    buf
}

/// Serializes a request payload: `cmd_len(1) | cmd | field_count(2 LE) | field*`.
pub fn encode_command(name: &str, fields: &[Field]) -> BytesMut {
    debug_assert!(name.len() <= u8::MAX as usize && name.is_ascii());
    let mut buf = BytesMut::with_capacity(1 + name.len() + 2);
    buf.put_u8(name.len() as u8);
    buf.put_slice(name.as_bytes());
    encode_fields(fields, &mut buf);
    buf
}

/// Response status reported by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// The request completed.
    Success,
    /// The request was rejected; the first field carries the code.
    Error,
}

impl Status {
    /// Returns `true` for [`Status::Success`].
    pub fn is_success(self) -> bool {
        self == Status::Success
    }

    /// Returns the wire spelling of this status.
    pub fn as_str(self) -> &'static str {
        match self {
            Status::Success => STATUS_SUCCESS,
            Status::Error => STATUS_ERROR,
        }
    }
}

/// The part of a response handed to the waiting caller.
#[derive(Debug, Clone)]
pub struct ServerReply {
    /// `SUCCESS` or `ERROR`.
    pub status: Status,
    /// The decoded flat field list.
    pub fields: Vec<Field>,
}

impl ServerReply {
    /// Returns the error code carried by the first field of an error reply.
    pub fn error_code(&self) -> Option<&str> {
        if self.status.is_success() {
            return None;
        }
        self.fields.first().and_then(|f| f.as_str().ok())
    }
}

/// A fully decoded response frame.
#[derive(Debug, Clone)]
pub struct RawResponse {
    /// The correlation id echoed by the server.
    pub clr_id: u32,
    /// Status and fields, ready for demultiplexing.
    pub reply: ServerReply,
}

/// Streaming decoder for response frames, for use with `FramedRead`.
#[derive(Debug, Default)]
pub struct FrameCodec;

impl FrameCodec {
    /// Creates a new codec instance.
    pub fn new() -> Self {
        Self
    }
}

fn decode_payload(clr_id: u32, payload: &[u8]) -> Result<RawResponse> {
    if payload.is_empty() {
        return Err(RoomzinError::Protocol("short frame: no status length".into()));
    }
    let status_len = payload[0] as usize;
    if payload.len() < 1 + status_len + 2 {
        return Err(RoomzinError::Protocol(
            "short frame: missing status or field count".into(),
        ));
    }

    let status = match &payload[1..1 + status_len] {
        b"SUCCESS" => Status::Success,
        b"ERROR" => Status::Error,
        other => {
            return Err(RoomzinError::Protocol(format!(
                "unknown status {:?}",
                String::from_utf8_lossy(other)
            )))
        }
    };

    let field_count =
        u16::from_le_bytes([payload[1 + status_len], payload[1 + status_len + 1]]);
    let fields = parse_fields(&payload[1 + status_len + 2..], field_count)?;

    Ok(RawResponse {
        clr_id,
        reply: ServerReply { status, fields },
    })
}

impl Decoder for FrameCodec {
    type Item = RawResponse;
    type Error = RoomzinError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<RawResponse>> {
        if src.len() < FRAME_HEADER_SIZE {
            return Ok(None);
        }
        if src[0] != MAGIC {
            return Err(RoomzinError::Protocol(format!(
                "bad magic byte: got 0x{:02x}",
                src[0]
            )));
        }

        let payload_len = u32::from_le_bytes([src[5], src[6], src[7], src[8]]) as usize;
        if src.len() < FRAME_HEADER_SIZE + payload_len {
            src.reserve(FRAME_HEADER_SIZE + payload_len - src.len());
            return Ok(None);
        }

        src.advance(1);
        let clr_id = src.get_u32_le();
        src.advance(4); // payload_len, already read
        let payload = src.split_to(payload_len);

        decode_payload(clr_id, &payload).map(Some)
    }
}
