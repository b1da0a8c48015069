//! Typed command builders and response parsers.
//!
//! Every builder serializes through the generic field codec; a command is a
//! name plus a declarative list of `(id, type, value)` fields, and each
//! parser consumes a known-shape flat field list.

pub(crate) mod admin;
pub(crate) mod property;
pub(crate) mod room;
pub(crate) mod search;

use roomzin_core::protocol::ServerReply;
use roomzin_core::{Result, RoomzinError};

/// Classifies an error reply: field 1 carries the code, field 2 the message.
pub(crate) fn reply_error(reply: &ServerReply) -> RoomzinError {
    let code = reply
        .fields
        .first()
        .and_then(|f| f.as_str().ok())
        .unwrap_or("RESPONSE_ERROR");
    let message = reply
        .fields
        .get(1)
        .and_then(|f| f.as_str().ok())
        .unwrap_or("");
    RoomzinError::classify(code, message)
}

/// For acknowledge-only commands.
pub(crate) fn ensure_success(reply: &ServerReply) -> Result<()> {
    if reply.status.is_success() {
        Ok(())
    } else {
        Err(reply_error(reply))
    }
}

/// Parses a single-byte boolean reply (`PROPEXIST`, `PROPROOMEXIST`).
pub(crate) fn parse_bool(reply: &ServerReply) -> Result<bool> {
    ensure_success(reply)?;
    let field = reply
        .fields
        .first()
        .ok_or_else(|| RoomzinError::Protocol("missing boolean field".into()))?;
    Ok(field.as_u8()? == 1)
}

/// Parses a single-byte scalar reply (the room availability commands echo
/// the resulting availability).
pub(crate) fn parse_scalar_u8(reply: &ServerReply) -> Result<u8> {
    ensure_success(reply)?;
    reply
        .fields
        .first()
        .ok_or_else(|| RoomzinError::Protocol("missing scalar field".into()))?
        .as_u8()
}

#[cfg(test)]
pub(crate) mod test_util {
    use roomzin_core::protocol::{Field, ServerReply, Status};

    pub(crate) fn success(fields: Vec<Field>) -> ServerReply {
        ServerReply {
            status: Status::Success,
            fields,
        }
    }

    pub(crate) fn error(code: &str, message: &str) -> ServerReply {
        ServerReply {
            status: Status::Error,
            fields: vec![Field::string(1, code), Field::string(2, message)],
        }
    }

    /// Splits an encoded command payload into `(name, fields)`.
    pub(crate) fn decode_command(payload: &[u8]) -> (String, Vec<Field>) {
        let name_len = payload[0] as usize;
        let name = String::from_utf8(payload[1..1 + name_len].to_vec()).unwrap();
        let count =
            u16::from_le_bytes([payload[1 + name_len], payload[1 + name_len + 1]]);
        let fields =
            roomzin_core::protocol::parse_fields(&payload[1 + name_len + 2..], count).unwrap();
        (name, fields)
    }
}
