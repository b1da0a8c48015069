//! Cluster-administration commands: codec table, segments, snapshots.

use bytes::Bytes;

use roomzin_core::protocol::{encode_command, Field, ServerReply, FIELD_CODEC_BLOB};
use roomzin_core::{Codecs, Result, RoomzinError};

use super::ensure_success;
use crate::types::SegmentInfo;

pub(crate) fn get_codecs_request() -> Bytes {
    encode_command("GETCODECS", &[]).freeze()
}

pub(crate) fn get_segments_request() -> Bytes {
    encode_command("GETSEGMENTS", &[]).freeze()
}

pub(crate) fn save_snapshot_request() -> Bytes {
    encode_command("SAVESNAPSHOT", &[]).freeze()
}

pub(crate) fn del_segment_request(segment: &str) -> Bytes {
    encode_command("DELSEGMENT", &[Field::string(1, segment)]).freeze()
}

/// `GETCODECS` returns exactly one codec-blob field.
pub(crate) fn parse_codecs(reply: &ServerReply) -> Result<Codecs> {
    ensure_success(reply)?;
    let [blob] = reply.fields.as_slice() else {
        return Err(RoomzinError::Protocol(format!(
            "GETCODECS expects 1 field, got {}",
            reply.fields.len()
        )));
    };
    if blob.kind != FIELD_CODEC_BLOB {
        return Err(RoomzinError::Protocol(format!(
            "expected codec blob field, got type 0x{:02x}",
            blob.kind
        )));
    }
    let text = std::str::from_utf8(&blob.data)
        .map_err(|_| RoomzinError::Protocol("codec blob is not ASCII".into()))?;
    Ok(Codecs::from_blob(text))
}

/// `GETSEGMENTS` returns `(segment, prop_count)` field pairs.
pub(crate) fn parse_segments(reply: &ServerReply) -> Result<Vec<SegmentInfo>> {
    ensure_success(reply)?;
    if reply.fields.len() % 2 != 0 {
        return Err(RoomzinError::Protocol(
            "GETSEGMENTS reply must hold segment/count pairs".into(),
        ));
    }
    reply
        .fields
        .chunks_exact(2)
        .map(|pair| {
            let [segment, count] = pair else { unreachable!() };
            Ok(SegmentInfo {
                segment: segment.as_str()?.to_owned(),
                prop_count: count.as_u32()?,
            })
        })
        .collect()
}
