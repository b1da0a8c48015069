//! Typed field list shared by request and response payloads.

use bytes::{BufMut, BytesMut};
use chrono::NaiveDate;

use super::constants::*;
use super::packed_date::packed_to_date;
use crate::error::{Result, RoomzinError};

/// A single typed field on the wire:
/// `id(2 LE) | type(1) | value_len(4 LE) | value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field id; ids start at 1 and are dense per command.
    pub id: u16,
    /// One of the `FIELD_*` type bytes.
    pub kind: u8,
    /// Raw value bytes; width conventions are type-specific.
    pub data: Vec<u8>,
}

impl Field {
    /// A string field (type 0x01).
    pub fn string(id: u16, value: impl AsRef<str>) -> Self {
        Self {
            id,
            kind: FIELD_STRING,
            data: value.as_ref().as_bytes().to_vec(),
        }
    }

    /// A 1-byte unsigned integer field (type 0x02).
    pub fn u8(id: u16, value: u8) -> Self {
        Self {
            id,
            kind: FIELD_UINT,
            data: vec![value],
        }
    }

    /// A 2-byte unsigned integer field (type 0x02).
    pub fn u16(id: u16, value: u16) -> Self {
        Self {
            id,
            kind: FIELD_UINT,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// A 4-byte unsigned integer field (type 0x03).
    pub fn u32(id: u16, value: u32) -> Self {
        Self {
            id,
            kind: FIELD_WIDE,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// An 8-byte unsigned integer field (type 0x03).
    pub fn u64(id: u16, value: u64) -> Self {
        Self {
            id,
            kind: FIELD_WIDE,
            data: value.to_le_bytes().to_vec(),
        }
    }

    /// An `f64` field carried as IEEE-754 bits (type 0x03).
    pub fn f64(id: u16, value: f64) -> Self {
        Self {
            id,
            kind: FIELD_WIDE,
            data: value.to_bits().to_le_bytes().to_vec(),
        }
    }

    fn type_mismatch(&self, expected: u8) -> RoomzinError {
        RoomzinError::Protocol(format!(
            "field {}: expected type 0x{expected:02x}, got 0x{:02x}",
            self.id, self.kind
        ))
    }

    fn width_mismatch(&self, expected: &str) -> RoomzinError {
        RoomzinError::Protocol(format!(
            "field {}: expected {expected} value bytes, got {}",
            self.id,
            self.data.len()
        ))
    }

    /// Reads the value as UTF-8 text (type 0x01).
    pub fn as_str(&self) -> Result<&str> {
        if self.kind != FIELD_STRING {
            return Err(self.type_mismatch(FIELD_STRING));
        }
        std::str::from_utf8(&self.data)
            .map_err(|_| RoomzinError::Protocol(format!("field {}: invalid UTF-8", self.id)))
    }

    /// Reads a 1-byte unsigned integer (type 0x02).
    pub fn as_u8(&self) -> Result<u8> {
        if self.kind != FIELD_UINT {
            return Err(self.type_mismatch(FIELD_UINT));
        }
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(self.width_mismatch("1")),
        }
    }

    /// Reads a 1- or 2-byte unsigned integer (type 0x02), widened to `u16`.
    pub fn as_uint(&self) -> Result<u16> {
        if self.kind != FIELD_UINT {
            return Err(self.type_mismatch(FIELD_UINT));
        }
        match self.data.as_slice() {
            [v] => Ok(u16::from(*v)),
            [a, b] => Ok(u16::from_le_bytes([*a, *b])),
            _ => Err(self.width_mismatch("1 or 2")),
        }
    }

    /// Reads a 4-byte unsigned integer (type 0x03).
    pub fn as_u32(&self) -> Result<u32> {
        if self.kind != FIELD_WIDE {
            return Err(self.type_mismatch(FIELD_WIDE));
        }
        match self.data.as_slice() {
            [a, b, c, d] => Ok(u32::from_le_bytes([*a, *b, *c, *d])),
            _ => Err(self.width_mismatch("4")),
        }
    }

    /// Reads an 8-byte unsigned integer (type 0x03).
    pub fn as_u64(&self) -> Result<u64> {
        if self.kind != FIELD_WIDE {
            return Err(self.type_mismatch(FIELD_WIDE));
        }
        let bytes: [u8; 8] = self
            .data
            .as_slice()
            .try_into()
            .map_err(|_| self.width_mismatch("8"))?;
        Ok(u64::from_le_bytes(bytes))
    }

    /// Reads an `f64` from its IEEE-754 bit pattern (type 0x03).
    pub fn as_f64(&self) -> Result<f64> {
        Ok(f64::from_bits(self.as_u64()?))
    }
}

/// Writes `field_count(2 LE)` followed by every field.
pub fn encode_fields(fields: &[Field], dst: &mut BytesMut) {
    dst.put_u16_le(fields.len() as u16);
    for field in fields {
        dst.put_u16_le(field.id);
        dst.put_u8(field.kind);
        dst.put_u32_le(field.data.len() as u32);
        dst.put_slice(&field.data);
    }
}

/// Sequentially parses `count` fields from `data`.
///
/// The entire slice must be consumed: malformed framing is never tolerated,
/// so leftover bytes after the last field are a protocol error.
pub fn parse_fields(data: &[u8], count: u16) -> Result<Vec<Field>> {
    let mut fields = Vec::with_capacity(count as usize);
    let mut offset = 0usize;

    for i in 0..count {
        if offset + FIELD_HEADER_SIZE > data.len() {
            return Err(RoomzinError::Protocol(format!(
                "short field: truncated header at field {i}"
            )));
        }
        let id = u16::from_le_bytes([data[offset], data[offset + 1]]);
        let kind = data[offset + 2];
        let len = u32::from_le_bytes([
            data[offset + 3],
            data[offset + 4],
            data[offset + 5],
            data[offset + 6],
        ]) as usize;
        offset += FIELD_HEADER_SIZE;

        if offset + len > data.len() {
            return Err(RoomzinError::Protocol(format!(
                "short field: field {i} wants {len} value bytes, {} remain",
                data.len() - offset
            )));
        }
        fields.push(Field {
            id,
            kind,
            data: data[offset..offset + len].to_vec(),
        });
        offset += len;
    }

    if offset != data.len() {
        return Err(RoomzinError::Protocol(format!(
            "trailing bytes: {} left after the last field",
            data.len() - offset
        )));
    }

    Ok(fields)
}

/// One decoded entry of a packed days vector (field type 0x08).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayEntry {
    /// The calendar date, unpacked from its 16-bit encoding.
    pub date: NaiveDate,
    /// Rooms available on that date.
    pub availability: u8,
    /// Final price in minor currency units.
    pub final_price: u32,
    /// Rate feature bitmask, expanded against the codec table by callers.
    pub rate_mask: u8,
}

/// Parses a days vector: `count(2 LE) | {date(2) | avail(1) | price(4) | mask(1)}*`.
pub fn parse_days_vector(data: &[u8]) -> Result<Vec<DayEntry>> {
    if data.len() < 2 {
        return Err(RoomzinError::Protocol("days vector too short".into()));
    }
    let count = u16::from_le_bytes([data[0], data[1]]) as usize;
    if data.len() != 2 + count * DAY_ENTRY_SIZE {
        return Err(RoomzinError::Protocol(format!(
            "days vector length mismatch: {count} entries want {} bytes, got {}",
            2 + count * DAY_ENTRY_SIZE,
            data.len()
        )));
    }

    let mut days = Vec::with_capacity(count);
    let mut cursor = 2usize;
    for _ in 0..count {
        let packed = u16::from_le_bytes([data[cursor], data[cursor + 1]]);
        let availability = data[cursor + 2];
        let final_price = u32::from_le_bytes([
            data[cursor + 3],
            data[cursor + 4],
            data[cursor + 5],
            data[cursor + 6],
        ]);
        let rate_mask = data[cursor + 7];
        cursor += DAY_ENTRY_SIZE;

        days.push(DayEntry {
            date: packed_to_date(packed)?,
            availability,
            final_price,
            rate_mask,
        });
    }
    Ok(days)
}
