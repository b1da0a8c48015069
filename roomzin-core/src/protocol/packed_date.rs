//! 16-bit packed calendar dates.
//!
//! Layout: bits [15..12] reserved (zero), [11..9] year offset from the
//! current year (0–7), [8..5] month − 1, [4..0] day − 1. The service only
//! accepts dates inside its bookable window of [today, today + 365 days].

use chrono::{Datelike, Days, NaiveDate, Utc};

use crate::error::{Result, RoomzinError};

const RESERVED_MASK: u16 = 0xF000;

/// Packs a date, rejecting anything outside the bookable window.
pub fn date_to_packed(date: NaiveDate) -> Result<u16> {
    pack_from(date, Utc::now().date_naive())
}

fn pack_from(date: NaiveDate, today: NaiveDate) -> Result<u16> {
    let horizon = today + Days::new(365);
    if date < today || date > horizon {
        return Err(RoomzinError::Validation(format!(
            "date {date} is outside [{today}, {horizon}]"
        )));
    }

    let offset = date.year() - today.year();
    debug_assert!((0..=7).contains(&offset));

    Ok(((offset as u16) << 9) | ((date.month0() as u16) << 5) | date.day0() as u16)
}

/// Unpacks a date, validating reserved bits and the real calendar.
pub fn packed_to_date(packed: u16) -> Result<NaiveDate> {
    unpack_from(packed, Utc::now().year())
}

fn unpack_from(packed: u16, base_year: i32) -> Result<NaiveDate> {
    if packed & RESERVED_MASK != 0 {
        return Err(RoomzinError::Protocol(format!(
            "packed date 0x{packed:04x}: reserved bits set"
        )));
    }

    let offset = ((packed >> 9) & 0b111) as i32;
    let month = ((packed >> 5) & 0b1111) + 1;
    let day = (packed & 0b1_1111) + 1;

    NaiveDate::from_ymd_opt(base_year + offset, u32::from(month), u32::from(day)).ok_or_else(
        || {
            RoomzinError::Protocol(format!(
                "packed date 0x{packed:04x}: no such day {}-{month:02}-{day:02}",
                base_year + offset
            ))
        },
    )
}
