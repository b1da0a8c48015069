//! Request and response record shapes for the command catalogue.

use chrono::{Days, NaiveDate, Utc};

use roomzin_core::{Codecs, Result, RoomzinError};

/// Checks that a date falls inside the bookable window [today, today+365].
pub(crate) fn validate_window(date: NaiveDate) -> Result<()> {
    let today = Utc::now().date_naive();
    if date < today {
        return Err(RoomzinError::Validation(format!("date {date} is in the past")));
    }
    if date > today + Days::new(365) {
        return Err(RoomzinError::Validation(format!(
            "date {date} is beyond 365 days from today"
        )));
    }
    Ok(())
}

pub(crate) fn validate_windows(dates: &[NaiveDate]) -> Result<()> {
    let errs: Vec<String> = dates
        .iter()
        .filter_map(|d| validate_window(*d).err())
        .map(|e| e.to_string())
        .collect();
    if errs.is_empty() {
        Ok(())
    } else {
        Err(RoomzinError::Validation(errs.join("; ")))
    }
}

fn collect(errs: Vec<String>) -> Result<()> {
    if errs.is_empty() {
        Ok(())
    } else {
        Err(RoomzinError::Validation(errs.join("; ")))
    }
}

/// Payload for registering or replacing a property (`SETPROP`).
#[derive(Debug, Clone, Default)]
pub struct SetPropRequest {
    pub segment: String,
    pub area: String,
    pub property_id: String,
    pub property_type: String,
    pub category: String,
    /// Star rating, 1–5.
    pub stars: u8,
    pub latitude: f64,
    pub longitude: f64,
    /// Amenity names; validated against the codec table.
    pub amenities: Vec<String>,
}

impl SetPropRequest {
    pub(crate) fn validate(&self, codecs: &Codecs) -> Result<()> {
        let mut errs = Vec::new();
        if self.segment.is_empty() {
            errs.push("segment is required".to_owned());
        }
        if self.area.is_empty() {
            errs.push("area is required".to_owned());
        }
        if self.property_id.is_empty() {
            errs.push("property_id is required".to_owned());
        }
        if self.property_type.is_empty() {
            errs.push("property_type is required".to_owned());
        }
        if self.category.is_empty() {
            errs.push("category is required".to_owned());
        }
        if self.stars == 0 || self.stars > 5 {
            errs.push("stars must be between 1 and 5".to_owned());
        }
        if !(-90.0..=90.0).contains(&self.latitude) {
            errs.push("latitude must be between -90 and 90".to_owned());
        }
        if !(-180.0..=180.0).contains(&self.longitude) {
            errs.push("longitude must be between -180 and 180".to_owned());
        }
        if !self.amenities.is_empty() {
            if let Err(e) = codecs.validate_amenities(&self.amenities) {
                errs.push(e.to_string());
            }
        }
        collect(errs)
    }
}

/// Payload for setting a room's availability, price, and rate features for
/// one date (`SETROOMPKG`). Absent optionals leave the stored value alone.
#[derive(Debug, Clone)]
pub struct SetRoomPkgRequest {
    pub property_id: String,
    pub room_type: String,
    pub date: NaiveDate,
    pub availability: Option<u8>,
    pub final_price: Option<u32>,
    /// Rate feature names; validated against the codec table.
    pub rate_features: Vec<String>,
}

impl SetRoomPkgRequest {
    pub(crate) fn validate(&self, codecs: &Codecs) -> Result<()> {
        let mut errs = Vec::new();
        if self.property_id.is_empty() {
            errs.push("property_id is required".to_owned());
        }
        if self.room_type.is_empty() {
            errs.push("room_type is required".to_owned());
        }
        if let Err(e) = validate_window(self.date) {
            errs.push(e.to_string());
        }
        if !self.rate_features.is_empty() {
            if let Err(e) = codecs.validate_rate_features(&self.rate_features) {
                errs.push(e.to_string());
            }
        }
        collect(errs)
    }
}

/// Payload shared by `SETROOMAVL`, `INCROOMAVL`, and `DECROOMAVL`.
#[derive(Debug, Clone)]
pub struct RoomAvailUpdate {
    pub property_id: String,
    pub room_type: String,
    pub date: NaiveDate,
    /// Amount to set/add/subtract; must be non-zero.
    pub amount: u8,
}

impl RoomAvailUpdate {
    pub(crate) fn validate(&self) -> Result<()> {
        let mut errs = Vec::new();
        if self.property_id.is_empty() {
            errs.push("property_id is required".to_owned());
        }
        if self.room_type.is_empty() {
            errs.push("room_type is required".to_owned());
        }
        if self.amount == 0 {
            errs.push("amount must be greater than 0".to_owned());
        }
        if let Err(e) = validate_window(self.date) {
            errs.push(e.to_string());
        }
        collect(errs)
    }
}

/// Filter set for `SEARCHPROP`.
#[derive(Debug, Clone, Default)]
pub struct SearchPropRequest {
    pub segment: String,
    pub area: Option<String>,
    pub property_type: Option<String>,
    pub stars: Option<u8>,
    pub category: Option<String>,
    pub amenities: Option<Vec<String>>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    pub limit: Option<u64>,
}

impl SearchPropRequest {
    pub(crate) fn validate(&self, codecs: &Codecs) -> Result<()> {
        let mut errs = Vec::new();
        if self.segment.is_empty() {
            errs.push("segment is required".to_owned());
        }
        if let Some(stars) = self.stars {
            if stars == 0 || stars > 5 {
                errs.push("stars must be between 1 and 5".to_owned());
            }
        }
        if let Some(latitude) = self.latitude {
            if !(-90.0..=90.0).contains(&latitude) {
                errs.push("latitude must be between -90 and 90".to_owned());
            }
        }
        if let Some(longitude) = self.longitude {
            if !(-180.0..=180.0).contains(&longitude) {
                errs.push("longitude must be between -180 and 180".to_owned());
            }
        }
        if let Some(amenities) = &self.amenities {
            if let Err(e) = codecs.validate_amenities(amenities) {
                errs.push(e.to_string());
            }
        }
        collect(errs)
    }
}

/// Filter set for `SEARCHAVAIL`.
#[derive(Debug, Clone, Default)]
pub struct SearchAvailRequest {
    pub segment: String,
    pub room_type: String,
    pub area: Option<String>,
    pub property_id: Option<String>,
    pub property_type: Option<String>,
    pub stars: Option<u8>,
    pub category: Option<String>,
    pub amenities: Vec<String>,
    pub longitude: Option<f64>,
    pub latitude: Option<f64>,
    /// Dates to query; at least one, all inside the bookable window.
    pub dates: Vec<NaiveDate>,
    pub availability: Option<u8>,
    pub final_price: Option<u32>,
    pub rate_features: Vec<String>,
    pub limit: Option<u64>,
}

impl SearchAvailRequest {
    pub(crate) fn validate(&self, codecs: &Codecs) -> Result<()> {
        let mut errs = Vec::new();
        if self.segment.is_empty() {
            errs.push("segment is required".to_owned());
        }
        if self.room_type.is_empty() {
            errs.push("room_type is required".to_owned());
        }
        if let Some(latitude) = self.latitude {
            if !(-90.0..=90.0).contains(&latitude) {
                errs.push("latitude must be between -90 and 90".to_owned());
            }
        }
        if let Some(longitude) = self.longitude {
            if !(-180.0..=180.0).contains(&longitude) {
                errs.push("longitude must be between -180 and 180".to_owned());
            }
        }
        if self.dates.is_empty() {
            errs.push("at least one date is required".to_owned());
        } else if let Err(e) = validate_windows(&self.dates) {
            errs.push(e.to_string());
        }
        if !self.rate_features.is_empty() {
            if let Err(e) = codecs.validate_rate_features(&self.rate_features) {
                errs.push(e.to_string());
            }
        }
        if self.limit == Some(0) {
            errs.push("limit must be greater than 0".to_owned());
        }
        collect(errs)
    }
}

/// One day of availability inside a property.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayAvailability {
    pub date: NaiveDate,
    pub availability: u8,
    /// Final price in minor currency units.
    pub final_price: u32,
    /// Rate feature names expanded from the wire bitmask.
    pub rate_features: Vec<String>,
}

/// One property with all of its queried days.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyAvailability {
    pub property_id: String,
    pub days: Vec<DayAvailability>,
}

/// Result of `GETPROPROOMDAY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoomDay {
    pub property_id: String,
    pub date: NaiveDate,
    pub availability: u8,
    pub final_price: u32,
    pub rate_features: Vec<String>,
}

/// One entry of `GETSEGMENTS`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SegmentInfo {
    pub segment: String,
    pub prop_count: u32,
}
