//! The codec table published by the server.
//!
//! A connected leader session publishes one opaque blob (field type 0x09)
//! holding the ordered enumeration names the wire format compresses into
//! bitmasks. The blob is ASCII: sections separated by `|`, items by `,`.

use crate::error::{Result, RoomzinError};

/// Widest rate mask on the wire (the extended codec uses 24 bits).
const MAX_RATE_BITS: usize = 24;

/// Ordered name lists used to expand wire bitmasks into human strings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Codecs {
    /// Amenity names accepted by property commands.
    pub amenities: Vec<String>,
    /// Rate feature names; bit `i` of a rate mask maps to `rate_features[i]`.
    pub rate_features: Vec<String>,
}

fn split_items(section: &str) -> Vec<String> {
    section
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_owned)
        .collect()
}

impl Codecs {
    /// Parses the server's codec blob.
    ///
    /// A two-section blob carries amenities then rate features; the extended
    /// single-section form carries only rate features.
    pub fn from_blob(blob: &str) -> Self {
        let sections: Vec<&str> = blob.split('|').collect();
        match sections.as_slice() {
            [] => Self::default(),
            [features] => Self {
                amenities: Vec::new(),
                rate_features: split_items(features),
            },
            [amenities, features, ..] => Self {
                amenities: split_items(amenities),
                rate_features: split_items(features),
            },
        }
    }

    /// Expands a rate mask into feature names; bit `i` maps to
    /// `rate_features[i]`. Empty when no codec table is loaded.
    pub fn expand_rate_mask(&self, mask: u32) -> Vec<String> {
        let width = MAX_RATE_BITS.min(self.rate_features.len());
        (0..width)
            .filter(|i| mask & (1 << i) != 0)
            .map(|i| self.rate_features[i].clone())
            .collect()
    }

    /// Checks every amenity name against the table.
    pub fn validate_amenities(&self, input: &[String]) -> Result<()> {
        let invalid: Vec<&str> = input
            .iter()
            .filter(|name| !self.amenities.contains(name))
            .map(String::as_str)
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(RoomzinError::Validation(format!(
                "invalid amenities: {}",
                invalid.join(", ")
            )))
        }
    }

    /// Checks every rate feature name against the table.
    pub fn validate_rate_features(&self, input: &[String]) -> Result<()> {
        let invalid: Vec<&str> = input
            .iter()
            .filter(|name| !self.rate_features.contains(name))
            .map(String::as_str)
            .collect();
        if invalid.is_empty() {
            Ok(())
        } else {
            Err(RoomzinError::Validation(format!(
                "invalid rate features: {}",
                invalid.join(", ")
            )))
        }
    }
}
