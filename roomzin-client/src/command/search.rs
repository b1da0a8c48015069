//! Search commands: `SEARCHPROP` and `SEARCHAVAIL`.

use bytes::Bytes;

use roomzin_core::protocol::{
    decode_property_id, encode_command, parse_days_vector, Field, ServerReply, FIELD_DAYS_VECTOR,
    FIELD_STRING,
};
use roomzin_core::{Codecs, Result, RoomzinError};

use super::ensure_success;
use crate::types::{DayAvailability, PropertyAvailability, SearchAvailRequest, SearchPropRequest};

pub(crate) fn search_prop_request(p: &SearchPropRequest) -> Bytes {
    let mut fields = vec![Field::string(1, &p.segment)];
    if let Some(area) = &p.area {
        fields.push(Field::string(2, area));
    }
    if let Some(property_type) = &p.property_type {
        fields.push(Field::string(3, property_type));
    }
    if let Some(stars) = p.stars {
        fields.push(Field::u8(4, stars));
    }
    if let Some(category) = &p.category {
        fields.push(Field::string(5, category));
    }
    if let Some(amenities) = &p.amenities {
        fields.push(Field::string(6, amenities.join(",")));
    }
    if let Some(longitude) = p.longitude {
        fields.push(Field::f64(7, longitude));
    }
    if let Some(latitude) = p.latitude {
        fields.push(Field::f64(8, latitude));
    }
    if let Some(limit) = p.limit {
        fields.push(Field::u64(9, limit));
    }
    encode_command("SEARCHPROP", &fields).freeze()
}

pub(crate) fn search_avail_request(p: &SearchAvailRequest) -> Bytes {
    let mut fields = vec![
        Field::string(1, &p.segment),
        Field::string(2, &p.room_type),
    ];
    if let Some(area) = &p.area {
        fields.push(Field::string(3, area));
    }
    if let Some(property_id) = &p.property_id {
        fields.push(Field::string(4, property_id));
    }
    if let Some(property_type) = &p.property_type {
        fields.push(Field::string(5, property_type));
    }
    if let Some(stars) = p.stars {
        fields.push(Field::u8(6, stars));
    }
    if let Some(category) = &p.category {
        fields.push(Field::string(7, category));
    }
    if !p.amenities.is_empty() {
        fields.push(Field::string(8, p.amenities.join(",")));
    }
    if let Some(longitude) = p.longitude {
        fields.push(Field::f64(9, longitude));
    }
    if let Some(latitude) = p.latitude {
        fields.push(Field::f64(10, latitude));
    }
    if !p.dates.is_empty() {
        let dates: Vec<String> = p.dates.iter().map(|d| d.to_string()).collect();
        fields.push(Field::string(11, dates.join(",")));
    }
    if let Some(availability) = p.availability {
        fields.push(Field::u8(12, availability));
    }
    if let Some(final_price) = p.final_price {
        fields.push(Field::u32(13, final_price));
    }
    if !p.rate_features.is_empty() {
        fields.push(Field::string(14, p.rate_features.join(",")));
    }
    if let Some(limit) = p.limit {
        fields.push(Field::u64(15, limit));
    }
    encode_command("SEARCHAVAIL", &fields).freeze()
}

/// `SEARCHPROP` returns one densely-numbered string field per property id.
pub(crate) fn parse_search_prop(reply: &ServerReply) -> Result<Vec<String>> {
    ensure_success(reply)?;
    let mut ids = Vec::with_capacity(reply.fields.len());
    for (i, field) in reply.fields.iter().enumerate() {
        if field.id as usize != i + 1 {
            return Err(RoomzinError::Protocol(format!(
                "search result field id {} at position {i}",
                field.id
            )));
        }
        if field.kind != FIELD_STRING {
            return Err(RoomzinError::Protocol(format!(
                "search result field {} has type 0x{:02x}",
                field.id, field.kind
            )));
        }
        ids.push(decode_property_id(&field.data));
    }
    Ok(ids)
}

/// `SEARCHAVAIL` returns a `num_days` head field followed by
/// `(property id, days vector)` pairs; every vector must carry exactly
/// `num_days` entries.
pub(crate) fn parse_search_avail(
    codecs: &Codecs,
    reply: &ServerReply,
) -> Result<Vec<PropertyAvailability>> {
    ensure_success(reply)?;

    let Some(head) = reply.fields.first() else {
        return Err(RoomzinError::Protocol(
            "SEARCHAVAIL reply missing num_days field".into(),
        ));
    };
    if head.id != 1 {
        return Err(RoomzinError::Protocol(
            "SEARCHAVAIL num_days field must have id 1".into(),
        ));
    }
    let num_days = head.as_uint()? as usize;

    let mut out = Vec::new();
    let mut pairs = reply.fields[1..].chunks_exact(2);
    for pair in pairs.by_ref() {
        let [prop, days] = pair else { unreachable!() };
        if prop.kind != FIELD_STRING {
            return Err(RoomzinError::Protocol(format!(
                "expected property field, got type 0x{:02x}",
                prop.kind
            )));
        }
        if days.kind != FIELD_DAYS_VECTOR {
            return Err(RoomzinError::Protocol(format!(
                "expected days vector, got type 0x{:02x}",
                days.kind
            )));
        }

        let property_id = decode_property_id(&prop.data);
        let entries = parse_days_vector(&days.data)?;
        if entries.len() != num_days {
            return Err(RoomzinError::Protocol(format!(
                "property {property_id}: {} days, expected {num_days}",
                entries.len()
            )));
        }

        out.push(PropertyAvailability {
            property_id,
            days: entries
                .into_iter()
                .map(|e| DayAvailability {
                    date: e.date,
                    availability: e.availability,
                    final_price: e.final_price,
                    rate_features: codecs.expand_rate_mask(u32::from(e.rate_mask)),
                })
                .collect(),
        });
    }

    if !pairs.remainder().is_empty() {
        return Err(RoomzinError::Protocol(
            "property field without a days vector".into(),
        ));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_util::{decode_command, success};
    use bytes::{BufMut, BytesMut};
    use chrono::{Days, Utc};
    use roomzin_core::protocol::date_to_packed;

    #[test]
    fn test_search_prop_required_only() {
        let request = SearchPropRequest {
            segment: "metro-east".into(),
            ..Default::default()
        };
        let (name, fields) = decode_command(&search_prop_request(&request));
        assert_eq!(name, "SEARCHPROP");
        assert_eq!(fields.len(), 1);
    }

    #[test]
    fn test_search_prop_all_filters() {
        let request = SearchPropRequest {
            segment: "metro-east".into(),
            area: Some("downtown".into()),
            property_type: Some("hotel".into()),
            stars: Some(4),
            category: Some("budget".into()),
            amenities: Some(vec!["wifi".into()]),
            longitude: Some(-74.0),
            latitude: Some(40.7),
            limit: Some(50),
        };
        let (_, fields) = decode_command(&search_prop_request(&request));
        assert_eq!(fields.len(), 9);
        assert_eq!(fields.last().unwrap().as_u64().unwrap(), 50);
    }

    #[test]
    fn test_search_avail_field_ids_are_stable() {
        let tomorrow = Utc::now().date_naive() + Days::new(1);
        let request = SearchAvailRequest {
            segment: "metro-east".into(),
            room_type: "double".into(),
            dates: vec![tomorrow],
            limit: Some(10),
            ..Default::default()
        };
        let (name, fields) = decode_command(&search_avail_request(&request));
        assert_eq!(name, "SEARCHAVAIL");
        let ids: Vec<u16> = fields.iter().map(|f| f.id).collect();
        assert_eq!(ids, vec![1, 2, 11, 15]);
        assert_eq!(fields[2].as_str().unwrap(), tomorrow.to_string());
    }

    #[test]
    fn test_parse_search_prop_decodes_ids() {
        let mut uuid_bytes = [0x22u8; 16];
        uuid_bytes[6] = 0x40; // version 4
        let reply = success(vec![Field {
            id: 1,
            kind: FIELD_STRING,
            data: uuid_bytes.to_vec(),
        }]);
        let ids = parse_search_prop(&reply).unwrap();
        assert_eq!(ids[0], decode_property_id(&uuid_bytes));
    }

    #[test]
    fn test_parse_search_prop_rejects_sparse_ids() {
        let reply = success(vec![Field::string(2, "x")]);
        assert!(parse_search_prop(&reply).is_err());
    }

    fn days_vector(dates: &[chrono::NaiveDate], mask: u8) -> Vec<u8> {
        let mut buf = BytesMut::new();
        buf.put_u16_le(dates.len() as u16);
        for date in dates {
            buf.put_u16_le(date_to_packed(*date).unwrap());
            buf.put_u8(2);
            buf.put_u32_le(150_00);
            buf.put_u8(mask);
        }
        buf.to_vec()
    }

    fn short_string_id(text: &str) -> Vec<u8> {
        let mut data = vec![0u8; 16];
        let bytes = text.as_bytes();
        data[..bytes.len().min(6)].copy_from_slice(&bytes[..bytes.len().min(6)]);
        data[6] = 0xF0;
        if bytes.len() > 6 {
            data[7..7 + bytes.len() - 6].copy_from_slice(&bytes[6..]);
        }
        data
    }

    #[test]
    fn test_parse_search_avail() {
        let codecs = Codecs::from_blob("|free_cancellation,non_refundable");
        let tomorrow = Utc::now().date_naive() + Days::new(1);

        let reply = success(vec![
            Field::u16(1, 1),
            Field {
                id: 2,
                kind: FIELD_STRING,
                data: short_string_id("h-42"),
            },
            Field {
                id: 3,
                kind: FIELD_DAYS_VECTOR,
                data: days_vector(&[tomorrow], 0b01),
            },
        ]);

        let properties = parse_search_avail(&codecs, &reply).unwrap();
        assert_eq!(properties.len(), 1);
        assert_eq!(properties[0].property_id, "h-42");
        assert_eq!(properties[0].days.len(), 1);
        assert_eq!(properties[0].days[0].date, tomorrow);
        assert_eq!(
            properties[0].days[0].rate_features,
            vec!["free_cancellation".to_string()]
        );
    }

    #[test]
    fn test_parse_search_avail_day_count_mismatch() {
        let codecs = Codecs::default();
        let tomorrow = Utc::now().date_naive() + Days::new(1);
        let reply = success(vec![
            Field::u16(1, 3), // promises three days
            Field {
                id: 2,
                kind: FIELD_STRING,
                data: short_string_id("h-1"),
            },
            Field {
                id: 3,
                kind: FIELD_DAYS_VECTOR,
                data: days_vector(&[tomorrow], 0),
            },
        ]);
        assert!(parse_search_avail(&codecs, &reply).is_err());
    }

    #[test]
    fn test_parse_search_avail_orphan_property_field() {
        let codecs = Codecs::default();
        let reply = success(vec![
            Field::u16(1, 1),
            Field {
                id: 2,
                kind: FIELD_STRING,
                data: short_string_id("h-1"),
            },
        ]);
        assert!(parse_search_avail(&codecs, &reply).is_err());
    }

    #[test]
    fn test_parse_search_avail_empty_result() {
        let codecs = Codecs::default();
        let reply = success(vec![Field::u16(1, 2)]);
        assert!(parse_search_avail(&codecs, &reply).unwrap().is_empty());
    }
}
