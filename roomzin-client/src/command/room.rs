//! Room-level commands: packages, availability updates, listings, deletes.

use bytes::Bytes;
use chrono::NaiveDate;

use roomzin_core::protocol::{encode_command, Field, ServerReply};
use roomzin_core::{Codecs, Result, RoomzinError};

use super::ensure_success;
use crate::types::{RoomAvailUpdate, RoomDay, SetRoomPkgRequest};

pub(crate) fn set_room_pkg_request(p: &SetRoomPkgRequest) -> Bytes {
    let mut fields = vec![
        Field::string(1, &p.property_id),
        Field::string(2, &p.room_type),
        Field::string(3, p.date.to_string()),
    ];
    if let Some(availability) = p.availability {
        fields.push(Field::u8(4, availability));
    }
    if let Some(final_price) = p.final_price {
        fields.push(Field::u32(5, final_price));
    }
    if !p.rate_features.is_empty() {
        fields.push(Field::string(6, p.rate_features.join(",")));
    }
    encode_command("SETROOMPKG", &fields).freeze()
}

/// Builder shared by `SETROOMAVL`, `INCROOMAVL`, and `DECROOMAVL`; the three
/// commands only differ in name.
pub(crate) fn room_avail_request(command: &str, p: &RoomAvailUpdate) -> Bytes {
    let fields = [
        Field::string(1, &p.property_id),
        Field::string(2, &p.room_type),
        Field::string(3, p.date.to_string()),
        Field::u8(4, p.amount),
    ];
    encode_command(command, &fields).freeze()
}

pub(crate) fn prop_room_exist_request(property_id: &str, room_type: &str) -> Bytes {
    encode_command(
        "PROPROOMEXIST",
        &[Field::string(1, property_id), Field::string(2, room_type)],
    )
    .freeze()
}

pub(crate) fn prop_room_list_request(property_id: &str) -> Bytes {
    encode_command("PROPROOMLIST", &[Field::string(1, property_id)]).freeze()
}

pub(crate) fn prop_room_date_list_request(property_id: &str, room_type: &str) -> Bytes {
    encode_command(
        "PROPROOMDATELIST",
        &[Field::string(1, property_id), Field::string(2, room_type)],
    )
    .freeze()
}

pub(crate) fn get_room_day_request(
    property_id: &str,
    room_type: &str,
    date: NaiveDate,
) -> Bytes {
    encode_command(
        "GETPROPROOMDAY",
        &[
            Field::string(1, property_id),
            Field::string(2, room_type),
            Field::string(3, date.to_string()),
        ],
    )
    .freeze()
}

pub(crate) fn del_prop_room_request(property_id: &str, room_type: &str) -> Bytes {
    encode_command(
        "DELPROPROOM",
        &[Field::string(1, property_id), Field::string(2, room_type)],
    )
    .freeze()
}

pub(crate) fn del_prop_day_request(property_id: &str, date: NaiveDate) -> Bytes {
    encode_command(
        "DELPROPDAY",
        &[Field::string(1, property_id), Field::string(2, date.to_string())],
    )
    .freeze()
}

pub(crate) fn del_room_day_request(
    property_id: &str,
    room_type: &str,
    date: NaiveDate,
) -> Bytes {
    encode_command(
        "DELROOMDAY",
        &[
            Field::string(1, property_id),
            Field::string(2, room_type),
            Field::string(3, date.to_string()),
        ],
    )
    .freeze()
}

/// `PROPROOMLIST` returns one string field per room type.
pub(crate) fn parse_room_list(reply: &ServerReply) -> Result<Vec<String>> {
    ensure_success(reply)?;
    reply
        .fields
        .iter()
        .map(|f| f.as_str().map(str::to_owned))
        .collect()
}

/// `PROPROOMDATELIST` returns one `YYYY-MM-DD` string field per date.
/// Blank fields mark absent slots and are skipped; the result is sorted.
pub(crate) fn parse_date_list(reply: &ServerReply) -> Result<Vec<NaiveDate>> {
    ensure_success(reply)?;
    let mut dates = reply
        .fields
        .iter()
        .filter_map(|f| match f.as_str() {
            Ok("") => None,
            Ok(text) => Some(text.parse::<NaiveDate>().map_err(|_| {
                RoomzinError::Protocol(format!("field {}: invalid date {text:?}", f.id))
            })),
            Err(e) => Some(Err(e)),
        })
        .collect::<Result<Vec<NaiveDate>>>()?;
    dates.sort_unstable();
    Ok(dates)
}

/// `GETPROPROOMDAY` returns a fixed 5-field chunk:
/// property id, date, availability, final price, rate mask.
pub(crate) fn parse_room_day(codecs: &Codecs, reply: &ServerReply) -> Result<RoomDay> {
    ensure_success(reply)?;
    let [property_id, date, availability, final_price, rate_mask] = reply.fields.as_slice()
    else {
        return Err(RoomzinError::Protocol(format!(
            "GETPROPROOMDAY expects 5 fields, got {}",
            reply.fields.len()
        )));
    };

    let date_text = date.as_str()?;
    Ok(RoomDay {
        property_id: property_id.as_str()?.to_owned(),
        date: date_text.parse::<NaiveDate>().map_err(|_| {
            RoomzinError::Protocol(format!("invalid date {date_text:?} in room day"))
        })?,
        availability: availability.as_u8()?,
        final_price: final_price.as_u32()?,
        rate_features: codecs.expand_rate_mask(u32::from(rate_mask.as_u8()?)),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::test_util::{decode_command, error, success};
    use chrono::{Days, Utc};

    fn tomorrow() -> NaiveDate {
        Utc::now().date_naive() + Days::new(1)
    }

    #[test]
    fn test_set_room_pkg_optionals_absent() {
        let request = SetRoomPkgRequest {
            property_id: "h-1".into(),
            room_type: "double".into(),
            date: tomorrow(),
            availability: None,
            final_price: None,
            rate_features: Vec::new(),
        };
        let (name, fields) = decode_command(&set_room_pkg_request(&request));
        assert_eq!(name, "SETROOMPKG");
        assert_eq!(fields.len(), 3);
        assert_eq!(fields[2].as_str().unwrap(), tomorrow().to_string());
    }

    #[test]
    fn test_set_room_pkg_optionals_present() {
        let request = SetRoomPkgRequest {
            property_id: "h-1".into(),
            room_type: "double".into(),
            date: tomorrow(),
            availability: Some(3),
            final_price: Some(99_00),
            rate_features: vec!["free_cancellation".into(), "no_prepayment".into()],
        };
        let (_, fields) = decode_command(&set_room_pkg_request(&request));
        assert_eq!(fields.len(), 6);
        assert_eq!(fields[3].as_u8().unwrap(), 3);
        assert_eq!(fields[4].as_u32().unwrap(), 99_00);
        assert_eq!(
            fields[5].as_str().unwrap(),
            "free_cancellation,no_prepayment"
        );
    }

    #[test]
    fn test_room_avail_request_shares_layout() {
        let update = RoomAvailUpdate {
            property_id: "h-1".into(),
            room_type: "double".into(),
            date: tomorrow(),
            amount: 2,
        };
        for command in ["SETROOMAVL", "INCROOMAVL", "DECROOMAVL"] {
            let (name, fields) = decode_command(&room_avail_request(command, &update));
            assert_eq!(name, command);
            assert_eq!(fields.len(), 4);
            assert_eq!(fields[3].as_u8().unwrap(), 2);
        }
    }

    #[test]
    fn test_parse_room_list() {
        let reply = success(vec![
            Field::string(1, "double"),
            Field::string(2, "suite"),
        ]);
        assert_eq!(parse_room_list(&reply).unwrap(), vec!["double", "suite"]);
    }

    #[test]
    fn test_parse_date_list_sorts() {
        let reply = success(vec![
            Field::string(1, "2026-09-02"),
            Field::string(2, "2026-08-30"),
            Field::string(3, "2026-09-01"),
        ]);
        let dates = parse_date_list(&reply).unwrap();
        assert_eq!(
            dates,
            vec![
                NaiveDate::from_ymd_opt(2026, 8, 30).unwrap(),
                NaiveDate::from_ymd_opt(2026, 9, 1).unwrap(),
                NaiveDate::from_ymd_opt(2026, 9, 2).unwrap(),
            ]
        );

        let bad = success(vec![Field::string(1, "not-a-date")]);
        assert!(parse_date_list(&bad).is_err());
    }

    #[test]
    fn test_parse_date_list_skips_blank_slots() {
        let reply = success(vec![
            Field::string(1, "2026-09-01"),
            Field::string(2, ""),
            Field::string(3, "2026-09-03"),
        ]);
        let dates = parse_date_list(&reply).unwrap();
        assert_eq!(dates.len(), 2);
        assert_eq!(dates[1], NaiveDate::from_ymd_opt(2026, 9, 3).unwrap());
    }

    #[test]
    fn test_parse_room_day() {
        let codecs = Codecs::from_blob("|a,b,c");
        let reply = success(vec![
            Field::string(1, "h-1"),
            Field::string(2, "2026-09-01"),
            Field::u8(3, 4),
            Field::u32(4, 120_00),
            Field::u8(5, 0b101),
        ]);
        let day = parse_room_day(&codecs, &reply).unwrap();
        assert_eq!(day.property_id, "h-1");
        assert_eq!(day.availability, 4);
        assert_eq!(day.final_price, 120_00);
        assert_eq!(day.rate_features, vec!["a".to_string(), "c".into()]);
    }

    #[test]
    fn test_parse_room_day_wrong_shape() {
        let codecs = Codecs::default();
        assert!(parse_room_day(&codecs, &success(vec![Field::u8(1, 1)])).is_err());
        let err = parse_room_day(&codecs, &error("NOT_FOUND", "no such room")).unwrap_err();
        assert!(err.is_request());
    }
}
