//! Property lifecycle commands: `SETPROP`, `DELPROP`, `PROPEXIST`.

use bytes::Bytes;

use roomzin_core::protocol::{encode_command, Field};

use crate::types::SetPropRequest;

pub(crate) fn set_prop_request(p: &SetPropRequest) -> Bytes {
    let fields = vec![
        Field::string(1, &p.segment),
        Field::string(2, &p.area),
        Field::string(3, &p.property_id),
        Field::string(4, &p.property_type),
        Field::string(5, &p.category),
        Field::u8(6, p.stars),
        Field::f64(7, p.latitude),
        Field::f64(8, p.longitude),
        Field::string(9, p.amenities.join(",")),
    ];
    encode_command("SETPROP", &fields).freeze()
}

pub(crate) fn del_prop_request(property_id: &str) -> Bytes {
    encode_command("DELPROP", &[Field::string(1, property_id)]).freeze()
}

pub(crate) fn prop_exist_request(property_id: &str) -> Bytes {
    encode_command("PROPEXIST", &[Field::string(1, property_id)]).freeze()
}
