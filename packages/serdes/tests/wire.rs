use std::net::{IpAddr, Ipv6Addr};
use std::str::FromStr;
use std::time::{Duration, Instant};

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use docwire_core::{
    pattern, BigDecimal, BigInt, Blob, CalendarDuration, ObjectId, Uuid, Value, ValueKind, Vector,
};
use docwire_serdes::{
    json_to_value, CodecOutput, Error, FnCodec, NumberPolicy, NumberRepr, SerDes, SerDesConfig, SerDesOptions,
    VectorEncoding,
};
use serde_json::json;

fn rich_document() -> Value {
    let owner: Value = [
        ("id", Value::Uuid(Uuid::new_v4())),
        ("ref", Value::ObjectId(ObjectId::new())),
        ("born", Value::Date(NaiveDate::from_ymd_opt(1815, 12, 10).unwrap())),
        (
            "lastSeen",
            Value::Timestamp(Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap()),
        ),
    ]
    .into_iter()
    .collect();

    [
        ("owner", owner),
        ("opens", Value::Time(NaiveTime::from_hms_milli_opt(9, 30, 0, 250).unwrap())),
        (
            "lease",
            Value::Duration(CalendarDuration::new(12, 0, 0).unwrap()),
        ),
        ("host", Value::Inet(IpAddr::V6(Ipv6Addr::LOCALHOST))),
        ("photo", Value::Blob(Blob::from(vec![0x89u8, b'P', b'N', b'G']))),
        ("embedding", Value::Vector(Vector::new(vec![0.25, -1.0, 3.5]))),
        ("tags", Value::Set(vec![Value::from("fast"), Value::from("red")])),
    ]
    .into_iter()
    .collect()
}

#[test]
fn test_rich_scalars_round_trip_through_a_body() {
    let serdes = SerDes::default();
    let mut document = rich_document();
    let original = document.clone();

    let body = serdes.serialize_to_body(&mut document).unwrap();
    assert_eq!(document, original);

    let back = serdes.deserialize_body(&body).unwrap();

    // Sets come back as arrays; everything else is exact.
    let mut expected = original;
    expected
        .set(
            &docwire_core::path!("tags"),
            Value::from(vec!["fast", "red"]),
        )
        .unwrap();
    assert_eq!(back, expected);
}

#[test]
fn test_wire_shapes() {
    let serdes = SerDes::default();
    let mut document: Value = [
        ("when", Value::Timestamp(Utc.timestamp_millis_opt(1_000).unwrap())),
        ("lease", Value::Duration(CalendarDuration::parse("1y2mo3d").unwrap())),
        ("photo", Value::Blob(Blob::from(vec![1u8, 2, 3]))),
        ("embedding", Value::Vector(Vector::new(vec![1.0, 2.0]))),
        ("host", Value::Inet("10.0.0.1".parse().unwrap())),
    ]
    .into_iter()
    .collect();

    let wire = serdes.serialize_to_json(&mut document).unwrap();
    assert_eq!(
        wire,
        json!({
            "when": {"$date": 1000},
            "lease": {"$duration": "1y2mo3d"},
            "photo": {"$binary": "AQID"},
            "embedding": {"$vector": [1.0, 2.0]},
            "host": {"$inet": "10.0.0.1"}
        })
    );
}

#[test]
fn test_binary_vectors_from_options() {
    let options: SerDesOptions =
        serde_json::from_value(json!({"vector_encoding": "binary"})).unwrap();
    let serdes = SerDes::new(
        SerDesConfig::builder()
            .apply_options(&options)
            .unwrap()
            .build(),
    );

    let mut document: Value = [("v", Value::Vector(Vector::new(vec![1.0])))]
        .into_iter()
        .collect();
    let wire = serdes.serialize_to_json(&mut document).unwrap();
    assert_eq!(wire, json!({"v": {"$vector": "P4AAAA=="}}));
    assert_eq!(serdes.deserialize_json(wire).unwrap(), document);
}

#[test]
fn test_tags_are_only_recognized_alone() {
    let serdes = SerDes::default();
    let wire = json!({
        "lookalike": {"$uuid": "00000000-0000-0000-0000-000000000000", "note": "x"},
        "plain": {"uuid": "00000000-0000-0000-0000-000000000000"}
    });
    let back = serdes.deserialize_json(wire.clone()).unwrap();
    assert_eq!(back, json_to_value(wire));
}

#[test]
fn test_malformed_tagged_payload_reports_its_path() {
    let serdes = SerDes::default();
    let err = serdes
        .deserialize_body(br#"{"owners": [{"id": {"$objectId": "not-hex"}}]}"#)
        .unwrap_err();
    match err {
        Error::InvalidWireValue { path, .. } => assert_eq!(path.to_string(), "owners.0.id"),
        other => panic!("expected invalid wire value, got {:?}", other),
    }
}

#[test]
fn test_invalid_json_body() {
    let err = SerDes::default().deserialize_body(b"{\"a\":").unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}

#[test]
fn test_number_policy_per_path() {
    let policy = NumberPolicy::per_path(NumberRepr::Number)
        .with(pattern!("id"), NumberRepr::String)
        .with(pattern!("balance"), NumberRepr::Decimal)
        .with(pattern!("items.*.qty"), NumberRepr::BigInt);
    let serdes = SerDes::new(SerDesConfig::builder().numbers(policy).build());

    let body = br#"{"id": 9007199254740993, "balance": 10.10, "items": [{"qty": 2}], "ratio": 0.5}"#;
    let back = serdes.deserialize_body(body).unwrap();

    let map = back.as_map().unwrap();
    assert_eq!(map["id"], Value::from("9007199254740993"));
    assert_eq!(
        map["balance"],
        Value::Decimal(BigDecimal::from_str("10.10").unwrap())
    );
    assert_eq!(
        back.get(&docwire_core::path!("items.0.qty")),
        Some(&Value::BigInt(BigInt::from(2)))
    );
    assert_eq!(map["ratio"], Value::Float(0.5));
}

#[test]
fn test_number_or_string_keeps_unsafe_numbers_as_text() {
    let serdes = SerDes::new(
        SerDesConfig::builder()
            .numbers(NumberRepr::NumberOrString)
            .build(),
    );
    let back = serdes
        .deserialize_body(br#"[1, 2.5, 123456789012345678901234567890]"#)
        .unwrap();
    assert_eq!(
        back,
        Value::from(vec![
            Value::Integer(1),
            Value::Float(2.5),
            Value::from("123456789012345678901234567890"),
        ])
    );
}

#[test]
fn test_fractional_number_under_bigint_policy() {
    let serdes = SerDes::new(SerDesConfig::builder().numbers(NumberRepr::BigInt).build());
    let err = serdes.deserialize_body(br#"{"n": 1.5}"#).unwrap_err();
    assert!(matches!(err, Error::InvalidWireValue { ref path, .. } if path.to_string() == "n"));
}

#[test]
fn test_callback_policy_sees_application_paths() {
    let options: SerDesOptions = serde_json::from_value(json!({"key_case": "snake_case"})).unwrap();
    let serdes = SerDes::new(
        SerDesConfig::builder()
            .apply_options(&options)
            .unwrap()
            .numbers(NumberPolicy::callback(|path| {
                if path.last_key() == Some("accountId") {
                    NumberRepr::String
                } else {
                    NumberRepr::Number
                }
            }))
            .build(),
    );

    let back = serdes
        .deserialize_body(br#"{"account_id": 42, "age": 42}"#)
        .unwrap();
    assert_eq!(back, json_to_value(json!({"accountId": "42", "age": 42})));
}

#[test]
fn test_big_numbers_serialize_exactly() {
    let serdes = SerDes::default();
    let mut document: Value = [
        ("big", Value::BigInt(BigInt::from_str("123456789012345678901234567890").unwrap())),
        ("dec", Value::Decimal(BigDecimal::from_str("0.1000000000000000000001").unwrap())),
    ]
    .into_iter()
    .collect();

    let body = serdes.serialize_to_body(&mut document).unwrap();
    assert_eq!(
        std::str::from_utf8(&body).unwrap(),
        r#"{"big":123456789012345678901234567890,"dec":0.1000000000000000000001}"#
    );
}

#[test]
fn test_serialize_to_json_honors_mutate_in_place() {
    let serdes = SerDes::new(SerDesConfig::builder().mutate_in_place(true).build());
    let mut document: Value = [("id", Value::Uuid(Uuid::nil()))].into_iter().collect();

    let wire = serdes.serialize_to_json(&mut document).unwrap();
    assert_eq!(document, json_to_value(wire));
    assert_eq!(
        document.get(&docwire_core::path!("id")).map(Value::kind),
        Some(ValueKind::Map)
    );
}

#[test]
fn test_vector_encoding_default_is_array() {
    assert_eq!(VectorEncoding::default(), VectorEncoding::Array);
}

#[test]
fn test_huge_exponents_are_decided_without_expansion() {
    let body = b"[1e10000000]";
    let started = Instant::now();

    let err = SerDes::default().deserialize_body(body).unwrap_err();
    assert!(matches!(err, Error::InvalidWireValue { ref path, .. } if path.to_string() == "0"));

    let as_decimal = SerDes::new(SerDesConfig::builder().numbers(NumberRepr::Decimal).build())
        .deserialize_body(body)
        .unwrap();
    match as_decimal.get(&docwire_core::path!("0")) {
        Some(Value::Decimal(d)) => {
            assert_eq!(d.as_bigint_and_exponent(), (BigInt::from(1), -10_000_000));
        }
        other => panic!("expected a decimal, got {:?}", other),
    }

    let as_text = SerDes::new(
        SerDesConfig::builder()
            .numbers(NumberRepr::NumberOrString)
            .build(),
    )
    .deserialize_body(body)
    .unwrap();
    assert_eq!(as_text, Value::from(vec!["1e10000000"]));

    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn test_snake_case_option_refuses_keys_it_cannot_restore() {
    let options: SerDesOptions = serde_json::from_value(json!({"key_case": "snake_case"})).unwrap();
    let serdes = SerDes::new(
        SerDesConfig::builder()
            .apply_options(&options)
            .unwrap()
            .build(),
    );

    let mut document = json_to_value(json!({"Name": 1, "snakeKey": 2}));
    let body = serdes.serialize_to_body(&mut document).unwrap();
    assert_eq!(body.as_ref(), br#"{"Name":1,"snake_key":2}"#);
    assert_eq!(serdes.deserialize_body(&body).unwrap(), document);

    let mut document = json_to_value(json!({"Name": 1, "snake_key": 2}));
    let err = serdes.serialize_to_body(&mut document).unwrap_err();
    assert!(matches!(err, Error::IrreversibleKey { ref key, .. } if key == "snake_key"));
}

#[test]
fn test_tag_rules_see_tagged_objects_on_deserialize() {
    // Kind rules see the decoded value when serializing; tag rules see the
    // wire object when deserializing.
    let config = SerDesConfig::builder()
        .codec(FnCodec::for_kind(ValueKind::Uuid).on_serialize(|v, _| match v {
            Value::Uuid(u) => Ok(CodecOutput::done(u.simple().to_string())),
            _ => Ok(CodecOutput::nevermind()),
        }))
        .codec(FnCodec::for_tag("$uuid").on_deserialize(|v, _| {
            let text = v
                .as_map()
                .and_then(|m| m.get("$uuid"))
                .and_then(Value::as_str)
                .ok_or("tagged uuid without text")?;
            Ok(CodecOutput::done(Value::from(format!("uuid:{}", text))))
        }))
        .build();
    let serdes = SerDes::new(config);

    let mut document: Value = [("id", Value::Uuid(Uuid::nil()))].into_iter().collect();
    let wire = serdes.serialize_to_json(&mut document).unwrap();
    assert_eq!(wire, json!({"id": "00000000000000000000000000000000"}));

    let back = serdes
        .deserialize_json(json!({"id": {"$uuid": "00000000-0000-0000-0000-000000000000"}}))
        .unwrap();
    assert_eq!(
        back,
        json_to_value(json!({"id": "uuid:00000000-0000-0000-0000-000000000000"}))
    );
}
