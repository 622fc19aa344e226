use super::*;

#[test]
fn test_decode_full_record() {
    let record = OffsetRecord::decode(br#"{"topic":"t1","partitionId":3,"offset":42}"#).unwrap();
    assert_eq!(
        record,
        OffsetRecord {
            topic: "t1".to_string(),
            partition_id: 3,
            offset: 42,
        }
    );
}

#[test]
fn test_absent_fields_take_zero_values() {
    let record = OffsetRecord::decode(br#"{"offset":7}"#).unwrap();
    assert_eq!(record.topic, "");
    assert_eq!(record.partition_id, 0);
    assert_eq!(record.offset, 7);
}

#[test]
fn test_unknown_fields_are_ignored() {
    let offset = OffsetRecord::decode_offset(br#"{"offset":9,"owner":"host-1"}"#).unwrap();
    assert_eq!(offset, 9);
}

#[test]
fn test_offset_is_64_bit() {
    let offset = OffsetRecord::decode_offset(br#"{"offset":9007199254740993}"#).unwrap();
    assert_eq!(offset, 9_007_199_254_740_993);
}

#[test]
fn test_malformed_payload_is_rejected() {
    assert!(matches!(
        OffsetRecord::decode(b"42"),
        Err(PayloadError::Json(_))
    ));
    assert!(matches!(
        OffsetRecord::decode(br#"{"offset":"many"}"#),
        Err(PayloadError::Json(_))
    ));
    assert!(matches!(OffsetRecord::decode(b""), Err(PayloadError::Json(_))));
}

#[test]
fn test_topic_view_requires_topic() {
    assert_eq!(
        OffsetRecord::decode_topic(br#"{"topic":"orders","offset":1}"#).unwrap(),
        "orders"
    );
    assert!(matches!(
        OffsetRecord::decode_topic(br#"{"offset":1}"#),
        Err(PayloadError::MissingTopic)
    ));
}

#[test]
fn test_encode_uses_wire_field_names() {
    let record = OffsetRecord {
        topic: "t1".to_string(),
        partition_id: 0,
        offset: 42,
    };
    let json: serde_json::Value = serde_json::from_slice(&record.encode()).unwrap();
    assert_eq!(json["partitionId"], 0);
    assert_eq!(json["offset"], 42);
    assert_eq!(json["topic"], "t1");
}
