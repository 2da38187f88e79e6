use msgpack_codec::{
    decode, decode_with, encode, encode_with, DecodeError, DecodeOptions, EncodeError,
    EncodeOptions, ExtensionCodec, ExtensionValue, MsgPackValue, Timestamp, UnknownExtPolicy,
    EXT_TIMESTAMP,
};

#[test]
fn timestamp32_roundtrip_without_milliseconds() {
    let codec = ExtensionCodec::new();
    let ts = Timestamp::from_millis(1_556_633_024_000);
    let (tag, payload) = codec.try_to_encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(tag, EXT_TIMESTAMP);
    assert_eq!(payload.len(), 4);
    assert_eq!(
        codec.decode(&payload, EXT_TIMESTAMP).unwrap(),
        MsgPackValue::Timestamp(ts)
    );
}

#[test]
fn timestamp64_roundtrip_with_milliseconds() {
    let codec = ExtensionCodec::new();
    let ts = Timestamp::from_millis(1_556_633_024_123);
    let (tag, payload) = codec.try_to_encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(tag, EXT_TIMESTAMP);
    assert_eq!(payload.len(), 8);
    match codec.decode(&payload, EXT_TIMESTAMP).unwrap() {
        MsgPackValue::Timestamp(decoded) => {
            assert_eq!(decoded, ts);
            assert_eq!(decoded.as_millis(), 1_556_633_024_123);
        }
        other => panic!("expected timestamp, got {other:?}"),
    }
}

#[test]
fn timestamp96_roundtrip_far_future() {
    let codec = ExtensionCodec::new();
    let ts = Timestamp::from_millis(0x4_0000_0000 * 1000);
    let (_, payload) = codec.try_to_encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(payload.len(), 12);
    assert_eq!(
        codec.decode(&payload, EXT_TIMESTAMP).unwrap(),
        MsgPackValue::Timestamp(ts)
    );
}

#[test]
fn timestamp_wire_format_through_full_codec() {
    // 4-byte payload rides a fixext4 header with the reserved tag.
    let ts = Timestamp::from_millis(1_556_633_024_000);
    let encoded = encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(encoded.len(), 6);
    assert_eq!(&encoded[..2], &[0xd6, 0xff]);
    assert_eq!(decode(&encoded).unwrap(), MsgPackValue::Timestamp(ts));

    // 8-byte payload: fixext8.
    let ts = Timestamp::from_millis(1_556_633_024_123);
    let encoded = encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(&encoded[..2], &[0xd7, 0xff]);
    assert_eq!(decode(&encoded).unwrap(), MsgPackValue::Timestamp(ts));

    // 12-byte payload: ext8 with explicit length.
    let ts = Timestamp::from_millis(-86_400_000);
    let encoded = encode(&MsgPackValue::Timestamp(ts)).unwrap();
    assert_eq!(&encoded[..3], &[0xc7, 12, 0xff]);
    assert_eq!(decode(&encoded).unwrap(), MsgPackValue::Timestamp(ts));
}

#[test]
fn timestamp_rejects_malformed_payload_length() {
    let codec = ExtensionCodec::new();
    assert_eq!(
        codec.decode(&[0; 6], EXT_TIMESTAMP),
        Err(DecodeError::InvalidTimestampLength(6))
    );
}

/// Registers set (tag 0) and pair-map (tag 1) codecs like an application
/// would: sets are arrays of integers, maps travel as arrays of [key,
/// value] pairs, both nested through the plain codec.
fn set_and_map_codec() -> ExtensionCodec {
    let mut codec = ExtensionCodec::new();
    codec.register(
        0,
        |value| match value {
            MsgPackValue::Array(items)
                if !items.is_empty()
                    && items.iter().all(|v| matches!(v, MsgPackValue::Int(_))) =>
            {
                encode(value).ok()
            }
            _ => None,
        },
        |data, _tag| decode(data),
    );
    codec.register(
        1,
        |value| match value {
            MsgPackValue::Map(pairs) => {
                let entries = MsgPackValue::Array(
                    pairs
                        .iter()
                        .map(|(k, v)| MsgPackValue::Array(vec![k.clone(), v.clone()]))
                        .collect(),
                );
                encode(&entries).ok()
            }
            _ => None,
        },
        |data, _tag| {
            let entries = match decode(data)? {
                MsgPackValue::Array(items) => items,
                other => panic!("pair-map payload must be an array, got {other:?}"),
            };
            let mut pairs = Vec::with_capacity(entries.len());
            for entry in entries {
                match entry {
                    MsgPackValue::Array(mut kv) if kv.len() == 2 => {
                        let val = kv.pop().unwrap();
                        let key = kv.pop().unwrap();
                        pairs.push((key, val));
                    }
                    other => panic!("pair-map entry must be a [key, value] pair, got {other:?}"),
                }
            }
            Ok(MsgPackValue::Map(pairs))
        },
    );
    codec
}

#[test]
fn custom_set_and_map_extensions_roundtrip() {
    let codec = set_and_map_codec();
    let set = MsgPackValue::Array(vec![
        MsgPackValue::Int(1),
        MsgPackValue::Int(2),
        MsgPackValue::Int(3),
    ]);
    let map = MsgPackValue::Map(vec![
        (MsgPackValue::from("foo"), MsgPackValue::from("bar")),
        (MsgPackValue::from("bar"), MsgPackValue::from("baz")),
    ]);
    let value = MsgPackValue::Array(vec![set.clone(), map.clone()]);

    let encode_options = EncodeOptions {
        extension_codec: Some(&codec),
        ..Default::default()
    };
    let encoded = encode_with(&value, &encode_options).unwrap();
    // The outer array is native; its elements went through the codec.
    assert_eq!(encoded[0], 0x92);

    let decode_options = DecodeOptions {
        extension_codec: Some(&codec),
        ..Default::default()
    };
    assert_eq!(decode_with(&encoded, &decode_options).unwrap(), value);

    // Without the codec the same bytes surface raw extensions.
    let raw_options = DecodeOptions {
        unknown_ext: UnknownExtPolicy::Raw,
        ..Default::default()
    };
    match decode_with(&encoded, &raw_options).unwrap() {
        MsgPackValue::Array(items) => {
            assert!(matches!(&items[0], MsgPackValue::Ext(e) if e.tag == 0));
            assert!(matches!(&items[1], MsgPackValue::Ext(e) if e.tag == 1));
        }
        other => panic!("expected array, got {other:?}"),
    }
}

#[test]
fn try_to_encode_walks_entries_in_registration_order() {
    let mut codec = ExtensionCodec::new();
    codec.register(
        10,
        |value| match value {
            MsgPackValue::Bool(_) => Some(vec![10]),
            _ => None,
        },
        |_, _| Ok(MsgPackValue::Nil),
    );
    codec.register(
        11,
        |value| match value {
            // Never reached for booleans: tag 10 claims them first.
            MsgPackValue::Bool(_) | MsgPackValue::Bin(_) => Some(vec![11]),
            _ => None,
        },
        |_, _| Ok(MsgPackValue::Nil),
    );
    assert_eq!(
        codec.try_to_encode(&MsgPackValue::Bool(true)),
        Some((10, vec![10]))
    );
    assert_eq!(
        codec.try_to_encode(&MsgPackValue::Bin(vec![])),
        Some((11, vec![11]))
    );
    assert_eq!(codec.try_to_encode(&MsgPackValue::Int(1)), None);
}

#[test]
fn last_registration_for_a_tag_wins() {
    let mut codec = ExtensionCodec::new();
    codec.register(5, |_| None, |_, _| Ok(MsgPackValue::Int(1)));
    codec.register(5, |_| None, |_, _| Ok(MsgPackValue::Int(2)));
    assert_eq!(codec.decode(&[], 5).unwrap(), MsgPackValue::Int(2));
}

#[test]
fn unknown_extension_policy() {
    // fixext1 with unregistered tag 9.
    let bytes = [0xd4, 0x09, 0xaa];
    assert_eq!(
        decode(&bytes),
        Err(DecodeError::UnrecognizedExtension(9))
    );

    let options = DecodeOptions {
        unknown_ext: UnknownExtPolicy::Raw,
        ..Default::default()
    };
    let raw = MsgPackValue::Ext(ExtensionValue {
        tag: 9,
        data: vec![0xaa],
    });
    assert_eq!(decode_with(&bytes, &options).unwrap(), raw);

    // Raw extensions encode back to the identical bytes.
    assert_eq!(encode(&raw).unwrap(), bytes);
}

#[test]
fn ext_header_families_by_payload_length() {
    for (len, expected_header) in [
        (1usize, vec![0xd4, 0x07]),
        (2, vec![0xd5, 0x07]),
        (4, vec![0xd6, 0x07]),
        (8, vec![0xd7, 0x07]),
        (16, vec![0xd8, 0x07]),
        (3, vec![0xc7, 3, 0x07]),
        (255, vec![0xc7, 255, 0x07]),
        (256, vec![0xc8, 0x01, 0x00, 0x07]),
        (65536, vec![0xc9, 0x00, 0x01, 0x00, 0x00, 0x07]),
    ] {
        let value = MsgPackValue::Ext(ExtensionValue {
            tag: 7,
            data: vec![0x55; len],
        });
        let encoded = encode(&value).unwrap();
        assert_eq!(&encoded[..expected_header.len()], &expected_header, "len {len}");
        assert_eq!(encoded.len(), expected_header.len() + len);

        let options = DecodeOptions {
            unknown_ext: UnknownExtPolicy::Raw,
            ..Default::default()
        };
        assert_eq!(decode_with(&encoded, &options).unwrap(), value);
    }
}

#[test]
fn timestamp_needs_a_codec_that_carries_it() {
    // An encode path that reaches a Timestamp with no accepting entry
    // fails rather than guessing.
    let mut codec = ExtensionCodec::new();
    // Shadow the builtin with an entry that never accepts.
    codec.register(EXT_TIMESTAMP, |_| None, |_, _| Ok(MsgPackValue::Nil));
    let options = EncodeOptions {
        extension_codec: Some(&codec),
        ..Default::default()
    };
    let ts = MsgPackValue::Timestamp(Timestamp::from_millis(0));
    assert_eq!(
        encode_with(&ts, &options),
        Err(EncodeError::UnsupportedValue)
    );
}
