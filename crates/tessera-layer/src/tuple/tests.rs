use tessera_constants::tuple::MAX_TUPLE_NESTING_DEPTH;
use uuid::Uuid;

use super::*;

fn roundtrip(t: &Tuple) -> Tuple {
    Tuple::unpack(&t.pack()).unwrap()
}

// =========================================================================
// Element Encoding
// =========================================================================

#[test]
fn test_empty_tuple() {
    let t = Tuple::new();
    assert!(t.is_empty());
    assert!(t.pack().is_empty());
    assert_eq!(roundtrip(&t), t);
}

#[test]
fn test_mixed_tuple_exact_bytes() {
    let t = Tuple::new().push(-1i64).push("hello").push(true);
    let packed = t.pack();

    assert_eq!(packed, vec![0x13, 0xFE, 0x02, b'h', b'e', b'l', b'l', b'o', 0x00, 0x27]);
    assert_eq!(Tuple::unpack(&packed).unwrap(), t);
}

#[test]
fn test_null_element() {
    let t = Tuple::new().push(());
    assert_eq!(t.pack(), vec![NULL_CODE]);
    assert_eq!(roundtrip(&t).get(0), Some(&Element::Null));
}

#[test]
fn test_string_with_null_bytes() {
    let t = Tuple::new().push("foo\x00bar");
    let packed = t.pack();

    assert_eq!(packed, b"\x02foo\x00\xFFbar\x00".to_vec());
    assert_eq!(roundtrip(&t).get(0), Some(&Element::String("foo\x00bar".to_string())));
}

#[test]
fn test_bytes_element() {
    let t = Tuple::new().push(vec![1u8, 0, 3]);
    assert_eq!(t.pack(), vec![BYTES_CODE, 1, 0, 0xFF, 3, 0]);
    assert_eq!(roundtrip(&t).get(0), Some(&Element::Bytes(vec![1, 0, 3])));
}

#[test]
fn test_integer_zero() {
    let t = Tuple::new().push(0i64);
    assert_eq!(t.pack(), vec![INT_ZERO_CODE]);
    assert_eq!(roundtrip(&t).get(0), Some(&Element::Int(0)));
}

#[test]
fn test_integers_roundtrip_across_widths() {
    let values = [
        1i128,
        -1,
        255,
        -255,
        256,
        -256,
        i64::MAX as i128,
        i64::MIN as i128,
        u64::MAX as i128,
        -(u64::MAX as i128),
        u64::MAX as i128 + 1,
        -(u64::MAX as i128) - 1,
        i128::MAX,
        i128::MIN,
    ];
    for n in values {
        let t = Tuple::new().push(n);
        assert_eq!(roundtrip(&t).get(0), Some(&Element::Int(n)), "failed for n={n}");
    }
}

#[test]
fn test_integer_ordering() {
    let values = [
        i128::MIN,
        -(u64::MAX as i128) - 1,
        -(u64::MAX as i128),
        i64::MIN as i128,
        -1000,
        -1,
        0,
        1,
        1000,
        i64::MAX as i128,
        u64::MAX as i128,
        u64::MAX as i128 + 1,
        i128::MAX,
    ];
    let packed: Vec<Vec<u8>> = values.iter().map(|&n| Tuple::new().push(n).pack()).collect();

    for i in 1..packed.len() {
        assert!(packed[i - 1] < packed[i], "ordering failed: {} should be < {}", values[i - 1], values[i]);
    }
}

#[test]
fn test_string_ordering() {
    let values = ["", "a", "a\x00", "aa", "ab", "b", "ba"];
    let packed: Vec<Vec<u8>> = values.iter().map(|s| Tuple::new().push(*s).pack()).collect();

    for i in 1..packed.len() {
        assert!(packed[i - 1] < packed[i], "ordering failed: {:?} should be < {:?}", values[i - 1], values[i]);
    }
}

#[test]
fn test_float_special_values() {
    for f in [f32::INFINITY, f32::NEG_INFINITY, -0.0, 0.0, f32::MIN_POSITIVE, f32::MAX] {
        let t = Tuple::new().push(f);
        match roundtrip(&t).get(0) {
            Some(Element::Float(g)) => assert_eq!(g.to_bits(), f.to_bits()),
            other => panic!("expected Float, got {other:?}"),
        }
    }

    match roundtrip(&Tuple::new().push(f64::NAN)).get(0) {
        Some(Element::Double(d)) => assert!(d.is_nan()),
        other => panic!("expected Double, got {other:?}"),
    }
}

#[test]
fn test_negative_zero_sorts_before_zero() {
    let neg = Tuple::new().push(-0.0f64);
    let pos = Tuple::new().push(0.0f64);

    assert!(neg < pos);
    assert!(neg.pack() < pos.pack());
    assert_ne!(neg, pos);
}

#[test]
fn test_double_ordering() {
    let values = [f64::NEG_INFINITY, -1e300, -1.0, -0.0, 0.0, 1e-300, 1.0, f64::INFINITY];
    let packed: Vec<Vec<u8>> = values.iter().map(|&d| Tuple::new().push(d).pack()).collect();

    for i in 1..packed.len() {
        assert!(packed[i - 1] < packed[i], "double ordering failed: {} should be < {}", values[i - 1], values[i]);
    }
}

#[test]
fn test_uuid_element() {
    let id = Uuid::from_bytes([7u8; 16]);
    let t = Tuple::new().push(id);
    let packed = t.pack();

    assert_eq!(packed[0], UUID_CODE);
    assert_eq!(&packed[1..], &[7u8; 16]);
    assert_eq!(roundtrip(&t).get(0), Some(&Element::Uuid(id)));
}

#[test]
fn test_bool_ordering() {
    let f = Tuple::new().push(false).pack();
    let t = Tuple::new().push(true).pack();
    assert_eq!(f, vec![FALSE_CODE]);
    assert_eq!(t, vec![TRUE_CODE]);
    assert!(f < t);
}

#[test]
fn test_nested_tuple_with_null() {
    let inner = Tuple::new().push(()).push("after_null");
    let outer = Tuple::new().push("outer").push(inner.clone());
    let packed = outer.pack();

    let inner_start = 1 + "outer".len() + 1;
    assert_eq!(&packed[inner_start..inner_start + 3], &[NESTED_CODE, 0x00, NULL_ESCAPE]);
    assert_eq!(*packed.last().unwrap(), 0x00);

    let unpacked = Tuple::unpack(&packed).unwrap();
    assert_eq!(unpacked.get(1), Some(&Element::Tuple(inner)));
}

#[test]
fn test_deeply_nested_tuple() {
    let t = Tuple::new().push(Tuple::new().push(Tuple::new().push(()).push(1i64)).push("x"));
    assert_eq!(roundtrip(&t), t);
}

#[test]
fn test_cross_type_ordering() {
    let ordered = [
        Tuple::new().push(()),
        Tuple::new().push(vec![0xFFu8]),
        Tuple::new().push(""),
        Tuple::new().push(Tuple::new()),
        Tuple::new().push(i128::MIN),
        Tuple::new().push(i128::MAX),
        Tuple::new().push(f32::NEG_INFINITY),
        Tuple::new().push(f64::NEG_INFINITY),
        Tuple::new().push(false),
        Tuple::new().push(Uuid::nil()),
        Tuple::new().push(Versionstamp::incomplete(0)),
    ];

    for pair in ordered.windows(2) {
        assert!(pair[0] < pair[1], "{:?} should be < {:?}", pair[0], pair[1]);
        assert!(pair[0].pack() < pair[1].pack(), "packed {:?} should be < {:?}", pair[0], pair[1]);
    }
}

#[test]
fn test_nested_tuple_sorts_before_numbers() {
    let nested = Tuple::new().push(Tuple::new().push(i128::MAX).push(true));
    let smallest = Tuple::new().push(i128::MIN);

    assert_eq!(nested.pack()[0], NESTED_CODE);
    assert!(nested < smallest);
    assert!(nested.pack() < smallest.pack());
    assert!(nested.pack() < Tuple::new().push(false).pack());
    assert!(nested.pack() < Tuple::new().push(Uuid::nil()).pack());
}

#[test]
fn test_prefix_sorts_first() {
    let short = Tuple::new().push("a");
    let long = Tuple::new().push("a").push(());
    assert!(short < long);
    assert!(short.pack() < long.pack());
}

#[test]
fn test_concat() {
    let a = Tuple::new().push("a").push(1i64);
    let b = Tuple::new().push(true);
    let joined = a.concat(&b);

    assert_eq!(joined.len(), 3);
    assert_eq!(joined.pack(), [a.pack(), b.pack()].concat());
}

// =========================================================================
// Versionstamps
// =========================================================================

#[test]
fn test_complete_versionstamp_roundtrip() {
    let vs = Versionstamp::complete([0, 0, 0, 0, 0, 0, 0, 9, 0, 1], 4).unwrap();
    let t = Tuple::new().push("log").push(vs);

    assert_eq!(t.try_pack().unwrap(), t.pack());
    assert_eq!(roundtrip(&t).get(1), Some(&Element::Versionstamp(vs)));
}

#[test]
fn test_try_pack_rejects_incomplete_versionstamp() {
    let t = Tuple::new().push(Tuple::new().push(Versionstamp::incomplete(1)));
    assert!(t.has_incomplete_versionstamp());
    assert!(matches!(t.try_pack(), Err(TupleError::UnsupportedValue { .. })));
}

#[test]
fn test_pack_with_versionstamp_appends_offset() {
    let prefix = b"pfx".to_vec();
    let t = Tuple::new().push("a").push(Versionstamp::incomplete(2));
    let key = t.pack_with_versionstamp(&prefix).unwrap();

    // prefix (3) + "a" string (3) + versionstamp code (1)
    let expected_offset = 3u32 + 3 + 1;
    let (body, offset) = key.split_at(key.len() - 4);
    assert_eq!(u32::from_le_bytes(offset.try_into().unwrap()), expected_offset);
    assert_eq!(&body[expected_offset as usize..expected_offset as usize + 10], &[0xFF; 10]);
    assert_eq!(&body[3..], t.pack().as_slice());
}

#[test]
fn test_pack_with_versionstamp_requires_exactly_one() {
    let none = Tuple::new().push("a");
    assert!(none.pack_with_versionstamp(&[]).is_err());

    let two = Tuple::new().push(Versionstamp::incomplete(0)).push(Versionstamp::incomplete(1));
    assert!(two.pack_with_versionstamp(&[]).is_err());
}

// =========================================================================
// Partial Decoding and Ranges
// =========================================================================

#[test]
fn test_unpack_prefix() {
    let t = Tuple::new().push("users").push(7i64).push("profile");
    let packed = t.pack();

    let (head, consumed) = Tuple::unpack_prefix(&packed, 2).unwrap();
    assert_eq!(head, Tuple::new().push("users").push(7i64));
    assert_eq!(consumed, Tuple::new().push("users").push(7i64).pack().len());

    // Trailing garbage past the decoded prefix is never inspected.
    let mut dirty = head.pack();
    dirty.push(0xEE);
    assert!(Tuple::unpack_prefix(&dirty, 2).is_ok());
    assert!(Tuple::unpack(&dirty).is_err());
}

#[test]
fn test_unpack_prefix_too_short() {
    let packed = Tuple::new().push(1i64).pack();
    let err = Tuple::unpack_prefix(&packed, 2).unwrap_err();
    assert!(err.is_truncated());
}

#[test]
fn test_range_excludes_self_and_siblings() {
    let prefix = Tuple::new().push("users").push(1i64);
    let (start, end) = prefix.range();

    let child = Tuple::new().push("users").push(1i64).push("profile").pack();
    assert!(child >= start && child < end);

    let own = prefix.pack();
    assert!(own < start);

    let sibling = Tuple::new().push("users").push(2i64).pack();
    assert!(sibling >= end);
}

#[test]
fn test_strinc() {
    assert_eq!(strinc(&[0x01, 0x02]), Some(vec![0x01, 0x03]));
    assert_eq!(strinc(&[0x01, 0xFF]), Some(vec![0x02]));
    assert_eq!(strinc(&[0xFF, 0xFF]), None);
    assert_eq!(strinc(&[]), None);

    let t = Tuple::new().push("abc");
    assert!(t.strinc().unwrap() > t.pack());
}

// =========================================================================
// Error Paths
// =========================================================================

#[test]
fn test_error_unknown_type_code() {
    match Tuple::unpack(&[0x40]) {
        Err(TupleError::UnknownTypeCode { code, offset }) => {
            assert_eq!(code, 0x40);
            assert_eq!(offset, 0);
        }
        other => panic!("expected UnknownTypeCode, got {other:?}"),
    }
}

#[test]
fn test_error_invalid_utf8() {
    let data = [STRING_CODE, 0xFF, 0xFE, 0x00];
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::InvalidUtf8 { .. })));
}

#[test]
fn test_error_missing_terminator() {
    let data = [STRING_CODE, b'a', b'b'];
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::MissingTerminator { .. })));
}

#[test]
fn test_error_truncated_int() {
    let data = [0x16, 0x01];
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::UnexpectedEnd { .. })));
}

#[test]
fn test_error_truncated_uuid() {
    let data = [UUID_CODE, 1, 2, 3];
    assert!(Tuple::unpack(&data).unwrap_err().is_truncated());
}

#[test]
fn test_error_unterminated_nested() {
    let data = [NESTED_CODE, INT_ZERO_CODE];
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::UnterminatedNested { .. })));
}

#[test]
fn test_error_integer_overflow() {
    let mut data = vec![POS_INT_BIG_CODE, 17];
    data.extend_from_slice(&[0x01; 17]);
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::IntegerOverflow { .. })));

    // 2^127 does not fit as a positive i128.
    let mut data = vec![POS_INT_BIG_CODE, 16, 0x80];
    data.extend_from_slice(&[0x00; 15]);
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::IntegerOverflow { .. })));
}

fn nested_bytes(levels: usize) -> Vec<u8> {
    let mut data = vec![NESTED_CODE; levels];
    data.extend(std::iter::repeat_n(NULL_CODE, levels));
    data
}

#[test]
fn test_nesting_at_bound_decodes() {
    let levels = MAX_TUPLE_NESTING_DEPTH as usize;
    let decoded = Tuple::unpack(&nested_bytes(levels)).unwrap();

    let mut depth = 0;
    let mut current = decoded.get(0);
    while let Some(Element::Tuple(inner)) = current {
        depth += 1;
        current = inner.get(0);
    }
    assert_eq!(depth, levels);
}

#[test]
fn test_error_nesting_too_deep() {
    let data = nested_bytes(MAX_TUPLE_NESTING_DEPTH as usize + 1);
    assert!(matches!(Tuple::unpack(&data), Err(TupleError::NestingTooDeep { max: MAX_TUPLE_NESTING_DEPTH, .. })));
}

#[test]
fn test_error_runaway_nesting_is_rejected() {
    let data = vec![NESTED_CODE; 100_000];
    let err = Tuple::unpack(&data).unwrap_err();
    assert!(matches!(err, TupleError::NestingTooDeep { offset, .. } if offset == MAX_TUPLE_NESTING_DEPTH as usize));
    assert!(!err.is_truncated());

    assert!(Tuple::unpack_prefix(&data, 1).is_err());
}
