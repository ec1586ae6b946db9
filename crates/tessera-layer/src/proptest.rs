//! Property-based tests for the tuple codec and subspaces.
//!
//! 1. **Roundtrip**: `unpack(pack(t)) == t` for every tuple, nesting included
//! 2. **Ordering**: `pack(a).cmp(pack(b)) == a.cmp(b)` across all element types
//! 3. **Prefix decoding**: the first `k` elements decode from `pack(t)` alone
//! 4. **Containment**: subspace keys stay inside their subspace's range

use std::cmp::Ordering;

use proptest::prelude::*;
use uuid::Uuid;

use crate::Element;
use crate::Subspace;
use crate::Tuple;
use crate::Versionstamp;

// =============================================================================
// Strategies
// =============================================================================

fn arb_versionstamp() -> impl Strategy<Value = Versionstamp> {
    (any::<[u8; 10]>(), any::<u16>()).prop_map(|(tr, user)| {
        Versionstamp::complete(tr, user).unwrap_or_else(|_| Versionstamp::incomplete(user))
    })
}

/// Leaf elements of every type.
fn arb_scalar() -> impl Strategy<Value = Element> {
    prop_oneof![
        Just(Element::Null),
        prop::collection::vec(any::<u8>(), 0..24).prop_map(Element::Bytes),
        "[a-z\\x00]{0,12}".prop_map(Element::String),
        any::<String>().prop_map(Element::String),
        any::<i64>().prop_map(|n| Element::Int(n.into())),
        any::<i128>().prop_map(Element::Int),
        (-300i64..300).prop_map(|n| Element::Int(n.into())),
        any::<f32>().prop_map(Element::Float),
        any::<f64>().prop_map(Element::Double),
        any::<bool>().prop_map(Element::Bool),
        any::<[u8; 16]>().prop_map(|b| Element::Uuid(Uuid::from_bytes(b))),
        arb_versionstamp().prop_map(Element::Versionstamp),
    ]
}

/// Elements including nested tuples a few levels deep.
fn arb_element() -> impl Strategy<Value = Element> {
    arb_scalar().prop_recursive(3, 24, 4, |inner| {
        prop::collection::vec(inner, 0..4).prop_map(|elements| Element::Tuple(Tuple::from_elements(elements)))
    })
}

fn arb_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec(arb_element(), 0..5).prop_map(Tuple::from_elements)
}

fn arb_string_tuple() -> impl Strategy<Value = Tuple> {
    prop::collection::vec("[a-z]{1,5}", 1..4).prop_map(|strings| strings.into_iter().map(Element::String).collect())
}

// =============================================================================
// Property Tests
// =============================================================================

proptest! {
    #[test]
    fn prop_roundtrip(tuple in arb_tuple()) {
        let packed = tuple.pack();
        let unpacked = Tuple::unpack(&packed).expect("unpack should succeed");
        prop_assert_eq!(tuple, unpacked);
    }

    /// Byte order of packed tuples equals structural tuple order.
    #[test]
    fn prop_order_preserved(a in arb_tuple(), b in arb_tuple()) {
        let structural = a.cmp(&b);
        let bytes = a.pack().cmp(&b.pack());
        prop_assert_eq!(structural, bytes, "a={:?} b={:?}", a, b);
    }

    #[test]
    fn prop_int_ordering(a in any::<i128>(), b in any::<i128>()) {
        let packed_a = Tuple::new().push(a).pack();
        let packed_b = Tuple::new().push(b).pack();
        prop_assert_eq!(a.cmp(&b), packed_a.cmp(&packed_b));
    }

    #[test]
    fn prop_double_ordering(a in any::<f64>(), b in any::<f64>()) {
        let packed_a = Tuple::new().push(a).pack();
        let packed_b = Tuple::new().push(b).pack();
        prop_assert_eq!(a.total_cmp(&b), packed_a.cmp(&packed_b));
    }

    /// Decoding the first k elements of a packed tuple yields its first k elements.
    #[test]
    fn prop_unpack_prefix(tuple in arb_tuple(), k in 0usize..6) {
        let k = k.min(tuple.len());
        let packed = tuple.pack();
        let (head, consumed) = Tuple::unpack_prefix(&packed, k).expect("prefix decode");

        let expected: Tuple = tuple.iter().take(k).cloned().collect();
        prop_assert_eq!(consumed, expected.pack().len());
        prop_assert_eq!(head, expected);
    }

    #[test]
    fn prop_prefix_stability(prefix in arb_tuple(), suffix in arb_tuple()) {
        let combined = prefix.concat(&suffix);
        prop_assert!(combined.pack().starts_with(&prefix.pack()));
        if !suffix.is_empty() {
            prop_assert_eq!(prefix.cmp(&combined), Ordering::Less);
        }
    }

    /// Every strict extension of a tuple falls inside its range.
    #[test]
    fn prop_range_captures_extensions(prefix in arb_tuple(), suffix in arb_tuple()) {
        prop_assume!(!suffix.is_empty());
        let (start, end) = prefix.range();
        let key = prefix.concat(&suffix).pack();
        prop_assert!(key >= start && key < end);
    }

    #[test]
    fn prop_subspace_roundtrip(prefix in arb_string_tuple(), key in arb_tuple()) {
        let subspace = Subspace::new(prefix);
        let packed = subspace.pack(&key);
        prop_assert!(subspace.contains(&packed));
        prop_assert_eq!(subspace.unpack(&packed).expect("unpack should succeed"), key);
    }

    /// Keys of a subspace lie within its range, and keys of a disjoint sibling do not.
    #[test]
    fn prop_subspace_range_containment(
        prefix1 in "[a-m]{1,3}",
        prefix2 in "[n-z]{1,3}",
        key in arb_tuple()
    ) {
        let sub1 = Subspace::new(Tuple::new().push(prefix1));
        let sub2 = Subspace::new(Tuple::new().push(prefix2));
        let (begin, end) = sub1.range();

        let key1 = sub1.pack(&key);
        let key2 = sub2.pack(&key);

        prop_assert!(key1 >= begin && key1 < end);
        prop_assert!(!(key2 >= begin && key2 < end));
        prop_assert!(!sub1.contains(&key2));
    }

    /// Every key of a subspace, the packed empty tuple included, lies in its range.
    #[test]
    fn prop_subspace_range_contains_every_key(prefix in arb_string_tuple(), key in arb_tuple()) {
        let subspace = Subspace::new(prefix);
        let (begin, end) = subspace.range();
        let packed = subspace.pack(&key);
        prop_assert!(packed >= begin && packed < end);
    }

    /// The tuple range holds exactly the keys with at least one element.
    #[test]
    fn prop_subspace_tuple_range(prefix in arb_string_tuple(), key in arb_tuple()) {
        let subspace = Subspace::new(prefix);
        let (begin, end) = subspace.tuple_range();
        let packed = subspace.pack(&key);
        prop_assert_eq!(packed >= begin && packed < end, !key.is_empty());
    }

    #[test]
    fn prop_nested_subspace_hierarchy(
        outer_prefix in arb_string_tuple(),
        inner_suffix in arb_tuple(),
        key in arb_tuple()
    ) {
        let outer = Subspace::new(outer_prefix);
        let inner = outer.subspace(&inner_suffix);
        let inner_key = inner.pack(&key);

        prop_assert!(inner.contains(&inner_key));
        prop_assert!(outer.contains(&inner_key));
        prop_assert_eq!(outer.unpack(&inner_key).expect("outer unpack"), inner_suffix.concat(&key));
    }

    #[test]
    fn prop_typed_partial(owner in "[a-z]{0,8}", id in any::<u64>(), flag in any::<bool>()) {
        let space = Subspace::new(Tuple::new().push("t")).typed::<(String, u64, bool)>();
        let raw = space.pack(&(owner.clone(), id, flag));

        prop_assert_eq!(space.unpack(&raw).expect("full"), (owner.clone(), id, flag));
        prop_assert_eq!(space.unpack_partial::<(String, u64)>(&raw).expect("partial"), (owner.clone(), id));

        let (begin, end) = space.range_partial(&(owner,));
        prop_assert!(raw >= begin && raw < end);
    }
}

// =============================================================================
// Additional Non-Proptest Tests
// =============================================================================

#[test]
fn test_subspace_range_disjoint() {
    let users = Subspace::new(Tuple::new().push("users"));
    let orders = Subspace::new(Tuple::new().push("orders"));

    let (users_start, users_end) = users.range();
    let (orders_start, orders_end) = orders.range();

    assert!(orders_end <= users_start || users_end <= orders_start);
}
