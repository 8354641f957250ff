//! Property-based test generators using proptest.
//!
//! Provides strategies for generating random test data that maintains
//! required invariants (valid address widths, finite decimals).

use difsync_core::HostValue;
use difsync_value::{DifProperty, DifUpdateData, DifValue, DifValueContainer, PointerAddress};
use proptest::prelude::*;

/// Strategy for generating valid pointer addresses (3, 5, or 26 bytes).
pub fn pointer_address_strategy() -> impl Strategy<Value = PointerAddress> {
    prop_oneof![
        prop::array::uniform3(any::<u8>())
            .prop_map(|bytes| PointerAddress::from_slice(&bytes).expect("3-byte address")),
        prop::array::uniform5(any::<u8>())
            .prop_map(|bytes| PointerAddress::from_slice(&bytes).expect("5-byte address")),
        prop::array::uniform26(any::<u8>()).prop_map(PointerAddress::from_full),
    ]
}

/// Strategy for generating short text payloads.
pub fn text_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z0-9 @._-]{0,24}").expect("Invalid regex")
}

/// Strategy for generating finite decimal payloads.
///
/// NaN is excluded: a NaN never compares equal to itself, which would
/// break every round-trip assertion without exercising conversion.
pub fn decimal_strategy() -> impl Strategy<Value = f64> {
    -1.0e12..1.0e12f64
}

/// Strategy for generating scalar host values.
pub fn scalar_host_value_strategy() -> impl Strategy<Value = HostValue> {
    prop_oneof![
        Just(HostValue::Null),
        any::<bool>().prop_map(HostValue::Bool),
        decimal_strategy().prop_map(HostValue::Decimal),
        any::<i128>().prop_map(HostValue::BigInt),
        text_strategy().prop_map(HostValue::Text),
    ]
}

/// Strategy for generating host values, nesting lists, records and
/// dictionaries up to a modest depth.
pub fn host_value_strategy() -> impl Strategy<Value = HostValue> {
    scalar_host_value_strategy().prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0..4).prop_map(HostValue::List),
            prop::collection::vec((text_strategy(), inner.clone()), 0..4)
                .prop_map(HostValue::Record),
            prop::collection::vec((inner.clone(), inner), 0..4).prop_map(HostValue::Dictionary),
        ]
    })
}

/// Strategy for generating update keys.
pub fn property_strategy() -> impl Strategy<Value = DifProperty> {
    prop_oneof![
        text_strategy().prop_map(DifProperty::Text),
        (0u64..16).prop_map(DifProperty::Index),
    ]
}

/// Strategy for generating update payload containers (inline text).
fn container_strategy() -> impl Strategy<Value = DifValueContainer> {
    text_strategy().prop_map(|text| DifValueContainer::Inline(DifValue::text(text)))
}

/// Strategy for generating arbitrary update operations.
///
/// Keys and kinds are intentionally unconstrained: delivery must stay
/// fail-safe whatever combination arrives.
pub fn update_data_strategy() -> impl Strategy<Value = DifUpdateData> {
    prop_oneof![
        container_strategy().prop_map(DifUpdateData::Replace),
        container_strategy().prop_map(DifUpdateData::Push),
        (property_strategy(), container_strategy())
            .prop_map(|(key, value)| DifUpdateData::Set(key, value)),
        property_strategy().prop_map(DifUpdateData::Remove),
        Just(DifUpdateData::Clear),
    ]
}
