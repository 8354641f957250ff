//! Well-known core-type addresses.
//!
//! Core types live in the 3-byte static address space. The first byte is
//! the static namespace marker, the second selects a group, and the third
//! a member within the group. Resolution coerces by *range*, not by exact
//! address: any address within the small-integer groups resolves to a host
//! number, any address in the big-integer group to the host big-integer
//! type, and any address in the decimal group to a host float.

use crate::address::PointerAddress;

/// Static namespace marker (first byte of every core-type address).
const STATIC_NS: u8 = 0x01;

/// Group for core scalars.
const GROUP_SCALAR: u8 = 0x00;
/// Group for small signed integers (i8..i64).
const GROUP_SIGNED: u8 = 0x10;
/// Group for small unsigned integers (u8..u64).
const GROUP_UNSIGNED: u8 = 0x11;
/// Group for arbitrary-width integers.
const GROUP_BIG_INTEGER: u8 = 0x12;
/// Group for binary floating-point decimals.
const GROUP_DECIMAL: u8 = 0x13;
/// Group for composite shapes.
const GROUP_COMPOSITE: u8 = 0x20;

/// The null type.
pub const NULL: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SCALAR, 0x00]);
/// The boolean type.
pub const BOOLEAN: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SCALAR, 0x01]);
/// The text type (also the untyped fast-path interpretation).
pub const TEXT: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SCALAR, 0x02]);
/// The endpoint identity type.
pub const ENDPOINT: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SCALAR, 0x03]);

/// 8-bit signed integer.
pub const I8: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SIGNED, 0x00]);
/// 16-bit signed integer.
pub const I16: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SIGNED, 0x01]);
/// 32-bit signed integer.
pub const I32: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SIGNED, 0x02]);
/// 64-bit signed integer.
pub const I64: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_SIGNED, 0x03]);

/// 8-bit unsigned integer.
pub const U8: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_UNSIGNED, 0x00]);
/// 16-bit unsigned integer.
pub const U16: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_UNSIGNED, 0x01]);
/// 32-bit unsigned integer.
pub const U32: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_UNSIGNED, 0x02]);
/// 64-bit unsigned integer.
pub const U64: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_UNSIGNED, 0x03]);

/// Arbitrary-width signed integer, exchanged as a decimal string.
pub const BIG_INTEGER: PointerAddress =
    PointerAddress::from_static([STATIC_NS, GROUP_BIG_INTEGER, 0x00]);

/// 32-bit binary floating-point decimal.
pub const F32: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_DECIMAL, 0x00]);
/// 64-bit binary floating-point decimal (the default number type).
pub const F64: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_DECIMAL, 0x01]);

/// The ordered sequence type.
pub const ARRAY: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_COMPOSITE, 0x00]);
/// The keyed record type.
pub const STRUCT: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_COMPOSITE, 0x01]);
/// The keyed collection type.
pub const MAP: PointerAddress = PointerAddress::from_static([STATIC_NS, GROUP_COMPOSITE, 0x02]);

fn group_of(addr: PointerAddress) -> Option<u8> {
    if !addr.is_static() || addr.as_bytes()[0] != STATIC_NS {
        return None;
    }
    Some(addr.as_bytes()[1])
}

/// Returns true for any address in the small signed/unsigned integer ranges.
#[must_use]
pub fn is_small_integer(addr: PointerAddress) -> bool {
    matches!(group_of(addr), Some(GROUP_SIGNED | GROUP_UNSIGNED))
}

/// Returns true for any address in the big-integer range.
#[must_use]
pub fn is_big_integer(addr: PointerAddress) -> bool {
    matches!(group_of(addr), Some(GROUP_BIG_INTEGER))
}

/// Returns true for any address in the decimal range.
#[must_use]
pub fn is_decimal(addr: PointerAddress) -> bool {
    matches!(group_of(addr), Some(GROUP_DECIMAL))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn integer_ranges() {
        for addr in [I8, I16, I32, I64, U8, U16, U32, U64] {
            assert!(is_small_integer(addr), "{addr}");
            assert!(!is_big_integer(addr), "{addr}");
            assert!(!is_decimal(addr), "{addr}");
        }
    }

    #[test]
    fn big_integer_range() {
        assert!(is_big_integer(BIG_INTEGER));
        assert!(!is_small_integer(BIG_INTEGER));
    }

    #[test]
    fn decimal_range() {
        assert!(is_decimal(F32));
        assert!(is_decimal(F64));
        assert!(!is_small_integer(F64));
    }

    #[test]
    fn scalars_are_outside_numeric_ranges() {
        for addr in [NULL, BOOLEAN, TEXT, ENDPOINT, ARRAY, STRUCT, MAP] {
            assert!(!is_small_integer(addr), "{addr}");
            assert!(!is_big_integer(addr), "{addr}");
            assert!(!is_decimal(addr), "{addr}");
        }
    }

    #[test]
    fn non_static_addresses_are_outside_all_ranges() {
        let addr = PointerAddress::from_slice(&[0x01, 0x10, 0x00, 0x00, 0x00]).unwrap();
        assert!(!is_small_integer(addr));
    }

    #[test]
    fn core_addresses_are_distinct() {
        let all = [
            NULL,
            BOOLEAN,
            TEXT,
            ENDPOINT,
            I8,
            I16,
            I32,
            I64,
            U8,
            U16,
            U32,
            U64,
            BIG_INTEGER,
            F32,
            F64,
            ARRAY,
            STRUCT,
            MAP,
        ];
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }
}
