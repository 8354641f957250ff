//! The tagged DIF value representation.

use crate::address::PointerAddress;
use crate::types::DifTypeContainer;
use serde::{Deserialize, Serialize};

/// The native representation carried by a [`DifValue`].
///
/// Mappings are entry lists rather than hash maps: keys may themselves be
/// containers (including addresses), and entry order is preserved across
/// the boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifRepr {
    /// No value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit decimal value.
    Decimal(f64),
    /// Text value (UTF-8).
    Text(String),
    /// Ordered sequence of containers.
    Sequence(Vec<DifValueContainer>),
    /// Mapping from container keys to container values.
    Mapping(Vec<(DifValueContainer, DifValueContainer)>),
    /// Keyed record of containers.
    Record(Vec<(String, DifValueContainer)>),
}

impl DifRepr {
    /// A short name for the representation's shape, used in error messages.
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            DifRepr::Null => "null",
            DifRepr::Bool(_) => "boolean",
            DifRepr::Decimal(_) => "decimal",
            DifRepr::Text(_) => "text",
            DifRepr::Sequence(_) => "sequence",
            DifRepr::Mapping(_) => "mapping",
            DifRepr::Record(_) => "record",
        }
    }
}

/// A value crossing the local/remote boundary.
///
/// `ty` names how `value` is to be interpreted. An absent `ty` means the
/// host-default interpretation of the representation; text is the only
/// representation exchanged this way (the fast path).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifValue {
    /// The type tag, if any.
    pub ty: Option<DifTypeContainer>,
    /// The native representation.
    pub value: DifRepr,
}

impl DifValue {
    /// Creates an untyped value (host-default interpretation).
    #[must_use]
    pub fn untyped(value: DifRepr) -> Self {
        Self { ty: None, value }
    }

    /// Creates a value tagged with a type address.
    #[must_use]
    pub fn typed(ty: PointerAddress, value: DifRepr) -> Self {
        Self {
            ty: Some(DifTypeContainer::Address(ty)),
            value,
        }
    }

    /// Creates an untyped text value (the fast path).
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self::untyped(DifRepr::Text(text.into()))
    }

    /// Returns the type address when the tag is an address container.
    #[must_use]
    pub fn type_address(&self) -> Option<PointerAddress> {
        match &self.ty {
            Some(DifTypeContainer::Address(addr)) => Some(*addr),
            _ => None,
        }
    }

    /// Returns the representation as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match &self.value {
            DifRepr::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the representation as a sequence, if it is one.
    #[must_use]
    pub fn as_sequence(&self) -> Option<&[DifValueContainer]> {
        match &self.value {
            DifRepr::Sequence(items) => Some(items),
            _ => None,
        }
    }
}

/// Either an inline DIF value or an address indirection to a remote value.
///
/// A container is never both at once; resolving an address container
/// requires a lookup through the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifValueContainer {
    /// An inline value.
    Inline(DifValue),
    /// An indirection to a remote value.
    Address(PointerAddress),
}

impl DifValueContainer {
    /// Returns the inline value, if this container is inline.
    #[must_use]
    pub fn as_inline(&self) -> Option<&DifValue> {
        match self {
            Self::Inline(value) => Some(value),
            Self::Address(_) => None,
        }
    }

    /// Returns the address, if this container is an indirection.
    #[must_use]
    pub fn as_address(&self) -> Option<PointerAddress> {
        match self {
            Self::Inline(_) => None,
            Self::Address(addr) => Some(*addr),
        }
    }
}

impl From<DifValue> for DifValueContainer {
    fn from(value: DifValue) -> Self {
        Self::Inline(value)
    }
}

impl From<PointerAddress> for DifValueContainer {
    fn from(addr: PointerAddress) -> Self {
        Self::Address(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types;

    #[test]
    fn untyped_text_fast_path() {
        let value = DifValue::text("hello");
        assert!(value.ty.is_none());
        assert_eq!(value.as_text(), Some("hello"));
    }

    #[test]
    fn typed_value_carries_address() {
        let value = DifValue::typed(core_types::BOOLEAN, DifRepr::Bool(true));
        assert_eq!(value.type_address(), Some(core_types::BOOLEAN));
    }

    #[test]
    fn container_is_inline_xor_address() {
        let inline = DifValueContainer::from(DifValue::text("x"));
        assert!(inline.as_inline().is_some());
        assert!(inline.as_address().is_none());

        let addr = PointerAddress::from_slice(&[9u8; 26]).unwrap();
        let indirect = DifValueContainer::from(addr);
        assert!(indirect.as_inline().is_none());
        assert_eq!(indirect.as_address(), Some(addr));
    }

    #[test]
    fn sequence_accessor() {
        let value = DifValue::typed(
            core_types::ARRAY,
            DifRepr::Sequence(vec![DifValue::text("a").into(), DifValue::text("b").into()]),
        );
        assert_eq!(value.as_sequence().map(<[_]>::len), Some(2));
    }
}
