//! DIF type descriptors.

use crate::address::PointerAddress;
use crate::value::DifValue;
use serde::{Deserialize, Serialize};

/// The kind of a type descriptor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DifTypeKind {
    /// A type described by the shape of a value.
    Structural,
    /// A reference to another registered type.
    Reference,
    /// An intersection of member types.
    Intersection,
    /// A union of member types.
    Union,
    /// A type with a single inhabitant.
    Unit,
    /// A callable type.
    Function,
}

/// The definition payload of a type descriptor; its shape depends on the
/// descriptor's [`DifTypeKind`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifTypeDef {
    /// A structural definition (the describing value).
    Value(Box<DifValue>),
    /// A reference to a registered type by address.
    Reference(PointerAddress),
    /// The member types of an intersection or union.
    Members(Vec<DifTypeContainer>),
    /// No definition payload (unit and function types).
    None,
}

/// Reference mutability.
///
/// References created immutable ("final") reject mutation and observation
/// attempts for their whole lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mutability {
    /// The referenced value may change.
    Mutable,
    /// The referenced value is final.
    Immutable,
}

/// A type descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifType {
    /// Optional display name.
    pub name: Option<String>,
    /// The descriptor kind.
    pub kind: DifTypeKind,
    /// The definition payload.
    pub def: DifTypeDef,
    /// Mutability of references to values of this type, if constrained.
    pub mutability: Option<Mutability>,
}

impl DifType {
    /// Creates a unit type with the given name.
    #[must_use]
    pub fn unit(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            kind: DifTypeKind::Unit,
            def: DifTypeDef::None,
            mutability: None,
        }
    }

    /// Creates a reference type pointing at a registered type address.
    #[must_use]
    pub fn reference(addr: PointerAddress) -> Self {
        Self {
            name: None,
            kind: DifTypeKind::Reference,
            def: DifTypeDef::Reference(addr),
            mutability: None,
        }
    }
}

/// Either an inline type descriptor or an address naming a registered type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifTypeContainer {
    /// An inline descriptor.
    Inline(DifType),
    /// An address naming a registered type.
    Address(PointerAddress),
}

impl DifTypeContainer {
    /// Returns the address, if this container names a registered type.
    #[must_use]
    pub fn as_address(&self) -> Option<PointerAddress> {
        match self {
            Self::Inline(_) => None,
            Self::Address(addr) => Some(*addr),
        }
    }
}

impl From<PointerAddress> for DifTypeContainer {
    fn from(addr: PointerAddress) -> Self {
        Self::Address(addr)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types;

    #[test]
    fn unit_type_has_no_def() {
        let ty = DifType::unit("marker");
        assert_eq!(ty.kind, DifTypeKind::Unit);
        assert_eq!(ty.def, DifTypeDef::None);
        assert_eq!(ty.name.as_deref(), Some("marker"));
    }

    #[test]
    fn reference_type_carries_target() {
        let ty = DifType::reference(core_types::ARRAY);
        assert_eq!(ty.kind, DifTypeKind::Reference);
        assert_eq!(ty.def, DifTypeDef::Reference(core_types::ARRAY));
    }

    #[test]
    fn container_address_accessor() {
        let container = DifTypeContainer::from(core_types::TEXT);
        assert_eq!(container.as_address(), Some(core_types::TEXT));

        let inline = DifTypeContainer::Inline(DifType::unit("u"));
        assert_eq!(inline.as_address(), None);
    }
}
