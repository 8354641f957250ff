//! # difsync value model
//!
//! The Datex Interchange Format (DIF) value model for difsync.
//!
//! This crate provides:
//! - Pointer addresses naming values owned by the remote store
//! - The tagged DIF value representation and its containers
//! - Type descriptors and the well-known core-type address space
//! - Update operations (replace / push / set / remove / clear)
//!
//! Values of this crate are transient: they are created during conversion
//! at the local/remote boundary and discarded after being handed to the
//! engine or resolved back into host values. The wire byte encoding of
//! these values is produced and consumed by the external engine and is
//! deliberately not part of this crate.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod address;
pub mod core_types;
mod error;
mod types;
mod update;
mod value;

pub use address::PointerAddress;
pub use error::{ValueError, ValueResult};
pub use types::{DifType, DifTypeContainer, DifTypeDef, DifTypeKind, Mutability};
pub use update::{DifProperty, DifUpdate, DifUpdateData, UpdateKind};
pub use value::{DifRepr, DifValue, DifValueContainer};
