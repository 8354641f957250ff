//! # difsync core
//!
//! Bidirectional synchronization between locally held host values and a
//! remote authoritative store addressed by opaque pointers.
//!
//! This crate provides:
//! - Conversion between host values and the DIF interchange representation
//! - A type-binding registry dispatching by type address
//! - Mutation-intercepting sequence and keyed-collection mirrors
//! - Scalar references over pointers to non-collection values
//! - A process-wide endpoint identity cache
//! - Sync-or-pending resolution of engine calls
//!
//! ## Architecture
//!
//! The [`DifHandler`] is the central façade. Host code mutates a bound
//! mirror; the mirror forwards the operation as an outgoing update built
//! from the pre-mutation state, then applies it to its own storage. The
//! engine is authoritative and may rebroadcast the update to every
//! observer, including back to the originating handler, which recognizes
//! its own echoes and never re-forwards while applying remote updates.
//!
//! ## Key invariants
//!
//! - A container is an inline value or an address, never both
//! - A bound value is reachable only through its wrapper
//! - Each pointer address maps to at most one live local mirror
//! - Updates for one address apply in delivery order; no cross-address
//!   ordering is assumed
//! - The update-delivery path is fail-safe: malformed remote input is
//!   logged and dropped, never allowed to corrupt a mirror

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod binding;
mod config;
mod convert;
mod endpoint;
mod engine;
mod error;
mod handler;
mod host;
mod list;
mod map;
mod reference;
mod registry;
mod resolution;

pub use binding::{BindingMeta, BoundValue, HostProperty, TypeBinding};
pub use config::HandlerConfig;
pub use endpoint::{Endpoint, EndpointCache};
pub use engine::{MockEngine, RuntimeEngine, UpdateObserver};
pub use error::{SyncError, SyncResult};
pub use handler::{DifHandler, ObserverHandle};
pub use host::HostValue;
pub use list::SyncedList;
pub use map::SyncedMap;
pub use reference::ScalarRef;
pub use registry::TypeRegistry;
pub use resolution::{Completer, Pending, Resolution};
