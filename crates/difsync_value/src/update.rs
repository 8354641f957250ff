//! Update operations.
//!
//! An update describes a single mutation to a remote-owned value. Updates
//! flow in both directions: locally intercepted mutations are forwarded to
//! the engine as updates, and the engine rebroadcasts updates to every
//! observer of the target address.

use crate::value::DifValueContainer;
use serde::{Deserialize, Serialize};

/// A key within a keyed or indexed update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifProperty {
    /// A text key (records, keyed collections).
    Text(String),
    /// An index key (ordered sequences).
    Index(u64),
    /// An arbitrary value key (keyed collections with non-text keys).
    Value(DifValueContainer),
}

impl DifProperty {
    /// Returns the index, if this is an index key.
    #[must_use]
    pub fn as_index(&self) -> Option<u64> {
        match self {
            Self::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// Returns the text, if this is a text key.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }
}

/// The kind of an update, without its payload.
///
/// Used for dispatch and logging; bindings opt in to kinds individually.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UpdateKind {
    /// The whole value is replaced.
    Replace,
    /// An element is appended.
    Push,
    /// A keyed or indexed entry is set.
    Set,
    /// A keyed or indexed entry is removed.
    Remove,
    /// All entries are removed.
    Clear,
}

/// A single mutation, tagged by kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum DifUpdateData {
    /// Replace the whole value.
    Replace(DifValueContainer),
    /// Append an element.
    Push(DifValueContainer),
    /// Set an entry.
    Set(DifProperty, DifValueContainer),
    /// Remove an entry.
    Remove(DifProperty),
    /// Remove all entries.
    Clear,
}

impl DifUpdateData {
    /// Returns the kind of this update.
    #[must_use]
    pub fn kind(&self) -> UpdateKind {
        match self {
            Self::Replace(_) => UpdateKind::Replace,
            Self::Push(_) => UpdateKind::Push,
            Self::Set(_, _) => UpdateKind::Set,
            Self::Remove(_) => UpdateKind::Remove,
            Self::Clear => UpdateKind::Clear,
        }
    }
}

/// An update together with its origin marker.
///
/// `source` identifies the actor that produced the update. An actor
/// receiving its own update back from the engine must not re-forward it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DifUpdate {
    /// Canonical name of the originating actor.
    pub source: String,
    /// The mutation.
    pub data: DifUpdateData,
}

impl DifUpdate {
    /// Creates an update.
    #[must_use]
    pub fn new(source: impl Into<String>, data: DifUpdateData) -> Self {
        Self {
            source: source.into(),
            data,
        }
    }

    /// Creates a replace update.
    #[must_use]
    pub fn replace(source: impl Into<String>, value: DifValueContainer) -> Self {
        Self::new(source, DifUpdateData::Replace(value))
    }

    /// Creates a push update.
    #[must_use]
    pub fn push(source: impl Into<String>, value: DifValueContainer) -> Self {
        Self::new(source, DifUpdateData::Push(value))
    }

    /// Creates a set update.
    #[must_use]
    pub fn set(source: impl Into<String>, key: DifProperty, value: DifValueContainer) -> Self {
        Self::new(source, DifUpdateData::Set(key, value))
    }

    /// Creates a remove update.
    #[must_use]
    pub fn remove(source: impl Into<String>, key: DifProperty) -> Self {
        Self::new(source, DifUpdateData::Remove(key))
    }

    /// Creates a clear update.
    #[must_use]
    pub fn clear(source: impl Into<String>) -> Self {
        Self::new(source, DifUpdateData::Clear)
    }
}
