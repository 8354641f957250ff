//! The host value model.

use crate::endpoint::Endpoint;
use crate::list::SyncedList;
use crate::map::SyncedMap;
use crate::reference::ScalarRef;
use std::sync::Arc;

/// A locally held value that can cross the local/remote boundary.
///
/// Plain shapes (`Null` through `Dictionary`) are owned data; bound shapes
/// (`SyncedList`, `SyncedMap`, `Ref`) are shared mirrors whose mutations
/// are intercepted and synchronized. Once a value is bound, the wrapper is
/// the only legitimate way to reach it.
#[derive(Debug, Clone)]
pub enum HostValue {
    /// No value.
    Null,
    /// Boolean value.
    Bool(bool),
    /// 64-bit decimal number (integers are not distinguished here).
    Decimal(f64),
    /// Wide integer, exchanged as a decimal string to avoid precision loss.
    BigInt(i128),
    /// Text value.
    Text(String),
    /// Shared endpoint identity.
    Endpoint(Arc<Endpoint>),
    /// Plain ordered sequence.
    List(Vec<HostValue>),
    /// Plain keyed record.
    Record(Vec<(String, HostValue)>),
    /// Plain keyed collection with arbitrary keys.
    Dictionary(Vec<(HostValue, HostValue)>),
    /// A bound, mutation-intercepting sequence mirror.
    SyncedList(Arc<SyncedList>),
    /// A bound, mutation-intercepting keyed mirror.
    SyncedMap(Arc<SyncedMap>),
    /// A bound single-value reference.
    Ref(Arc<ScalarRef>),
}

impl HostValue {
    /// Returns true for the null value.
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, HostValue::Null)
    }

    /// Returns this value as a boolean, if it is one.
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            HostValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns this value as a decimal number, if it is one.
    #[must_use]
    pub fn as_decimal(&self) -> Option<f64> {
        match self {
            HostValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }

    /// Returns this value as a wide integer, if it is one.
    #[must_use]
    pub fn as_big_int(&self) -> Option<i128> {
        match self {
            HostValue::BigInt(n) => Some(*n),
            _ => None,
        }
    }

    /// Returns this value as text, if it is text.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            HostValue::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Returns this value as a plain list, if it is one.
    #[must_use]
    pub fn as_list(&self) -> Option<&[HostValue]> {
        match self {
            HostValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Returns this value as a shared endpoint, if it is one.
    #[must_use]
    pub fn as_endpoint(&self) -> Option<&Arc<Endpoint>> {
        match self {
            HostValue::Endpoint(endpoint) => Some(endpoint),
            _ => None,
        }
    }

    /// Returns this value as a bound list mirror, if it is one.
    #[must_use]
    pub fn as_synced_list(&self) -> Option<&Arc<SyncedList>> {
        match self {
            HostValue::SyncedList(list) => Some(list),
            _ => None,
        }
    }

    /// Returns this value as a bound map mirror, if it is one.
    #[must_use]
    pub fn as_synced_map(&self) -> Option<&Arc<SyncedMap>> {
        match self {
            HostValue::SyncedMap(map) => Some(map),
            _ => None,
        }
    }

    /// Returns this value as a bound scalar reference, if it is one.
    #[must_use]
    pub fn as_ref_value(&self) -> Option<&Arc<ScalarRef>> {
        match self {
            HostValue::Ref(reference) => Some(reference),
            _ => None,
        }
    }

    /// A short name for the value's shape, used in error messages.
    #[must_use]
    pub fn shape_name(&self) -> &'static str {
        match self {
            HostValue::Null => "null",
            HostValue::Bool(_) => "boolean",
            HostValue::Decimal(_) => "decimal",
            HostValue::BigInt(_) => "big integer",
            HostValue::Text(_) => "text",
            HostValue::Endpoint(_) => "endpoint",
            HostValue::List(_) => "list",
            HostValue::Record(_) => "record",
            HostValue::Dictionary(_) => "dictionary",
            HostValue::SyncedList(_) => "synced list",
            HostValue::SyncedMap(_) => "synced map",
            HostValue::Ref(_) => "reference",
        }
    }
}

impl PartialEq for HostValue {
    /// Plain shapes compare structurally; endpoints by canonical name;
    /// bound mirrors by identity.
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (HostValue::Null, HostValue::Null) => true,
            (HostValue::Bool(a), HostValue::Bool(b)) => a == b,
            (HostValue::Decimal(a), HostValue::Decimal(b)) => a == b,
            (HostValue::BigInt(a), HostValue::BigInt(b)) => a == b,
            (HostValue::Text(a), HostValue::Text(b)) => a == b,
            (HostValue::Endpoint(a), HostValue::Endpoint(b)) => a.name() == b.name(),
            (HostValue::List(a), HostValue::List(b)) => a == b,
            (HostValue::Record(a), HostValue::Record(b)) => a == b,
            (HostValue::Dictionary(a), HostValue::Dictionary(b)) => a == b,
            (HostValue::SyncedList(a), HostValue::SyncedList(b)) => Arc::ptr_eq(a, b),
            (HostValue::SyncedMap(a), HostValue::SyncedMap(b)) => Arc::ptr_eq(a, b),
            (HostValue::Ref(a), HostValue::Ref(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<bool> for HostValue {
    fn from(b: bool) -> Self {
        HostValue::Bool(b)
    }
}

impl From<f64> for HostValue {
    fn from(d: f64) -> Self {
        HostValue::Decimal(d)
    }
}

impl From<i128> for HostValue {
    fn from(n: i128) -> Self {
        HostValue::BigInt(n)
    }
}

impl From<String> for HostValue {
    fn from(s: String) -> Self {
        HostValue::Text(s)
    }
}

impl From<&str> for HostValue {
    fn from(s: &str) -> Self {
        HostValue::Text(s.to_string())
    }
}

impl<T: Into<HostValue>> From<Vec<T>> for HostValue {
    fn from(items: Vec<T>) -> Self {
        HostValue::List(items.into_iter().map(Into::into).collect())
    }
}

impl From<()> for HostValue {
    fn from((): ()) -> Self {
        HostValue::Null
    }
}
