//! Conversion between host values and DIF values.
//!
//! Host → DIF conversion is a deterministic structural mapping dispatched
//! by the host value's shape. DIF → host resolution is the inverse,
//! dispatched by the value's type tag; composite shapes aggregate their
//! element resolutions, so the result is synchronous exactly when every
//! element resolves synchronously.

use crate::error::{SyncError, SyncResult};
use crate::handler::DifHandler;
use crate::host::HostValue;
use crate::resolution::Resolution;
use difsync_value::{
    core_types, DifRepr, DifType, DifTypeContainer, DifTypeDef, DifValue, DifValueContainer,
    ValueError,
};
use std::sync::Arc;

impl DifHandler {
    /// Converts a host value to its DIF representation.
    ///
    /// Bound mirrors convert from their current snapshot; use
    /// [`DifHandler::convert_to_container`] to serialize them as pointer
    /// references instead.
    pub fn convert_to_dif(&self, value: &HostValue) -> SyncResult<DifValue> {
        match value {
            HostValue::Null => Ok(DifValue::typed(core_types::NULL, DifRepr::Null)),
            HostValue::Bool(b) => Ok(DifValue::typed(core_types::BOOLEAN, DifRepr::Bool(*b))),
            HostValue::Decimal(d) => Ok(DifValue::typed(core_types::F64, DifRepr::Decimal(*d))),
            // The decimal-string encoding keeps wide integers exact
            // across the boundary.
            HostValue::BigInt(n) => Ok(DifValue::typed(
                core_types::BIG_INTEGER,
                DifRepr::Text(n.to_string()),
            )),
            // Text is the implicit default: no type tag.
            HostValue::Text(s) => Ok(DifValue::text(s.clone())),
            HostValue::Endpoint(endpoint) => Ok(DifValue::typed(
                core_types::ENDPOINT,
                DifRepr::Text(endpoint.name().to_string()),
            )),
            HostValue::List(items) => {
                let elements = items
                    .iter()
                    .map(|item| self.convert_to_container(item))
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(DifValue::typed(
                    core_types::ARRAY,
                    DifRepr::Sequence(elements),
                ))
            }
            HostValue::Record(entries) => {
                let fields = entries
                    .iter()
                    .map(|(key, item)| Ok((key.clone(), self.convert_to_container(item)?)))
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(DifValue::typed(core_types::STRUCT, DifRepr::Record(fields)))
            }
            HostValue::Dictionary(entries) => {
                let pairs = entries
                    .iter()
                    .map(|(key, item)| {
                        Ok((
                            self.convert_to_container(key)?,
                            self.convert_to_container(item)?,
                        ))
                    })
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(DifValue::typed(core_types::MAP, DifRepr::Mapping(pairs)))
            }
            HostValue::SyncedList(list) => self.convert_to_dif(&HostValue::List(list.to_vec())),
            HostValue::SyncedMap(map) => {
                self.convert_to_dif(&HostValue::Dictionary(map.entries()))
            }
            HostValue::Ref(reference) => self.convert_to_dif(&reference.get()),
        }
    }

    /// Converts a host value to a container.
    ///
    /// Bound mirrors serialize as their pointer address; everything else
    /// inlines through [`DifHandler::convert_to_dif`].
    pub fn convert_to_container(&self, value: &HostValue) -> SyncResult<DifValueContainer> {
        match value {
            HostValue::SyncedList(list) => match list.address() {
                Some(address) => Ok(DifValueContainer::Address(address)),
                None => Ok(DifValueContainer::Inline(self.convert_to_dif(value)?)),
            },
            HostValue::SyncedMap(map) => match map.address() {
                Some(address) => Ok(DifValueContainer::Address(address)),
                None => Ok(DifValueContainer::Inline(self.convert_to_dif(value)?)),
            },
            HostValue::Ref(reference) => Ok(DifValueContainer::Address(reference.address())),
            other => Ok(DifValueContainer::Inline(self.convert_to_dif(other)?)),
        }
    }

    /// Resolves a DIF value to a host value, dispatched by its type tag.
    pub fn resolve_dif_value(
        self: &Arc<Self>,
        value: DifValue,
    ) -> SyncResult<Resolution<HostValue>> {
        let DifValue { ty, value: repr } = value;

        // No type: host-default interpretation (the text fast path).
        let Some(ty) = ty else {
            return self.resolve_repr(repr);
        };
        let address = match ty {
            DifTypeContainer::Address(address) => address,
            DifTypeContainer::Inline(DifType {
                def: DifTypeDef::Reference(address),
                ..
            }) => address,
            // An inline descriptor without a nameable address resolves
            // by the shape of its representation.
            DifTypeContainer::Inline(_) => return self.resolve_repr(repr),
        };

        if address == core_types::NULL {
            // A null-typed value is null whatever sentinel the sender's
            // host bindings used for absence.
            return Ok(Resolution::Ready(HostValue::Null));
        }
        if address == core_types::BOOLEAN || address == core_types::TEXT {
            return self.resolve_repr(repr);
        }
        if core_types::is_small_integer(address) || core_types::is_decimal(address) {
            return Ok(Resolution::Ready(HostValue::Decimal(decimal_payload(
                &repr,
            )?)));
        }
        if core_types::is_big_integer(address) {
            return Ok(Resolution::Ready(HostValue::BigInt(big_integer_payload(
                &repr,
            )?)));
        }
        if address == core_types::ENDPOINT {
            let name = match &repr {
                DifRepr::Text(name) => name,
                other => {
                    return Err(SyncError::engine(format!(
                        "endpoint value with {} payload",
                        other.shape_name()
                    )))
                }
            };
            return Ok(Resolution::Ready(HostValue::Endpoint(
                self.endpoints.resolve(name),
            )));
        }
        if address == core_types::ARRAY
            || address == core_types::STRUCT
            || address == core_types::MAP
        {
            return self.resolve_repr(repr);
        }

        // Everything else dispatches through the type registry.
        match self.registry.lookup(address) {
            Some(binding) => {
                let handler = Arc::clone(self);
                Ok(self
                    .resolve_repr(repr)?
                    .and_then(move |plain| Ok(binding.bind(&handler, plain, None)?.value)))
            }
            None => Err(SyncError::CustomTypeNotSupported { address }),
        }
    }

    /// Resolves a representation by shape, recursing through containers.
    pub(crate) fn resolve_repr(
        self: &Arc<Self>,
        repr: DifRepr,
    ) -> SyncResult<Resolution<HostValue>> {
        match repr {
            DifRepr::Null => Ok(Resolution::Ready(HostValue::Null)),
            DifRepr::Bool(b) => Ok(Resolution::Ready(HostValue::Bool(b))),
            DifRepr::Decimal(d) => Ok(Resolution::Ready(HostValue::Decimal(d))),
            DifRepr::Text(t) => Ok(Resolution::Ready(HostValue::Text(t))),
            DifRepr::Sequence(items) => {
                let elements = items
                    .into_iter()
                    .map(|item| self.resolve_container(item))
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(Resolution::join_all(elements).and_then(|values| Ok(HostValue::List(values))))
            }
            DifRepr::Record(entries) => {
                let (keys, containers): (Vec<_>, Vec<_>) = entries.into_iter().unzip();
                let values = containers
                    .into_iter()
                    .map(|container| self.resolve_container(container))
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(Resolution::join_all(values).and_then(move |values| {
                    Ok(HostValue::Record(keys.into_iter().zip(values).collect()))
                }))
            }
            DifRepr::Mapping(entries) => {
                // Keys and values resolve together; pairs are rebuilt
                // from the interleaved results.
                let mut interleaved = Vec::with_capacity(entries.len() * 2);
                for (key, value) in entries {
                    interleaved.push(key);
                    interleaved.push(value);
                }
                let resolutions = interleaved
                    .into_iter()
                    .map(|container| self.resolve_container(container))
                    .collect::<SyncResult<Vec<_>>>()?;
                Ok(Resolution::join_all(resolutions).and_then(|flat| {
                    let mut pairs = Vec::with_capacity(flat.len() / 2);
                    let mut values = flat.into_iter();
                    while let (Some(key), Some(value)) = (values.next(), values.next()) {
                        pairs.push((key, value));
                    }
                    Ok(HostValue::Dictionary(pairs))
                }))
            }
        }
    }
}

fn decimal_payload(repr: &DifRepr) -> SyncResult<f64> {
    match repr {
        DifRepr::Decimal(d) => Ok(*d),
        DifRepr::Text(t) => t
            .parse::<f64>()
            .map_err(|_| SyncError::engine(format!("malformed numeric payload {t:?}"))),
        other => Err(SyncError::engine(format!(
            "numeric value with {} payload",
            other.shape_name()
        ))),
    }
}

fn big_integer_payload(repr: &DifRepr) -> SyncResult<i128> {
    match repr {
        DifRepr::Text(t) => t
            .parse::<i128>()
            .map_err(|_| ValueError::invalid_big_integer(t.clone()).into()),
        DifRepr::Decimal(d) => Ok(*d as i128),
        other => Err(SyncError::engine(format!(
            "big-integer value with {} payload",
            other.shape_name()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HandlerConfig;
    use crate::engine::{MockEngine, RuntimeEngine};

    fn handler() -> Arc<DifHandler> {
        DifHandler::new(
            Arc::new(MockEngine::new()) as Arc<dyn RuntimeEngine>,
            HandlerConfig::default(),
        )
    }

    fn roundtrip(handler: &Arc<DifHandler>, value: HostValue) -> HostValue {
        let dif = handler.convert_to_dif(&value).unwrap();
        handler
            .resolve_dif_value(dif)
            .unwrap()
            .expect_ready()
            .unwrap()
    }

    #[test]
    fn scalar_roundtrips() {
        let handler = handler();
        for value in [
            HostValue::Null,
            HostValue::Bool(true),
            HostValue::Bool(false),
            HostValue::Decimal(0.0),
            HostValue::Decimal(-273.15),
            HostValue::Text(String::new()),
            HostValue::Text("käse".into()),
            HostValue::BigInt(0),
            HostValue::BigInt(i128::MAX),
            HostValue::BigInt(i128::MIN),
        ] {
            assert_eq!(roundtrip(&handler, value.clone()), value);
        }
    }

    #[test]
    fn text_conversion_is_untyped() {
        let handler = handler();
        let dif = handler
            .convert_to_dif(&HostValue::Text("plain".into()))
            .unwrap();
        assert!(dif.ty.is_none());
    }

    #[test]
    fn numbers_are_decimals_regardless_of_integrality() {
        let handler = handler();
        let dif = handler.convert_to_dif(&HostValue::Decimal(3.0)).unwrap();
        assert_eq!(dif.type_address(), Some(core_types::F64));
        assert_eq!(dif.value, DifRepr::Decimal(3.0));
    }

    #[test]
    fn big_integer_crosses_as_decimal_string() {
        let handler = handler();
        let dif = handler
            .convert_to_dif(&HostValue::BigInt(170_141_183_460_469_231_731_687_303_715_884_105_727))
            .unwrap();
        assert_eq!(dif.type_address(), Some(core_types::BIG_INTEGER));
        assert_eq!(
            dif.value,
            DifRepr::Text("170141183460469231731687303715884105727".into())
        );
    }

    #[test]
    fn malformed_big_integer_payload_is_rejected() {
        let handler = handler();
        let dif = DifValue::typed(core_types::BIG_INTEGER, DifRepr::Text("not a number".into()));
        assert!(matches!(
            handler.resolve_dif_value(dif),
            Err(SyncError::Value(ValueError::InvalidBigInteger { .. }))
        ));
    }

    #[test]
    fn small_integer_range_coerces_to_decimal() {
        let handler = handler();
        let dif = DifValue::typed(core_types::I32, DifRepr::Decimal(7.0));
        assert_eq!(
            handler
                .resolve_dif_value(dif)
                .unwrap()
                .expect_ready()
                .unwrap(),
            HostValue::Decimal(7.0)
        );
    }

    #[test]
    fn null_typed_value_normalizes_any_payload() {
        let handler = handler();
        // A sender that encodes absence as a sentinel still resolves to null.
        let dif = DifValue::typed(core_types::NULL, DifRepr::Text("undefined".into()));
        assert!(handler
            .resolve_dif_value(dif)
            .unwrap()
            .expect_ready()
            .unwrap()
            .is_null());
    }

    #[test]
    fn list_roundtrip() {
        let handler = handler();
        let value = HostValue::List(vec![
            HostValue::Text("a".into()),
            HostValue::Decimal(2.0),
            HostValue::Null,
            HostValue::List(vec![HostValue::Bool(true)]),
        ]);
        assert_eq!(roundtrip(&handler, value.clone()), value);
    }

    #[test]
    fn record_roundtrip() {
        let handler = handler();
        let value = HostValue::Record(vec![
            ("name".into(), HostValue::Text("Ada".into())),
            ("age".into(), HostValue::Decimal(36.0)),
        ]);
        assert_eq!(roundtrip(&handler, value.clone()), value);
    }

    #[test]
    fn dictionary_roundtrip() {
        let handler = handler();
        let value = HostValue::Dictionary(vec![
            (HostValue::Decimal(1.0), HostValue::Text("one".into())),
            (HostValue::Text("two".into()), HostValue::Decimal(2.0)),
        ]);
        assert_eq!(roundtrip(&handler, value.clone()), value);
    }

    #[test]
    fn endpoint_resolution_goes_through_the_identity_cache() {
        let handler = handler();
        let endpoint = handler.endpoint("@ada");
        let resolved = roundtrip(&handler, HostValue::Endpoint(Arc::clone(&endpoint)));
        let resolved_endpoint = resolved.as_endpoint().unwrap();
        assert!(Arc::ptr_eq(resolved_endpoint, &endpoint));
    }

    #[test]
    fn unregistered_custom_type_is_rejected() {
        let handler = handler();
        let custom = difsync_value::PointerAddress::from_static([0x02, 0x10, 0x01]);
        let dif = DifValue::typed(custom, DifRepr::Text("payload".into()));
        assert!(matches!(
            handler.resolve_dif_value(dif),
            Err(SyncError::CustomTypeNotSupported { .. })
        ));
    }

    #[test]
    fn untyped_value_resolves_by_shape() {
        let handler = handler();
        let dif = DifValue::untyped(DifRepr::Sequence(vec![DifValueContainer::Inline(
            DifValue::text("x"),
        )]));
        let resolved = handler
            .resolve_dif_value(dif)
            .unwrap()
            .expect_ready()
            .unwrap();
        assert_eq!(
            resolved,
            HostValue::List(vec![HostValue::Text("x".into())])
        );
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        fn scalar() -> impl Strategy<Value = HostValue> {
            prop_oneof![
                Just(HostValue::Null),
                any::<bool>().prop_map(HostValue::Bool),
                (-1.0e12..1.0e12f64).prop_map(HostValue::Decimal),
                any::<i128>().prop_map(HostValue::BigInt),
                "[a-zA-Z0-9 ]{0,16}".prop_map(HostValue::Text),
            ]
        }

        proptest! {
            #[test]
            fn every_scalar_round_trips(value in scalar()) {
                let handler = handler();
                prop_assert_eq!(roundtrip(&handler, value.clone()), value);
            }
        }
    }
}
