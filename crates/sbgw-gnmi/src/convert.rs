//! gNMI typed values <-> canonical values

use sbgw_conv::{from_json_bytes, to_json_bytes};
use sbgw_core::{CanonicalValue, Encoding, GatewayError, GatewayResult};
use serde_json::Number;

use crate::proto::typed_value::Value;
use crate::proto::{Decimal64, ScalarArray, TypedValue};

/// Normalize a value received from a device
pub fn typed_to_canonical(typed: &TypedValue) -> GatewayResult<CanonicalValue> {
    let Some(value) = &typed.value else {
        return Ok(CanonicalValue::Null);
    };

    match value {
        Value::JsonVal(bytes) | Value::JsonIetfVal(bytes) => {
            if bytes.is_empty() {
                return Ok(CanonicalValue::Null);
            }
            from_json_bytes(bytes)
                .map_err(|e| GatewayError::protocol(format!("device sent invalid JSON: {}", e)))
        }
        Value::StringVal(s) | Value::AsciiVal(s) => Ok(CanonicalValue::String(s.clone())),
        Value::IntVal(i) => Ok((*i).into()),
        Value::UintVal(u) => Ok((*u).into()),
        Value::BoolVal(b) => Ok(CanonicalValue::Bool(*b)),
        Value::DoubleVal(d) => float(*d),
        Value::FloatVal(f) => float(f64::from(*f)),
        Value::DecimalVal(d) => decimal(d),
        Value::LeaflistVal(list) => list
            .element
            .iter()
            .map(typed_to_canonical)
            .collect::<GatewayResult<Vec<_>>>()
            .map(CanonicalValue::Sequence),
        Value::BytesVal(_) => Err(unsupported("bytes")),
        Value::ProtoBytes(_) => Err(unsupported("proto_bytes")),
        Value::AnyVal(any) => Err(unsupported(&format!("any ({})", any.type_url))),
    }
}

fn float(value: f64) -> GatewayResult<CanonicalValue> {
    Number::from_f64(value)
        .map(CanonicalValue::Number)
        .ok_or_else(|| {
            GatewayError::UnsupportedFormat(format!("non-finite number {} has no JSON form", value))
        })
}

fn decimal(d: &Decimal64) -> GatewayResult<CanonicalValue> {
    if d.precision == 0 {
        return Ok(d.digits.into());
    }
    float(d.digits as f64 / 10f64.powi(d.precision as i32))
}

fn unsupported(kind: &str) -> GatewayError {
    GatewayError::UnsupportedFormat(format!("gNMI {} values cannot be normalized", kind))
}

/// Encode a canonical value for a Set, following the device's encoding
pub fn canonical_to_typed(value: &CanonicalValue, encoding: Encoding) -> GatewayResult<TypedValue> {
    let value = match encoding {
        Encoding::Json => Value::JsonVal(to_json_bytes(value)?),
        Encoding::JsonIetf => Value::JsonIetfVal(to_json_bytes(value)?),
        Encoding::Bytes => Value::BytesVal(to_json_bytes(value)?),
        Encoding::Ascii => Value::AsciiVal(scalar_text(value)?),
        Encoding::Proto => return scalar_typed(value),
    };
    Ok(TypedValue { value: Some(value) })
}

fn scalar_text(value: &CanonicalValue) -> GatewayResult<String> {
    match value {
        CanonicalValue::Null => Err(GatewayError::UnsupportedFormat(
            "null cannot be sent as an ASCII value".to_string(),
        )),
        other => other.render_scalar().ok_or_else(|| {
            GatewayError::UnsupportedFormat(format!(
                "{} cannot be sent as an ASCII value",
                other.type_name()
            ))
        }),
    }
}

fn scalar_typed(value: &CanonicalValue) -> GatewayResult<TypedValue> {
    let value = match value {
        CanonicalValue::Bool(b) => Value::BoolVal(*b),
        CanonicalValue::String(s) => Value::StringVal(s.clone()),
        CanonicalValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::IntVal(i)
            } else if let Some(u) = n.as_u64() {
                Value::UintVal(u)
            } else {
                Value::DoubleVal(n.as_f64().unwrap_or_default())
            }
        }
        CanonicalValue::Sequence(items) => Value::LeaflistVal(ScalarArray {
            element: items
                .iter()
                .map(|item| {
                    if item.is_scalar() {
                        scalar_typed(item)
                    } else {
                        Err(GatewayError::UnsupportedFormat(
                            "leaf-lists may only hold scalars".to_string(),
                        ))
                    }
                })
                .collect::<GatewayResult<Vec<_>>>()?,
        }),
        CanonicalValue::Null | CanonicalValue::Mapping(_) => {
            return Err(GatewayError::UnsupportedFormat(format!(
                "{} has no scalar protobuf encoding",
                value.type_name()
            )))
        }
    };
    Ok(TypedValue { value: Some(value) })
}
