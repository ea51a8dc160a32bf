use crate::error::{ODataError, ODataResult};
use crate::model::{decimal_digits, PrimitiveKind, PropertyDef, PropertyValue};

/// Compares stored values with key-predicate text through the canonical
/// rendering of the property's declared type and facets.
pub struct KeyMatcher;

impl KeyMatcher {
    /// A null rendering is a non-match. Comparison is exact: no case folding, no trimming.
    pub fn matches(def: &PropertyDef, value: &PropertyValue, literal: &str) -> ODataResult<bool> {
        Ok(match Self::value_to_string(def, value)? {
            Some(text) => text == literal,
            None => false,
        })
    }

    /// Canonical text of `value` under `def`. `Ok(None)` for a null in a nullable property.
    pub fn value_to_string(def: &PropertyDef, value: &PropertyValue) -> ODataResult<Option<String>> {
        let name = def.name.as_str();
        let kind = def.primitive_kind().ok_or_else(|| {
            ODataError::conversion(name, "complex properties have no canonical text form")
        })?;
        let facets = def.facets;

        let text = match (kind, value) {
            (_, PropertyValue::Null) => {
                if facets.nullable {
                    return Ok(None);
                }
                return Err(ODataError::conversion(name, "null value in non-nullable property"));
            }
            (PrimitiveKind::Boolean, PropertyValue::Boolean(b)) => b.to_string(),
            (kind, value) if kind.is_integer() => {
                let n = value
                    .as_i64()
                    .ok_or_else(|| mismatch(name, kind, value))?;
                if let Some((lower, upper)) = kind.integer_range() {
                    if n < lower || n > upper {
                        return Err(ODataError::conversion(
                            name,
                            format!("{} is out of range for {}", n, kind.edm_name()),
                        ));
                    }
                }
                n.to_string()
            }
            (PrimitiveKind::Double, PropertyValue::Double(d)) => format_double(*d),
            (PrimitiveKind::Decimal, PropertyValue::Decimal(d)) => {
                if let Some(scale) = facets.scale {
                    if d.scale() > scale {
                        return Err(ODataError::conversion(
                            name,
                            format!("{} exceeds scale {}", d, scale),
                        ));
                    }
                }
                if let Some(precision) = facets.precision {
                    if decimal_digits(d).max(d.scale()) > precision {
                        return Err(ODataError::conversion(
                            name,
                            format!("{} exceeds precision {}", d, precision),
                        ));
                    }
                }
                d.to_string()
            }
            (PrimitiveKind::String, PropertyValue::String(s)) => {
                if let Some(max_length) = facets.max_length {
                    if s.chars().count() > max_length as usize {
                        return Err(ODataError::conversion(
                            name,
                            format!("value exceeds max length {}", max_length),
                        ));
                    }
                }
                if !facets.unicode && !s.is_ascii() {
                    return Err(ODataError::conversion(
                        name,
                        "non-ASCII text in a non-unicode property",
                    ));
                }
                s.clone()
            }
            (kind, value) => return Err(mismatch(name, kind, value)),
        };
        Ok(Some(text))
    }
}

fn mismatch(name: &str, kind: PrimitiveKind, value: &PropertyValue) -> ODataError {
    ODataError::conversion(
        name,
        format!("value {:?} is not a valid {}", value, kind.edm_name()),
    )
}

fn format_double(d: f64) -> String {
    if d.is_nan() {
        "NaN".to_string()
    } else if d == f64::INFINITY {
        "INF".to_string()
    } else if d == f64::NEG_INFINITY {
        "-INF".to_string()
    } else {
        d.to_string()
    }
}
