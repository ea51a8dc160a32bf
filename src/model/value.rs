pub use rust_decimal::Decimal;

/// Number of significant digits in the unscaled value of `d` (zero counts as one).
pub fn decimal_digits(d: &Decimal) -> u32 {
    d.mantissa()
        .unsigned_abs()
        .checked_ilog10()
        .map_or(1, |exponent| exponent + 1)
}

/// A named value; entities and complex values are ordered lists of these.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub name: String,
    pub value: PropertyValue,
}

impl Property {
    pub fn new(name: impl Into<String>, value: impl Into<PropertyValue>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Null,
    Boolean(bool),
    Int16(i16),
    Int32(i32),
    Int64(i64),
    Double(f64),
    Decimal(Decimal),
    String(String),
    Complex(Vec<Property>),
}

impl PropertyValue {
    pub fn is_null(&self) -> bool {
        matches!(self, PropertyValue::Null)
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            PropertyValue::Int16(v) => Some(*v as i64),
            PropertyValue::Int32(v) => Some(*v as i64),
            PropertyValue::Int64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Equality used for joins: integers compare numerically regardless of width.
    pub fn key_eq(&self, other: &PropertyValue) -> bool {
        match (self.as_i64(), other.as_i64()) {
            (Some(a), Some(b)) => a == b,
            _ => !self.is_null() && self == other,
        }
    }

    /// Literal form used inside identifiers and key predicates, e.g. `1` or `'abc'`.
    pub fn to_uri_literal(&self) -> Option<String> {
        match self {
            PropertyValue::Null | PropertyValue::Complex(_) => None,
            PropertyValue::Boolean(b) => Some(b.to_string()),
            PropertyValue::Int16(v) => Some(v.to_string()),
            PropertyValue::Int32(v) => Some(v.to_string()),
            PropertyValue::Int64(v) => Some(v.to_string()),
            PropertyValue::Double(v) => Some(v.to_string()),
            PropertyValue::Decimal(d) => Some(d.to_string()),
            PropertyValue::String(s) => Some(format!("'{}'", s.replace('\'', "''"))),
        }
    }

    pub fn to_json(&self) -> serde_json::Value {
        use serde_json::Value;
        match self {
            PropertyValue::Null => Value::Null,
            PropertyValue::Boolean(b) => Value::Bool(*b),
            PropertyValue::Int16(v) => Value::from(*v),
            PropertyValue::Int32(v) => Value::from(*v),
            PropertyValue::Int64(v) => Value::from(*v),
            // Non-finite doubles travel as NaN, INF and -INF strings
            PropertyValue::Double(v) => serde_json::Number::from_f64(*v)
                .map(Value::Number)
                .unwrap_or_else(|| {
                    let text = if v.is_nan() {
                        "NaN"
                    } else if v.is_sign_negative() {
                        "-INF"
                    } else {
                        "INF"
                    };
                    Value::String(text.to_string())
                }),
            // Exact text, as in the IEEE754Compatible wire form
            PropertyValue::Decimal(d) => Value::String(d.to_string()),
            PropertyValue::String(s) => Value::String(s.clone()),
            PropertyValue::Complex(members) => Value::Object(
                members
                    .iter()
                    .map(|p| (p.name.clone(), p.value.to_json()))
                    .collect(),
            ),
        }
    }
}

impl From<bool> for PropertyValue {
    fn from(value: bool) -> Self {
        PropertyValue::Boolean(value)
    }
}

impl From<i16> for PropertyValue {
    fn from(value: i16) -> Self {
        PropertyValue::Int16(value)
    }
}

impl From<i32> for PropertyValue {
    fn from(value: i32) -> Self {
        PropertyValue::Int32(value)
    }
}

impl From<i64> for PropertyValue {
    fn from(value: i64) -> Self {
        PropertyValue::Int64(value)
    }
}

impl From<f64> for PropertyValue {
    fn from(value: f64) -> Self {
        PropertyValue::Double(value)
    }
}

impl From<Decimal> for PropertyValue {
    fn from(value: Decimal) -> Self {
        PropertyValue::Decimal(value)
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::String(value.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(value: String) -> Self {
        PropertyValue::String(value)
    }
}

impl From<Vec<Property>> for PropertyValue {
    fn from(value: Vec<Property>) -> Self {
        PropertyValue::Complex(value)
    }
}
