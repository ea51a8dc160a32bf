use crate::error::{ODataError, ODataResult};
use crate::model::{
    Decimal, Entity, PrimitiveKind, Property, PropertyDef, PropertyType, PropertyValue, Schema,
    TypeTag,
};
use serde_json::{Map, Value};

/// Decodes a JSON request body into an entity of `entity_type`.
///
/// Only properties present in the body are set, in declared order, so the
/// result doubles as a patch. Unknown members and `@odata.*` annotations
/// are ignored.
pub fn decode_entity(schema: &Schema, entity_type: TypeTag, body: &Value) -> ODataResult<Entity> {
    let def = schema.entity_type(entity_type);
    let object = body
        .as_object()
        .ok_or_else(|| ODataError::invalid(format!("{} payload must be a JSON object", def.name)))?;

    let mut entity = Entity::new(entity_type);
    for property in &def.properties {
        if let Some(raw) = object.get(&property.name) {
            entity.set_property(&property.name, decode_value(schema, property, raw)?);
        }
    }

    let ignored: Vec<&String> = object
        .keys()
        .filter(|k| !k.starts_with('@') && def.get_property(k).is_none())
        .collect();
    if !ignored.is_empty() {
        log::debug!("ignoring unknown {} members {:?}", def.name, ignored);
    }
    Ok(entity)
}

fn decode_value(schema: &Schema, def: &PropertyDef, raw: &Value) -> ODataResult<PropertyValue> {
    if raw.is_null() {
        if def.facets.nullable {
            return Ok(PropertyValue::Null);
        }
        return Err(ODataError::invalid(format!("'{}' cannot be null", def.name)));
    }

    match &def.property_type {
        PropertyType::Complex(type_name) => {
            let complex = schema.complex_type(type_name).ok_or_else(|| {
                ODataError::invalid(format!("unknown complex type '{}'", type_name))
            })?;
            let object = raw.as_object().ok_or_else(|| wrong_shape(def, "an object"))?;
            decode_members(schema, &complex.properties, object)
        }
        PropertyType::Primitive(kind) => decode_primitive(def, *kind, raw),
    }
}

fn decode_members(
    schema: &Schema,
    members: &[PropertyDef],
    object: &Map<String, Value>,
) -> ODataResult<PropertyValue> {
    let mut properties = Vec::with_capacity(members.len());
    for member in members {
        let value = match object.get(&member.name) {
            Some(raw) => decode_value(schema, member, raw)?,
            None => PropertyValue::Null,
        };
        properties.push(Property::new(member.name.clone(), value));
    }
    Ok(PropertyValue::Complex(properties))
}

fn decode_primitive(def: &PropertyDef, kind: PrimitiveKind, raw: &Value) -> ODataResult<PropertyValue> {
    let value = match kind {
        PrimitiveKind::Boolean => PropertyValue::Boolean(
            raw.as_bool().ok_or_else(|| wrong_shape(def, "a boolean"))?,
        ),
        PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64 => {
            // Int64 may arrive as a string to survive JSON number precision
            let n = match (raw.as_i64(), raw.as_str()) {
                (Some(n), _) => n,
                (None, Some(text)) if kind == PrimitiveKind::Int64 => text
                    .parse::<i64>()
                    .map_err(|_| wrong_shape(def, "an integer"))?,
                _ => return Err(wrong_shape(def, "an integer")),
            };
            integer(def, kind, n)?
        }
        PrimitiveKind::Double => match (raw.as_f64(), raw.as_str()) {
            (Some(d), _) => PropertyValue::Double(d),
            (None, Some("NaN")) => PropertyValue::Double(f64::NAN),
            (None, Some("INF")) => PropertyValue::Double(f64::INFINITY),
            (None, Some("-INF")) => PropertyValue::Double(f64::NEG_INFINITY),
            _ => return Err(wrong_shape(def, "a number")),
        },
        PrimitiveKind::Decimal => {
            let text = match raw {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => return Err(wrong_shape(def, "a decimal")),
            };
            let decimal = text
                .parse::<Decimal>()
                .or_else(|_| Decimal::from_scientific(&text))
                .map_err(|e| ODataError::invalid(format!("'{}': {}", def.name, e)))?;
            PropertyValue::Decimal(decimal)
        }
        PrimitiveKind::String => {
            let text = raw.as_str().ok_or_else(|| wrong_shape(def, "a string"))?;
            if let Some(max_length) = def.facets.max_length {
                if text.chars().count() > max_length as usize {
                    return Err(ODataError::invalid(format!(
                        "'{}' exceeds max length {}",
                        def.name, max_length
                    )));
                }
            }
            PropertyValue::String(text.to_string())
        }
    };
    Ok(value)
}

fn integer(def: &PropertyDef, kind: PrimitiveKind, n: i64) -> ODataResult<PropertyValue> {
    let out_of_range = || {
        ODataError::invalid(format!(
            "'{}': {} is out of range for {}",
            def.name,
            n,
            kind.edm_name()
        ))
    };
    Ok(match kind {
        PrimitiveKind::Int16 => PropertyValue::Int16(i16::try_from(n).map_err(|_| out_of_range())?),
        PrimitiveKind::Int32 => PropertyValue::Int32(i32::try_from(n).map_err(|_| out_of_range())?),
        _ => PropertyValue::Int64(n),
    })
}

fn wrong_shape(def: &PropertyDef, expected: &str) -> ODataError {
    ODataError::invalid(format!("'{}' must be {}", def.name, expected))
}
