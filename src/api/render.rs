use serde_json::{json, Map, Value};

use crate::logic::ResourceOutcome;
use crate::model::{Entity, Schema};

/// JSON body for a resolved resource, or `None` for "no content".
pub fn render_outcome(schema: &Schema, outcome: &ResourceOutcome) -> Option<Value> {
    match outcome {
        ResourceOutcome::Collection {
            entity_set,
            entities,
        } => Some(json!({
            "@odata.context": format!("$metadata#{}", entity_set),
            "value": entities.iter().map(|e| entity_body(schema, e)).collect::<Vec<_>>(),
        })),
        ResourceOutcome::Entity { entity_set, entity } => {
            let mut body = Map::new();
            body.insert(
                "@odata.context".to_string(),
                Value::String(format!("$metadata#{}/$entity", entity_set)),
            );
            if let Value::Object(members) = entity_body(schema, entity) {
                body.extend(members);
            }
            Some(Value::Object(body))
        }
        ResourceOutcome::Property { path, value, .. } => Some(json!({
            "@odata.context": format!("$metadata#{}", path),
            "value": value.to_json(),
        })),
        ResourceOutcome::NoContent => None,
    }
}

/// `@odata.id` followed by the properties in stored order.
pub fn entity_body(schema: &Schema, entity: &Entity) -> Value {
    let mut body = Map::new();
    if let Some(id) = entity.id.clone().or_else(|| schema.entity_id(entity)) {
        body.insert("@odata.id".to_string(), Value::String(id));
    }
    for property in &entity.properties {
        body.insert(property.name.clone(), property.value.to_json());
    }
    Value::Object(body)
}

pub fn service_document(schema: &Schema) -> Value {
    let sets: Vec<Value> = schema
        .entity_sets()
        .iter()
        .map(|set| {
            json!({
                "name": set.name,
                "kind": "EntitySet",
                "url": set.name,
            })
        })
        .collect();
    json!({
        "@odata.context": "$metadata",
        "value": sets,
    })
}
