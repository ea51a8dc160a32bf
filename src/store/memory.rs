use crate::error::{ODataError, ODataResult};
use crate::logic::{EntityLocator, KeyMatcher};
use crate::model::{
    Entity, EntityCollection, EntityTypeDef, KeyPredicate, Link, NavigationBinding, PrimitiveKind,
    PropertyValue, Schema, TypeTag, UpdateMode,
};
use crate::store::traits::EntityStore;
use itertools::Itertools;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Volatile store: one lock per entity collection, plus one for the link tables.
/// Reads run concurrently; a write holds its collection exclusively.
/// No method holds two locks at once.
pub struct MemoryStore {
    schema: Arc<Schema>,
    collections: Vec<RwLock<Vec<Entity>>>,
    links: RwLock<HashMap<String, Vec<Link>>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
enum LinkSide {
    Source,
    Target,
}

impl MemoryStore {
    pub fn new(schema: Arc<Schema>) -> Self {
        let collections = schema
            .entity_types()
            .map(|_| RwLock::new(Vec::new()))
            .collect();
        Self {
            schema,
            collections,
            links: RwLock::new(HashMap::new()),
        }
    }

    pub fn shared_schema(&self) -> Arc<Schema> {
        Arc::clone(&self.schema)
    }

    fn collection(&self, entity_type: TypeTag) -> ODataResult<&RwLock<Vec<Entity>>> {
        self.collections
            .get(entity_type.index())
            .ok_or_else(|| ODataError::not_found(format!("unknown entity type {:?}", entity_type)))
    }

    /// Integer single keys get the lowest unused positive value; any other
    /// key must be supplied by the caller and be unique.
    fn assign_key(
        def: &EntityTypeDef,
        existing: &[Entity],
        entity: &mut Entity,
    ) -> ODataResult<()> {
        if let Some(key) = def.single_key() {
            if let Some(kind) = key.primitive_kind().filter(|k| k.is_integer()) {
                let used: HashSet<i64> = existing
                    .iter()
                    .filter_map(|e| e.property(&key.name).and_then(PropertyValue::as_i64))
                    .collect();
                let mut candidate: i64 = 1;
                while used.contains(&candidate) {
                    candidate += 1;
                }
                let value = match kind {
                    PrimitiveKind::Int16 => i16::try_from(candidate).ok().map(PropertyValue::Int16),
                    PrimitiveKind::Int32 => i32::try_from(candidate).ok().map(PropertyValue::Int32),
                    _ => Some(PropertyValue::Int64(candidate)),
                };
                let value = value.ok_or_else(|| {
                    ODataError::Conflict(format!("no free key left for {}", def.name))
                })?;
                entity.set_property(&key.name, value);
                return Ok(());
            }
        }

        let mut predicates = Vec::with_capacity(def.key.len());
        for name in &def.key {
            let value = entity
                .property(name)
                .filter(|v| !v.is_null())
                .ok_or_else(|| ODataError::invalid(format!("missing key property '{}'", name)))?;
            let Some(key_def) = def.get_property(name) else {
                return Err(ODataError::invalid(format!("undeclared key property '{}'", name)));
            };
            let text = KeyMatcher::value_to_string(key_def, value)?.ok_or_else(|| {
                ODataError::invalid(format!("missing key property '{}'", name))
            })?;
            predicates.push(KeyPredicate::new(name.clone(), text));
        }
        if EntityLocator::position(def, existing, &predicates)?.is_some() {
            return Err(ODataError::Conflict(format!(
                "{} with the same key already exists",
                def.name
            )));
        }
        Ok(())
    }

    /// Link tables touching `entity_type`, with the side that holds its key.
    fn link_sides(&self, entity_type: TypeTag) -> Vec<(String, LinkSide)> {
        let mut sides = Vec::new();
        for (tag, _) in self.schema.entity_types() {
            for rel in self.schema.relationships_from(tag) {
                let NavigationBinding::LinkTable { table, reversed } = &rel.navigation.binding
                else {
                    continue;
                };
                let (own, other) = if *reversed {
                    (LinkSide::Target, LinkSide::Source)
                } else {
                    (LinkSide::Source, LinkSide::Target)
                };
                if rel.source == entity_type {
                    sides.push((table.clone(), own));
                }
                if rel.target == entity_type {
                    sides.push((table.clone(), other));
                }
            }
        }
        sides.into_iter().unique().collect()
    }
}

impl EntityStore for MemoryStore {
    fn schema(&self) -> &Schema {
        &self.schema
    }

    fn read_all(&self, entity_type: TypeTag) -> ODataResult<EntityCollection> {
        let collection = self.collection(entity_type)?.read();
        Ok(EntityCollection::from(collection.clone()))
    }

    fn read_by_key(
        &self,
        entity_type: TypeTag,
        keys: &[KeyPredicate],
    ) -> ODataResult<Option<Entity>> {
        let def = self.schema.entity_type(entity_type);
        let collection = self.collection(entity_type)?.read();
        Ok(EntityLocator::find(def, &collection, keys)?.cloned())
    }

    fn insert(&self, entity_type: TypeTag, mut entity: Entity) -> ODataResult<Entity> {
        let def = self.schema.entity_type(entity_type);
        let mut collection = self.collection(entity_type)?.write();
        Self::assign_key(def, &collection, &mut entity)?;

        // Every declared property is present on a stored entity, null when omitted.
        let mut stored = Entity::new(entity_type);
        for property in &def.properties {
            let value = entity
                .property(&property.name)
                .cloned()
                .unwrap_or(PropertyValue::Null);
            stored.set_property(&property.name, value);
        }
        stored.id = self.schema.entity_id(&stored);

        collection.push(stored.clone());
        log::debug!(
            "inserted {}",
            stored.id.as_deref().unwrap_or(def.name.as_str())
        );
        Ok(stored)
    }

    fn update(
        &self,
        entity_type: TypeTag,
        keys: &[KeyPredicate],
        changes: Entity,
        mode: UpdateMode,
    ) -> ODataResult<Entity> {
        let def = self.schema.entity_type(entity_type);
        let mut collection = self.collection(entity_type)?.write();
        let index = EntityLocator::position(def, &collection, keys)?.ok_or_else(|| {
            ODataError::not_found(format!("{} not found", self.schema.describe_key(entity_type, keys)))
        })?;
        let target = &mut collection[index];

        for property in &def.properties {
            if def.is_key(&property.name) {
                if changes.has_property(&property.name) {
                    log::debug!("ignoring key property '{}' in update payload", property.name);
                }
                continue;
            }
            match changes.property(&property.name) {
                Some(value) => target.set_property(&property.name, value.clone()),
                None if mode == UpdateMode::Replace => {
                    target.set_property(&property.name, PropertyValue::Null)
                }
                None => {}
            }
        }
        Ok(target.clone())
    }

    fn delete(&self, entity_type: TypeTag, keys: &[KeyPredicate]) -> ODataResult<()> {
        let def = self.schema.entity_type(entity_type);
        let removed = {
            let mut collection = self.collection(entity_type)?.write();
            let index = EntityLocator::position(def, &collection, keys)?.ok_or_else(|| {
                ODataError::not_found(format!("{} not found", self.schema.describe_key(entity_type, keys)))
            })?;
            collection.remove(index)
        };

        let key_value = def
            .single_key()
            .and_then(|key| removed.property(&key.name))
            .cloned();
        if let Some(key_value) = key_value {
            let sides = self.link_sides(entity_type);
            if !sides.is_empty() {
                let mut links = self.links.write();
                for (table, side) in sides {
                    if let Some(rows) = links.get_mut(&table) {
                        rows.retain(|link| {
                            let held = match side {
                                LinkSide::Source => &link.source,
                                LinkSide::Target => &link.target,
                            };
                            !held.key_eq(&key_value)
                        });
                    }
                }
            }
        }
        log::debug!("deleted {}", self.schema.describe_key(entity_type, keys));
        Ok(())
    }

    fn links(&self, table: &str) -> ODataResult<Vec<Link>> {
        Ok(self.links.read().get(table).cloned().unwrap_or_default())
    }

    fn add_link(&self, table: &str, link: Link) -> ODataResult<()> {
        self.links
            .write()
            .entry(table.to_string())
            .or_default()
            .push(link);
        Ok(())
    }
}
