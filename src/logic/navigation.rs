use crate::error::{ODataError, ODataResult};
use crate::model::{
    Cardinality, Entity, EntityCollection, NavigationBinding, PropertyValue, Relationship, TypeTag,
};
use crate::store::EntityStore;

/// Computes related entities by joining on declared keys.
///
/// The relationship table is fixed once the schema is built; the joins run
/// against the store's current collections, so mutations are visible.
pub struct NavigationResolver<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> NavigationResolver<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Related entities of `source` of type `target`. Empty when nothing is related.
    pub fn related_collection(
        &self,
        source: &Entity,
        target: TypeTag,
    ) -> ODataResult<EntityCollection> {
        let relationship = self.relationship_to(source, target)?;
        self.collection_via(source, relationship)
    }

    /// The single related entity, `None` when absent and the navigation is nullable.
    pub fn related_single(&self, source: &Entity, target: TypeTag) -> ODataResult<Option<Entity>> {
        let relationship = self.relationship_to(source, target)?;
        self.single_via(source, relationship)
    }

    pub fn relationship(&self, source: &Entity, navigation: &str) -> ODataResult<&'a Relationship> {
        let schema = self.store.schema();
        schema
            .relationship(source.entity_type, navigation)
            .ok_or_else(|| ODataError::MissingRelationship {
                source_type: schema.entity_type(source.entity_type).name.clone(),
                target: navigation.to_string(),
            })
    }

    fn relationship_to(&self, source: &Entity, target: TypeTag) -> ODataResult<&'a Relationship> {
        let schema = self.store.schema();
        schema
            .relationship_to(source.entity_type, target)
            .ok_or_else(|| ODataError::MissingRelationship {
                source_type: schema.entity_type(source.entity_type).name.clone(),
                target: schema.entity_type(target).name.clone(),
            })
    }

    pub fn collection_via(
        &self,
        source: &Entity,
        relationship: &Relationship,
    ) -> ODataResult<EntityCollection> {
        let schema = self.store.schema();
        let target_def = schema.entity_type(relationship.target);
        let candidates = self.store.read_all(relationship.target)?;

        let related: Vec<Entity> = match &relationship.navigation.binding {
            NavigationBinding::ForeignKey { property } => {
                let Some(fk) = source.property(property).filter(|v| !v.is_null()) else {
                    return Ok(EntityCollection::new());
                };
                let Some(target_key) = target_def.single_key() else {
                    return Ok(EntityCollection::new());
                };
                candidates
                    .into_iter()
                    .filter(|t| t.property(&target_key.name).is_some_and(|k| k.key_eq(fk)))
                    .collect()
            }
            NavigationBinding::InverseForeignKey { property } => {
                let Some(source_key) = self.single_key_value(source) else {
                    return Ok(EntityCollection::new());
                };
                candidates
                    .into_iter()
                    .filter(|t| t.property(property).is_some_and(|v| v.key_eq(&source_key)))
                    .collect()
            }
            NavigationBinding::LinkTable { table, reversed } => {
                let (Some(source_key), Some(target_key)) =
                    (self.single_key_value(source), target_def.single_key())
                else {
                    return Ok(EntityCollection::new());
                };
                let linked: Vec<PropertyValue> = self
                    .store
                    .links(table)?
                    .into_iter()
                    .filter_map(|link| {
                        let (near, far) = if *reversed {
                            (link.target, link.source)
                        } else {
                            (link.source, link.target)
                        };
                        near.key_eq(&source_key).then_some(far)
                    })
                    .collect();
                // Target collection order, not link order
                candidates
                    .into_iter()
                    .filter(|t| {
                        t.property(&target_key.name)
                            .is_some_and(|k| linked.iter().any(|l| l.key_eq(k)))
                    })
                    .collect()
            }
        };

        if relationship.navigation.contained {
            return Ok(self.contained_identities(source, relationship, related).into());
        }
        Ok(related.into())
    }

    pub fn single_via(
        &self,
        source: &Entity,
        relationship: &Relationship,
    ) -> ODataResult<Option<Entity>> {
        let related = self.collection_via(source, relationship)?.into_iter().next();
        let navigation = &relationship.navigation;
        if related.is_none() && navigation.cardinality == Cardinality::One && !navigation.nullable {
            let schema = self.store.schema();
            return Err(ODataError::not_found(format!(
                "required '{}' of {} is missing",
                navigation.name,
                source
                    .id
                    .clone()
                    .or_else(|| schema.entity_id(source))
                    .unwrap_or_else(|| schema.entity_type(source.entity_type).name.clone())
            )));
        }
        Ok(related)
    }

    fn single_key_value(&self, entity: &Entity) -> Option<PropertyValue> {
        let def = self.store.schema().entity_type(entity.entity_type);
        def.single_key()
            .and_then(|key| entity.property(&key.name))
            .filter(|v| !v.is_null())
            .cloned()
    }

    /// Contained targets are addressed through their owner: `Products(1)/Suppliers(2)`.
    fn contained_identities(
        &self,
        owner: &Entity,
        relationship: &Relationship,
        related: Vec<Entity>,
    ) -> Vec<Entity> {
        let schema = self.store.schema();
        let owner_id = owner.id.clone().or_else(|| schema.entity_id(owner));
        related
            .into_iter()
            .map(|mut entity| {
                entity.id = match (&owner_id, schema.key_literal(&entity)) {
                    (Some(owner_id), Some(key)) => Some(format!(
                        "{}/{}({})",
                        owner_id, relationship.navigation.name, key
                    )),
                    _ => None,
                };
                entity
            })
            .collect()
    }
}
