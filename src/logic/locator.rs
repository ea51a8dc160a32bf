use crate::error::ODataResult;
use crate::logic::KeyMatcher;
use crate::model::{Entity, EntityTypeDef, KeyPredicate};

/// Finds the entity addressed by a set of key predicates.
pub struct EntityLocator;

impl EntityLocator {
    /// First entity, in collection order, matching every predicate. Duplicates are not detected.
    pub fn find<'a>(
        entity_type: &EntityTypeDef,
        entities: &'a [Entity],
        keys: &[KeyPredicate],
    ) -> ODataResult<Option<&'a Entity>> {
        Ok(Self::position(entity_type, entities, keys)?.map(|i| &entities[i]))
    }

    pub fn position(
        entity_type: &EntityTypeDef,
        entities: &[Entity],
        keys: &[KeyPredicate],
    ) -> ODataResult<Option<usize>> {
        for (i, entity) in entities.iter().enumerate() {
            if Self::matches_all_keys(entity_type, entity, keys)? {
                return Ok(Some(i));
            }
        }
        Ok(None)
    }

    /// Stops at the first predicate that does not match.
    pub fn matches_all_keys(
        entity_type: &EntityTypeDef,
        entity: &Entity,
        keys: &[KeyPredicate],
    ) -> ODataResult<bool> {
        for key in keys {
            let (Some(def), Some(value)) =
                (entity_type.get_property(&key.name), entity.property(&key.name))
            else {
                return Ok(false);
            };
            if !KeyMatcher::matches(def, value, &key.text)? {
                return Ok(false);
            }
        }
        Ok(true)
    }
}
