use crate::error::ODataResult;
use crate::model::{Entity, EntityCollection, KeyPredicate, Link, Schema, TypeTag, UpdateMode};

/// CRUD surface the resolution engine works against. Returned entities are
/// copies; canonical state only changes through the mutating methods.
pub trait EntityStore: Send + Sync {
    fn schema(&self) -> &Schema;

    /// All entities of a type, in insertion order
    fn read_all(&self, entity_type: TypeTag) -> ODataResult<EntityCollection>;

    /// Absence is `Ok(None)`; callers decide whether that is an error.
    fn read_by_key(&self, entity_type: TypeTag, keys: &[KeyPredicate]) -> ODataResult<Option<Entity>>;

    /// Stores a new entity and returns it with its key and identifier assigned.
    fn insert(&self, entity_type: TypeTag, entity: Entity) -> ODataResult<Entity>;

    /// Applies `changes` to the addressed entity. Key properties in `changes` are ignored.
    fn update(
        &self,
        entity_type: TypeTag,
        keys: &[KeyPredicate],
        changes: Entity,
        mode: UpdateMode,
    ) -> ODataResult<Entity>;

    /// Removes the addressed entity together with its link-table rows.
    fn delete(&self, entity_type: TypeTag, keys: &[KeyPredicate]) -> ODataResult<()>;

    fn links(&self, table: &str) -> ODataResult<Vec<Link>>;

    fn add_link(&self, table: &str, link: Link) -> ODataResult<()>;
}
