use crate::error::{ODataError, ODataResult};
use crate::logic::{decode_entity, EntityLocator, NavigationResolver};
use crate::model::{
    Cardinality, Entity, EntityCollection, KeyPredicate, PathSegment, PropertyValue, TypeTag,
    UpdateMode,
};
use crate::store::EntityStore;
use serde_json::Value;

/// What a resource path resolved to. `entity_set` names the set used for the
/// response context.
#[derive(Debug, Clone, PartialEq)]
pub enum ResourceOutcome {
    Collection {
        entity_set: String,
        entities: EntityCollection,
    },
    Entity {
        entity_set: String,
        entity: Entity,
    },
    Property {
        entity_set: String,
        /// Addressed property, e.g. `Products(1)/Name`
        path: String,
        value: PropertyValue,
    },
    NoContent,
}

/// Classifies parsed segments and dispatches them to the store or the
/// navigation resolver.
///
/// Supported shapes:
/// - `Set`
/// - `Set(key)`
/// - `Set(key)/Navigation` and `Set(key)/Navigation(key)`
/// - `Set(key)/Property`
pub struct RequestRouter<'a, S: EntityStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: EntityStore + ?Sized> RequestRouter<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    pub fn read(&self, segments: &[PathSegment]) -> ODataResult<ResourceOutcome> {
        let (set_name, entity_type, keys) = root_segment(segments)?;

        match segments {
            [_] if keys.is_empty() => Ok(ResourceOutcome::Collection {
                entity_set: set_name.to_string(),
                entities: self.store.read_all(entity_type)?,
            }),
            [_] => Ok(ResourceOutcome::Entity {
                entity_set: set_name.to_string(),
                entity: self.resolve(entity_type, keys)?,
            }),
            [_, _] if keys.is_empty() => Err(ODataError::unsupported(format!(
                "'{}' must address a single entity before navigating",
                set_name
            ))),
            [_, PathSegment::Navigation { name, keys: nav_keys }] => {
                let source = self.resolve(entity_type, keys)?;
                self.navigate(&source, name, nav_keys)
            }
            [_, PathSegment::Property { name }] => {
                let source = self.resolve(entity_type, keys)?;
                self.property(set_name, &source, name)
            }
            [_, PathSegment::EntitySet { name, .. }] => Err(ODataError::unsupported(format!(
                "entity set '{}' cannot follow another segment",
                name
            ))),
            _ => Err(ODataError::unsupported(format!(
                "paths deeper than two segments are not supported ({} given)",
                segments.len()
            ))),
        }
    }

    /// POST to a collection. Returns the stored entity.
    pub fn create(&self, segments: &[PathSegment], body: &Value) -> ODataResult<ResourceOutcome> {
        let (set_name, entity_type, keys) = root_segment(segments)?;
        if segments.len() != 1 || !keys.is_empty() {
            return Err(ODataError::unsupported("entities can only be created in an entity set"));
        }
        let entity = decode_entity(self.store.schema(), entity_type, body)?;
        let created = self.store.insert(entity_type, entity)?;
        log::debug!("created {}", created.id.as_deref().unwrap_or(set_name));
        Ok(ResourceOutcome::Entity {
            entity_set: set_name.to_string(),
            entity: created,
        })
    }

    /// PATCH or PUT on a single entity.
    pub fn update(
        &self,
        segments: &[PathSegment],
        body: &Value,
        mode: UpdateMode,
    ) -> ODataResult<ResourceOutcome> {
        let (set_name, entity_type, keys) = single_entity(segments)?;
        let changes = decode_entity(self.store.schema(), entity_type, body)?;
        let updated = self.store.update(entity_type, keys, changes, mode)?;
        Ok(ResourceOutcome::Entity {
            entity_set: set_name.to_string(),
            entity: updated,
        })
    }

    pub fn delete(&self, segments: &[PathSegment]) -> ODataResult<()> {
        let (_, entity_type, keys) = single_entity(segments)?;
        self.store.delete(entity_type, keys)
    }

    fn resolve(&self, entity_type: TypeTag, keys: &[KeyPredicate]) -> ODataResult<Entity> {
        self.store.read_by_key(entity_type, keys)?.ok_or_else(|| {
            ODataError::not_found(format!(
                "{} not found",
                self.store.schema().describe_key(entity_type, keys)
            ))
        })
    }

    fn navigate(
        &self,
        source: &Entity,
        navigation: &str,
        keys: &[KeyPredicate],
    ) -> ODataResult<ResourceOutcome> {
        let resolver = NavigationResolver::new(self.store);
        let relationship = resolver.relationship(source, navigation)?;
        let entity_set = self.set_name(relationship.target);

        if !keys.is_empty() {
            let related = resolver.collection_via(source, relationship)?;
            let def = self.store.schema().entity_type(relationship.target);
            let entity = EntityLocator::find(def, &related.entities, keys)?
                .cloned()
                .ok_or_else(|| {
                    ODataError::not_found(format!(
                        "no related {} of {} matches the key",
                        def.name, navigation
                    ))
                })?;
            return Ok(ResourceOutcome::Entity { entity_set, entity });
        }

        match relationship.navigation.cardinality {
            Cardinality::Many => Ok(ResourceOutcome::Collection {
                entity_set,
                entities: resolver.collection_via(source, relationship)?,
            }),
            Cardinality::One => Ok(match resolver.single_via(source, relationship)? {
                Some(entity) => ResourceOutcome::Entity { entity_set, entity },
                None => ResourceOutcome::NoContent,
            }),
        }
    }

    fn property(&self, set_name: &str, source: &Entity, name: &str) -> ODataResult<ResourceOutcome> {
        let value = source.property(name).ok_or_else(|| {
            ODataError::not_found(format!("property '{}' is not present", name))
        })?;
        if value.is_null() {
            return Ok(ResourceOutcome::NoContent);
        }
        let owner = source
            .id
            .clone()
            .or_else(|| self.store.schema().entity_id(source))
            .unwrap_or_else(|| set_name.to_string());
        Ok(ResourceOutcome::Property {
            entity_set: set_name.to_string(),
            path: format!("{}/{}", owner, name),
            value: value.clone(),
        })
    }

    fn set_name(&self, entity_type: TypeTag) -> String {
        let schema = self.store.schema();
        match schema.entity_set_of(entity_type) {
            Some(set) => set.name.clone(),
            None => schema.entity_type(entity_type).name.clone(),
        }
    }
}

fn root_segment(segments: &[PathSegment]) -> ODataResult<(&str, TypeTag, &[KeyPredicate])> {
    match segments.first() {
        Some(PathSegment::EntitySet {
            name,
            entity_type,
            keys,
        }) => Ok((name.as_str(), *entity_type, keys.as_slice())),
        Some(other) => Err(ODataError::unsupported(format!(
            "path must start with an entity set, not '{}'",
            other.name()
        ))),
        None => Err(ODataError::unsupported("empty resource path")),
    }
}

fn single_entity(segments: &[PathSegment]) -> ODataResult<(&str, TypeTag, &[KeyPredicate])> {
    let (set_name, entity_type, keys) = root_segment(segments)?;
    if segments.len() != 1 || keys.is_empty() {
        return Err(ODataError::unsupported(
            "only single entities addressed by key can be modified",
        ));
    }
    Ok((set_name, entity_type, keys))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FailureKind;
    use crate::logic::parse_resource_path;
    use crate::model::{
        EntityTypeDef, Link, NavigationBinding, NavigationDef, PrimitiveKind, PropertyDef, Schema,
    };
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::Arc;

    fn store() -> MemoryStore {
        let schema = Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Product", &["ID"])
                    .property(PropertyDef::primitive("ID", PrimitiveKind::Int32))
                    .property(PropertyDef::primitive("Name", PrimitiveKind::String))
                    .property(PropertyDef::primitive("CategoryID", PrimitiveKind::Int32))
                    .navigation(
                        NavigationDef::to_one(
                            "Category",
                            "Category",
                            NavigationBinding::ForeignKey {
                                property: "CategoryID".to_string(),
                            },
                        )
                        .partner("Products"),
                    )
                    .navigation(NavigationDef::to_many(
                        "Suppliers",
                        "Supplier",
                        NavigationBinding::LinkTable {
                            table: "ProductSuppliers".to_string(),
                            reversed: false,
                        },
                    )),
            )
            .entity_type(
                EntityTypeDef::new("Category", &["ID"])
                    .property(PropertyDef::primitive("ID", PrimitiveKind::Int32))
                    .navigation(
                        NavigationDef::to_many(
                            "Products",
                            "Product",
                            NavigationBinding::InverseForeignKey {
                                property: "CategoryID".to_string(),
                            },
                        )
                        .partner("Category"),
                    ),
            )
            .entity_type(
                EntityTypeDef::new("Supplier", &["SupplierID"])
                    .property(PropertyDef::primitive("SupplierID", PrimitiveKind::Int32)),
            )
            .entity_set("Products", "Product")
            .entity_set("Categories", "Category")
            .entity_set("Suppliers", "Supplier")
            .build()
            .unwrap();
        let schema = Arc::new(schema);
        let product = schema.tag_of("Product").unwrap();
        let category = schema.tag_of("Category").unwrap();
        let supplier = schema.tag_of("Supplier").unwrap();
        let store = MemoryStore::new(schema);

        store.insert(category, Entity::new(category)).unwrap();
        store.insert(category, Entity::new(category)).unwrap();
        for (name, category_id) in [("Pen", Some(1)), ("Ink", Some(1)), ("Loose", None)] {
            let mut entity = Entity::new(product).with_property("Name", name);
            if let Some(id) = category_id {
                entity.set_property("CategoryID", id);
            }
            store.insert(product, entity).unwrap();
        }
        store.insert(supplier, Entity::new(supplier)).unwrap();
        store.insert(supplier, Entity::new(supplier)).unwrap();
        store.add_link("ProductSuppliers", Link::new(1, 1)).unwrap();
        store.add_link("ProductSuppliers", Link::new(1, 2)).unwrap();
        store
    }

    fn read(store: &MemoryStore, path: &str) -> ODataResult<ResourceOutcome> {
        let segments = parse_resource_path(store.schema(), path)?;
        RequestRouter::new(store).read(&segments)
    }

    fn entity_ids(outcome: &ResourceOutcome) -> Vec<String> {
        match outcome {
            ResourceOutcome::Collection { entities, .. } => {
                entities.iter().filter_map(|e| e.id.clone()).collect()
            }
            ResourceOutcome::Entity { entity, .. } => entity.id.clone().into_iter().collect(),
            _ => Vec::new(),
        }
    }

    #[test]
    fn test_collection_and_single_reads() {
        let store = store();
        let outcome = read(&store, "Products").unwrap();
        assert_eq!(entity_ids(&outcome), vec!["Products(1)", "Products(2)", "Products(3)"]);

        let outcome = read(&store, "Products(2)").unwrap();
        let ResourceOutcome::Entity { entity_set, entity } = outcome else {
            panic!("expected entity");
        };
        assert_eq!(entity_set, "Products");
        assert_eq!(entity.property("Name"), Some(&PropertyValue::from("Ink")));
    }

    #[test]
    fn test_missing_key_is_not_found() {
        let store = store();
        let err = read(&store, "Products(999)").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
        assert_eq!(err.to_string(), "Product(ID=999) not found");
        assert_eq!(
            read(&store, "Products(999)/Category").unwrap_err().kind(),
            FailureKind::NotFound
        );
    }

    #[test]
    fn test_navigation_by_cardinality() {
        let store = store();
        let outcome = read(&store, "Categories(1)/Products").unwrap();
        assert_eq!(entity_ids(&outcome), vec!["Products(1)", "Products(2)"]);

        let outcome = read(&store, "Products(1)/Category").unwrap();
        assert_eq!(entity_ids(&outcome), vec!["Categories(1)"]);

        assert_eq!(read(&store, "Products(3)/Category").unwrap(), ResourceOutcome::NoContent);
        let outcome = read(&store, "Categories(2)/Products").unwrap();
        assert!(entity_ids(&outcome).is_empty());
    }

    #[test]
    fn test_keyed_navigation_applies_locator() {
        let store = store();
        let outcome = read(&store, "Products(1)/Suppliers(2)").unwrap();
        assert_eq!(entity_ids(&outcome), vec!["Suppliers(2)"]);

        let err = read(&store, "Products(2)/Suppliers(1)").unwrap_err();
        assert_eq!(err.kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_property_reads() {
        let store = store();
        let outcome = read(&store, "Products(1)/Name").unwrap();
        assert_eq!(
            outcome,
            ResourceOutcome::Property {
                entity_set: "Products".to_string(),
                path: "Products(1)/Name".to_string(),
                value: PropertyValue::from("Pen"),
            }
        );
        assert_eq!(read(&store, "Products(3)/CategoryID").unwrap(), ResourceOutcome::NoContent);
    }

    #[test]
    fn test_unsupported_shapes() {
        let store = store();
        for path in ["Products(1)/Category/Products", "Products/Category", "Products(1)/Category/ID"] {
            assert_eq!(
                read(&store, path).unwrap_err().kind(),
                FailureKind::UnsupportedPath,
                "{}",
                path
            );
        }

        let router = RequestRouter::new(&store);
        let err = router.read(&[PathSegment::property("Name")]).unwrap_err();
        assert_eq!(err.kind(), FailureKind::UnsupportedPath);
        assert_eq!(router.read(&[]).unwrap_err().kind(), FailureKind::UnsupportedPath);
    }

    #[test]
    fn test_write_operations() {
        let store = store();
        let router = RequestRouter::new(&store);
        let products = parse_resource_path(store.schema(), "Products").unwrap();

        let created = router.create(&products, &json!({"Name": "Clip"})).unwrap();
        assert_eq!(entity_ids(&created), vec!["Products(4)"]);

        let target = parse_resource_path(store.schema(), "Products(4)").unwrap();
        router
            .update(&target, &json!({"Name": "Paperclip"}), UpdateMode::Patch)
            .unwrap();
        let ResourceOutcome::Entity { entity, .. } = router.read(&target).unwrap() else {
            panic!("expected entity");
        };
        assert_eq!(entity.property("Name"), Some(&PropertyValue::from("Paperclip")));

        router.delete(&target).unwrap();
        assert_eq!(router.read(&target).unwrap_err().kind(), FailureKind::NotFound);
    }

    #[test]
    fn test_writes_need_plain_shapes() {
        let store = store();
        let router = RequestRouter::new(&store);
        let nav = parse_resource_path(store.schema(), "Products(1)/Category").unwrap();
        let keyed = parse_resource_path(store.schema(), "Products(1)").unwrap();
        let set = parse_resource_path(store.schema(), "Products").unwrap();

        assert_eq!(
            router.create(&keyed, &json!({})).unwrap_err().kind(),
            FailureKind::UnsupportedPath
        );
        assert_eq!(
            router.update(&nav, &json!({}), UpdateMode::Patch).unwrap_err().kind(),
            FailureKind::UnsupportedPath
        );
        assert_eq!(router.delete(&set).unwrap_err().kind(), FailureKind::UnsupportedPath);
    }
}
