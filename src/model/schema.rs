use crate::model::{Cardinality, Entity, Facets, KeyPredicate, PrimitiveKind, TypeTag};
use anyhow::{anyhow, bail, ensure, Result};
use itertools::Itertools;
use std::collections::{HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub enum PropertyType {
    Primitive(PrimitiveKind),
    /// Name of a complex type declared in the same schema
    Complex(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDef {
    pub name: String,
    pub property_type: PropertyType,
    pub facets: Facets,
}

impl PropertyDef {
    pub fn primitive(name: &str, kind: PrimitiveKind) -> Self {
        Self {
            name: name.to_string(),
            property_type: PropertyType::Primitive(kind),
            facets: Facets::default(),
        }
    }

    pub fn complex(name: &str, type_name: &str) -> Self {
        Self {
            name: name.to_string(),
            property_type: PropertyType::Complex(type_name.to_string()),
            facets: Facets::default(),
        }
    }

    pub fn with_facets(mut self, facets: Facets) -> Self {
        self.facets = facets;
        self
    }

    pub fn primitive_kind(&self) -> Option<PrimitiveKind> {
        match &self.property_type {
            PropertyType::Primitive(kind) => Some(*kind),
            PropertyType::Complex(_) => None,
        }
    }
}

/// Structured value type without identity, e.g. an Address.
#[derive(Debug, Clone, PartialEq)]
pub struct ComplexTypeDef {
    pub name: String,
    pub properties: Vec<PropertyDef>,
}

impl ComplexTypeDef {
    pub fn new(name: &str, properties: Vec<PropertyDef>) -> Self {
        Self {
            name: name.to_string(),
            properties,
        }
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }
}

/// How the related entities of a navigation are found.
#[derive(Debug, Clone, PartialEq)]
pub enum NavigationBinding {
    /// The source entity holds the target's key in `property`.
    ForeignKey { property: String },
    /// Target entities hold the source's key in `property`.
    InverseForeignKey { property: String },
    /// Pairs kept by the store under `table`; `reversed` walks target -> source.
    LinkTable { table: String, reversed: bool },
}

#[derive(Debug, Clone, PartialEq)]
pub struct NavigationDef {
    pub name: String,
    pub target_type: String,
    pub cardinality: Cardinality,
    /// Only meaningful for to-one navigations. An absent target of a
    /// non-nullable navigation is a caller error.
    pub nullable: bool,
    /// Contained targets have no top-level identity outside their owner.
    pub contained: bool,
    pub partner: Option<String>,
    pub binding: NavigationBinding,
}

impl NavigationDef {
    pub fn to_one(name: &str, target_type: &str, binding: NavigationBinding) -> Self {
        Self {
            name: name.to_string(),
            target_type: target_type.to_string(),
            cardinality: Cardinality::One,
            nullable: true,
            contained: false,
            partner: None,
            binding,
        }
    }

    pub fn to_many(name: &str, target_type: &str, binding: NavigationBinding) -> Self {
        Self {
            cardinality: Cardinality::Many,
            ..Self::to_one(name, target_type, binding)
        }
    }

    pub fn required(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn contained(mut self) -> Self {
        self.contained = true;
        self
    }

    pub fn partner(mut self, partner: &str) -> Self {
        self.partner = Some(partner.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntityTypeDef {
    pub name: String,
    /// Names of the key properties, in declaration order
    pub key: Vec<String>,
    pub properties: Vec<PropertyDef>,
    pub navigations: Vec<NavigationDef>,
}

impl EntityTypeDef {
    pub fn new(name: &str, key: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            key: key.iter().map(|k| k.to_string()).collect(),
            properties: Vec::new(),
            navigations: Vec::new(),
        }
    }

    pub fn property(mut self, property: PropertyDef) -> Self {
        self.properties.push(property);
        self
    }

    pub fn navigation(mut self, navigation: NavigationDef) -> Self {
        self.navigations.push(navigation);
        self
    }

    pub fn get_property(&self, name: &str) -> Option<&PropertyDef> {
        self.properties.iter().find(|p| p.name == name)
    }

    pub fn get_navigation(&self, name: &str) -> Option<&NavigationDef> {
        self.navigations.iter().find(|n| n.name == name)
    }

    pub fn is_key(&self, name: &str) -> bool {
        self.key.iter().any(|k| k == name)
    }

    /// The key property when the key is not composite.
    pub fn single_key(&self) -> Option<&PropertyDef> {
        match self.key.as_slice() {
            [only] => self.get_property(only),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EntitySetDef {
    pub name: String,
    pub entity_type: TypeTag,
}

/// A navigation with both ends resolved to tags.
#[derive(Debug, Clone, PartialEq)]
pub struct Relationship {
    pub source: TypeTag,
    pub target: TypeTag,
    pub navigation: NavigationDef,
}

/// Immutable service model, built once at startup.
#[derive(Debug, Clone)]
pub struct Schema {
    namespace: String,
    entity_types: Vec<EntityTypeDef>,
    complex_types: Vec<ComplexTypeDef>,
    entity_sets: Vec<EntitySetDef>,
    type_index: HashMap<String, TypeTag>,
    set_index: HashMap<String, usize>,
    set_of_type: HashMap<TypeTag, usize>,
    relationships: HashMap<(TypeTag, String), Relationship>,
}

impl Schema {
    pub fn builder(namespace: &str) -> SchemaBuilder {
        SchemaBuilder {
            namespace: namespace.to_string(),
            entity_types: Vec::new(),
            complex_types: Vec::new(),
            entity_sets: Vec::new(),
        }
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn entity_type(&self, tag: TypeTag) -> &EntityTypeDef {
        &self.entity_types[tag.0]
    }

    /// `Type(Key=text,...)` for log lines and error messages.
    pub fn describe_key(&self, tag: TypeTag, keys: &[KeyPredicate]) -> String {
        let key_text = keys
            .iter()
            .map(|k| format!("{}={}", k.name, k.text))
            .join(",");
        format!("{}({})", self.entity_type(tag).name, key_text)
    }

    pub fn entity_types(&self) -> impl Iterator<Item = (TypeTag, &EntityTypeDef)> {
        self.entity_types
            .iter()
            .enumerate()
            .map(|(i, def)| (TypeTag(i), def))
    }

    pub fn tag_of(&self, type_name: &str) -> Option<TypeTag> {
        self.type_index.get(type_name).copied()
    }

    pub fn entity_sets(&self) -> &[EntitySetDef] {
        &self.entity_sets
    }

    pub fn entity_set(&self, name: &str) -> Option<&EntitySetDef> {
        self.set_index.get(name).map(|&i| &self.entity_sets[i])
    }

    pub fn entity_set_of(&self, tag: TypeTag) -> Option<&EntitySetDef> {
        self.set_of_type.get(&tag).map(|&i| &self.entity_sets[i])
    }

    pub fn complex_type(&self, name: &str) -> Option<&ComplexTypeDef> {
        self.complex_types.iter().find(|c| c.name == name)
    }

    pub fn relationship(&self, source: TypeTag, navigation: &str) -> Option<&Relationship> {
        self.relationships.get(&(source, navigation.to_string()))
    }

    /// First declared navigation of `source` whose target type is `target`.
    pub fn relationship_to(&self, source: TypeTag, target: TypeTag) -> Option<&Relationship> {
        self.entity_type(source)
            .navigations
            .iter()
            .filter_map(|nav| self.relationship(source, &nav.name))
            .find(|rel| rel.target == target)
    }

    pub fn relationships_from(&self, source: TypeTag) -> impl Iterator<Item = &Relationship> {
        self.entity_type(source)
            .navigations
            .iter()
            .filter_map(move |nav| self.relationship(source, &nav.name))
    }

    /// Key portion of an identifier: `1` for a single key, `ID=1,Code='x'` for composite keys.
    pub fn key_literal(&self, entity: &Entity) -> Option<String> {
        let def = self.entity_type(entity.entity_type);
        if let [only] = def.key.as_slice() {
            return entity.property(only)?.to_uri_literal();
        }
        let parts = def
            .key
            .iter()
            .map(|k| {
                entity
                    .property(k)
                    .and_then(|v| v.to_uri_literal())
                    .map(|literal| format!("{}={}", k, literal))
            })
            .collect::<Option<Vec<_>>>()?;
        Some(parts.iter().join(","))
    }

    /// Canonical identifier `<EntitySet>(<key>)`. Types without an entity set
    /// fall back to their type name.
    pub fn entity_id(&self, entity: &Entity) -> Option<String> {
        let key = self.key_literal(entity)?;
        let prefix = match self.entity_set_of(entity.entity_type) {
            Some(set) => set.name.as_str(),
            None => self.entity_type(entity.entity_type).name.as_str(),
        };
        Some(format!("{}({})", prefix, key))
    }
}

pub struct SchemaBuilder {
    namespace: String,
    entity_types: Vec<EntityTypeDef>,
    complex_types: Vec<ComplexTypeDef>,
    entity_sets: Vec<(String, String)>,
}

impl SchemaBuilder {
    pub fn complex_type(mut self, def: ComplexTypeDef) -> Self {
        self.complex_types.push(def);
        self
    }

    pub fn entity_type(mut self, def: EntityTypeDef) -> Self {
        self.entity_types.push(def);
        self
    }

    pub fn entity_set(mut self, name: &str, entity_type: &str) -> Self {
        self.entity_sets
            .push((name.to_string(), entity_type.to_string()));
        self
    }

    pub fn build(self) -> Result<Schema> {
        let mut type_index = HashMap::new();
        for (i, def) in self.entity_types.iter().enumerate() {
            ensure!(
                type_index.insert(def.name.clone(), TypeTag(i)).is_none(),
                "duplicate entity type '{}'",
                def.name
            );
        }

        let mut complex_names = HashSet::new();
        for complex in &self.complex_types {
            ensure!(
                complex_names.insert(complex.name.as_str()),
                "duplicate complex type '{}'",
                complex.name
            );
        }
        for complex in &self.complex_types {
            for property in &complex.properties {
                if let PropertyType::Complex(name) = &property.property_type {
                    ensure!(
                        complex_names.contains(name.as_str()),
                        "complex type '{}' references unknown complex type '{}'",
                        complex.name,
                        name
                    );
                }
            }
        }

        for def in &self.entity_types {
            validate_entity_type(def, &complex_names)?;
        }

        let mut entity_sets = Vec::new();
        let mut set_index = HashMap::new();
        let mut set_of_type = HashMap::new();
        for (name, type_name) in &self.entity_sets {
            let tag = *type_index
                .get(type_name)
                .ok_or_else(|| anyhow!("entity set '{}' references unknown type '{}'", name, type_name))?;
            ensure!(
                !set_index.contains_key(name),
                "duplicate entity set '{}'",
                name
            );
            ensure!(
                !set_of_type.contains_key(&tag),
                "entity type '{}' is exposed by more than one entity set",
                type_name
            );
            set_index.insert(name.clone(), entity_sets.len());
            set_of_type.insert(tag, entity_sets.len());
            entity_sets.push(EntitySetDef {
                name: name.clone(),
                entity_type: tag,
            });
        }

        let mut relationships = HashMap::new();
        for (i, def) in self.entity_types.iter().enumerate() {
            let source = TypeTag(i);
            for nav in &def.navigations {
                let target = *type_index.get(&nav.target_type).ok_or_else(|| {
                    anyhow!(
                        "navigation '{}.{}' targets unknown type '{}'",
                        def.name,
                        nav.name,
                        nav.target_type
                    )
                })?;
                let target_def = &self.entity_types[target.0];
                validate_binding(def, nav, target_def)?;
                if let Some(partner) = &nav.partner {
                    let back = target_def.get_navigation(partner).ok_or_else(|| {
                        anyhow!(
                            "navigation '{}.{}' names missing partner '{}.{}'",
                            def.name,
                            nav.name,
                            target_def.name,
                            partner
                        )
                    })?;
                    ensure!(
                        back.target_type == def.name,
                        "partner '{}.{}' does not point back to '{}'",
                        target_def.name,
                        partner,
                        def.name
                    );
                }
                relationships.insert(
                    (source, nav.name.clone()),
                    Relationship {
                        source,
                        target,
                        navigation: nav.clone(),
                    },
                );
            }
        }

        Ok(Schema {
            namespace: self.namespace,
            entity_types: self.entity_types,
            complex_types: self.complex_types,
            entity_sets,
            type_index,
            set_index,
            set_of_type,
            relationships,
        })
    }
}

fn validate_entity_type(def: &EntityTypeDef, complex_names: &HashSet<&str>) -> Result<()> {
    ensure!(!def.key.is_empty(), "entity type '{}' declares no key", def.name);

    let mut seen = HashSet::new();
    for property in &def.properties {
        ensure!(
            seen.insert(property.name.as_str()),
            "entity type '{}' declares property '{}' twice",
            def.name,
            property.name
        );
        if let PropertyType::Complex(name) = &property.property_type {
            ensure!(
                complex_names.contains(name.as_str()),
                "property '{}.{}' references unknown complex type '{}'",
                def.name,
                property.name,
                name
            );
        }
    }
    for nav in &def.navigations {
        ensure!(
            seen.insert(nav.name.as_str()),
            "entity type '{}' declares member '{}' twice",
            def.name,
            nav.name
        );
    }

    for key in &def.key {
        match def.get_property(key) {
            Some(p) if p.primitive_kind().is_some() => {}
            Some(_) => bail!("key '{}.{}' must be a primitive property", def.name, key),
            None => bail!("key '{}.{}' is not a declared property", def.name, key),
        }
    }
    Ok(())
}

fn validate_binding(
    source: &EntityTypeDef,
    nav: &NavigationDef,
    target: &EntityTypeDef,
) -> Result<()> {
    match &nav.binding {
        NavigationBinding::ForeignKey { property } => {
            ensure!(
                source.get_property(property).is_some(),
                "navigation '{}.{}' uses undeclared foreign key '{}'",
                source.name,
                nav.name,
                property
            );
            ensure!(
                target.single_key().is_some(),
                "foreign key target '{}' must have a single key",
                target.name
            );
        }
        NavigationBinding::InverseForeignKey { property } => {
            ensure!(
                target.get_property(property).is_some(),
                "navigation '{}.{}' uses undeclared foreign key '{}.{}'",
                source.name,
                nav.name,
                target.name,
                property
            );
            ensure!(
                source.single_key().is_some(),
                "navigation source '{}' must have a single key",
                source.name
            );
        }
        NavigationBinding::LinkTable { table, .. } => {
            ensure!(
                source.single_key().is_some() && target.single_key().is_some(),
                "link table '{}' requires single keys on '{}' and '{}'",
                table,
                source.name,
                target.name
            );
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Facets;

    fn category_and_product() -> SchemaBuilder {
        Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Product", &["ID"])
                    .property(PropertyDef::primitive("ID", PrimitiveKind::Int32))
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
                    ),
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
            .entity_set("Products", "Product")
            .entity_set("Categories", "Category")
    }

    #[test]
    fn test_build_resolves_tags_and_relationships() {
        let schema = category_and_product().build().unwrap();
        let product = schema.tag_of("Product").unwrap();
        let category = schema.tag_of("Category").unwrap();

        assert_eq!(schema.entity_set("Products").unwrap().entity_type, product);
        assert_eq!(schema.entity_set_of(category).unwrap().name, "Categories");

        let rel = schema.relationship(product, "Category").unwrap();
        assert_eq!(rel.target, category);
        assert_eq!(
            schema.relationship_to(category, product).unwrap().navigation.name,
            "Products"
        );
        assert!(schema.relationship_to(product, product).is_none());
    }

    #[test]
    fn test_entity_id_uses_entity_set_name() {
        let schema = category_and_product().build().unwrap();
        let product = schema.tag_of("Product").unwrap();
        let entity = Entity::new(product).with_property("ID", 3);
        assert_eq!(schema.entity_id(&entity).as_deref(), Some("Products(3)"));
    }

    #[test]
    fn test_composite_key_literal() {
        let schema = Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Line", &["OrderID", "Code"])
                    .property(PropertyDef::primitive("OrderID", PrimitiveKind::Int32))
                    .property(PropertyDef::primitive("Code", PrimitiveKind::String)),
            )
            .entity_set("Lines", "Line")
            .build()
            .unwrap();
        let line = Entity::new(schema.tag_of("Line").unwrap())
            .with_property("OrderID", 1)
            .with_property("Code", "a");
        assert_eq!(
            schema.entity_id(&line).as_deref(),
            Some("Lines(OrderID=1,Code='a')")
        );
    }

    #[test]
    fn test_build_rejects_unknown_navigation_target() {
        let result = Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Product", &["ID"])
                    .property(PropertyDef::primitive("ID", PrimitiveKind::Int32))
                    .navigation(NavigationDef::to_many(
                        "Suppliers",
                        "Supplier",
                        NavigationBinding::LinkTable {
                            table: "ProductSuppliers".to_string(),
                            reversed: false,
                        },
                    )),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_undeclared_key() {
        let result = Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Product", &["ID"])
                    .property(PropertyDef::primitive("Name", PrimitiveKind::String)),
            )
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn test_build_rejects_broken_partner() {
        let result = Schema::builder("Test")
            .entity_type(
                EntityTypeDef::new("Product", &["ID"])
                    .property(
                        PropertyDef::primitive("ID", PrimitiveKind::Int32)
                            .with_facets(Facets::default().not_null()),
                    )
                    .property(PropertyDef::primitive("CategoryID", PrimitiveKind::Int32))
                    .navigation(
                        NavigationDef::to_one(
                            "Category",
                            "Category",
                            NavigationBinding::ForeignKey {
                                property: "CategoryID".to_string(),
                            },
                        )
                        .partner("Items"),
                    ),
            )
            .entity_type(
                EntityTypeDef::new("Category", &["ID"])
                    .property(PropertyDef::primitive("ID", PrimitiveKind::Int32)),
            )
            .build();
        assert!(result.is_err());
    }
}
