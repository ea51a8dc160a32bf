use crate::model::{Property, PropertyValue, TypeTag};

/// A typed record. Properties keep their insertion order so rendering is stable.
#[derive(Debug, Clone, PartialEq)]
pub struct Entity {
    pub entity_type: TypeTag,
    /// Identifier such as `Products(1)`, or `Products(1)/Suppliers(2)` for contained entities.
    pub id: Option<String>,
    pub properties: Vec<Property>,
}

impl Entity {
    pub fn new(entity_type: TypeTag) -> Self {
        Self {
            entity_type,
            id: None,
            properties: Vec::new(),
        }
    }

    pub fn with_property(mut self, name: &str, value: impl Into<PropertyValue>) -> Self {
        self.set_property(name, value);
        self
    }

    pub fn property(&self, name: &str) -> Option<&PropertyValue> {
        self.properties
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.value)
    }

    pub fn has_property(&self, name: &str) -> bool {
        self.properties.iter().any(|p| p.name == name)
    }

    /// Replaces the value in place, or appends the property if it is new.
    pub fn set_property(&mut self, name: &str, value: impl Into<PropertyValue>) {
        let value = value.into();
        match self.properties.iter_mut().find(|p| p.name == name) {
            Some(existing) => existing.value = value,
            None => self.properties.push(Property::new(name, value)),
        }
    }
}

/// Ordered entities of a single declared type.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntityCollection {
    pub entities: Vec<Entity>,
}

impl EntityCollection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Entity> {
        self.entities.iter()
    }

    pub fn first(&self) -> Option<&Entity> {
        self.entities.first()
    }
}

impl From<Vec<Entity>> for EntityCollection {
    fn from(entities: Vec<Entity>) -> Self {
        Self { entities }
    }
}

impl IntoIterator for EntityCollection {
    type Item = Entity;
    type IntoIter = std::vec::IntoIter<Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.into_iter()
    }
}

impl<'a> IntoIterator for &'a EntityCollection {
    type Item = &'a Entity;
    type IntoIter = std::slice::Iter<'a, Entity>;

    fn into_iter(self) -> Self::IntoIter {
        self.entities.iter()
    }
}

/// One row of a many-to-many link table: the key of each side.
#[derive(Debug, Clone, PartialEq)]
pub struct Link {
    pub source: PropertyValue,
    pub target: PropertyValue,
}

impl Link {
    pub fn new(source: impl Into<PropertyValue>, target: impl Into<PropertyValue>) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
        }
    }
}
