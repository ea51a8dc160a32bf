use crate::model::TypeTag;

/// `(property, literal text)` taken from a path segment such as `Products(ID=1)`.
/// String literals arrive unquoted: `Suppliers('A''B')` yields the text `A'B`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPredicate {
    pub name: String,
    pub text: String,
}

impl KeyPredicate {
    pub fn new(name: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
        }
    }
}

/// One classified resource-path segment.
#[derive(Debug, Clone, PartialEq)]
pub enum PathSegment {
    EntitySet {
        name: String,
        entity_type: TypeTag,
        keys: Vec<KeyPredicate>,
    },
    Navigation {
        name: String,
        keys: Vec<KeyPredicate>,
    },
    Property {
        name: String,
    },
}

impl PathSegment {
    pub fn entity_set(name: &str, entity_type: TypeTag, keys: Vec<KeyPredicate>) -> Self {
        PathSegment::EntitySet {
            name: name.to_string(),
            entity_type,
            keys,
        }
    }

    pub fn navigation(name: &str, keys: Vec<KeyPredicate>) -> Self {
        PathSegment::Navigation {
            name: name.to_string(),
            keys,
        }
    }

    pub fn property(name: &str) -> Self {
        PathSegment::Property {
            name: name.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            PathSegment::EntitySet { name, .. }
            | PathSegment::Navigation { name, .. }
            | PathSegment::Property { name } => name,
        }
    }
}
