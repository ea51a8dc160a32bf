
/// Index of an entity type inside a built [`Schema`](crate::model::Schema).
/// Resolved once when the schema is built so request handling never has to
/// compare type names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(pub(crate) usize);

impl TypeTag {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PrimitiveKind {
    Boolean,
    Int16,
    Int32,
    Int64,
    Double,
    Decimal,
    String,
}

impl PrimitiveKind {
    pub fn is_integer(self) -> bool {
        matches!(
            self,
            PrimitiveKind::Int16 | PrimitiveKind::Int32 | PrimitiveKind::Int64
        )
    }

    /// Inclusive value range for integer kinds.
    pub fn integer_range(self) -> Option<(i64, i64)> {
        match self {
            PrimitiveKind::Int16 => Some((i16::MIN as i64, i16::MAX as i64)),
            PrimitiveKind::Int32 => Some((i32::MIN as i64, i32::MAX as i64)),
            PrimitiveKind::Int64 => Some((i64::MIN, i64::MAX)),
            _ => None,
        }
    }

    pub fn edm_name(self) -> &'static str {
        match self {
            PrimitiveKind::Boolean => "Edm.Boolean",
            PrimitiveKind::Int16 => "Edm.Int16",
            PrimitiveKind::Int32 => "Edm.Int32",
            PrimitiveKind::Int64 => "Edm.Int64",
            PrimitiveKind::Double => "Edm.Double",
            PrimitiveKind::Decimal => "Edm.Decimal",
            PrimitiveKind::String => "Edm.String",
        }
    }
}

/// Declared facets of a property. All of them participate in canonical
/// rendering of a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Facets {
    pub nullable: bool,
    pub max_length: Option<u32>,
    pub precision: Option<u32>,
    pub scale: Option<u32>,
    pub unicode: bool,
}

impl Default for Facets {
    fn default() -> Self {
        Self {
            nullable: true,
            max_length: None,
            precision: None,
            scale: None,
            unicode: true,
        }
    }
}

impl Facets {
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    pub fn max_length(mut self, max_length: u32) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn precision(mut self, precision: u32, scale: u32) -> Self {
        self.precision = Some(precision);
        self.scale = Some(scale);
        self
    }

    pub fn ascii_only(mut self) -> Self {
        self.unicode = false;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cardinality {
    One,
    Many,
}

/// PATCH leaves omitted properties untouched, PUT (Replace) nulls them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateMode {
    Patch,
    Replace,
}
