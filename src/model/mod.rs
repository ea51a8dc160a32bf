pub mod common;
pub mod entity;
pub mod path;
pub mod schema;
pub mod value;

pub use common::*;
pub use entity::*;
pub use path::*;
pub use schema::*;
pub use value::*;
