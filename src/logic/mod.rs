pub mod locator;
pub mod matcher;
pub mod navigation;
pub mod path;
pub mod payload;
pub mod router;

pub use locator::*;
pub use matcher::*;
pub use navigation::*;
pub use path::*;
pub use payload::*;
pub use router::*;
