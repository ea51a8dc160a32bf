pub mod memory;
pub mod session;
pub mod traits;

pub use memory::*;
pub use session::*;
pub use traits::*;
