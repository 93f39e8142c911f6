pub mod drag;
pub mod error;
pub mod reorder;
pub mod session;
pub mod types;

pub use error::ValidationError;
pub use reorder::{ReorderError, reorder};
pub use types::*;
