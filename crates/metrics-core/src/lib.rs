pub mod error;
pub mod metric;
pub mod stats;
pub mod store;
pub mod traits;
pub mod types;

pub use error::*;
pub use metric::*;
pub use store::{KeyValueStore, MemoryStore};
pub use traits::*;
pub use types::*;
