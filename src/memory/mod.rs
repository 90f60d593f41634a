pub mod types;
pub mod store;
pub mod learning;

pub use types::*;
pub use store::*;
pub use learning::*;
