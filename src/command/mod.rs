pub mod types;
pub mod builder;
pub mod risk;

pub use types::*;
pub use builder::{build, explain_command};
pub use risk::classify;
