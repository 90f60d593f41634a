pub mod types;
pub mod entities;
pub mod rules;
pub mod statistical;
pub mod ambiguity;
pub mod recognizer;

pub use types::*;
pub use ambiguity::{Clarification, ClarificationOption};
pub use recognizer::{normalize, recognize, IntentRecognizer, Recognition};
