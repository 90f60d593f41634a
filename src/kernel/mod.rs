pub mod batch;
pub mod cancel;
pub mod errors;
pub mod history;
pub mod meta;
pub mod orchestrator;
pub mod response;
pub mod telemetry;

pub use orchestrator::Orchestrator;
pub use response::Response;
