pub mod orchestrator;
pub mod preflight;

pub use orchestrator::*;
pub use preflight::*;
