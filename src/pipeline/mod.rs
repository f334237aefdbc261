pub mod orchestrator;

pub use orchestrator::{PostureOrchestrator, RunOptions, TenantReport};
