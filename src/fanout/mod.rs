pub mod fetcher;
pub mod classifier;
pub mod status;

pub use fetcher::{fan_out, FanOutResults, Operation, Outcome, RequestSet};
pub use classifier::{triage, ActivationRule, Triage};
pub use status::CollectionStatus;
