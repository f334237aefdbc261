pub mod types;
pub mod classification;

pub use types::{AdvisorError, UpstreamError};
pub use classification::Disposition;
