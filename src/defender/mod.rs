//! Microsoft Defender backend: Graph Security and Defender for Endpoint.

pub mod aggregate;
pub mod collector;
pub mod delegated;
pub mod requests;
pub mod snapshot;

pub use aggregate::DefenderSource;
pub use collector::DefenderCollector;
pub use delegated::load_delegated;
pub use snapshot::DefenderSnapshot;
