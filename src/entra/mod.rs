//! Microsoft Entra ID backend: directory, identity protection, Intune and Global Secure Access.

pub mod aggregate;
pub mod collector;
pub mod requests;
pub mod snapshot;

pub use collector::EntraCollector;
pub use snapshot::{AccessStatus, EntraSnapshot};
