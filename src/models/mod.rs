pub mod advisory;
pub mod defender;
pub mod entra;
pub mod normalize;

pub use advisory::{build_observation, Advisory, Priority};
