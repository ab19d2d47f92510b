pub mod location_store;
pub mod messaging;

pub use location_store::*;
pub use messaging::*;
