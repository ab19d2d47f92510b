pub mod entities;
pub mod geo;
pub mod payload;
pub mod ports;

pub use entities::*;
pub use geo::*;
pub use geodist_errors::{GeoError, GeoResult};
pub use ports::*;
