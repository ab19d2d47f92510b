pub mod connection;
pub mod distance_service;
pub mod location_service;

pub use connection::close_connection;
pub use distance_service::DistanceService;
pub use location_service::LocationService;
