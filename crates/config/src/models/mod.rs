pub mod api_observability;
pub mod app_config;
pub mod distance_worker;
pub mod location_store;
pub mod message_queue;

pub use api_observability::*;
pub use app_config::*;
pub use distance_worker::*;
pub use location_store::*;
pub use message_queue::*;
