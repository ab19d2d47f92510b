pub mod factory;
pub mod in_memory_broker;
pub mod in_memory_store;
pub mod message_queue;
pub mod redis_store;
pub mod timeout_handler;

pub use factory::*;
pub use in_memory_broker::*;
pub use in_memory_store::*;
pub use message_queue::*;
pub use redis_store::*;
pub use timeout_handler::*;
