pub mod distance_worker;

pub use distance_worker::{DistanceWorker, JobOutcome};
