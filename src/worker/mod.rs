pub mod lifecycle;
mod pool;

pub use lifecycle::{WorkerEvent, WorkerLifecycle, WorkerState};
pub use pool::WorkerPool;
