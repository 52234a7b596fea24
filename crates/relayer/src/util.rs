pub mod mutex;
pub mod pretty;
pub mod retry;
pub mod sled;
pub mod task;
pub mod tracing;
