pub mod endpoint;
pub mod handle;
pub mod mock;
pub mod requests;
pub mod runtime;
pub mod tracking;
