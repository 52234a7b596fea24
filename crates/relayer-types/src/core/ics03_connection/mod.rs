//! ICS 03: Connection implementation for connecting a client
//! on the local chain with a client on a remote chain.

pub mod connection;
pub mod error;
pub mod events;
pub mod msgs;
pub mod version;
