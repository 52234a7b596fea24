//! Application modules that run on top of IBC channels.

pub mod transfer;
