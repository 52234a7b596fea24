//! ICS 26: Routing module for the messages submitted to a chain.

pub mod msgs;
