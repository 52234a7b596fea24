//! ICS 04: Channel implementation that facilitates communication between
//! applications and the chains those applications are built upon.

pub mod acknowledgement;
pub mod channel;
pub mod commitment;
pub mod error;
pub mod events;
pub mod msgs;
pub mod packet;
pub mod timeout;
pub mod version;
