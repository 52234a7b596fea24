//! Message handlers of the mock chain.
//!
//! Every handler validates the message completely against the working
//! state before writing to it, so that a rejected message leaves no trace.

mod channel;
mod client;
mod connection;
mod packet;
