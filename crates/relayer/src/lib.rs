#![forbid(unsafe_code)]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]
#![allow(clippy::too_many_arguments, clippy::result_large_err)]

//! IBC relay engine.
//!
//! The engine establishes a verified path between two chains and then
//! relays packets over it:
//!
//! - [`chain`] wraps each chain behind a [`chain::handle::ChainHandle`],
//!   served by a [`chain::runtime::ChainRuntime`] thread that owns the
//!   chain's [`chain::endpoint::ChainEndpoint`];
//! - [`handshake`] resolves a path from the [`registry`] or creates the
//!   clients, connection and channel that make it up;
//! - [`link`] relays pending packets, acknowledgements and timeouts in
//!   both directions of an open channel;
//! - [`session`] runs both directions of a link, one-shot or as
//!   background workers;
//! - [`faucet`] funds the relayer account on a best-effort basis;
//! - [`relay`] ties the above together for a pair of configured chains.

pub mod account;
pub mod chain;
pub mod channel;
pub mod config;
pub mod connection;
pub mod error;
pub mod event;
pub mod faucet;
pub mod foreign_client;
pub mod handshake;
pub mod link;
pub mod observer;
pub mod registry;
pub mod relay;
pub mod session;
pub mod spawn;
pub mod util;
