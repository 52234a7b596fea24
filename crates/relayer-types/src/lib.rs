#![forbid(unsafe_code)]
#![deny(
    trivial_casts,
    trivial_numeric_casts,
    unused_import_braces,
    rust_2018_idioms
)]
#![allow(clippy::large_enum_variant, clippy::result_large_err)]

//! Domain types used by the IBC relay engine.
//!
//! The types in this crate follow the ICS layout: identifiers and store
//! paths live under [`core::ics24_host`], light client types under
//! [`core::ics02_client`], connection ends under [`core::ics03_connection`],
//! channel ends and packets under [`core::ics04_channel`], and commitment
//! proofs under [`core::ics23_commitment`]. Messages submitted to a chain
//! are wrapped into a [`core::ics26_routing::msgs::MsgEnvelope`].

pub mod applications;
pub mod core;
pub mod events;
pub mod proofs;
pub mod serializers;
pub mod signer;
pub mod timestamp;
pub mod tx_msg;

/// Re-export of the height type, which is used pervasively.
pub type Height = crate::core::ics02_client::height::Height;

#[cfg(test)]
mod test_utils;
