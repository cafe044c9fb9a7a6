//! `arena_client`
//!
//! Client-side systems:
//! - Connection and name handshake
//! - Input state to control command
//! - World view tracking from broadcast lines
//!
//! Rendering lives elsewhere; this crate only speaks the protocol.

pub mod client;
pub mod input;
pub mod view;

pub use client::GameClient;
