//! Unix platform layer for the decision exchange.
//!
//! The decision process and the controller talk over a Unix domain
//! stream socket. Each message is a big-endian `u32` length followed by
//! that many bytes of JSON, and exchanges strictly alternate:
//! one request, one reply, never two requests in flight.

pub mod framing;
pub mod slot;
mod server;
mod client;
mod clock;

pub use client::ExchangeClient;
pub use clock::SystemClock;
pub use server::{ExchangeServer, ServerConfig};
