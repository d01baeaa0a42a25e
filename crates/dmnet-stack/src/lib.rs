//! Single-connection TCP client stack for a polled NIC.
//!
//! Three pieces: [`client::TcpClient`] (the connection state machine, frames in / actions out),
//! [`arp::ArpResponder`] (so the peer can resolve us), and [`pump::Pump`] (the polling loop that
//! owns the NIC through the [`dmnet_backend::FrameIo`] seam and routes frames between them).

#![forbid(unsafe_code)]

pub mod arp;
pub mod client;
pub mod pump;

pub use arp::ArpResponder;
pub use client::{Action, ClientConfig, TcpClient, TcpState};
pub use pump::{Pump, PumpStats};
