//! Polled DM9000 Ethernet controller driver.
//!
//! The driver is generic over [`RegisterIo`], the two-cell (index/data) MMIO port the chip is
//! wired to. All hardware waits are bounded polls: a device that never clears a busy or reset
//! bit surfaces as [`Dm9000Error::Timeout`] instead of hanging the control thread. There are no
//! interrupts; the receive side is designed to be polled from a dispatch loop.
//!
//! [`sim::SimBus`] is a register-level simulator of the chip used by this crate's tests and by
//! downstream integration tests.

pub mod bus;
pub mod regs;
pub mod sim;

mod device;
mod frame;

pub use bus::{MmioRegisterIo, RegisterIo};
pub use device::{DeviceInfo, Dm9000, Duplex, IoMode, LinkSpeed};
pub use frame::RxOutcome;

/// Size of the one-frame transmit and receive windows, matching the chip's SRAM packet buffer.
pub const MAX_FRAME_LEN: usize = 2048;

#[derive(Debug, thiserror::Error)]
pub enum Dm9000Error {
    /// A busy/reset/completion bit never reached the expected state within the poll budget.
    #[error("timed out waiting for {op}")]
    Timeout { op: &'static str },

    #[error("frame of {len} bytes exceeds the {max}-byte transmit buffer")]
    FrameTooLarge { len: usize, max: usize },

    /// The chip reported a transmit-side error (collision, carrier loss, jabber).
    #[error("transmit failed (TSR {tsr:#04x})")]
    TxFailed { tsr: u8 },
}
