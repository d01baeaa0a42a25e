//! Frame-level seam between the NIC driver and the protocol stack.
//!
//! This crate is intentionally minimal: it deals exclusively with raw Ethernet frames so the
//! receive/dispatch pump can be tested against an in-memory device instead of DM9000 hardware.
#![forbid(unsafe_code)]

use std::collections::VecDeque;

/// One Ethernet frame at a time, polled rather than blocking.
///
/// `poll_receive` returns `Ok(None)` when no frame is pending; the caller owns the polling
/// cadence and any idle-timeout bookkeeping. Frames the hardware flags as bad (CRC, alignment,
/// overflow, ...) are dropped inside the implementation and also surface as `Ok(None)` — a
/// partial or malformed frame is never exposed.
pub trait FrameIo {
    type Error: core::fmt::Display;

    /// Transmit one frame; returns once the hardware reports completion.
    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error>;

    /// Poll for one received frame.
    fn poll_receive(&mut self) -> Result<Option<Vec<u8>>, Self::Error>;
}

impl<T: FrameIo + ?Sized> FrameIo for &mut T {
    type Error = T::Error;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        <T as FrameIo>::transmit(&mut **self, frame)
    }

    fn poll_receive(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        <T as FrameIo>::poll_receive(&mut **self)
    }
}

impl<T: FrameIo + ?Sized> FrameIo for Box<T> {
    type Error = T::Error;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        <T as FrameIo>::transmit(&mut **self, frame)
    }

    fn poll_receive(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        <T as FrameIo>::poll_receive(&mut **self)
    }
}

/// In-memory [`FrameIo`] backed by two queues; the test peer scripts the RX side and inspects
/// the TX side.
#[derive(Debug, Default)]
pub struct QueueIo {
    tx: Vec<Vec<u8>>,
    rx: VecDeque<Vec<u8>>,
}

impl QueueIo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a frame for the next `poll_receive`.
    pub fn push_rx(&mut self, frame: Vec<u8>) {
        self.rx.push_back(frame);
    }

    /// Frames transmitted so far, oldest first.
    pub fn transmitted(&self) -> &[Vec<u8>] {
        &self.tx
    }

    pub fn take_transmitted(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.tx)
    }
}

impl FrameIo for QueueIo {
    type Error = core::convert::Infallible;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        self.tx.push(frame.to_vec());
        Ok(())
    }

    fn poll_receive(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        Ok(self.rx.pop_front())
    }
}
