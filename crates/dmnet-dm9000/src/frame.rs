//! One-frame-at-a-time transmit and receive paths.

use tracing::warn;

use dmnet_backend::FrameIo;

use crate::bus::RegisterIo;
use crate::device::Dm9000;
use crate::regs::*;
use crate::{Dm9000Error, MAX_FRAME_LEN};

/// Poll budget for the NSR transmit-complete bits.
const TX_ATTEMPTS: u32 = 5000;
const TX_DELAY_US: u32 = 10;

/// Result of one receive poll. At most one frame is extracted per call; a frame the hardware
/// flagged as bad is consumed whole and reported as `Dropped`, never partially exposed.
#[derive(Debug, PartialEq, Eq)]
pub enum RxOutcome<'a> {
    Frame(&'a [u8]),
    /// Nothing pending; poll again later.
    Empty,
    /// A frame was present but carried RX error status and was discarded.
    Dropped { rsr: u8 },
}

impl<B: RegisterIo> Dm9000<B> {
    /// Transmits one Ethernet frame and waits (bounded) for hardware completion.
    ///
    /// The frame is streamed into the TX SRAM as 16-bit words, low byte first; an odd-length
    /// frame is padded with a single zero byte, while the length programmed into TXPLL/TXPLH is
    /// the unpadded length.
    pub fn transmit(&mut self, frame: &[u8]) -> Result<(), Dm9000Error> {
        if frame.len() > MAX_FRAME_LEN {
            return Err(Dm9000Error::FrameTooLarge {
                len: frame.len(),
                max: MAX_FRAME_LEN,
            });
        }
        let len = frame.len() as u16;
        self.bus.write(TXPLH, len >> 8);
        self.bus.write(TXPLL, len & 0xff);

        let mut chunks = frame.chunks_exact(2);
        for pair in &mut chunks {
            self.bus
                .write(MWCMD, u16::from(pair[0]) | u16::from(pair[1]) << 8);
        }
        if let [last] = chunks.remainder() {
            self.bus.write(MWCMD, u16::from(*last));
        }

        // Clear the stale transmit latch, then fire.
        self.bus.write(ISR, u16::from(ISR_PT));
        self.bus.write(TCR, u16::from(TCR_TXREQ));

        self.poll_tx_end()?;
        let tsr = self.bus.read(TSR1) as u8;
        if tsr & TSR_ERR_MASK != 0 {
            return Err(Dm9000Error::TxFailed { tsr });
        }
        Ok(())
    }

    fn poll_tx_end(&mut self) -> Result<(), Dm9000Error> {
        for _ in 0..TX_ATTEMPTS {
            let nsr = self.bus.read(NSR) as u8;
            if nsr & (NSR_TX1END | NSR_TX2END) != 0 {
                // Latched; write 1 to clear for the next transmit.
                self.bus
                    .write(NSR, u16::from(nsr & (NSR_TX1END | NSR_TX2END)));
                return Ok(());
            }
            self.bus.delay_us(TX_DELAY_US);
        }
        Err(Dm9000Error::Timeout {
            op: "TX completion",
        })
    }

    /// Polls for one received frame. Non-blocking: returns [`RxOutcome::Empty`] immediately when
    /// the RX SRAM holds no packet.
    pub fn receive(&mut self) -> RxOutcome<'_> {
        // The first FIFO read after a pointer move returns stale data; throw it away.
        self.bus.read(MRCMDX);
        let ready = self.bus.read(MRCMDX1) as u8;
        if ready != 0x01 {
            return RxOutcome::Empty;
        }

        // Per-packet header: [ready, RSR status] then the 16-bit length, then the data words.
        let rsr = (self.bus.read(MRCMD) >> 8) as u8;
        let len = self.bus.read(MRCMD) as usize;

        if rsr & RSR_ERR_MASK != 0 || len > MAX_FRAME_LEN {
            // Drain the packet so the read pointer lands on the next one.
            for _ in 0..len.div_ceil(2) {
                self.bus.read(MRCMD);
            }
            self.bus.write(ISR, u16::from(ISR_PR));
            return RxOutcome::Dropped { rsr };
        }

        for i in (0..len).step_by(2) {
            let word = self.bus.read(MRCMD);
            self.rx_buf[i] = word as u8;
            if i + 1 < len {
                self.rx_buf[i + 1] = (word >> 8) as u8;
            }
        }
        self.bus.write(ISR, u16::from(ISR_PR));
        RxOutcome::Frame(&self.rx_buf[..len])
    }
}

impl<B: RegisterIo> FrameIo for Dm9000<B> {
    type Error = Dm9000Error;

    fn transmit(&mut self, frame: &[u8]) -> Result<(), Self::Error> {
        Dm9000::transmit(self, frame)
    }

    fn poll_receive(&mut self) -> Result<Option<Vec<u8>>, Self::Error> {
        match self.receive() {
            RxOutcome::Frame(frame) => Ok(Some(frame.to_vec())),
            RxOutcome::Empty => Ok(None),
            RxOutcome::Dropped { rsr } => {
                warn!(rsr = format_args!("{rsr:#04x}"), "dropped frame with RX error status");
                Ok(None)
            }
        }
    }
}
