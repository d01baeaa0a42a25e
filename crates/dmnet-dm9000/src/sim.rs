//! Register-level DM9000 simulator.
//!
//! Models just enough of the chip for the driver to be exercised without hardware: the index/data
//! access pattern is already below [`crate::bus::RegisterIo`], so the simulator only has to act
//! like the register file — self-clearing reset bits, the EPCR PHY-access busy handshake, the
//! TX/RX SRAM FIFOs with their per-packet headers, and write-1-to-clear status latches.
//!
//! Used by this crate's tests, by downstream integration tests, and by the CLI's `--sim` mode.

use std::collections::VecDeque;

use crate::bus::RegisterIo;
use crate::regs::*;

/// Ways the simulated hardware can be made to misbehave, for timeout-path tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Failure {
    /// NCR reset bit never self-clears.
    StuckReset,
    /// EPCR busy bit never clears.
    StuckPhyBusy,
    /// Transmit-complete bits never latch.
    NoTxComplete,
}

#[derive(Debug)]
pub struct SimBus {
    regs: [u8; 256],
    phy: [u16; 32],
    /// Every PHY register write, in order, for bring-up assertions.
    phy_writes: Vec<(u8, u16)>,
    failure: Option<Failure>,

    reset_reads_left: u32,
    epcr_busy_reads_left: u32,
    bmcr_reset_reads_left: u32,

    /// RX SRAM as the driver sees it through MRCMD: per-packet header words then data words.
    rx_stream: VecDeque<u16>,
    tx_fifo: Vec<u8>,
    transmitted: Vec<Vec<u8>>,
    /// Raw (padded) byte count streamed through MWCMD for the most recent transmit.
    last_tx_stream_len: usize,
    resets: u32,
}

impl Default for SimBus {
    fn default() -> Self {
        Self::new()
    }
}

impl SimBus {
    pub fn new() -> Self {
        let mut sim = Self {
            regs: [0u8; 256],
            phy: [0u16; 32],
            phy_writes: Vec::new(),
            failure: None,
            reset_reads_left: 0,
            epcr_busy_reads_left: 0,
            bmcr_reset_reads_left: 0,
            rx_stream: VecDeque::new(),
            tx_fifo: Vec::new(),
            transmitted: Vec::new(),
            last_tx_stream_len: 0,
            resets: 0,
        };
        sim.regs[VIDL as usize] = 0x46;
        sim.regs[VIDH as usize] = 0x0a;
        sim.regs[PIDL as usize] = 0x00;
        sim.regs[PIDH as usize] = 0x90;
        sim
    }

    pub fn with_failure(failure: Failure) -> Self {
        let mut sim = Self::new();
        sim.failure = Some(failure);
        sim
    }

    pub fn reg(&self, reg: u8) -> u8 {
        self.regs[reg as usize]
    }

    pub fn phy_reg(&self, offset: u8) -> u16 {
        self.phy[usize::from(offset & 0x1f)]
    }

    pub fn phy_writes(&self) -> &[(u8, u16)] {
        &self.phy_writes
    }

    pub fn resets(&self) -> u32 {
        self.resets
    }

    pub fn transmitted(&self) -> &[Vec<u8>] {
        &self.transmitted
    }

    pub fn take_transmitted(&mut self) -> Vec<Vec<u8>> {
        std::mem::take(&mut self.transmitted)
    }

    pub fn last_tx_stream_len(&self) -> usize {
        self.last_tx_stream_len
    }

    pub fn set_link(&mut self, up: bool) {
        if up {
            self.regs[NSR as usize] |= NSR_LINKST;
        } else {
            self.regs[NSR as usize] &= !NSR_LINKST;
        }
    }

    pub fn set_speed_10mbps(&mut self, slow: bool) {
        if slow {
            self.regs[NSR as usize] |= NSR_SPEED;
        } else {
            self.regs[NSR as usize] &= !NSR_SPEED;
        }
    }

    pub fn set_full_duplex(&mut self, full: bool) {
        if full {
            self.regs[NCR as usize] |= NCR_FDX;
        } else {
            self.regs[NCR as usize] &= !NCR_FDX;
        }
    }

    /// Reported in TSR1 after the next transmit completes.
    pub fn set_tx_status(&mut self, tsr: u8) {
        self.regs[TSR1 as usize] = tsr;
    }

    /// Queues a frame in the RX SRAM with the given per-packet RSR status byte.
    pub fn inject_frame(&mut self, frame: &[u8], rsr: u8) {
        self.rx_stream.push_back(0x0001 | u16::from(rsr) << 8);
        self.rx_stream.push_back(frame.len() as u16);
        let mut chunks = frame.chunks_exact(2);
        for pair in &mut chunks {
            self.rx_stream
                .push_back(u16::from(pair[0]) | u16::from(pair[1]) << 8);
        }
        if let [last] = chunks.remainder() {
            self.rx_stream.push_back(u16::from(*last));
        }
    }

    pub fn rx_pending(&self) -> bool {
        !self.rx_stream.is_empty()
    }

    fn phy_op(&mut self, cmd: u8) {
        let offset = self.regs[EPAR as usize] & 0x1f;
        if cmd & EPCR_ERPRW != 0 {
            let value = u16::from(self.regs[EPDRH as usize]) << 8
                | u16::from(self.regs[EPDRL as usize]);
            self.phy[usize::from(offset)] = value;
            self.phy_writes.push((offset, value));
            if offset == PHY_BMCR && value & BMCR_RST != 0 {
                // The PHY reset bit self-clears after one observed read.
                self.bmcr_reset_reads_left = 1;
            }
        } else if cmd & EPCR_ERPRR != 0 {
            let mut value = self.phy[usize::from(offset)];
            if offset == PHY_BMCR && value & BMCR_RST != 0 {
                if self.bmcr_reset_reads_left == 0 {
                    self.phy[usize::from(offset)] &= !BMCR_RST;
                    value &= !BMCR_RST;
                } else {
                    self.bmcr_reset_reads_left -= 1;
                }
            }
            self.regs[EPDRH as usize] = (value >> 8) as u8;
            self.regs[EPDRL as usize] = value as u8;
        }
    }
}

impl RegisterIo for SimBus {
    fn read(&mut self, reg: u8) -> u16 {
        match reg {
            NCR => {
                let value = self.regs[NCR as usize];
                if value & NCR_RST != 0 && self.failure != Some(Failure::StuckReset) {
                    if self.reset_reads_left == 0 {
                        self.regs[NCR as usize] &= !NCR_RST;
                    } else {
                        self.reset_reads_left -= 1;
                    }
                }
                u16::from(value)
            }
            EPCR => {
                let value = self.regs[EPCR as usize];
                if value & EPCR_ERRE != 0 && self.failure != Some(Failure::StuckPhyBusy) {
                    if self.epcr_busy_reads_left == 0 {
                        self.regs[EPCR as usize] &= !EPCR_ERRE;
                    } else {
                        self.epcr_busy_reads_left -= 1;
                    }
                }
                u16::from(value)
            }
            // Stale-data quirk: the first FIFO read after a pointer move is garbage.
            MRCMDX => 0x0000,
            MRCMDX1 => u16::from(self.rx_stream.front().copied().unwrap_or(0) as u8),
            MRCMD => self.rx_stream.pop_front().unwrap_or(0),
            _ => u16::from(self.regs[usize::from(reg)]),
        }
    }

    fn write(&mut self, reg: u8, value: u16) {
        let byte = value as u8;
        match reg {
            NCR => {
                self.regs[NCR as usize] = byte;
                if byte & NCR_RST != 0 {
                    self.resets += 1;
                    self.reset_reads_left = 2;
                }
            }
            EPCR => {
                self.regs[EPCR as usize] = byte;
                if byte & (EPCR_ERPRW | EPCR_ERPRR) != 0 {
                    self.phy_op(byte);
                    self.regs[EPCR as usize] |= EPCR_ERRE;
                    self.epcr_busy_reads_left = 1;
                }
            }
            // Latched status; write 1 to clear. Link/speed bits in NSR are live, not latched.
            NSR => {
                self.regs[NSR as usize] &= !(byte & (NSR_TX1END | NSR_TX2END | NSR_WAKEST));
            }
            ISR => {
                self.regs[ISR as usize] &= !(byte & 0x3f);
            }
            MWCMD => {
                self.tx_fifo.push(value as u8);
                self.tx_fifo.push((value >> 8) as u8);
            }
            TCR => {
                self.regs[TCR as usize] = byte;
                if byte & TCR_TXREQ != 0 {
                    let declared = usize::from(self.regs[TXPLH as usize]) << 8
                        | usize::from(self.regs[TXPLL as usize]);
                    let fifo = std::mem::take(&mut self.tx_fifo);
                    self.last_tx_stream_len = fifo.len();
                    let frame = fifo[..declared.min(fifo.len())].to_vec();
                    self.transmitted.push(frame);
                    self.regs[TCR as usize] &= !TCR_TXREQ;
                    if self.failure != Some(Failure::NoTxComplete) {
                        self.regs[NSR as usize] |= NSR_TX1END;
                    }
                }
            }
            _ => self.regs[usize::from(reg)] = byte,
        }
    }
}
