//! Device bring-up, PHY access, and status queries.

use core::fmt;

use tracing::debug;

use crate::bus::RegisterIo;
use crate::regs::*;
use crate::{Dm9000Error, MAX_FRAME_LEN};

/// Poll budget for NCR reset completion.
const RESET_ATTEMPTS: u32 = 1000;
const RESET_DELAY_US: u32 = 10;
/// Poll budget for the EPCR PHY-access busy bit and the PHY's own reset bit.
const PHY_ATTEMPTS: u32 = 500;
const PHY_DELAY_US: u32 = 5;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkSpeed {
    Mbps10,
    Mbps100,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Duplex {
    Half,
    Full,
}

/// Strapped bus width, read back from ISR.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IoMode {
    Bits8,
    Bits16,
}

pub struct Dm9000<B> {
    pub(crate) bus: B,
    mac: [u8; 6],
    pub(crate) rx_buf: [u8; MAX_FRAME_LEN],
}

impl<B: RegisterIo> Dm9000<B> {
    pub fn new(bus: B, mac: [u8; 6]) -> Self {
        Self {
            bus,
            mac,
            rx_buf: [0u8; MAX_FRAME_LEN],
        }
    }

    pub fn mac(&self) -> [u8; 6] {
        self.mac
    }

    pub fn bus_mut(&mut self) -> &mut B {
        &mut self.bus
    }

    fn reg_read(&mut self, reg: u8) -> u8 {
        self.bus.read(reg) as u8
    }

    /// Polls `reg` until `(value & mask) == want`, with a fixed per-attempt delay.
    fn poll_mask(
        &mut self,
        reg: u8,
        mask: u8,
        want: u8,
        attempts: u32,
        delay_us: u32,
        op: &'static str,
    ) -> Result<(), Dm9000Error> {
        for _ in 0..attempts {
            if self.reg_read(reg) & mask == want {
                return Ok(());
            }
            self.bus.delay_us(delay_us);
        }
        Err(Dm9000Error::Timeout { op })
    }

    pub(crate) fn poll_clear(
        &mut self,
        reg: u8,
        mask: u8,
        attempts: u32,
        delay_us: u32,
        op: &'static str,
    ) -> Result<(), Dm9000Error> {
        self.poll_mask(reg, mask, 0, attempts, delay_us, op)
    }

    /// Wakes the PHY out of power-down and waits for the analog side to stabilize.
    pub fn power_up(&mut self) {
        self.bus.write(GPR, 0x00);
        self.bus.delay_us(100_000);
    }

    /// Soft-resets the MAC core. The reset bit self-clears when the chip is ready.
    pub fn reset(&mut self) -> Result<(), Dm9000Error> {
        self.bus.write(NCR, u16::from(NCR_RST));
        self.poll_clear(NCR, NCR_RST, RESET_ATTEMPTS, RESET_DELAY_US, "NCR reset")
    }

    /// Writes a PHY register through the EPCR/EPAR/EPDRx indirection.
    pub fn phy_write(&mut self, offset: u8, value: u16) -> Result<(), Dm9000Error> {
        self.bus.write(EPAR, u16::from(offset | EPAR_PHY));
        self.bus.write(EPDRH, value >> 8);
        self.bus.write(EPDRL, value & 0xff);
        self.bus
            .write(EPCR, u16::from(EPCR_EPOS | EPCR_ERPRW));
        self.poll_clear(EPCR, EPCR_ERRE, PHY_ATTEMPTS, PHY_DELAY_US, "PHY write")?;
        self.bus.delay_us(5);
        self.bus.write(EPCR, u16::from(EPCR_EPOS));
        Ok(())
    }

    pub fn phy_read(&mut self, offset: u8) -> Result<u16, Dm9000Error> {
        self.bus.write(EPAR, u16::from(offset | EPAR_PHY));
        self.bus
            .write(EPCR, u16::from(EPCR_EPOS | EPCR_ERPRR));
        self.poll_clear(EPCR, EPCR_ERRE, PHY_ATTEMPTS, PHY_DELAY_US, "PHY read")?;
        self.bus.write(EPCR, u16::from(EPCR_EPOS));
        self.bus.delay_us(5);
        let high = self.bus.read(EPDRH) & 0xff;
        let low = self.bus.read(EPDRL) & 0xff;
        Ok((high << 8) | low)
    }

    /// Resets the PHY and waits for its reset bit to self-clear.
    pub fn phy_reset(&mut self) -> Result<(), Dm9000Error> {
        self.phy_write(PHY_BMCR, BMCR_RST)?;
        for _ in 0..PHY_ATTEMPTS {
            if self.phy_read(PHY_BMCR)? & BMCR_RST == 0 {
                return Ok(());
            }
            self.bus.delay_us(PHY_DELAY_US);
        }
        Err(Dm9000Error::Timeout { op: "PHY reset" })
    }

    /// Full bring-up sequence: power, resets, auto-negotiation, address filters, receiver.
    ///
    /// The receive interrupt flag is unmasked even though nothing is wired to the interrupt
    /// line; reception is still driven by polling [`Dm9000::receive`].
    pub fn init(&mut self) -> Result<(), Dm9000Error> {
        self.power_up();
        debug!("power up done");
        self.reset()?;
        debug!("reset done");
        self.phy_reset()?;
        debug!("PHY reset done");

        self.phy_write(PHY_ANAR, ANAR_DEFAULT)?;
        self.phy_write(PHY_BMCR, BMCR_AUTONEG)?;

        let mac = self.mac;
        for (i, byte) in mac.iter().enumerate() {
            self.bus.write(PAR0 + i as u8, u16::from(*byte));
        }
        for i in 0..8 {
            self.bus.write(MAR0 + i, 0x00);
        }
        // Accept broadcast.
        self.bus.write(MAR7, u16::from(MAR7_BROADCAST));

        // SRAM pointer auto-return, then clear latched status before unmasking RX.
        self.bus.write(IMR, u16::from(IMR_PAR));
        self.bus
            .write(NSR, u16::from(NSR_WAKEST | NSR_TX2END | NSR_TX1END));
        self.bus.write(
            ISR,
            u16::from(ISR_UDRUN | ISR_ROO | ISR_ROS | ISR_PT | ISR_PR),
        );
        self.bus.write(IMR, u16::from(IMR_PAR | IMR_PRI));

        // Receiver on, dropping over-length and bad-CRC frames in hardware.
        self.bus
            .write(RCR, u16::from(RCR_DIS_LONG | RCR_DIS_CRC | RCR_RXEN));
        // Hardware IP header checksum on transmit.
        self.bus.write(TCSCR, u16::from(TCSCR_IPCSE));
        debug!(mac = ?self.mac, "DM9000 initialized");
        Ok(())
    }

    pub fn check_link(&mut self) -> bool {
        self.reg_read(NSR) & NSR_LINKST != 0
    }

    pub fn check_speed(&mut self) -> LinkSpeed {
        if self.reg_read(NSR) & NSR_SPEED == 0 {
            LinkSpeed::Mbps100
        } else {
            LinkSpeed::Mbps10
        }
    }

    pub fn check_duplex(&mut self) -> Duplex {
        if self.reg_read(NCR) & NCR_FDX != 0 {
            Duplex::Full
        } else {
            Duplex::Half
        }
    }

    pub fn io_mode(&mut self) -> IoMode {
        if self.reg_read(ISR) & ISR_IOMODE != 0 {
            IoMode::Bits8
        } else {
            IoMode::Bits16
        }
    }

    /// Snapshot of the registers worth eyeballing when debugging bring-up.
    pub fn device_info(&mut self) -> DeviceInfo {
        let mut mac = [0u8; 6];
        for (i, byte) in mac.iter_mut().enumerate() {
            *byte = self.reg_read(PAR0 + i as u8);
        }
        let mut multicast = [0u8; 8];
        for (i, byte) in multicast.iter_mut().enumerate() {
            *byte = self.reg_read(MAR0 + i as u8);
        }
        DeviceInfo {
            mac,
            multicast,
            nsr: self.reg_read(NSR),
            ncr: self.reg_read(NCR),
            imr: self.reg_read(IMR),
            bptr: self.reg_read(BPTR),
            fctr: self.reg_read(FCTR),
            fcr: self.reg_read(FCR),
            smcr: self.reg_read(SMCR),
            gpr: self.reg_read(GPR),
            vendor_id: u16::from(self.reg_read(VIDH)) << 8 | u16::from(self.reg_read(VIDL)),
            product_id: u16::from(self.reg_read(PIDH)) << 8 | u16::from(self.reg_read(PIDL)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub mac: [u8; 6],
    pub multicast: [u8; 8],
    pub nsr: u8,
    pub ncr: u8,
    pub imr: u8,
    pub bptr: u8,
    pub fctr: u8,
    pub fcr: u8,
    pub smcr: u8,
    pub gpr: u8,
    pub vendor_id: u16,
    pub product_id: u16,
}

impl DeviceInfo {
    pub fn link_up(&self) -> bool {
        self.nsr & NSR_LINKST != 0
    }
}

impl fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "---------- Device info ----------")?;
        write!(f, "MAC       :")?;
        for byte in self.mac {
            write!(f, " {byte:02x}")?;
        }
        writeln!(f)?;
        write!(f, "Multicast :")?;
        for byte in self.multicast {
            write!(f, " {byte:02x}")?;
        }
        writeln!(f)?;
        writeln!(f, "NSR       : {:02x} (link {})", self.nsr, self.link_up() as u8)?;
        writeln!(f, "NCR       : {:02x}", self.ncr)?;
        writeln!(f, "IMR       : {:02x}", self.imr)?;
        writeln!(f, "BPTR      : {:02x}", self.bptr)?;
        writeln!(f, "FCTR      : {:02x}", self.fctr)?;
        writeln!(f, "FCR       : {:02x}", self.fcr)?;
        writeln!(f, "SMCR      : {:02x}", self.smcr)?;
        writeln!(f, "GPR       : {:02x}", self.gpr)?;
        write!(f, "ID        : {:04x}:{:04x}", self.vendor_id, self.product_id)
    }
}
