//! DM9000 register map and bit definitions.
//!
//! Offsets and bit positions follow the Davicom DM9000 datasheet and must stay bit-for-bit
//! compatible with the hardware; they are shared by the driver and the register-file simulator.

/// Network Control Register.
pub const NCR: u8 = 0x00;
pub const NCR_RST: u8 = 0x01;
pub const NCR_FDX: u8 = 0x08;

/// Network Status Register.
pub const NSR: u8 = 0x01;
pub const NSR_TX1END: u8 = 0x04;
pub const NSR_TX2END: u8 = 0x08;
pub const NSR_WAKEST: u8 = 0x20;
pub const NSR_LINKST: u8 = 0x40;
pub const NSR_SPEED: u8 = 0x80;

/// TX Control Register.
pub const TCR: u8 = 0x02;
pub const TCR_TXREQ: u8 = 0x01;

/// TX Status Register for packet I (mirrors the datasheet's TSR I/II pair; the driver only
/// queues one packet at a time, so TSR1 is the one that matters).
pub const TSR1: u8 = 0x03;
pub const TSR2: u8 = 0x04;
pub const TSR_EC: u8 = 0x04;
pub const TSR_COL: u8 = 0x08;
pub const TSR_LC: u8 = 0x10;
pub const TSR_NC: u8 = 0x20;
pub const TSR_LOC: u8 = 0x40;
pub const TSR_TJTO: u8 = 0x80;
/// Any of: excessive collision, collision, late collision, no carrier, loss of carrier,
/// TX jabber timeout.
pub const TSR_ERR_MASK: u8 = 0xfc;

/// RX Control Register.
pub const RCR: u8 = 0x05;
pub const RCR_RXEN: u8 = 0x01;
pub const RCR_DIS_CRC: u8 = 0x10;
pub const RCR_DIS_LONG: u8 = 0x20;

/// RX Status Register bits, as they appear in the per-packet status byte prepended to each
/// received frame in the RX SRAM.
pub const RSR_FOE: u8 = 0x01;
pub const RSR_CE: u8 = 0x02;
pub const RSR_AE: u8 = 0x04;
pub const RSR_PLE: u8 = 0x08;
pub const RSR_RWTO: u8 = 0x10;
pub const RSR_LCS: u8 = 0x20;
pub const RSR_ERR_MASK: u8 = RSR_FOE | RSR_CE | RSR_AE | RSR_PLE | RSR_RWTO | RSR_LCS;

/// Back Pressure Threshold / Flow Control registers (status dump only).
pub const BPTR: u8 = 0x08;
pub const FCTR: u8 = 0x09;
pub const FCR: u8 = 0x0a;

/// EEPROM & PHY Control/Address/Data registers (indirect PHY access).
pub const EPCR: u8 = 0x0b;
pub const EPCR_ERRE: u8 = 0x01;
pub const EPCR_ERPRW: u8 = 0x02;
pub const EPCR_ERPRR: u8 = 0x04;
pub const EPCR_EPOS: u8 = 0x08;
pub const EPAR: u8 = 0x0c;
/// PHY address 1 in EPAR[7:6]; or-ed with the PHY register offset.
pub const EPAR_PHY: u8 = 0x40;
pub const EPDRL: u8 = 0x0d;
pub const EPDRH: u8 = 0x0e;

/// Physical Address (MAC) registers, PAR0..PAR5.
pub const PAR0: u8 = 0x10;
/// Multicast Address (hash table) registers, MAR0..MAR7.
pub const MAR0: u8 = 0x16;
pub const MAR7: u8 = 0x1d;
/// MAR7 bit 7 accepts broadcast frames.
pub const MAR7_BROADCAST: u8 = 0x80;

/// General Purpose Register; bit 0 powers down the PHY.
pub const GPR: u8 = 0x1f;

/// TX Read Pointer Address (status dump only).
pub const TRPAL: u8 = 0x22;
pub const TRPAH: u8 = 0x23;

/// Vendor/Product ID registers; the DM9000 reads back 0x0a46 / 0x9000.
pub const VIDL: u8 = 0x28;
pub const VIDH: u8 = 0x29;
pub const PIDL: u8 = 0x2a;
pub const PIDH: u8 = 0x2b;

/// Special Mode Control Register (status dump only).
pub const SMCR: u8 = 0x2f;

/// Transmit Check Sum Control Register.
pub const TCSCR: u8 = 0x31;
pub const TCSCR_IPCSE: u8 = 0x01;

/// Memory Read Command (address register untouched — "peek" variants) and
/// Memory Read Command with pointer auto-increment.
pub const MRCMDX: u8 = 0xf0;
pub const MRCMDX1: u8 = 0xf1;
pub const MRCMD: u8 = 0xf2;

/// Memory Write Command with pointer auto-increment.
pub const MWCMD: u8 = 0xf8;
/// Memory Write address pointer (status dump only).
pub const MWRL: u8 = 0xfa;
pub const MWRH: u8 = 0xfb;

/// TX Packet Length registers.
pub const TXPLL: u8 = 0xfc;
pub const TXPLH: u8 = 0xfd;

/// Interrupt Status Register. Latched; write 1 to clear.
pub const ISR: u8 = 0xfe;
pub const ISR_PR: u8 = 0x01;
pub const ISR_PT: u8 = 0x02;
pub const ISR_ROS: u8 = 0x04;
pub const ISR_ROO: u8 = 0x08;
pub const ISR_UDRUN: u8 = 0x10;
/// Bus width strap readback: set = 8-bit mode, clear = 16-bit mode.
pub const ISR_IOMODE: u8 = 0x80;

/// Interrupt Mask Register.
pub const IMR: u8 = 0xff;
/// Packet Received interrupt enable.
pub const IMR_PRI: u8 = 0x01;
/// Packet Transmitted interrupt enable.
pub const IMR_PTI: u8 = 0x02;
/// SRAM read/write pointer auto-return.
pub const IMR_PAR: u8 = 0x80;

/// PHY registers reached through EPCR/EPAR/EPDRx.
pub const PHY_BMCR: u8 = 0x00;
pub const PHY_BMSR: u8 = 0x01;
pub const PHY_ANAR: u8 = 0x04;
pub const BMCR_RST: u16 = 0x8000;
/// Auto-negotiation: advertise 10/100 half/full + 802.3, then restart-autoneg + enable.
pub const ANAR_DEFAULT: u16 = 0x01e1 | 0x0400;
pub const BMCR_AUTONEG: u16 = 0x1200;
