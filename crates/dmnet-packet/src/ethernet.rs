use core::fmt;
use core::str::FromStr;

use super::{ensure_len, ensure_out_buf_len, PacketError};

pub const ETHERTYPE_IPV4: u16 = 0x0800;
pub const ETHERTYPE_ARP: u16 = 0x0806;

#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    pub const BROADCAST: Self = Self([0xff; 6]);

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

impl FromStr for MacAddr {
    type Err = PacketError;

    /// Parses `aa:bb:cc:dd:ee:ff` (also accepts `-` separators).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut octets = [0u8; 6];
        let mut parts = s.split(|c| c == ':' || c == '-');
        for octet in octets.iter_mut() {
            let part = parts.next().ok_or(PacketError::Malformed("short MAC"))?;
            *octet =
                u8::from_str_radix(part, 16).map_err(|_| PacketError::Malformed("bad MAC octet"))?;
        }
        if parts.next().is_some() {
            return Err(PacketError::Malformed("long MAC"));
        }
        Ok(MacAddr(octets))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: &'a [u8],
}

impl<'a> EthernetFrame<'a> {
    pub const HEADER_LEN: usize = 14;

    pub fn parse(buf: &'a [u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::HEADER_LEN)?;
        Ok(Self {
            dst: MacAddr(buf[0..6].try_into().unwrap()),
            src: MacAddr(buf[6..12].try_into().unwrap()),
            ethertype: u16::from_be_bytes([buf[12], buf[13]]),
            payload: &buf[Self::HEADER_LEN..],
        })
    }
}

pub struct EthernetFrameBuilder<'a> {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ethertype: u16,
    pub payload: &'a [u8],
}

impl EthernetFrameBuilder<'_> {
    pub fn len(&self) -> usize {
        EthernetFrame::HEADER_LEN + self.payload.len()
    }

    pub fn write(&self, out: &mut [u8]) -> Result<usize, PacketError> {
        let len = self.len();
        ensure_out_buf_len(out, len)?;
        out[0..6].copy_from_slice(&self.dst.0);
        out[6..12].copy_from_slice(&self.src.0);
        out[12..14].copy_from_slice(&self.ethertype.to_be_bytes());
        out[EthernetFrame::HEADER_LEN..len].copy_from_slice(self.payload);
        Ok(len)
    }

    pub fn build_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; self.len()];
        let written = self.write(&mut out).expect("sized above");
        debug_assert_eq!(written, out.len());
        out
    }
}
