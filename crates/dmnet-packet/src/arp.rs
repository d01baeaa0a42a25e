use core::net::Ipv4Addr;

use super::{ensure_len, ensure_out_buf_len, MacAddr, PacketError};

pub const ARP_OP_REQUEST: u16 = 1;
pub const ARP_OP_REPLY: u16 = 2;

const HTYPE_ETHERNET: u16 = 1;
const PTYPE_IPV4: u16 = 0x0800;

/// Ethernet/IPv4 ARP packet (fixed 28-byte body).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ArpPacket {
    pub op: u16,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

impl ArpPacket {
    pub const LEN: usize = 28;

    pub fn parse(buf: &[u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::LEN)?;
        let htype = u16::from_be_bytes([buf[0], buf[1]]);
        let ptype = u16::from_be_bytes([buf[2], buf[3]]);
        if htype != HTYPE_ETHERNET || ptype != PTYPE_IPV4 || buf[4] != 6 || buf[5] != 4 {
            return Err(PacketError::Malformed("not an Ethernet/IPv4 ARP packet"));
        }
        Ok(Self {
            op: u16::from_be_bytes([buf[6], buf[7]]),
            sender_mac: MacAddr(buf[8..14].try_into().unwrap()),
            sender_ip: Ipv4Addr::new(buf[14], buf[15], buf[16], buf[17]),
            target_mac: MacAddr(buf[18..24].try_into().unwrap()),
            target_ip: Ipv4Addr::new(buf[24], buf[25], buf[26], buf[27]),
        })
    }

    pub fn write(&self, out: &mut [u8]) -> Result<usize, PacketError> {
        ensure_out_buf_len(out, Self::LEN)?;
        out[0..2].copy_from_slice(&HTYPE_ETHERNET.to_be_bytes());
        out[2..4].copy_from_slice(&PTYPE_IPV4.to_be_bytes());
        out[4] = 6;
        out[5] = 4;
        out[6..8].copy_from_slice(&self.op.to_be_bytes());
        out[8..14].copy_from_slice(&self.sender_mac.0);
        out[14..18].copy_from_slice(&self.sender_ip.octets());
        out[18..24].copy_from_slice(&self.target_mac.0);
        out[24..28].copy_from_slice(&self.target_ip.octets());
        Ok(Self::LEN)
    }

    pub fn build_vec(&self) -> Vec<u8> {
        let mut out = vec![0u8; Self::LEN];
        self.write(&mut out).expect("sized above");
        out
    }
}
