use core::net::Ipv4Addr;

use super::{checksum, ensure_len, ensure_out_buf_len, PacketError};

pub const IPPROTO_ICMP: u8 = 1;
pub const IPPROTO_TCP: u8 = 6;
pub const IPPROTO_UDP: u8 = 17;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ipv4Packet<'a> {
    pub total_len: u16,
    pub identification: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub header_checksum: u16,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub payload: &'a [u8],
}

impl<'a> Ipv4Packet<'a> {
    pub const MIN_HEADER_LEN: usize = 20;

    pub fn parse(buf: &'a [u8]) -> Result<Self, PacketError> {
        ensure_len(buf, Self::MIN_HEADER_LEN)?;
        let version = buf[0] >> 4;
        let ihl = (buf[0] & 0x0f) as usize;
        if version != 4 || ihl < 5 {
            return Err(PacketError::Malformed("not an IPv4 header"));
        }
        let header_len = ihl * 4;
        ensure_len(buf, header_len)?;
        let total_len = u16::from_be_bytes([buf[2], buf[3]]) as usize;
        if total_len < header_len || buf.len() < total_len {
            return Err(PacketError::Truncated);
        }
        Ok(Self {
            total_len: total_len as u16,
            identification: u16::from_be_bytes([buf[4], buf[5]]),
            ttl: buf[8],
            protocol: buf[9],
            header_checksum: u16::from_be_bytes([buf[10], buf[11]]),
            src: Ipv4Addr::new(buf[12], buf[13], buf[14], buf[15]),
            dst: Ipv4Addr::new(buf[16], buf[17], buf[18], buf[19]),
            payload: &buf[header_len..total_len],
        })
    }

    pub fn header_checksum_valid(buf: &[u8]) -> bool {
        let ihl = (buf.first().copied().unwrap_or(0) & 0x0f) as usize * 4;
        ihl >= Self::MIN_HEADER_LEN
            && buf.len() >= ihl
            && checksum::ipv4_header_checksum(&buf[..ihl]) == 0
    }
}

/// Populates a 20-byte IPv4 header ahead of an already-written transport payload.
///
/// This is the "IP collaborator" seam: the TCP layer writes its segment at offset
/// [`Ipv4Packet::MIN_HEADER_LEN`] of the buffer handed to [`Ipv4PacketBuilder::write`], and the
/// builder fills in the header (including its checksum) in front of it.
pub struct Ipv4PacketBuilder {
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
    pub protocol: u8,
    pub identification: u16,
    pub ttl: u8,
    pub payload_len: usize,
}

impl Ipv4PacketBuilder {
    pub fn len(&self) -> usize {
        Ipv4Packet::MIN_HEADER_LEN + self.payload_len
    }

    /// Writes the header into `out[..20]`; the payload is expected at `out[20..20 + payload_len]`.
    /// Returns the total packet length.
    pub fn write(&self, out: &mut [u8]) -> Result<usize, PacketError> {
        let total_len = self.len();
        if total_len > u16::MAX as usize {
            return Err(PacketError::Malformed("IPv4 payload too large"));
        }
        ensure_out_buf_len(out, total_len)?;
        out[0] = (4 << 4) | 5; // version + IHL
        out[1] = 0; // DSCP/ECN
        out[2..4].copy_from_slice(&(total_len as u16).to_be_bytes());
        out[4..6].copy_from_slice(&self.identification.to_be_bytes());
        out[6..8].copy_from_slice(&0x4000u16.to_be_bytes()); // DF
        out[8] = self.ttl;
        out[9] = self.protocol;
        out[10..12].copy_from_slice(&0u16.to_be_bytes());
        out[12..16].copy_from_slice(&self.src.octets());
        out[16..20].copy_from_slice(&self.dst.octets());
        let csum = checksum::ipv4_header_checksum(&out[..Ipv4Packet::MIN_HEADER_LEN]);
        out[10..12].copy_from_slice(&csum.to_be_bytes());
        Ok(total_len)
    }

    /// Convenience for callers that already hold the payload as a slice.
    pub fn build_vec(&self, payload: &[u8]) -> Result<Vec<u8>, PacketError> {
        debug_assert_eq!(payload.len(), self.payload_len);
        let mut out = vec![0u8; self.len()];
        out[Ipv4Packet::MIN_HEADER_LEN..].copy_from_slice(payload);
        self.write(&mut out)?;
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_and_parse_roundtrip() {
        let src = Ipv4Addr::new(10, 0, 0, 1);
        let dst = Ipv4Addr::new(10, 0, 0, 2);
        let pkt = Ipv4PacketBuilder {
            src,
            dst,
            protocol: IPPROTO_TCP,
            identification: 7,
            ttl: 64,
            payload_len: 4,
        }
        .build_vec(&[0xde, 0xad, 0xbe, 0xef])
        .unwrap();

        assert!(Ipv4Packet::header_checksum_valid(&pkt));
        let parsed = Ipv4Packet::parse(&pkt).unwrap();
        assert_eq!(parsed.src, src);
        assert_eq!(parsed.dst, dst);
        assert_eq!(parsed.protocol, IPPROTO_TCP);
        assert_eq!(parsed.total_len, 24);
        assert_eq!(parsed.payload, &[0xde, 0xad, 0xbe, 0xef]);
    }

    #[test]
    fn total_len_shorter_than_buffer_trims_payload() {
        let pkt = Ipv4PacketBuilder {
            src: Ipv4Addr::new(1, 1, 1, 1),
            dst: Ipv4Addr::new(2, 2, 2, 2),
            protocol: IPPROTO_UDP,
            identification: 0,
            ttl: 64,
            payload_len: 2,
        }
        .build_vec(&[9, 9])
        .unwrap();

        // Ethernet frames are padded to a 60-byte minimum on the wire; the parser must honor
        // total_len, not the buffer length.
        let mut padded = pkt.clone();
        padded.extend_from_slice(&[0u8; 16]);
        let parsed = Ipv4Packet::parse(&padded).unwrap();
        assert_eq!(parsed.payload, &[9, 9]);
    }

    #[test]
    fn rejects_non_ipv4() {
        let mut buf = [0u8; 20];
        buf[0] = (6 << 4) | 5;
        assert!(matches!(
            Ipv4Packet::parse(&buf),
            Err(PacketError::Malformed(_))
        ));
    }
}
