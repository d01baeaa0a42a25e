//! Wire formats for the DM9000 network stack.
//!
//! Parsing borrows the input buffer (`EthernetFrame<'a>`, `TcpSegment<'a>`); builders write into a
//! caller-provided output buffer so frames can be composed directly in a fixed transmit buffer,
//! with `build_vec` conveniences on top.
#![forbid(unsafe_code)]

pub mod arp;
pub mod checksum;
pub mod ethernet;
pub mod ipv4;
pub mod tcp;

pub use ethernet::MacAddr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketError {
    /// The input buffer ended before the structure did.
    Truncated,
    /// The structure is self-inconsistent (bad version, impossible length field, ...).
    Malformed(&'static str),
    /// The output buffer is too small for the structure being built.
    OutBufTooSmall { need: usize, got: usize },
}

impl core::fmt::Display for PacketError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PacketError::Truncated => write!(f, "truncated packet"),
            PacketError::Malformed(what) => write!(f, "malformed packet: {what}"),
            PacketError::OutBufTooSmall { need, got } => {
                write!(f, "output buffer too small: need {need} bytes, got {got}")
            }
        }
    }
}

impl std::error::Error for PacketError {}

pub(crate) fn ensure_len(data: &[u8], len: usize) -> Result<(), PacketError> {
    if data.len() < len {
        return Err(PacketError::Truncated);
    }
    Ok(())
}

pub(crate) fn ensure_out_buf_len(out: &[u8], len: usize) -> Result<(), PacketError> {
    if out.len() < len {
        return Err(PacketError::OutBufTooSmall {
            need: len,
            got: out.len(),
        });
    }
    Ok(())
}
