//! Answers ARP requests for our address so the peer can find us; nothing more.

use core::net::Ipv4Addr;

use tracing::debug;

use dmnet_packet::arp::{ArpPacket, ARP_OP_REPLY, ARP_OP_REQUEST};
use dmnet_packet::ethernet::{EthernetFrameBuilder, ETHERTYPE_ARP};
use dmnet_packet::MacAddr;

pub struct ArpResponder {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
}

impl ArpResponder {
    pub fn new(mac: MacAddr, ip: Ipv4Addr) -> Self {
        Self { mac, ip }
    }

    /// Handles one inbound ARP payload (the Ethernet payload, header already stripped).
    /// Returns the reply frame for a request targeting our IP; everything else is ignored.
    pub fn handle(&self, payload: &[u8]) -> Option<Vec<u8>> {
        let req = ArpPacket::parse(payload).ok()?;
        if req.op != ARP_OP_REQUEST || req.target_ip != self.ip {
            return None;
        }
        debug!(from = %req.sender_ip, "answering ARP request");
        let reply = ArpPacket {
            op: ARP_OP_REPLY,
            sender_mac: self.mac,
            sender_ip: self.ip,
            target_mac: req.sender_mac,
            target_ip: req.sender_ip,
        };
        Some(
            EthernetFrameBuilder {
                dst: req.sender_mac,
                src: self.mac,
                ethertype: ETHERTYPE_ARP,
                payload: &reply.build_vec(),
            }
            .build_vec(),
        )
    }
}
