//! The receive-and-dispatch loop that ties the NIC to the protocol handlers.

use std::time::Duration;

use tracing::{debug, warn};

use dmnet_backend::FrameIo;
use dmnet_packet::ethernet::{EthernetFrame, ETHERTYPE_ARP, ETHERTYPE_IPV4};

use crate::arp::ArpResponder;
use crate::client::{Action, TcpClient};

#[derive(Debug, Clone)]
pub struct Pump {
    /// Consecutive empty polls before the loop gives up and returns.
    pub max_idle_polls: u32,
    /// Sleep inserted after each empty poll. Zero is fine for simulated NICs.
    pub idle_delay: Duration,
}

impl Default for Pump {
    fn default() -> Self {
        Self {
            max_idle_polls: 100,
            idle_delay: Duration::from_millis(10),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PumpStats {
    pub frames_in: u64,
    pub frames_out: u64,
    pub delivered_bytes: u64,
    pub idle_polls: u64,
}

/// Transmits every `EmitFrame` in `actions`; a NIC-level transmit failure is logged and the
/// remaining actions still go out (drop-and-continue, nothing here may abort the process).
pub fn emit<N: FrameIo>(nic: &mut N, actions: &[Action], stats: &mut PumpStats) {
    for action in actions {
        match action {
            Action::EmitFrame(frame) => match nic.transmit(frame) {
                Ok(()) => stats.frames_out += 1,
                Err(err) => warn!(%err, "transmit failed, frame lost"),
            },
            Action::Delivered { len } => stats.delivered_bytes += *len as u64,
        }
    }
}

impl Pump {
    /// Polls the NIC until `max_idle_polls` consecutive polls come back empty.
    ///
    /// Frames are dispatched by ethertype: ARP to the responder, IPv4 to the TCP client;
    /// anything else (including receive errors) is dropped and the loop continues. Every poll
    /// cycle advances the client's idle-timeout counter — foreign traffic does not keep a
    /// connection alive, only a segment the client accepts resets the countdown.
    pub fn run<N: FrameIo>(
        &self,
        nic: &mut N,
        client: &mut TcpClient,
        arp: &ArpResponder,
    ) -> PumpStats {
        let mut stats = PumpStats::default();
        let mut idle_streak = 0u32;
        loop {
            let frame = match nic.poll_receive() {
                Ok(frame) => frame,
                Err(err) => {
                    warn!(%err, "receive poll failed");
                    None
                }
            };
            client.tick_idle();
            match frame {
                Some(frame) => {
                    idle_streak = 0;
                    stats.frames_in += 1;
                    self.dispatch(nic, client, arp, &frame, &mut stats);
                }
                None => {
                    idle_streak += 1;
                    stats.idle_polls += 1;
                    if idle_streak >= self.max_idle_polls {
                        debug!(idle_streak, "no traffic, pump exiting");
                        return stats;
                    }
                    if !self.idle_delay.is_zero() {
                        std::thread::sleep(self.idle_delay);
                    }
                }
            }
        }
    }

    fn dispatch<N: FrameIo>(
        &self,
        nic: &mut N,
        client: &mut TcpClient,
        arp: &ArpResponder,
        frame: &[u8],
        stats: &mut PumpStats,
    ) {
        let Ok(eth) = EthernetFrame::parse(frame) else {
            return;
        };
        match eth.ethertype {
            ETHERTYPE_ARP => {
                if let Some(reply) = arp.handle(eth.payload) {
                    emit(nic, &[Action::EmitFrame(reply)], stats);
                }
            }
            ETHERTYPE_IPV4 => {
                let actions = client.handle_frame(frame);
                emit(nic, &actions, stats);
            }
            other => debug!(ethertype = format_args!("{other:#06x}"), "ignoring frame"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use core::net::Ipv4Addr;

    use dmnet_backend::QueueIo;
    use dmnet_packet::MacAddr;

    use crate::client::ClientConfig;

    fn pump() -> Pump {
        Pump {
            max_idle_polls: 3,
            idle_delay: Duration::ZERO,
        }
    }

    #[test]
    fn exits_after_the_idle_budget() {
        let mut io = QueueIo::new();
        let mut client = TcpClient::new(ClientConfig::default());
        let arp = ArpResponder::new(MacAddr([0x02, 0, 0, 0, 0, 1]), Ipv4Addr::new(192, 168, 1, 2));

        let stats = pump().run(&mut io, &mut client, &arp);
        assert_eq!(stats.idle_polls, 3);
        assert_eq!(stats.frames_in, 0);
    }

    #[test]
    fn unparseable_and_unknown_frames_are_ignored() {
        let mut io = QueueIo::new();
        io.push_rx(vec![0u8; 4]); // too short for an Ethernet header
        let mut frame = vec![0u8; 20];
        frame[12] = 0x86; // IPv6 ethertype
        frame[13] = 0xdd;
        io.push_rx(frame);

        let mut client = TcpClient::new(ClientConfig::default());
        let arp = ArpResponder::new(MacAddr([0x02, 0, 0, 0, 0, 1]), Ipv4Addr::new(192, 168, 1, 2));
        let stats = pump().run(&mut io, &mut client, &arp);
        assert_eq!(stats.frames_in, 2);
        assert_eq!(stats.frames_out, 0);
        assert!(io.transmitted().is_empty());
    }
}
