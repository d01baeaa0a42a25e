//! Single-connection TCP client state machine.
//!
//! Frames in, [`Action`]s out: [`TcpClient::handle_frame`] consumes one inbound Ethernet frame
//! and returns the frames to transmit plus any delivered payload notification. The client never
//! touches hardware itself; the pump owns the NIC and the polling cadence.

use core::net::Ipv4Addr;

use tracing::{debug, warn};

use dmnet_packet::ethernet::{EthernetFrame, EthernetFrameBuilder, ETHERTYPE_IPV4};
use dmnet_packet::ipv4::{Ipv4Packet, Ipv4PacketBuilder, IPPROTO_TCP};
use dmnet_packet::tcp::{TcpFlags, TcpSegment, TcpSegmentBuilder};
use dmnet_packet::MacAddr;

/// Sequence number a locally-initiated connection starts from.
pub const INITIAL_SEQ: u32 = 1001;
/// Advertised receive window, fixed; there is no real flow control behind it.
pub const WINDOW_SIZE: u16 = 1000;
/// Poll cycles without an accepted segment before a non-closed connection is reset.
pub const IDLE_TIMEOUT_CYCLES: u32 = 30;

const DEFAULT_REQUEST: &[u8] =
    b"GET / HTTP/1.0\r\nHost: local_host\r\nUser-Agent: thu_mips\r\n\r\n";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
    Closed,
    SynSent,
    SynReceived,
    Established,
    FinSent,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub mac: MacAddr,
    pub ip: Ipv4Addr,
    pub local_port: u16,
    pub window_size: u16,
    pub initial_seq: u32,
    pub idle_timeout_cycles: u32,
    /// Capacity of the application receive buffer.
    pub recv_capacity: usize,
    /// Sent exactly once, when the handshake we initiated completes.
    pub request: Vec<u8>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            mac: MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]),
            ip: Ipv4Addr::new(192, 168, 1, 2),
            local_port: 8080,
            window_size: WINDOW_SIZE,
            initial_seq: INITIAL_SEQ,
            idle_timeout_cycles: IDLE_TIMEOUT_CYCLES,
            recv_capacity: 724,
            request: DEFAULT_REQUEST.to_vec(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// An Ethernet frame to hand to the NIC.
    EmitFrame(Vec<u8>),
    /// Application payload was appended to the receive buffer.
    Delivered { len: usize },
}

/// The one connection record. Created in `Closed`; returns to `Closed` on RST, idle timeout,
/// or the close path. All buffers are fixed-capacity and reused across connections.
pub struct TcpClient {
    cfg: ClientConfig,
    state: TcpState,

    remote_mac: MacAddr,
    remote_ip: Ipv4Addr,
    remote_port: u16,

    /// Next sequence number to send.
    snd_nxt: u32,
    /// Next sequence number expected from the peer (our ACK value).
    rcv_nxt: u32,

    idle_cycles: u32,
    ip_ident: u16,

    recv_buf: Vec<u8>,
}

impl TcpClient {
    pub fn new(cfg: ClientConfig) -> Self {
        let initial_seq = cfg.initial_seq;
        let recv_capacity = cfg.recv_capacity;
        Self {
            cfg,
            state: TcpState::Closed,
            remote_mac: MacAddr::BROADCAST,
            remote_ip: Ipv4Addr::UNSPECIFIED,
            remote_port: 0,
            snd_nxt: initial_seq,
            rcv_nxt: 0,
            idle_cycles: 0,
            ip_ident: 0,
            recv_buf: Vec::with_capacity(recv_capacity),
        }
    }

    pub fn state(&self) -> TcpState {
        self.state
    }

    /// Payload accumulated across PSH segments on the current connection.
    pub fn received(&self) -> &[u8] {
        &self.recv_buf
    }

    pub fn take_received(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.recv_buf)
    }

    /// Initiates the three-way handshake. No-op unless the connection is `Closed`.
    pub fn open(
        &mut self,
        remote_mac: MacAddr,
        remote_ip: Ipv4Addr,
        remote_port: u16,
    ) -> Vec<Action> {
        if self.state != TcpState::Closed {
            return Vec::new();
        }
        debug!(%remote_ip, remote_port, "TCP handshake initiated");
        self.remote_mac = remote_mac;
        self.remote_ip = remote_ip;
        self.remote_port = remote_port;
        self.snd_nxt = self.cfg.initial_seq;
        self.rcv_nxt = 0;
        self.idle_cycles = 0;
        self.recv_buf.clear();
        self.state = TcpState::SynSent;
        vec![self.send_segment(TcpFlags::SYN, &[])]
    }

    /// Sends FIN and waits (in `FinSent`) for any peer response before resetting.
    pub fn close(&mut self) -> Vec<Action> {
        if self.state != TcpState::Established {
            return Vec::new();
        }
        self.state = TcpState::FinSent;
        vec![self.send_segment(TcpFlags::FIN | TcpFlags::ACK, &[])]
    }

    /// One poll cycle elapsed. Called by the pump on every poll, whether or not a frame
    /// arrived; only a segment the client accepts resets the counter.
    ///
    /// A non-closed connection that sees no matching traffic for the configured number of
    /// cycles is reset to `Closed` with no segment sent; that reset is the designed recovery
    /// path, not an error.
    pub fn tick_idle(&mut self) {
        if self.state == TcpState::Closed {
            self.idle_cycles = 0;
            return;
        }
        self.idle_cycles += 1;
        if self.idle_cycles >= self.cfg.idle_timeout_cycles {
            warn!(state = ?self.state, "TCP idle timeout, resetting connection");
            self.idle_cycles = 0;
            self.state = TcpState::Closed;
        }
    }

    /// Dispatches one inbound Ethernet frame. Non-IPv4, non-TCP, malformed, and foreign frames
    /// are dropped without any state change.
    pub fn handle_frame(&mut self, frame: &[u8]) -> Vec<Action> {
        let Ok(eth) = EthernetFrame::parse(frame) else {
            return Vec::new();
        };
        if eth.ethertype != ETHERTYPE_IPV4 {
            return Vec::new();
        }
        let Ok(ip) = Ipv4Packet::parse(eth.payload) else {
            return Vec::new();
        };
        if ip.protocol != IPPROTO_TCP {
            return Vec::new();
        }
        let Ok(segment) = TcpSegment::parse(ip.payload) else {
            return Vec::new();
        };
        self.handle_segment(eth.src, ip.src, ip.dst, &segment)
    }

    /// The connection transition function, one event at a time.
    pub fn handle_segment(
        &mut self,
        peer_mac: MacAddr,
        src_ip: Ipv4Addr,
        dst_ip: Ipv4Addr,
        segment: &TcpSegment<'_>,
    ) -> Vec<Action> {
        let flags = segment.flags();

        // Passive open: an inbound SYN while closed adopts the sender as our peer, but only
        // when it is actually addressed to us — replies always source from our local identity,
        // so a SYN to another port must not be answered from this one.
        if flags.contains(TcpFlags::SYN)
            && self.state == TcpState::Closed
            && segment.dst_port() == self.cfg.local_port
            && dst_ip == self.cfg.ip
        {
            self.remote_mac = peer_mac;
            self.remote_ip = src_ip;
            self.remote_port = segment.src_port();
            self.rcv_nxt = segment.seq_number().wrapping_add(1);
            self.snd_nxt = self.cfg.initial_seq;
            self.idle_cycles = 0;
            self.recv_buf.clear();
            self.state = TcpState::SynReceived;
            debug!(peer = %src_ip, port = self.remote_port, "inbound SYN, sending SYN+ACK");
            return vec![self.send_segment(TcpFlags::SYN | TcpFlags::ACK, &[])];
        }

        // Identity filter: anything not matching the recorded quadruple is ignored.
        if self.state == TcpState::Closed
            || segment.dst_port() != self.cfg.local_port
            || segment.src_port() != self.remote_port
            || dst_ip != self.cfg.ip
            || src_ip != self.remote_ip
        {
            return Vec::new();
        }
        self.idle_cycles = 0;

        if flags.contains(TcpFlags::SYN)
            && flags.contains(TcpFlags::ACK)
            && self.state == TcpState::SynSent
        {
            // Active open completing: adopt the peer's ACK as our send sequence.
            self.snd_nxt = segment.ack_number();
            self.rcv_nxt = segment.seq_number().wrapping_add(1);
            self.state = TcpState::Established;
            debug!("TCP handshake complete");
            let ack = self.send_segment(TcpFlags::ACK, &[]);
            let request = self.cfg.request.clone();
            let push = self.send_segment(TcpFlags::PSH, &request);
            return vec![ack, push];
        }

        if flags.contains(TcpFlags::RST) {
            debug!(state = ?self.state, "inbound RST, connection closed");
            self.state = TcpState::Closed;
            return Vec::new();
        }

        if self.state == TcpState::FinSent {
            // Our FIN was answered with something; finish with a hard reset.
            self.snd_nxt = segment.ack_number();
            let rst = self.send_segment(TcpFlags::RST, &[]);
            self.state = TcpState::Closed;
            return vec![rst];
        }

        if self.state == TcpState::SynReceived && flags.contains(TcpFlags::ACK) {
            self.snd_nxt = segment.ack_number();
            self.rcv_nxt = segment.seq_number().wrapping_add(1);
            self.state = TcpState::Established;
            return Vec::new();
        }

        if self.state == TcpState::Established && flags.contains(TcpFlags::PSH) {
            let payload = segment.payload();
            if self.recv_buf.len() + payload.len() > self.cfg.recv_capacity {
                // Dropped without an ACK; the peer will retransmit.
                warn!(
                    have = self.recv_buf.len(),
                    incoming = payload.len(),
                    capacity = self.cfg.recv_capacity,
                    "receive buffer overflow, dropping segment"
                );
                return Vec::new();
            }
            // Note: segments are not deduplicated by sequence number, so a retransmitted PSH
            // appends its payload a second time.
            self.recv_buf.extend_from_slice(payload);
            self.rcv_nxt = segment.seq_number().wrapping_add(payload.len() as u32);
            let ack = self.send_segment(TcpFlags::ACK, &[]);
            return vec![
                Action::Delivered {
                    len: payload.len(),
                },
                ack,
            ];
        }

        Vec::new()
    }

    /// The only path that produces TCP traffic: TCP segment, then the IPv4 header in front of
    /// it, then the Ethernet header, emitted as one frame.
    fn send_segment(&mut self, flags: TcpFlags, payload: &[u8]) -> Action {
        let tcp = TcpSegmentBuilder {
            src_port: self.cfg.local_port,
            dst_port: self.remote_port,
            seq_number: self.snd_nxt,
            ack_number: self.rcv_nxt,
            flags,
            window_size: self.cfg.window_size,
            payload,
        };
        let segment = tcp.build_vec(self.cfg.ip, self.remote_ip);

        self.ip_ident = self.ip_ident.wrapping_add(1);
        let ip = Ipv4PacketBuilder {
            src: self.cfg.ip,
            dst: self.remote_ip,
            protocol: IPPROTO_TCP,
            identification: self.ip_ident,
            ttl: 64,
            payload_len: segment.len(),
        };
        let packet = ip.build_vec(&segment).expect("segment fits an IPv4 packet");

        let frame = EthernetFrameBuilder {
            dst: self.remote_mac,
            src: self.cfg.mac,
            ethertype: ETHERTYPE_IPV4,
            payload: &packet,
        }
        .build_vec();
        Action::EmitFrame(frame)
    }
}
