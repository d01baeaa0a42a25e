//! Full-loop test: simulated DM9000 under the pump, scripted peer on the other side.

use core::net::Ipv4Addr;
use std::time::Duration;

use dmnet_dm9000::sim::SimBus;
use dmnet_dm9000::Dm9000;
use dmnet_packet::arp::{ArpPacket, ARP_OP_REPLY, ARP_OP_REQUEST};
use dmnet_packet::ethernet::{EthernetFrame, EthernetFrameBuilder, ETHERTYPE_ARP, ETHERTYPE_IPV4};
use dmnet_packet::ipv4::{Ipv4Packet, Ipv4PacketBuilder, IPPROTO_TCP};
use dmnet_packet::tcp::{TcpFlags, TcpSegment, TcpSegmentBuilder};
use dmnet_packet::MacAddr;
use dmnet_stack::{pump, ArpResponder, ClientConfig, Pump, TcpClient, TcpState};

const OUR_MAC: MacAddr = MacAddr([0x02, 0x00, 0x00, 0x00, 0x00, 0x01]);
const OUR_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 2);
const OUR_PORT: u16 = 8080;
const PEER_MAC: MacAddr = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
const PEER_IP: Ipv4Addr = Ipv4Addr::new(192, 168, 1, 1);
const PEER_PORT: u16 = 80;

fn pump_cfg() -> Pump {
    Pump {
        max_idle_polls: 5,
        idle_delay: Duration::ZERO,
    }
}

fn nic() -> Dm9000<SimBus> {
    let mut nic = Dm9000::new(SimBus::new(), OUR_MAC.0);
    nic.init().unwrap();
    nic
}

fn peer_tcp_frame_to(dst_port: u16, flags: TcpFlags, seq: u32, ack: u32, payload: &[u8]) -> Vec<u8> {
    let segment = TcpSegmentBuilder {
        src_port: PEER_PORT,
        dst_port,
        seq_number: seq,
        ack_number: ack,
        flags,
        window_size: 8192,
        payload,
    }
    .build_vec(PEER_IP, OUR_IP);
    let packet = Ipv4PacketBuilder {
        src: PEER_IP,
        dst: OUR_IP,
        protocol: IPPROTO_TCP,
        identification: 1,
        ttl: 64,
        payload_len: segment.len(),
    }
    .build_vec(&segment)
    .unwrap();
    EthernetFrameBuilder {
        dst: OUR_MAC,
        src: PEER_MAC,
        ethertype: ETHERTYPE_IPV4,
        payload: &packet,
    }
    .build_vec()
}

fn peer_tcp_frame(flags: TcpFlags, seq: u32, ack: u32, payload: &[u8]) -> Vec<u8> {
    peer_tcp_frame_to(OUR_PORT, flags, seq, ack, payload)
}

fn parse_tcp(frame: &[u8]) -> (TcpFlags, u32, u32, Vec<u8>) {
    let eth = EthernetFrame::parse(frame).unwrap();
    assert_eq!(eth.ethertype, ETHERTYPE_IPV4);
    let ip = Ipv4Packet::parse(eth.payload).unwrap();
    let tcp = TcpSegment::parse(ip.payload).unwrap();
    assert!(tcp.checksum_valid_ipv4(ip.src, ip.dst));
    (
        tcp.flags(),
        tcp.seq_number(),
        tcp.ack_number(),
        tcp.payload().to_vec(),
    )
}

#[test]
fn handshake_request_response_teardown() {
    let mut nic = nic();
    let mut client = TcpClient::new(ClientConfig::default());
    let arp = ArpResponder::new(OUR_MAC, OUR_IP);
    let cfg = pump_cfg();
    let mut stats = dmnet_stack::PumpStats::default();

    // Active open: the SYN goes out through the real transmit path.
    let actions = client.open(PEER_MAC, PEER_IP, PEER_PORT);
    pump::emit(&mut nic, &actions, &mut stats);
    let sent = nic.bus_mut().take_transmitted();
    assert_eq!(sent.len(), 1);
    let (flags, seq, _, _) = parse_tcp(&sent[0]);
    assert_eq!(flags, TcpFlags::SYN);
    assert_eq!(seq, 1001);

    // Peer answers SYN+ACK; the pump should forward our ACK and the HTTP request.
    nic.bus_mut()
        .inject_frame(&peer_tcp_frame(TcpFlags::SYN | TcpFlags::ACK, 500, 1002, &[]), 0x00);
    cfg.run(&mut nic, &mut client, &arp);
    assert_eq!(client.state(), TcpState::Established);
    let sent = nic.bus_mut().take_transmitted();
    assert_eq!(sent.len(), 2);
    let (flags, _, ack, _) = parse_tcp(&sent[0]);
    assert_eq!(flags, TcpFlags::ACK);
    assert_eq!(ack, 501);
    let (flags, _, _, payload) = parse_tcp(&sent[1]);
    assert_eq!(flags, TcpFlags::PSH);
    assert!(payload.starts_with(b"GET / HTTP/1.0"));

    // Peer pushes the response body; we deliver it and ACK.
    let body = b"HTTP/1.0 200 OK\r\n\r\nhello";
    nic.bus_mut()
        .inject_frame(&peer_tcp_frame(TcpFlags::PSH | TcpFlags::ACK, 501, 1002, body), 0x00);
    let run = cfg.run(&mut nic, &mut client, &arp);
    assert_eq!(run.delivered_bytes, body.len() as u64);
    assert_eq!(client.received(), body);
    let sent = nic.bus_mut().take_transmitted();
    let (flags, _, ack, _) = parse_tcp(&sent[0]);
    assert_eq!(flags, TcpFlags::ACK);
    assert_eq!(ack, 501 + body.len() as u32);

    // Teardown: FIN out, then the peer's ACK draws the final RST.
    let actions = client.close();
    pump::emit(&mut nic, &actions, &mut stats);
    nic.bus_mut()
        .inject_frame(&peer_tcp_frame(TcpFlags::ACK, 501, 1003, &[]), 0x00);
    cfg.run(&mut nic, &mut client, &arp);
    assert_eq!(client.state(), TcpState::Closed);
    let sent = nic.bus_mut().take_transmitted();
    let (flags, _, _, _) = parse_tcp(&sent[1]);
    assert_eq!(flags, TcpFlags::RST);
}

#[test]
fn pump_answers_arp_requests() {
    let mut nic = nic();
    let mut client = TcpClient::new(ClientConfig::default());
    let arp = ArpResponder::new(OUR_MAC, OUR_IP);

    let request = EthernetFrameBuilder {
        dst: MacAddr::BROADCAST,
        src: PEER_MAC,
        ethertype: ETHERTYPE_ARP,
        payload: &ArpPacket {
            op: ARP_OP_REQUEST,
            sender_mac: PEER_MAC,
            sender_ip: PEER_IP,
            target_mac: MacAddr([0; 6]),
            target_ip: OUR_IP,
        }
        .build_vec(),
    }
    .build_vec();
    nic.bus_mut().inject_frame(&request, 0x00);

    let stats = pump_cfg().run(&mut nic, &mut client, &arp);
    assert_eq!(stats.frames_in, 1);
    assert_eq!(stats.frames_out, 1);

    let sent = nic.bus_mut().take_transmitted();
    let eth = EthernetFrame::parse(&sent[0]).unwrap();
    assert_eq!(eth.ethertype, ETHERTYPE_ARP);
    let reply = ArpPacket::parse(eth.payload).unwrap();
    assert_eq!(reply.op, ARP_OP_REPLY);
    assert_eq!(reply.sender_mac, OUR_MAC);
    assert_eq!(reply.target_ip, PEER_IP);
}

#[test]
fn pump_drives_idle_timeout_and_exits_bounded() {
    let mut nic = nic();
    let mut client = TcpClient::new(ClientConfig {
        idle_timeout_cycles: 3,
        ..ClientConfig::default()
    });
    let arp = ArpResponder::new(OUR_MAC, OUR_IP);
    client.open(PEER_MAC, PEER_IP, PEER_PORT);
    assert_eq!(client.state(), TcpState::SynSent);

    let stats = pump_cfg().run(&mut nic, &mut client, &arp);
    // Five empty polls: the loop exits on its own and the connection timed out on the way.
    assert_eq!(stats.idle_polls, 5);
    assert_eq!(stats.frames_in, 0);
    assert_eq!(client.state(), TcpState::Closed);
}

#[test]
fn foreign_traffic_does_not_keep_a_connection_alive() {
    let mut nic = nic();
    let mut client = TcpClient::new(ClientConfig {
        idle_timeout_cycles: 3,
        ..ClientConfig::default()
    });
    let arp = ArpResponder::new(OUR_MAC, OUR_IP);
    client.open(PEER_MAC, PEER_IP, PEER_PORT);
    assert_eq!(client.state(), TcpState::SynSent);

    // A steady stream of segments for a port nobody is listening on. None of
    // these polls is empty, so the loop only exits once the connection times
    // out and the injected frames run dry.
    for _ in 0..10 {
        nic.bus_mut()
            .inject_frame(&peer_tcp_frame_to(9999, TcpFlags::SYN, 500, 0, &[]), 0x00);
    }

    let stats = pump_cfg().run(&mut nic, &mut client, &arp);
    assert_eq!(stats.frames_in, 10);
    assert_eq!(client.state(), TcpState::Closed);
    assert!(nic.bus_mut().take_transmitted().is_empty());
}

#[test]
fn hardware_dropped_frames_count_as_idle() {
    let mut nic = nic();
    let mut client = TcpClient::new(ClientConfig::default());
    let arp = ArpResponder::new(OUR_MAC, OUR_IP);

    // CRC-errored frame: the driver drains and drops it, the pump sees an empty poll.
    nic.bus_mut()
        .inject_frame(&peer_tcp_frame(TcpFlags::SYN, 500, 0, &[]), 0x02);
    let stats = pump_cfg().run(&mut nic, &mut client, &arp);
    assert_eq!(stats.frames_in, 0);
    assert_eq!(client.state(), TcpState::Closed);
    assert!(nic.bus_mut().take_transmitted().is_empty());
}
