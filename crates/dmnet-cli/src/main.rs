//! `dmnet`: bring-up, status, and receive-loop front end for the DM9000 driver.
//!
//! Thin dispatch only; all protocol and device logic lives in the library crates.

use std::net::{Ipv4Addr, SocketAddrV4};
use std::time::Duration;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing::info;

use dmnet_dm9000::sim::SimBus;
use dmnet_dm9000::{Dm9000, MmioRegisterIo, RegisterIo};
use dmnet_packet::MacAddr;
use dmnet_stack::{pump, ArpResponder, ClientConfig, Pump, PumpStats, TcpClient};

#[derive(Debug, Parser)]
#[command(name = "dmnet", about = "DM9000 NIC bring-up and single-connection TCP client")]
struct Args {
    /// Drive the register-file simulator instead of real hardware.
    #[arg(long, global = true)]
    sim: bool,

    /// Physical addresses of the chip's index and data cells, `IO:DATA` in hex.
    #[arg(long, global = true, value_name = "IO:DATA", value_parser = parse_mmio, conflicts_with = "sim")]
    mmio: Option<(usize, usize)>,

    /// Local MAC address.
    #[arg(long, global = true, default_value = "02:00:00:00:00:01")]
    mac: MacAddr,

    /// Local IPv4 address.
    #[arg(long, global = true, default_value = "192.168.1.2")]
    ip: Ipv4Addr,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Initialize the device, then poll for frames and run the TCP client.
    Recv {
        /// Open a connection to `IP:PORT` once the device is up.
        #[arg(long, requires = "remote_mac")]
        connect: Option<SocketAddrV4>,

        /// MAC address of the connect target (no ARP lookup on the send side).
        #[arg(long)]
        remote_mac: Option<MacAddr>,

        /// Local TCP port.
        #[arg(long, default_value_t = 8080)]
        port: u16,

        /// Give up after this many consecutive empty polls.
        #[arg(long, default_value_t = 1000)]
        max_idle_polls: u32,

        /// Delay between empty polls, in milliseconds.
        #[arg(long, default_value_t = 10)]
        idle_delay_ms: u64,
    },

    /// One-shot device initialization with a register dump.
    Init,

    /// Poll and print link status, speed, and duplex.
    Link {
        #[arg(long, default_value_t = 10)]
        polls: u32,

        #[arg(long, default_value_t = 500)]
        interval_ms: u64,
    },

    /// Raw register read (one hex address) or write (address plus hex value).
    Reg {
        #[arg(value_parser = parse_hex_u8)]
        addr: u8,

        #[arg(value_parser = parse_hex_u16)]
        value: Option<u16>,
    },
}

fn parse_hex_u8(s: &str) -> Result<u8, String> {
    u8::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    u16::from_str_radix(s.trim_start_matches("0x"), 16).map_err(|e| e.to_string())
}

fn parse_mmio(s: &str) -> Result<(usize, usize), String> {
    let (io, data) = s
        .split_once(':')
        .ok_or_else(|| "expected IO:DATA (two hex addresses)".to_string())?;
    let io = usize::from_str_radix(io.trim_start_matches("0x"), 16).map_err(|e| e.to_string())?;
    let data =
        usize::from_str_radix(data.trim_start_matches("0x"), 16).map_err(|e| e.to_string())?;
    Ok((io, data))
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    if args.sim {
        run(SimBus::new(), &args)
    } else if let Some((io, data)) = args.mmio {
        // Safety: the operator vouches for the MMIO addresses; nothing else in this process
        // touches them.
        let bus = unsafe { MmioRegisterIo::new(io, data) };
        run(bus, &args)
    } else {
        bail!("select a device: --sim or --mmio IO:DATA");
    }
}

fn run<B: RegisterIo>(bus: B, args: &Args) -> Result<()> {
    let mut dev = Dm9000::new(bus, args.mac.octets());
    match &args.command {
        Command::Init => {
            dev.init().context("device initialization failed")?;
            println!("{}", dev.device_info());
            println!("IO mode   : {:?}", dev.io_mode());
            Ok(())
        }
        Command::Link {
            polls,
            interval_ms,
        } => {
            dev.init().context("device initialization failed")?;
            for _ in 0..*polls {
                println!(
                    "link {} speed {:?} duplex {:?}",
                    if dev.check_link() { "up" } else { "down" },
                    dev.check_speed(),
                    dev.check_duplex(),
                );
                std::thread::sleep(Duration::from_millis(*interval_ms));
            }
            Ok(())
        }
        Command::Reg { addr, value } => {
            let bus = dev.bus_mut();
            match value {
                Some(value) => {
                    bus.write(*addr, *value);
                    println!("reg {addr:#04x} <- {value:#06x}");
                }
                None => println!("reg {addr:#04x} = {:#06x}", bus.read(*addr)),
            }
            Ok(())
        }
        Command::Recv {
            connect,
            remote_mac,
            port,
            max_idle_polls,
            idle_delay_ms,
        } => {
            dev.init().context("device initialization failed")?;
            info!(mac = %args.mac, ip = %args.ip, "device up, entering receive loop");

            let mut client = TcpClient::new(ClientConfig {
                mac: args.mac,
                ip: args.ip,
                local_port: *port,
                ..ClientConfig::default()
            });
            let arp = ArpResponder::new(args.mac, args.ip);

            let mut stats = PumpStats::default();
            // clap enforces that --connect brings --remote-mac along.
            if let (Some(addr), Some(remote_mac)) = (connect, remote_mac) {
                let actions = client.open(*remote_mac, *addr.ip(), addr.port());
                pump::emit(&mut dev, &actions, &mut stats);
            }

            let loop_stats = Pump {
                max_idle_polls: *max_idle_polls,
                idle_delay: Duration::from_millis(*idle_delay_ms),
            }
            .run(&mut dev, &mut client, &arp);

            println!(
                "pump done: {} in, {} out, {} idle polls, {} bytes delivered (state {:?})",
                loop_stats.frames_in,
                loop_stats.frames_out + stats.frames_out,
                loop_stats.idle_polls,
                loop_stats.delivered_bytes,
                client.state(),
            );
            if !client.received().is_empty() {
                println!("{}", String::from_utf8_lossy(client.received()));
            }
            Ok(())
        }
    }
}
