mod collaborators;

use arproxy::codec::{self, ArpMessage};
use arproxy::config::{GatewayBinding, ProxyConfig};
use arproxy::processor::{PacketContext, PacketProcessor};
use arproxy::services::{
    ConnectPoint, DeviceId, Host, NetworkId, NetworkType, PortNumber, ServiceNetwork,
};
use arproxy::{ArpProxy, Services};
use arproxy_packets::{ArpOp, EthernetFrame, MacAddr};
use clap::{value_t, values_t, App, Arg, ArgMatches, ErrorKind};
use collaborators::{CapturedPackets, FixedConfig, FixedHosts, FixedManagementPort, FixedNetworks};
use std::net::Ipv4Addr;
use std::str::FromStr;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Ethernet minimum without the FCS; shorter frames are padded on the wire.
const MIN_FRAME_LEN: usize = 60;

/// Optional repeated argument. Parse failures still exit with clap's usage message.
fn values_or_empty<T: FromStr>(matches: &ArgMatches, name: &str) -> Vec<T>
where
    T::Err: std::fmt::Display,
{
    match values_t!(matches, name, T) {
        Ok(values) => values,
        Err(ref e) if e.kind == ErrorKind::ArgumentNotFound => vec![],
        Err(e) => e.exit(),
    }
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let matches = App::new("ARP probe")
        .version("0.1")
        .author("Route-rs Contributors")
        .about("Sends one ARP request through an ARP proxy and prints what comes out")
        .arg(Arg::with_name("private_gateway_mac")
             .short("p")
             .long("private-gateway-mac")
             .value_name("MAC")
             .help("MAC answered for every overlay service IP")
             .required(true)
             .takes_value(true))
        .arg(Arg::with_name("public_gateway")
             .short("g")
             .long("public-gateway")
             .value_name("IP=MAC")
             .help("Statically bound public gateway")
             .multiple(true)
             .number_of_values(1)
             .takes_value(true))
        .arg(Arg::with_name("service_ip")
             .short("s")
             .long("service-ip")
             .value_name("IP")
             .help("Service IP of a private overlay network")
             .multiple(true)
             .number_of_values(1)
             .takes_value(true))
        .arg(Arg::with_name("sender_ip")
             .long("sender-ip")
             .value_name("IP")
             .default_value("10.0.0.2")
             .takes_value(true))
        .arg(Arg::with_name("sender_mac")
             .long("sender-mac")
             .value_name("MAC")
             .default_value("52:54:00:00:00:02")
             .takes_value(true))
        .arg(Arg::with_name("management_port")
             .short("m")
             .long("management-port")
             .value_name("PORT")
             .help("Treat the sender as a management host and forward unresolved requests here")
             .takes_value(true))
        .arg(Arg::with_name("target_ip")
             .value_name("TARGET_IP")
             .help("IP address to ask for")
             .required(true)
             .index(1))
        .get_matches();

    let private_gateway_mac = value_t!(matches, "private_gateway_mac", MacAddr).unwrap_or_else(|e| e.exit());
    let target_ip = value_t!(matches, "target_ip", Ipv4Addr).unwrap_or_else(|e| e.exit());
    let sender_ip = value_t!(matches, "sender_ip", Ipv4Addr).unwrap_or_else(|e| e.exit());
    let sender_mac = value_t!(matches, "sender_mac", MacAddr).unwrap_or_else(|e| e.exit());
    let management_port = if matches.is_present("management_port") {
        Some(PortNumber(value_t!(matches, "management_port", u32).unwrap_or_else(|e| e.exit())))
    } else {
        None
    };

    let config = values_or_empty::<GatewayBinding>(&matches, "public_gateway")
        .into_iter()
        .fold(ProxyConfig::new(private_gateway_mac), ProxyConfig::public_gateway);
    let networks = values_or_empty::<Ipv4Addr>(&matches, "service_ip")
        .into_iter()
        .enumerate()
        .map(|(i, ip)| ServiceNetwork {
            id: NetworkId(format!("overlay-{}", i)),
            network_type: NetworkType::Private,
            service_ip: Some(ip),
        })
        .collect();

    let ingress = ConnectPoint::new(DeviceId::new("of:0000000000000001"), PortNumber(1));
    let sender = Host {
        mac: sender_mac,
        ips: vec![sender_ip],
        location: ingress.clone(),
        network_type: if management_port.is_some() {
            NetworkType::ManagementHost
        } else {
            NetworkType::Private
        },
    };

    let packets = Arc::new(CapturedPackets::default());
    let proxy = ArpProxy::new(Services {
        packets: packets.clone(),
        hosts: Arc::new(FixedHosts(vec![sender])),
        config: Arc::new(FixedConfig(config)),
        networks: Arc::new(FixedNetworks(networks)),
        nodes: Arc::new(FixedManagementPort(management_port)),
    });
    proxy.activate();

    let mut request = codec::encode(&ArpMessage {
        operation: ArpOp::Request,
        sender_mac,
        sender_ip,
        target_mac: MacAddr::NONE,
        target_ip,
    });
    request.set_src_mac(sender_mac);
    request.set_dest_mac(MacAddr::BROADCAST);

    // Hand the proxy wire bytes, as the packet service would.
    let mut wire = request.as_bytes().to_vec();
    wire.resize(MIN_FRAME_LEN, 0);
    let request = match EthernetFrame::from_buffer(wire, 0) {
        Ok(frame) => frame,
        Err(e) => {
            eprintln!("could not build request frame: {}", e);
            std::process::exit(1);
        }
    };

    let mut context = PacketContext::new(ingress, request);
    proxy.processor().process(&mut context);

    let emitted = packets.take();
    if emitted.is_empty() {
        println!("who-has {} tell {}: dropped", target_ip, sender_ip);
    }
    for packet in emitted {
        match codec::parse(&packet.frame) {
            Ok(message) if message.operation == ArpOp::Reply => println!(
                "{} is-at {} (out {}/{})",
                message.sender_ip, message.sender_mac, packet.device, packet.port
            ),
            Ok(message) => println!(
                "who-has {} tell {}: forwarded out {}/{}",
                message.target_ip, message.sender_ip, packet.device, packet.port
            ),
            Err(e) => println!("emitted unreadable frame: {}", e),
        }
    }

    proxy.deactivate();
}
