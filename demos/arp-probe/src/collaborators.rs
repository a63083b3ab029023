use arproxy::config::ProxyConfig;
use arproxy::services::{
    ConfigSource, ConnectPoint, DeviceId, Host, HostService, NodeManager, OutboundPacket,
    PacketRequest, PacketService, PortNumber, ServiceNetwork, ServiceNetworkService,
};
use std::net::Ipv4Addr;
use std::sync::Mutex;
use tracing::info;

/// Holds on to emitted packets so they can be printed after the probe.
#[derive(Default)]
pub struct CapturedPackets {
    emitted: Mutex<Vec<OutboundPacket>>,
}

impl CapturedPackets {
    pub fn take(&self) -> Vec<OutboundPacket> {
        match self.emitted.lock() {
            Ok(mut emitted) => emitted.drain(..).collect(),
            Err(poisoned) => poisoned.into_inner().drain(..).collect(),
        }
    }
}

impl PacketService for CapturedPackets {
    fn request_packets(&self, request: PacketRequest) {
        info!(ether_type = request.ether_type, priority = ?request.priority, "packet request");
    }

    fn cancel_packets(&self, request: PacketRequest) {
        info!(ether_type = request.ether_type, "packet request cancelled");
    }

    fn emit(&self, packet: OutboundPacket) {
        match self.emitted.lock() {
            Ok(mut emitted) => emitted.push(packet),
            Err(poisoned) => poisoned.into_inner().push(packet),
        }
    }
}

pub struct FixedConfig(pub ProxyConfig);

impl ConfigSource for FixedConfig {
    fn current_config(&self) -> Option<ProxyConfig> {
        Some(self.0.clone())
    }
}

pub struct FixedNetworks(pub Vec<ServiceNetwork>);

impl ServiceNetworkService for FixedNetworks {
    fn service_networks(&self) -> Vec<ServiceNetwork> {
        self.0.clone()
    }
}

pub struct FixedHosts(pub Vec<Host>);

impl HostService for FixedHosts {
    fn hosts_by_ip(&self, ip: Ipv4Addr) -> Vec<Host> {
        self.0
            .iter()
            .filter(|host| host.ips.contains(&ip))
            .cloned()
            .collect()
    }

    fn connected_hosts(&self, connect_point: &ConnectPoint) -> Vec<Host> {
        self.0
            .iter()
            .filter(|host| &host.location == connect_point)
            .cloned()
            .collect()
    }
}

/// A node whose management port, if any, is the same on every device.
pub struct FixedManagementPort(pub Option<PortNumber>);

impl NodeManager for FixedManagementPort {
    fn management_port(&self, _device: &DeviceId) -> Option<PortNumber> {
        self.0
    }
}
