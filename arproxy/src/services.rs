//! Interfaces of the services the proxy runs against: packet I/O, host tracking, configuration,
//! service network membership and node management. The proxy only consumes these; the
//! surrounding controller provides the implementations.

use crate::config::ProxyConfig;
use arproxy_packets::{EthernetFrame, MacAddr, ARP_ETHER_TYPE};
use std::fmt;
use std::net::Ipv4Addr;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct DeviceId(pub String);

impl DeviceId {
    pub fn new(id: impl Into<String>) -> Self {
        DeviceId(id.into())
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PortNumber(pub u32);

impl fmt::Display for PortNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A port on a device, where a packet was received or where a host is attached.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ConnectPoint {
    pub device: DeviceId,
    pub port: PortNumber,
}

impl ConnectPoint {
    pub fn new(device: DeviceId, port: PortNumber) -> Self {
        ConnectPoint { device, port }
    }
}

impl fmt::Display for ConnectPoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.device, self.port)
    }
}

/// Kind of tenant network an instance or service network belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NetworkType {
    Private,
    Public,
    ManagementHost,
    ManagementLocal,
    Vsg,
    AccessAgent,
}

impl NetworkType {
    pub fn is_management(self) -> bool {
        match self {
            NetworkType::ManagementHost | NetworkType::ManagementLocal => true,
            _ => false,
        }
    }

    /// Service networks of these types get the private gateway MAC for their service IP.
    pub fn uses_private_gateway(self) -> bool {
        match self {
            NetworkType::Private | NetworkType::Vsg => true,
            _ => false,
        }
    }
}

/// An end station known to the host tracking service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Host {
    pub mac: MacAddr,
    pub ips: Vec<Ipv4Addr>,
    pub location: ConnectPoint,
    pub network_type: NetworkType,
}

/// Priority the dispatch fabric gives a packet request. The proxy only asks at control
/// priority, ahead of reactive forwarding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PacketPriority {
    Control,
}

/// Selects which packets the dispatch fabric hands to the proxy.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PacketRequest {
    pub ether_type: u16,
    pub priority: PacketPriority,
}

impl PacketRequest {
    pub fn arp() -> Self {
        PacketRequest {
            ether_type: ARP_ETHER_TYPE,
            priority: PacketPriority::Control,
        }
    }
}

/// A frame to transmit out of one port of a device.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct OutboundPacket {
    pub device: DeviceId,
    pub port: PortNumber,
    pub frame: EthernetFrame,
}

pub trait PacketService: Send + Sync {
    fn request_packets(&self, request: PacketRequest);

    fn cancel_packets(&self, request: PacketRequest);

    /// Fire and forget.
    fn emit(&self, packet: OutboundPacket);
}

pub trait HostService: Send + Sync {
    fn hosts_by_ip(&self, ip: Ipv4Addr) -> Vec<Host>;

    fn connected_hosts(&self, connect_point: &ConnectPoint) -> Vec<Host>;
}

pub trait ConfigSource: Send + Sync {
    fn current_config(&self) -> Option<ProxyConfig>;
}

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct NetworkId(pub String);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceNetwork {
    pub id: NetworkId,
    pub network_type: NetworkType,
    pub service_ip: Option<Ipv4Addr>,
}

pub trait ServiceNetworkService: Send + Sync {
    fn service_networks(&self) -> Vec<ServiceNetwork>;
}

pub trait NodeManager: Send + Sync {
    /// The port on `device` leading to the host management network, if the node has one.
    fn management_port(&self, device: &DeviceId) -> Option<PortNumber>;
}
