use arproxy_packets::MacAddr;
use std::net::Ipv4Addr;
use thiserror::Error;

/// Everything that can go wrong inside the proxy. None of these ever reach the packet fabric;
/// each is resolved where it is raised (pass-through, drop, or a rejected table write).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProxyError {
    #[error("malformed ARP frame: {0}")]
    MalformedFrame(&'static str),

    #[error("no MAC address known for {0}")]
    UnresolvedTarget(Ipv4Addr),

    #[error("{mac} cannot be registered as the gateway MAC for {ip}")]
    InvalidGatewayRegistration { ip: Ipv4Addr, mac: MacAddr },

    #[error("private gateway MAC is not configured")]
    MissingConfiguration,
}

pub type Result<T> = std::result::Result<T, ProxyError>;
