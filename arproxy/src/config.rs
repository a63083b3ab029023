use arproxy_packets::MacAddr;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::str::FromStr;

/// Configuration the proxy reads from the controller's configuration service.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProxyConfig {
    /// MAC answered for the service IP of every private and vSG network.
    pub private_gateway_mac: MacAddr,
    /// Statically bound public gateways. These win over the private gateway MAC.
    pub public_gateways: HashMap<Ipv4Addr, MacAddr>,
}

impl ProxyConfig {
    /// Key the configuration is stored under. Config change events for other keys are ignored.
    pub const KEY: &'static str = "arproxy";

    pub fn new(private_gateway_mac: MacAddr) -> Self {
        ProxyConfig {
            private_gateway_mac,
            public_gateways: HashMap::new(),
        }
    }

    pub fn public_gateway(mut self, binding: GatewayBinding) -> Self {
        self.public_gateways.insert(binding.ip, binding.mac);
        self
    }
}

/// A single `IP=MAC` public gateway binding.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayBinding {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
}

impl FromStr for GatewayBinding {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(2, '=');
        let ip = parts.next().unwrap_or_default().trim();
        let mac = parts
            .next()
            .ok_or_else(|| format!("binding {:?} is not of the form IP=MAC", s))?
            .trim();

        let ip = ip
            .parse::<Ipv4Addr>()
            .map_err(|e| format!("invalid gateway IP {:?}: {}", ip, e))?;
        let mac = mac
            .parse::<MacAddr>()
            .map_err(|e| format!("invalid gateway MAC {:?}: {}", mac, e))?;
        Ok(GatewayBinding { ip, mac })
    }
}
