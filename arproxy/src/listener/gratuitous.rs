use crate::codec;
use crate::gateway::GatewayTable;
use crate::services::{ConnectPoint, OutboundPacket, PacketService};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::debug;

/// Announces a gateway's current MAC to a set of instances after it changed.
#[derive(Clone)]
pub struct GratuitousArp {
    gateways: Arc<GatewayTable>,
    packets: Arc<dyn PacketService>,
}

impl GratuitousArp {
    pub fn new(gateways: Arc<GatewayTable>, packets: Arc<dyn PacketService>) -> Self {
        GratuitousArp { gateways, packets }
    }

    /// Emits one announcement out of each instance's attachment point. Returns how many were sent.
    pub fn send(&self, gateway_ip: Ipv4Addr, instances: &[ConnectPoint]) -> usize {
        let gateway_mac = match self.gateways.lookup(gateway_ip) {
            Some(mac) => mac,
            None => {
                debug!(%gateway_ip, "gateway is not registered to ARP proxy");
                return 0;
            }
        };

        let frame = codec::build_gratuitous(gateway_ip, gateway_mac);
        for instance in instances {
            self.packets.emit(OutboundPacket {
                device: instance.device.clone(),
                port: instance.port,
                frame: frame.clone(),
            });
        }
        debug!(%gateway_ip, %gateway_mac, instances = instances.len(), "sent gratuitous ARP");
        instances.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayOrigin;
    use crate::services::{DeviceId, PortNumber};
    use crate::utils::test::services::RecordingPacketService;
    use arproxy_packets::MacAddr;

    const GATEWAY_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    #[test]
    fn announces_to_every_instance() {
        let table = Arc::new(GatewayTable::new());
        let mac = MacAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        table.upsert(GATEWAY_IP, mac, GatewayOrigin::Configured).unwrap();
        let packets = Arc::new(RecordingPacketService::new());
        let gratuitous = GratuitousArp::new(table, packets.clone());

        let instances = vec![
            ConnectPoint::new(DeviceId::new("of:0001"), PortNumber(3)),
            ConnectPoint::new(DeviceId::new("of:0002"), PortNumber(8)),
        ];
        assert_eq!(gratuitous.send(GATEWAY_IP, &instances), 2);

        let emitted = packets.emitted();
        assert_eq!(emitted.len(), 2);
        for (packet, instance) in emitted.iter().zip(&instances) {
            assert_eq!(packet.device, instance.device);
            assert_eq!(packet.port, instance.port);
            assert_eq!(packet.frame, codec::build_gratuitous(GATEWAY_IP, mac));
        }
    }

    #[test]
    fn unknown_gateway_sends_nothing() {
        let packets = Arc::new(RecordingPacketService::new());
        let gratuitous = GratuitousArp::new(Arc::new(GatewayTable::new()), packets.clone());
        let instances = vec![ConnectPoint::new(DeviceId::new("of:0001"), PortNumber(3))];
        assert_eq!(gratuitous.send(GATEWAY_IP, &instances), 0);
        assert!(packets.emitted().is_empty());
    }
}
