use crate::codec::{self, ArpMessage};
use crate::error::{ProxyError, Result};
use crate::gateway::GatewayTable;
use crate::services::{ConnectPoint, HostService, NodeManager, PortNumber};
use arproxy_packets::{ArpOp, EthernetFrame, MacAddr};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::trace;

/// What to do with an ARP frame the proxy has taken ownership of.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Decision {
    /// Send this frame out the port the request arrived on.
    Emit(EthernetFrame),
    /// Send the frame, unmodified, out another port of the same device.
    Forward(PortNumber, EthernetFrame),
    Drop,
}

/// Decides, frame by frame, how the proxy answers ARP. Holds no per-frame state, so one resolver
/// can serve any number of packet callbacks at once.
pub struct ArpResolver {
    gateways: Arc<GatewayTable>,
    hosts: Arc<dyn HostService>,
    nodes: Arc<dyn NodeManager>,
}

impl ArpResolver {
    pub fn new(
        gateways: Arc<GatewayTable>,
        hosts: Arc<dyn HostService>,
        nodes: Arc<dyn NodeManager>,
    ) -> Self {
        ArpResolver {
            gateways,
            hosts,
            nodes,
        }
    }

    /// Returns `None` for frames that are not IPv4 ARP; those are left to other consumers.
    pub fn resolve(&self, received_from: &ConnectPoint, frame: &EthernetFrame) -> Option<Decision> {
        let message = match codec::parse(frame) {
            Ok(message) => message,
            Err(e) => {
                trace!(%received_from, error = %e, "not handling frame");
                return None;
            }
        };

        let decision = match message.operation {
            ArpOp::Request => self.resolve_request(received_from, frame, &message),
            ArpOp::Reply => self.resolve_reply(received_from, frame, &message),
        };
        Some(decision)
    }

    ///
    /// Requests for a gateway IP are answered with the gateway MAC, requests for a known host with
    /// the host's MAC. Tenant hosts never see the real next hop.
    ///
    /// Anything else only leaves the proxy if it came from a management instance and the node has
    /// a management port; unresolved requests must not reach the tenant data plane.
    ///
    fn resolve_request(
        &self,
        received_from: &ConnectPoint,
        frame: &EthernetFrame,
        request: &ArpMessage,
    ) -> Decision {
        match self.lookup_mac(request.target_ip) {
            Ok(mac) => Decision::Emit(codec::build_reply(request.target_ip, mac, request)),
            Err(e) => {
                trace!(error = %e, "unresolved ARP request");
                self.forward_management_request(received_from, frame)
            }
        }
    }

    fn forward_management_request(
        &self,
        received_from: &ConnectPoint,
        frame: &EthernetFrame,
    ) -> Decision {
        let from_management = self
            .hosts
            .connected_hosts(received_from)
            .first()
            .map_or(false, |host| host.network_type.is_management());
        if !from_management {
            return Decision::Drop;
        }

        match self.nodes.management_port(&received_from.device) {
            Some(port) => {
                trace!(device = %received_from.device, %port, "forwarding ARP request to management network");
                Decision::Forward(port, frame.clone())
            }
            None => Decision::Drop,
        }
    }

    fn resolve_reply(
        &self,
        received_from: &ConnectPoint,
        frame: &EthernetFrame,
        reply: &ArpMessage,
    ) -> Decision {
        let host = self
            .hosts
            .hosts_by_ip(reply.target_ip)
            .into_iter()
            .find(|host| host.location.device == received_from.device);

        match host {
            Some(host) => Decision::Forward(host.location.port, frame.clone()),
            None => {
                trace!(target_ip = %reply.target_ip, device = %received_from.device, "no host for ARP reply");
                Decision::Drop
            }
        }
    }

    // No overlapping IPs: the first host found for an address is the one.
    fn lookup_mac(&self, ip: Ipv4Addr) -> Result<MacAddr> {
        if let Some(mac) = self.gateways.lookup(ip) {
            return Ok(mac);
        }
        self.hosts
            .hosts_by_ip(ip)
            .first()
            .map(|host| {
                trace!(%ip, "found MAC from host service");
                host.mac
            })
            .ok_or(ProxyError::UnresolvedTarget(ip))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayOrigin;
    use crate::services::{DeviceId, Host, NetworkType};
    use crate::utils::test::frames::{arp_reply, arp_request};
    use crate::utils::test::services::{StaticHostService, StaticNodeManager};
    use arproxy_packets::IPV4_ETHER_TYPE;

    const REQUESTER_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 2);
    const GATEWAY_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);
    const HOST_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 3);

    fn requester_mac() -> MacAddr {
        MacAddr::new([0x52, 0x54, 0x00, 0x00, 0x00, 0x02])
    }

    fn gateway_mac() -> MacAddr {
        MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01])
    }

    fn host_mac() -> MacAddr {
        MacAddr::new([0x52, 0x54, 0x00, 0x00, 0x00, 0x03])
    }

    fn ingress() -> ConnectPoint {
        ConnectPoint::new(DeviceId::new("of:0001"), PortNumber(1))
    }

    fn host(ip: Ipv4Addr, mac: MacAddr, location: ConnectPoint, network_type: NetworkType) -> Host {
        Host {
            mac,
            ips: vec![ip],
            location,
            network_type,
        }
    }

    fn resolver(hosts: StaticHostService, nodes: StaticNodeManager) -> (ArpResolver, Arc<GatewayTable>) {
        let table = Arc::new(GatewayTable::new());
        table.set_default_mac(gateway_mac()).unwrap();
        let resolver = ArpResolver::new(Arc::clone(&table), Arc::new(hosts), Arc::new(nodes));
        (resolver, table)
    }

    #[test]
    fn non_arp_frames_are_not_applicable() {
        let (resolver, _) = resolver(StaticHostService::new(), StaticNodeManager::new());
        let mut frame = EthernetFrame::empty();
        frame.set_ether_type(IPV4_ETHER_TYPE);
        assert_eq!(resolver.resolve(&ingress(), &frame), None);
    }

    #[test]
    fn request_for_gateway_is_answered() {
        let (resolver, table) = resolver(StaticHostService::new(), StaticNodeManager::new());
        table.register_overlay(GATEWAY_IP).unwrap();

        let request = arp_request(requester_mac(), REQUESTER_IP, GATEWAY_IP);
        let decision = resolver.resolve(&ingress(), &request).unwrap();

        let expected_request = codec::parse(&request).unwrap();
        assert_eq!(
            decision,
            Decision::Emit(codec::build_reply(GATEWAY_IP, gateway_mac(), &expected_request))
        );
    }

    #[test]
    fn request_for_known_host_is_answered_with_host_mac() {
        let hosts = StaticHostService::new().host(host(
            HOST_IP,
            host_mac(),
            ConnectPoint::new(DeviceId::new("of:0002"), PortNumber(7)),
            NetworkType::Private,
        ));
        let (resolver, _) = resolver(hosts, StaticNodeManager::new());

        let request = arp_request(requester_mac(), REQUESTER_IP, HOST_IP);
        match resolver.resolve(&ingress(), &request) {
            Some(Decision::Emit(frame)) => {
                let reply = codec::parse(&frame).unwrap();
                assert_eq!(reply.operation, ArpOp::Reply);
                assert_eq!(reply.sender_mac, host_mac());
                assert_eq!(reply.sender_ip, HOST_IP);
            }
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn gateway_table_is_consulted_before_hosts() {
        let hosts = StaticHostService::new().host(host(
            GATEWAY_IP,
            host_mac(),
            ingress(),
            NetworkType::Private,
        ));
        let (resolver, table) = resolver(hosts, StaticNodeManager::new());
        table
            .upsert(GATEWAY_IP, gateway_mac(), GatewayOrigin::Configured)
            .unwrap();

        let request = arp_request(requester_mac(), REQUESTER_IP, GATEWAY_IP);
        match resolver.resolve(&ingress(), &request) {
            Some(Decision::Emit(frame)) => {
                assert_eq!(codec::parse(&frame).unwrap().sender_mac, gateway_mac())
            }
            other => panic!("expected a reply, got {:?}", other),
        }
    }

    #[test]
    fn unresolved_request_from_management_instance_is_forwarded() {
        let hosts = StaticHostService::new().host(host(
            REQUESTER_IP,
            requester_mac(),
            ingress(),
            NetworkType::ManagementLocal,
        ));
        let nodes = StaticNodeManager::new().management_port(DeviceId::new("of:0001"), PortNumber(99));
        let (resolver, _) = resolver(hosts, nodes);

        let request = arp_request(requester_mac(), REQUESTER_IP, HOST_IP);
        assert_eq!(
            resolver.resolve(&ingress(), &request),
            Some(Decision::Forward(PortNumber(99), request))
        );
    }

    #[test]
    fn unresolved_request_without_management_port_is_dropped() {
        let hosts = StaticHostService::new().host(host(
            REQUESTER_IP,
            requester_mac(),
            ingress(),
            NetworkType::ManagementHost,
        ));
        let (resolver, _) = resolver(hosts, StaticNodeManager::new());

        let request = arp_request(requester_mac(), REQUESTER_IP, HOST_IP);
        assert_eq!(resolver.resolve(&ingress(), &request), Some(Decision::Drop));
    }

    #[test]
    fn unresolved_request_from_tenant_instance_is_dropped() {
        let hosts = StaticHostService::new().host(host(
            REQUESTER_IP,
            requester_mac(),
            ingress(),
            NetworkType::Private,
        ));
        let nodes = StaticNodeManager::new().management_port(DeviceId::new("of:0001"), PortNumber(99));
        let (resolver, _) = resolver(hosts, nodes);

        let request = arp_request(requester_mac(), REQUESTER_IP, HOST_IP);
        assert_eq!(resolver.resolve(&ingress(), &request), Some(Decision::Drop));
    }

    #[test]
    fn unresolved_request_from_unknown_requester_is_dropped() {
        let nodes = StaticNodeManager::new().management_port(DeviceId::new("of:0001"), PortNumber(99));
        let (resolver, _) = resolver(StaticHostService::new(), nodes);

        let request = arp_request(requester_mac(), REQUESTER_IP, HOST_IP);
        assert_eq!(resolver.resolve(&ingress(), &request), Some(Decision::Drop));
    }

    #[test]
    fn reply_is_forwarded_to_host_on_same_device() {
        let hosts = StaticHostService::new()
            .host(host(
                HOST_IP,
                host_mac(),
                ConnectPoint::new(DeviceId::new("of:0002"), PortNumber(4)),
                NetworkType::Private,
            ))
            .host(host(
                HOST_IP,
                host_mac(),
                ConnectPoint::new(DeviceId::new("of:0001"), PortNumber(5)),
                NetworkType::Private,
            ));
        let (resolver, _) = resolver(hosts, StaticNodeManager::new());

        let reply = arp_reply(requester_mac(), REQUESTER_IP, host_mac(), HOST_IP);
        assert_eq!(
            resolver.resolve(&ingress(), &reply),
            Some(Decision::Forward(PortNumber(5), reply))
        );
    }

    #[test]
    fn reply_for_host_on_other_device_is_dropped() {
        let hosts = StaticHostService::new().host(host(
            HOST_IP,
            host_mac(),
            ConnectPoint::new(DeviceId::new("of:0002"), PortNumber(4)),
            NetworkType::Private,
        ));
        let (resolver, _) = resolver(hosts, StaticNodeManager::new());

        let reply = arp_reply(requester_mac(), REQUESTER_IP, host_mac(), HOST_IP);
        assert_eq!(resolver.resolve(&ingress(), &reply), Some(Decision::Drop));
    }

    #[test]
    fn duplicate_requests_get_identical_replies() {
        let (resolver, table) = resolver(StaticHostService::new(), StaticNodeManager::new());
        table.register_overlay(GATEWAY_IP).unwrap();

        let request = arp_request(requester_mac(), REQUESTER_IP, GATEWAY_IP);
        let first = resolver.resolve(&ingress(), &request);
        let second = resolver.resolve(&ingress(), &request);
        assert!(matches!(first, Some(Decision::Emit(_))));
        assert_eq!(first, second);
    }
}
