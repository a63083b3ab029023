use crate::gateway::GatewayTable;
use crate::services::ServiceNetwork;
use futures::{Stream, StreamExt};
use std::sync::Arc;
use tracing::warn;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ServiceNetworkEventKind {
    NetworkCreated,
    NetworkUpdated,
    NetworkRemoved,
    PortCreated,
    PortUpdated,
    PortRemoved,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ServiceNetworkEvent {
    pub kind: ServiceNetworkEventKind,
    pub subject: ServiceNetwork,
}

/// Registers the service IP of each overlay network as a gateway answered with the private
/// gateway MAC, and drops it again when the network goes away.
#[derive(Clone)]
pub struct ServiceNetworkListener {
    gateways: Arc<GatewayTable>,
}

impl ServiceNetworkListener {
    pub fn new(gateways: Arc<GatewayTable>) -> Self {
        ServiceNetworkListener { gateways }
    }

    pub fn is_relevant(&self, event: &ServiceNetworkEvent) -> bool {
        event.subject.service_ip.is_some()
    }

    pub fn handle(&self, event: &ServiceNetworkEvent) {
        let service_ip = match event.subject.service_ip {
            Some(ip) => ip,
            None => return,
        };

        match event.kind {
            ServiceNetworkEventKind::NetworkCreated | ServiceNetworkEventKind::NetworkUpdated => {
                if let Err(e) = self.gateways.register_overlay(service_ip) {
                    warn!(%service_ip, network = ?event.subject.id, error = %e, "gateway not added");
                }
            }
            ServiceNetworkEventKind::NetworkRemoved => {
                self.gateways.remove(service_ip);
            }
            ServiceNetworkEventKind::PortCreated
            | ServiceNetworkEventKind::PortUpdated
            | ServiceNetworkEventKind::PortRemoved => {}
        }
    }

    pub async fn listen<S>(self, mut events: S)
    where
        S: Stream<Item = ServiceNetworkEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if self.is_relevant(&event) {
                self.handle(&event);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::GatewayOrigin;
    use crate::services::{NetworkId, NetworkType};
    use crate::utils::test::harness::block_on;
    use arproxy_packets::MacAddr;
    use futures::stream;
    use std::net::Ipv4Addr;

    const SERVICE_IP: Ipv4Addr = Ipv4Addr::new(10, 0, 0, 1);

    fn private_mac() -> MacAddr {
        MacAddr::new([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0x01])
    }

    fn event(kind: ServiceNetworkEventKind, service_ip: Option<Ipv4Addr>) -> ServiceNetworkEvent {
        ServiceNetworkEvent {
            kind,
            subject: ServiceNetwork {
                id: NetworkId("tenant-a".to_string()),
                network_type: NetworkType::Private,
                service_ip,
            },
        }
    }

    fn configured_table() -> Arc<GatewayTable> {
        let table = Arc::new(GatewayTable::new());
        table.set_default_mac(private_mac()).unwrap();
        table
    }

    #[test]
    fn only_networks_with_service_ip_are_relevant() {
        let listener = ServiceNetworkListener::new(configured_table());
        assert!(listener.is_relevant(&event(ServiceNetworkEventKind::NetworkCreated, Some(SERVICE_IP))));
        assert!(!listener.is_relevant(&event(ServiceNetworkEventKind::NetworkCreated, None)));
    }

    #[test]
    fn created_and_removed_network() {
        let table = configured_table();
        let listener = ServiceNetworkListener::new(Arc::clone(&table));

        listener.handle(&event(ServiceNetworkEventKind::NetworkCreated, Some(SERVICE_IP)));
        assert_eq!(table.lookup(SERVICE_IP), Some(private_mac()));

        listener.handle(&event(ServiceNetworkEventKind::NetworkRemoved, Some(SERVICE_IP)));
        assert_eq!(table.lookup(SERVICE_IP), None);
    }

    #[test]
    fn port_events_are_ignored() {
        let table = configured_table();
        let listener = ServiceNetworkListener::new(Arc::clone(&table));
        listener.handle(&event(ServiceNetworkEventKind::PortCreated, Some(SERVICE_IP)));
        assert!(table.is_empty());

        listener.handle(&event(ServiceNetworkEventKind::NetworkUpdated, Some(SERVICE_IP)));
        listener.handle(&event(ServiceNetworkEventKind::PortRemoved, Some(SERVICE_IP)));
        assert_eq!(table.lookup(SERVICE_IP), Some(private_mac()));
    }

    #[test]
    fn network_before_configuration_is_skipped() {
        let table = Arc::new(GatewayTable::new());
        let listener = ServiceNetworkListener::new(Arc::clone(&table));
        listener.handle(&event(ServiceNetworkEventKind::NetworkCreated, Some(SERVICE_IP)));
        assert!(table.is_empty());
    }

    #[test]
    fn removing_network_keeps_public_gateway() {
        let table = configured_table();
        let public_mac = MacAddr::new([0x11, 0x22, 0x33, 0x44, 0x55, 0x66]);
        table
            .upsert(SERVICE_IP, public_mac, GatewayOrigin::Configured)
            .unwrap();
        let listener = ServiceNetworkListener::new(Arc::clone(&table));

        listener.handle(&event(ServiceNetworkEventKind::NetworkUpdated, Some(SERVICE_IP)));
        listener.handle(&event(ServiceNetworkEventKind::NetworkRemoved, Some(SERVICE_IP)));
        assert_eq!(table.lookup(SERVICE_IP), Some(public_mac));
    }

    #[test]
    fn listen_applies_events_in_order() {
        let table = configured_table();
        let other_ip = Ipv4Addr::new(10, 0, 1, 1);
        let events = stream::iter(vec![
            event(ServiceNetworkEventKind::NetworkCreated, Some(SERVICE_IP)),
            event(ServiceNetworkEventKind::NetworkCreated, None),
            event(ServiceNetworkEventKind::NetworkCreated, Some(other_ip)),
            event(ServiceNetworkEventKind::NetworkRemoved, Some(SERVICE_IP)),
        ]);
        block_on(ServiceNetworkListener::new(Arc::clone(&table)).listen(events));

        assert_eq!(table.lookup(SERVICE_IP), None);
        assert_eq!(table.lookup(other_ip), Some(private_mac()));
        assert_eq!(table.len(), 1);
    }
}
