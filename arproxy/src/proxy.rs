use crate::gateway::GatewayTable;
use crate::listener::{
    ConfigEvent, ConfigListener, EventStream, GratuitousArp, ServiceNetworkEvent,
    ServiceNetworkListener,
};
use crate::processor::ArpPacketProcessor;
use crate::resolver::ArpResolver;
use crate::services::{
    ConfigSource, ConnectPoint, HostService, NodeManager, PacketRequest, PacketService,
    ServiceNetworkService,
};
use crossbeam::crossbeam_channel::{self, Receiver};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

/// The services an ArpProxy runs against.
#[derive(Clone)]
pub struct Services {
    pub packets: Arc<dyn PacketService>,
    pub hosts: Arc<dyn HostService>,
    pub config: Arc<dyn ConfigSource>,
    pub networks: Arc<dyn ServiceNetworkService>,
    pub nodes: Arc<dyn NodeManager>,
}

/// Answers ARP for virtual gateway IPs on behalf of the overlay.
///
/// After `activate`, register `processor()` with the dispatch fabric and feed configuration and
/// service network events to the listeners, either directly or with `spawn_listeners`.
pub struct ArpProxy {
    gateways: Arc<GatewayTable>,
    packets: Arc<dyn PacketService>,
    networks: Arc<dyn ServiceNetworkService>,
    processor: Arc<ArpPacketProcessor>,
    config_listener: ConfigListener,
    network_listener: ServiceNetworkListener,
    gratuitous: GratuitousArp,
    gateway_changes: Receiver<Vec<Ipv4Addr>>,
}

impl ArpProxy {
    pub fn new(services: Services) -> Self {
        let gateways = Arc::new(GatewayTable::new());
        let resolver = ArpResolver::new(Arc::clone(&gateways), services.hosts, services.nodes);
        let (changes, gateway_changes) = crossbeam_channel::unbounded();

        ArpProxy {
            processor: Arc::new(ArpPacketProcessor::new(
                resolver,
                Arc::clone(&services.packets),
            )),
            config_listener: ConfigListener::new(Arc::clone(&gateways), services.config)
                .notify_changes(changes),
            network_listener: ServiceNetworkListener::new(Arc::clone(&gateways)),
            gratuitous: GratuitousArp::new(Arc::clone(&gateways), Arc::clone(&services.packets)),
            packets: services.packets,
            networks: services.networks,
            gateways,
            gateway_changes,
        }
    }

    ///
    /// Loads the configuration, asks for ARP delivery at control priority and registers the
    /// service IP of every existing private and vSG network.
    ///
    pub fn activate(&self) {
        self.config_listener.read_configuration();
        self.packets.request_packets(PacketRequest::arp());

        let networks = self.networks.service_networks();
        for network in networks
            .iter()
            .filter(|network| network.network_type.uses_private_gateway())
        {
            let service_ip = match network.service_ip {
                Some(ip) => ip,
                None => continue,
            };
            if let Err(e) = self.gateways.register_overlay(service_ip) {
                warn!(%service_ip, error = %e, "gateway not added");
            }
        }
        debug!(gateways = self.gateways.len(), "ARP proxy activated");
    }

    pub fn deactivate(&self) {
        self.packets.cancel_packets(PacketRequest::arp());
        debug!("ARP proxy deactivated");
    }

    pub fn gateways(&self) -> &Arc<GatewayTable> {
        &self.gateways
    }

    pub fn processor(&self) -> Arc<ArpPacketProcessor> {
        Arc::clone(&self.processor)
    }

    pub fn config_listener(&self) -> ConfigListener {
        self.config_listener.clone()
    }

    pub fn network_listener(&self) -> ServiceNetworkListener {
        self.network_listener.clone()
    }

    /// Gateway IPs whose MAC changed while the config listener ran under `spawn_listeners`, one
    /// batch per configuration event. Each one wants a `send_gratuitous_arp`.
    pub fn gateway_changes(&self) -> Receiver<Vec<Ipv4Addr>> {
        self.gateway_changes.clone()
    }

    /// Drives both listeners as tasks on the current tokio runtime. The tasks end with their
    /// streams.
    pub fn spawn_listeners(
        &self,
        config_events: EventStream<ConfigEvent>,
        network_events: EventStream<ServiceNetworkEvent>,
    ) -> Vec<JoinHandle<()>> {
        vec![
            tokio::spawn(self.config_listener().listen(config_events)),
            tokio::spawn(self.network_listener().listen(network_events)),
        ]
    }

    /// Tells `instances` about the current MAC of `gateway_ip`.
    pub fn send_gratuitous_arp(&self, gateway_ip: Ipv4Addr, instances: &[ConnectPoint]) -> usize {
        self.gratuitous.send(gateway_ip, instances)
    }
}
