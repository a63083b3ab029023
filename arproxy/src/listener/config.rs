use crate::config::ProxyConfig;
use crate::gateway::{GatewayOrigin, GatewayTable};
use crate::services::ConfigSource;
use crossbeam::crossbeam_channel::Sender;
use futures::{Stream, StreamExt};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConfigEventKind {
    Added,
    Updated,
    Removed,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ConfigEvent {
    pub kind: ConfigEventKind,
    /// Which configuration changed.
    pub config_key: String,
}

impl ConfigEvent {
    pub fn new(kind: ConfigEventKind, config_key: impl Into<String>) -> Self {
        ConfigEvent {
            kind,
            config_key: config_key.into(),
        }
    }
}

#[derive(Clone)]
pub struct ConfigListener {
    gateways: Arc<GatewayTable>,
    source: Arc<dyn ConfigSource>,
    changes: Option<Sender<Vec<Ipv4Addr>>>,
}

impl ConfigListener {
    pub fn new(gateways: Arc<GatewayTable>, source: Arc<dyn ConfigSource>) -> Self {
        ConfigListener {
            gateways,
            source,
            changes: None,
        }
    }

    /// While listening, every non-empty set of changed gateway IPs is also sent to `changes`, so
    /// the owner can announce the new MACs.
    pub fn notify_changes(mut self, changes: Sender<Vec<Ipv4Addr>>) -> Self {
        self.changes = Some(changes);
        self
    }

    pub fn is_relevant(&self, event: &ConfigEvent) -> bool {
        event.config_key == ProxyConfig::KEY && event.kind != ConfigEventKind::Removed
    }

    /// Returns the gateway IPs whose MAC changed as a result of the event.
    pub fn handle(&self, event: &ConfigEvent) -> Vec<Ipv4Addr> {
        match event.kind {
            ConfigEventKind::Added | ConfigEventKind::Updated => self.read_configuration(),
            // bindings outlive their configuration
            ConfigEventKind::Removed => vec![],
        }
    }

    ///
    /// Loads the private gateway MAC and every public gateway binding from the current
    /// configuration. Bindings are only ever added or overwritten here, never removed.
    ///
    /// Returns the gateway IPs whose MAC changed.
    ///
    pub fn read_configuration(&self) -> Vec<Ipv4Addr> {
        let config = match self.source.current_config() {
            Some(config) => config,
            None => {
                debug!("no configuration found");
                return vec![];
            }
        };

        let mut changed = match self.gateways.set_default_mac(config.private_gateway_mac) {
            Ok(rebound) => rebound,
            Err(e) => {
                warn!(error = %e, "ignoring private gateway MAC");
                vec![]
            }
        };

        for (ip, mac) in config.public_gateways {
            match self.gateways.upsert(ip, mac, GatewayOrigin::Configured) {
                Ok(outcome) if outcome.mac_changed(mac) => changed.push(ip),
                Ok(_) => {}
                Err(e) => warn!(error = %e, "ignoring public gateway binding"),
            }
        }
        changed
    }

    pub async fn listen<S>(self, mut events: S)
    where
        S: Stream<Item = ConfigEvent> + Unpin,
    {
        while let Some(event) = events.next().await {
            if !self.is_relevant(&event) {
                continue;
            }
            let changed = self.handle(&event);
            if changed.is_empty() {
                continue;
            }
            debug!(gateways = ?changed, "gateway MACs changed");
            if let Some(changes) = &self.changes {
                if changes.send(changed).is_err() {
                    debug!("nobody is waiting for gateway changes");
                }
            }
        }
    }
}
