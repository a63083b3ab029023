/// The gateway table maps virtual gateway IPs to the MAC the proxy answers with. Entries come from
/// two places: public gateways bound in configuration, and service IPs of overlay networks that
/// share the private gateway MAC. Configured bindings win over overlay ones.
pub mod gateway;

/// Parsing of inbound ARP and construction of replies and gratuitous announcements.
pub mod codec;

/// The per-frame decision: reply, forward, or drop.
pub mod resolver;

/// Packet processor registered with the dispatch fabric. Carries out the resolver's decision and
/// marks the packet handled.
pub mod processor;

/// Keeps the gateway table in step with configuration and network changes.
pub mod listener;

/// Proxy configuration: the private gateway MAC and public gateway bindings.
pub mod config;

/// Interfaces to the controller services the proxy depends on.
pub mod services;

pub mod error;

/// Wires the pieces together and owns activation.
pub mod proxy;

mod utils;

pub use crate::error::{ProxyError, Result};
pub use crate::proxy::{ArpProxy, Services};
