//! Gateway IP to MAC bindings answered by the proxy.
//!
//! Entries come from two places: public gateways bound statically in the configuration, and
//! service IPs of overlay networks, which are all answered with the single private gateway MAC.
//! Packet processing only reads the table; listeners write it. Every read-compare-write happens
//! under one write guard so readers never see a half-applied update.

use crate::error::{ProxyError, Result};
use arproxy_packets::MacAddr;
use crossbeam::atomic::AtomicCell;
use crossbeam::sync::ShardedLock;
use std::collections::HashMap;
use std::net::Ipv4Addr;
use std::sync::PoisonError;
use tracing::{debug, warn};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GatewayOrigin {
    /// Public gateway bound in the proxy configuration.
    Configured,
    /// Service IP of an overlay network.
    Overlay,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GatewayEntry {
    pub ip: Ipv4Addr,
    pub mac: MacAddr,
    pub origin: GatewayOrigin,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UpsertOutcome {
    Inserted,
    Replaced { previous: MacAddr },
    /// Same MAC and origin were already present.
    Unchanged,
    /// A configured public binding took precedence over the private gateway MAC.
    Retained,
}

impl UpsertOutcome {
    /// True if the MAC answered for the IP is different after the write.
    pub fn mac_changed(&self, mac: MacAddr) -> bool {
        match *self {
            UpsertOutcome::Inserted => true,
            UpsertOutcome::Replaced { previous } => previous != mac,
            UpsertOutcome::Unchanged | UpsertOutcome::Retained => false,
        }
    }
}

/// The private gateway MAC. Unset until configuration has been read.
#[derive(Default)]
pub struct DefaultGatewayMac {
    mac: AtomicCell<Option<MacAddr>>,
}

impl DefaultGatewayMac {
    pub fn new() -> Self {
        DefaultGatewayMac {
            mac: AtomicCell::new(None),
        }
    }

    pub fn get(&self) -> Option<MacAddr> {
        self.mac.load()
    }

    fn swap(&self, mac: MacAddr) -> Option<MacAddr> {
        self.mac.swap(Some(mac))
    }
}

#[derive(Default)]
pub struct GatewayTable {
    entries: ShardedLock<HashMap<Ipv4Addr, GatewayEntry>>,
    default_mac: DefaultGatewayMac,
}

impl GatewayTable {
    pub fn new() -> Self {
        GatewayTable {
            entries: ShardedLock::new(HashMap::new()),
            default_mac: DefaultGatewayMac::new(),
        }
    }

    pub fn default_mac(&self) -> Option<MacAddr> {
        self.default_mac.get()
    }

    /// Sets the private gateway MAC and returns the IPs of overlay entries that were re-pointed
    /// from the previous MAC to the new one.
    pub fn set_default_mac(&self, mac: MacAddr) -> Result<Vec<Ipv4Addr>> {
        if mac.is_none() || mac.is_broadcast() {
            warn!(%mac, "rejected private gateway MAC");
            return Err(ProxyError::InvalidGatewayRegistration {
                ip: Ipv4Addr::UNSPECIFIED,
                mac,
            });
        }

        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let previous = self.default_mac.swap(mac);
        let mut rebound = Vec::new();
        match previous {
            Some(previous) if previous != mac => {
                for entry in entries.values_mut() {
                    if entry.origin == GatewayOrigin::Overlay && entry.mac == previous {
                        entry.mac = mac;
                        rebound.push(entry.ip);
                    }
                }
                debug!(%previous, %mac, rebound = rebound.len(), "private gateway MAC changed");
            }
            Some(_) => {}
            None => debug!(%mac, "set private gateway MAC"),
        }
        Ok(rebound)
    }

    /// Inserts or overwrites the binding for `ip`.
    ///
    /// An overlay write carrying the private gateway MAC never replaces a configured binding to
    /// some other MAC; public gateways win.
    pub fn upsert(&self, ip: Ipv4Addr, mac: MacAddr, origin: GatewayOrigin) -> Result<UpsertOutcome> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        self.upsert_locked(&mut entries, GatewayEntry { ip, mac, origin })
    }

    /// Binds `ip` to the private gateway MAC. The MAC is read under the same write guard as the
    /// insert, so a concurrent `set_default_mac` either re-points this entry or happens after it.
    pub fn register_overlay(&self, ip: Ipv4Addr) -> Result<UpsertOutcome> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let mac = self
            .default_mac
            .get()
            .ok_or(ProxyError::MissingConfiguration)?;
        self.upsert_locked(
            &mut entries,
            GatewayEntry {
                ip,
                mac,
                origin: GatewayOrigin::Overlay,
            },
        )
    }

    // The default MAC only changes while the write guard is held, so reading it here is stable.
    fn upsert_locked(
        &self,
        entries: &mut HashMap<Ipv4Addr, GatewayEntry>,
        entry: GatewayEntry,
    ) -> Result<UpsertOutcome> {
        let GatewayEntry { ip, mac, origin } = entry;
        if mac.is_none() || mac.is_broadcast() {
            warn!(%ip, %mac, "rejected gateway registration");
            return Err(ProxyError::InvalidGatewayRegistration { ip, mac });
        }

        let default_mac = self.default_mac.get();
        let outcome = match entries.get(&ip) {
            Some(existing)
                if origin == GatewayOrigin::Overlay
                    && existing.origin == GatewayOrigin::Configured
                    && Some(existing.mac) != default_mac
                    && Some(mac) == default_mac =>
            {
                return Ok(UpsertOutcome::Retained);
            }
            Some(existing) if *existing == entry => return Ok(UpsertOutcome::Unchanged),
            Some(existing) => UpsertOutcome::Replaced {
                previous: existing.mac,
            },
            None => UpsertOutcome::Inserted,
        };

        entries.insert(ip, entry);
        debug!(%ip, %mac, ?origin, "added ARP proxy entry");
        Ok(outcome)
    }

    /// Removes `ip` if it is bound to the private gateway MAC. Public gateways stay.
    pub fn remove(&self, ip: Ipv4Addr) -> Option<GatewayEntry> {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let existing = *entries.get(&ip)?;
        if Some(existing.mac) != self.default_mac.get() {
            return None;
        }
        entries.remove(&ip);
        debug!(%ip, mac = %existing.mac, "removed ARP proxy entry");
        Some(existing)
    }

    pub fn lookup(&self, ip: Ipv4Addr) -> Option<MacAddr> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&ip).map(|entry| entry.mac)
    }

    pub fn get(&self, ip: Ipv4Addr) -> Option<GatewayEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.get(&ip).copied()
    }

    /// Snapshot of all entries, in no particular order.
    pub fn entries(&self) -> Vec<GatewayEntry> {
        let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
        entries.values().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
