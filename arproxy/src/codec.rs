//! Conversion between raw Ethernet frames and typed ARP messages, and construction of the frames
//! the proxy sends: replies to requests and gratuitous announcements.

use crate::error::{ProxyError, Result};
use arproxy_packets::{ArpFrame, ArpOp, EthernetFrame, MacAddr};
use std::convert::TryFrom;
use std::net::Ipv4Addr;

/// An IPv4 over Ethernet ARP packet.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ArpMessage {
    pub operation: ArpOp,
    pub sender_mac: MacAddr,
    pub sender_ip: Ipv4Addr,
    pub target_mac: MacAddr,
    pub target_ip: Ipv4Addr,
}

/// Reads an ARP message out of a frame. Anything other than an Ethernet/IPv4 ARP request or reply
/// is `MalformedFrame`, which callers treat as "not ours" rather than as a failure.
pub fn parse(frame: &EthernetFrame) -> Result<ArpMessage> {
    let arp = ArpFrame::try_from(frame.clone()).map_err(ProxyError::MalformedFrame)?;
    if !arp.is_ethernet_ipv4() {
        return Err(ProxyError::MalformedFrame(
            "not an Ethernet/IPv4 ARP packet",
        ));
    }
    let operation = ArpOp::try_from(arp.opcode()).map_err(ProxyError::MalformedFrame)?;

    // Both lengths were checked above, the typed accessors cannot miss.
    let missing = || ProxyError::MalformedFrame("ARP address fields are truncated");
    Ok(ArpMessage {
        operation,
        sender_mac: arp.sender_mac_addr().ok_or_else(missing)?,
        sender_ip: arp.sender_ipv4_addr().ok_or_else(missing)?,
        target_mac: arp.target_mac_addr().ok_or_else(missing)?,
        target_ip: arp.target_ipv4_addr().ok_or_else(missing)?,
    })
}

/// Writes a message into a new frame. The Ethernet addresses are left to the caller.
pub fn encode(message: &ArpMessage) -> EthernetFrame {
    let mut arp = ArpFrame::ethernet_ipv4();
    arp.set_opcode(message.operation as u16);
    arp.set_sender_hardware_addr(message.sender_mac);
    arp.set_sender_protocol_addr(message.sender_ip);
    arp.set_target_hardware_addr(message.target_mac);
    arp.set_target_protocol_addr(message.target_ip);
    arp.frame()
}

/// Answers `request` on behalf of `target_ip`, claiming `reply_mac`.
pub fn build_reply(target_ip: Ipv4Addr, reply_mac: MacAddr, request: &ArpMessage) -> EthernetFrame {
    let reply = ArpMessage {
        operation: ArpOp::Reply,
        sender_mac: reply_mac,
        sender_ip: target_ip,
        target_mac: request.sender_mac,
        target_ip: request.sender_ip,
    };
    let mut frame = encode(&reply);
    frame.set_src_mac(reply_mac);
    frame.set_dest_mac(request.sender_mac);
    frame
}

/// Broadcast request announcing that `ip` is now at `mac`. Sender and target IP are the same.
pub fn build_gratuitous(ip: Ipv4Addr, mac: MacAddr) -> EthernetFrame {
    let announcement = ArpMessage {
        operation: ArpOp::Request,
        sender_mac: mac,
        sender_ip: ip,
        target_mac: MacAddr::BROADCAST,
        target_ip: ip,
    };
    let mut frame = encode(&announcement);
    frame.set_src_mac(mac);
    frame.set_dest_mac(MacAddr::BROADCAST);
    frame
}
