use crate::codec::{self, ArpMessage};
use arproxy_packets::{ArpOp, EthernetFrame, MacAddr};
use std::net::Ipv4Addr;

/// Broadcast who-has request for `target_ip`.
pub(crate) fn arp_request(sender_mac: MacAddr, sender_ip: Ipv4Addr, target_ip: Ipv4Addr) -> EthernetFrame {
    let mut frame = codec::encode(&ArpMessage {
        operation: ArpOp::Request,
        sender_mac,
        sender_ip,
        target_mac: MacAddr::NONE,
        target_ip,
    });
    frame.set_src_mac(sender_mac);
    frame.set_dest_mac(MacAddr::BROADCAST);
    frame
}

/// Unicast is-at reply from `sender` to `target`.
pub(crate) fn arp_reply(
    sender_mac: MacAddr,
    sender_ip: Ipv4Addr,
    target_mac: MacAddr,
    target_ip: Ipv4Addr,
) -> EthernetFrame {
    let mut frame = codec::encode(&ArpMessage {
        operation: ArpOp::Reply,
        sender_mac,
        sender_ip,
        target_mac,
        target_ip,
    });
    frame.set_src_mac(sender_mac);
    frame.set_dest_mac(target_mac);
    frame
}
