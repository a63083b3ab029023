use crate::{EthernetFrame, MacAddr, ARP_ETHER_TYPE, IPV4_ETHER_TYPE};
use std::convert::TryFrom;
use std::net::Ipv4Addr;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ArpOp {
    Request = 1,
    Reply = 2,
}

impl TryFrom<u16> for ArpOp {
    type Error = &'static str;

    fn try_from(code: u16) -> Result<Self, Self::Error> {
        match code {
            1 => Ok(ArpOp::Request),
            2 => Ok(ArpOp::Reply),
            _ => Err("Unknown ARP opcode"),
        }
    }
}

pub enum ArpHardwareType {
    Ethernet = 1,
}

pub const ETHERNET_HARDWARE_ADDR_LEN: u8 = 6;
pub const IPV4_PROTOCOL_ADDR_LEN: u8 = 4;

/// Payload length of an ARP packet for Ethernet hardware and IPv4 protocol addresses.
pub const ETHERNET_IPV4_ARP_LEN: usize = 28;

// Offsets of the fixed part of the ARP header. The four address fields follow, sized by the two
// length bytes.
const HTYPE: usize = 0;
const PTYPE: usize = 2;
const HLEN: usize = 4;
const PLEN: usize = 5;
const OPER: usize = 6;
const FIXED_HEADER_LEN: usize = 8;

#[derive(Clone, Copy)]
enum AddrField {
    SenderHardware,
    SenderProtocol,
    TargetHardware,
    TargetProtocol,
}

/// An Ethernet frame viewed as an ARP packet laid out per RFC 826
/// (https://tools.ietf.org/html/rfc826).
#[derive(Clone, Debug)]
pub struct ArpFrame {
    frame: EthernetFrame,
}

impl ArpFrame {
    /// Zeroed ARP packet sized for the given address lengths, in a frame with the ARP ether type.
    pub fn new(hardware_addr_len: u8, protocol_addr_len: u8) -> Self {
        let len = FIXED_HEADER_LEN + 2 * (hardware_addr_len as usize + protocol_addr_len as usize);

        let mut frame = EthernetFrame::empty();
        frame.set_ether_type(ARP_ETHER_TYPE);
        frame.set_payload(&vec![0; len]);

        let mut arp = ArpFrame { frame };
        arp.set_hardware_addr_len(hardware_addr_len);
        arp.set_protocol_addr_len(protocol_addr_len);
        arp
    }

    /// IPv4 over Ethernet, with hardware and protocol type already filled in.
    pub fn ethernet_ipv4() -> Self {
        let mut arp = ArpFrame::new(ETHERNET_HARDWARE_ADDR_LEN, IPV4_PROTOCOL_ADDR_LEN);
        arp.set_hardware_type(ArpHardwareType::Ethernet as u16);
        arp.set_protocol_type(IPV4_ETHER_TYPE);
        arp
    }

    pub fn hardware_type(&self) -> u16 {
        self.read_u16(HTYPE)
    }

    pub fn protocol_type(&self) -> u16 {
        self.read_u16(PTYPE)
    }

    pub fn hardware_addr_len(&self) -> u8 {
        self.field(HLEN, 1)[0]
    }

    pub fn protocol_addr_len(&self) -> u8 {
        self.field(PLEN, 1)[0]
    }

    pub fn opcode(&self) -> u16 {
        self.read_u16(OPER)
    }

    /// True if this frame maps IPv4 addresses to 48-bit Ethernet addresses.
    pub fn is_ethernet_ipv4(&self) -> bool {
        self.hardware_type() == ArpHardwareType::Ethernet as u16
            && self.protocol_type() == IPV4_ETHER_TYPE
            && self.hardware_addr_len() == ETHERNET_HARDWARE_ADDR_LEN
            && self.protocol_addr_len() == IPV4_PROTOCOL_ADDR_LEN
    }

    pub fn sender_hardware_addr(&self) -> &[u8] {
        self.addr(AddrField::SenderHardware)
    }

    pub fn sender_protocol_addr(&self) -> &[u8] {
        self.addr(AddrField::SenderProtocol)
    }

    pub fn target_hardware_addr(&self) -> &[u8] {
        self.addr(AddrField::TargetHardware)
    }

    pub fn target_protocol_addr(&self) -> &[u8] {
        self.addr(AddrField::TargetProtocol)
    }

    /// Sender hardware address, if the frame carries 6 byte hardware addresses.
    pub fn sender_mac_addr(&self) -> Option<MacAddr> {
        mac_from_field(self.sender_hardware_addr())
    }

    pub fn target_mac_addr(&self) -> Option<MacAddr> {
        mac_from_field(self.target_hardware_addr())
    }

    /// Sender protocol address, if the frame carries 4 byte protocol addresses.
    pub fn sender_ipv4_addr(&self) -> Option<Ipv4Addr> {
        ipv4_from_slice(self.sender_protocol_addr())
    }

    pub fn target_ipv4_addr(&self) -> Option<Ipv4Addr> {
        ipv4_from_slice(self.target_protocol_addr())
    }

    pub fn set_hardware_type(&mut self, htype: u16) {
        self.write(HTYPE, &htype.to_be_bytes());
    }

    pub fn set_protocol_type(&mut self, ptype: u16) {
        self.write(PTYPE, &ptype.to_be_bytes());
    }

    pub fn set_hardware_addr_len(&mut self, len: u8) {
        self.write(HLEN, &[len]);
    }

    pub fn set_protocol_addr_len(&mut self, len: u8) {
        self.write(PLEN, &[len]);
    }

    pub fn set_opcode(&mut self, code: u16) {
        self.write(OPER, &code.to_be_bytes());
    }

    // The typed setters assume 6 byte hardware and 4 byte protocol addresses.
    pub fn set_sender_hardware_addr(&mut self, addr: MacAddr) {
        self.write_addr(AddrField::SenderHardware, &addr.bytes);
    }

    pub fn set_sender_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.write_addr(AddrField::SenderProtocol, &addr.octets());
    }

    pub fn set_target_hardware_addr(&mut self, addr: MacAddr) {
        self.write_addr(AddrField::TargetHardware, &addr.bytes);
    }

    pub fn set_target_protocol_addr(&mut self, addr: Ipv4Addr) {
        self.write_addr(AddrField::TargetProtocol, &addr.octets());
    }

    pub fn ethernet(&self) -> &EthernetFrame {
        &self.frame
    }

    /// Gives the underlying frame back.
    pub fn frame(self) -> EthernetFrame {
        self.frame
    }

    /// Offset and length of an address field within the ARP packet.
    fn addr_span(&self, field: AddrField) -> (usize, usize) {
        let hlen = self.hardware_addr_len() as usize;
        let plen = self.protocol_addr_len() as usize;
        match field {
            AddrField::SenderHardware => (FIXED_HEADER_LEN, hlen),
            AddrField::SenderProtocol => (FIXED_HEADER_LEN + hlen, plen),
            AddrField::TargetHardware => (FIXED_HEADER_LEN + hlen + plen, hlen),
            AddrField::TargetProtocol => (FIXED_HEADER_LEN + 2 * hlen + plen, plen),
        }
    }

    fn addr(&self, field: AddrField) -> &[u8] {
        let (offset, len) = self.addr_span(field);
        self.field(offset, len)
    }

    fn write_addr(&mut self, field: AddrField, bytes: &[u8]) {
        let (offset, _) = self.addr_span(field);
        self.write(offset, bytes);
    }

    fn field(&self, offset: usize, len: usize) -> &[u8] {
        let start = self.frame.payload_offset + offset;
        &self.frame.data[start..start + len]
    }

    fn read_u16(&self, offset: usize) -> u16 {
        let bytes = self.field(offset, 2);
        u16::from_be_bytes([bytes[0], bytes[1]])
    }

    fn write(&mut self, offset: usize, bytes: &[u8]) {
        let start = self.frame.payload_offset + offset;
        self.frame.data[start..start + bytes.len()].copy_from_slice(bytes);
    }
}

fn mac_from_field(bytes: &[u8]) -> Option<MacAddr> {
    if bytes.len() != ETHERNET_HARDWARE_ADDR_LEN as usize {
        return None;
    }
    MacAddr::from_slice(bytes)
}

fn ipv4_from_slice(bytes: &[u8]) -> Option<Ipv4Addr> {
    match *bytes {
        [a, b, c, d] => Some(Ipv4Addr::new(a, b, c, d)),
        _ => None,
    }
}

impl TryFrom<EthernetFrame> for ArpFrame {
    type Error = &'static str;

    /// Accepts frames with the ARP ether type whose payload holds every field the two length
    /// bytes call for. Trailing bytes are ignored, short frames are padded on the wire.
    fn try_from(frame: EthernetFrame) -> Result<Self, Self::Error> {
        if frame.ether_type() != ARP_ETHER_TYPE {
            return Err("not an ARP frame");
        }

        let available = frame.payload().len();
        if available < FIXED_HEADER_LEN {
            return Err("ARP header is truncated");
        }

        let arp = ArpFrame { frame };
        let (offset, len) = arp.addr_span(AddrField::TargetProtocol);
        if available < offset + len {
            return Err("ARP addresses are truncated");
        }
        Ok(arp)
    }
}
