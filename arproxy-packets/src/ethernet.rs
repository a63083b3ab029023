use crate::*;
use std::borrow::Cow;

/// Length of an untagged Ethernet II header.
pub const ETHERNET_HEADER_LEN: usize = 14;

#[derive(Clone, Debug)]
pub struct EthernetFrame {
    pub data: PacketData,
    pub layer2_offset: usize,
    pub payload_offset: usize,
}

impl Packet for EthernetFrame {}

impl EthernetFrame {
    /// Wraps bytes as received from the wire. `layer2_offset` skips anything the capture put in
    /// front of the Ethernet header. This is how inbound frames enter the proxy.
    pub fn from_buffer(
        frame: PacketData,
        layer2_offset: usize,
    ) -> Result<EthernetFrame, &'static str> {
        // | dst MAC (6) | src MAC (6) | ether type (2) | payload
        // 802.1Q tags are not unwrapped.
        if frame.len() < layer2_offset + ETHERNET_HEADER_LEN {
            return Err("frame is shorter than an Ethernet header");
        }

        Ok(EthernetFrame {
            data: frame,
            layer2_offset,
            payload_offset: ETHERNET_HEADER_LEN + layer2_offset,
        })
    }

    /// A zeroed header with no payload.
    pub fn empty() -> EthernetFrame {
        EthernetFrame {
            data: vec![0; ETHERNET_HEADER_LEN],
            layer2_offset: 0,
            payload_offset: ETHERNET_HEADER_LEN,
        }
    }

    pub fn dest_mac(&self) -> MacAddr {
        self.mac_at(self.layer2_offset)
    }

    pub fn src_mac(&self) -> MacAddr {
        self.mac_at(self.layer2_offset + 6)
    }

    pub fn set_dest_mac(&mut self, mac: MacAddr) {
        let start = self.layer2_offset;
        self.data[start..start + 6].copy_from_slice(&mac.bytes);
    }

    pub fn set_src_mac(&mut self, mac: MacAddr) {
        let start = self.layer2_offset + 6;
        self.data[start..start + 6].copy_from_slice(&mac.bytes);
    }

    pub fn ether_type(&self) -> u16 {
        let start = self.layer2_offset + 12;
        u16::from_be_bytes([self.data[start], self.data[start + 1]])
    }

    pub fn set_ether_type(&mut self, ether_type: u16) {
        let start = self.layer2_offset + 12;
        self.data[start..start + 2].copy_from_slice(&ether_type.to_be_bytes());
    }

    pub fn payload(&self) -> Cow<[u8]> {
        Cow::from(&self.data[self.payload_offset..])
    }

    /// Replaces everything after the header.
    pub fn set_payload(&mut self, payload: &[u8]) {
        self.data.truncate(self.payload_offset);
        self.data.reserve_exact(payload.len());
        self.data.extend(payload);
    }

    /// The frame bytes from the layer 2 header onward, as they go on the wire.
    pub fn as_bytes(&self) -> &[u8] {
        &self.data[self.layer2_offset..]
    }

    fn mac_at(&self, start: usize) -> MacAddr {
        let mut bytes = [0u8; 6];
        bytes.copy_from_slice(&self.data[start..start + 6]);
        MacAddr::new(bytes)
    }
}

/// Frames compare by their wire bytes; whatever precedes the layer 2 header is ignored.
impl PartialEq for EthernetFrame {
    fn eq(&self, other: &Self) -> bool {
        self.data[self.layer2_offset..] == other.data[other.layer2_offset..]
    }
}

impl Eq for EthernetFrame {}
