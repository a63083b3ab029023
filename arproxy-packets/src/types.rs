use std::fmt;
use std::str::FromStr;

pub type PacketData = Vec<u8>;

/// Marker for types that wrap raw frame data.
pub trait Packet: Send + Clone {}

pub const IPV4_ETHER_TYPE: u16 = 0x0800;
pub const ARP_ETHER_TYPE: u16 = 0x0806;

/// 48-bit Ethernet hardware address, most significant byte first.
#[derive(Eq, Clone, Copy, Hash, PartialEq, Default)]
pub struct MacAddr {
    pub bytes: [u8; 6],
}

impl MacAddr {
    /// All zeroes, used as "no address".
    pub const NONE: MacAddr = MacAddr { bytes: [0; 6] };
    pub const BROADCAST: MacAddr = MacAddr { bytes: [0xff; 6] };

    pub fn new(bytes: [u8; 6]) -> MacAddr {
        MacAddr { bytes }
    }

    pub fn is_none(&self) -> bool {
        *self == MacAddr::NONE
    }

    pub fn is_broadcast(&self) -> bool {
        *self == MacAddr::BROADCAST
    }

    /// Copies a MacAddr out of the first 6 bytes of a slice, if there are that many.
    pub fn from_slice(bytes: &[u8]) -> Option<MacAddr> {
        if bytes.len() < 6 {
            return None;
        }
        let mut mac = [0; 6];
        mac.copy_from_slice(&bytes[..6]);
        Some(MacAddr::new(mac))
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = &self.bytes;
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            b[0], b[1], b[2], b[3], b[4], b[5]
        )
    }
}

impl fmt::Debug for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MacAddr({})", self)
    }
}

impl FromStr for MacAddr {
    type Err = &'static str;

    /// Parses the colon separated hex form, e.g. `aa:bb:cc:dd:ee:01`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut bytes = [0u8; 6];
        let mut octets = s.split(':');
        for byte in bytes.iter_mut() {
            let octet = octets.next().ok_or("MAC address has fewer than 6 octets")?;
            if octet.len() != 2 {
                return Err("MAC address octets must be two hex digits");
            }
            *byte = u8::from_str_radix(octet, 16).map_err(|_| "MAC address is not valid hex")?;
        }
        if octets.next().is_some() {
            return Err("MAC address has more than 6 octets");
        }
        Ok(MacAddr::new(bytes))
    }
}

impl From<[u8; 6]> for MacAddr {
    fn from(bytes: [u8; 6]) -> Self {
        MacAddr::new(bytes)
    }
}
