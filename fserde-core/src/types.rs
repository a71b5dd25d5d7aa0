//! Common types used throughout fserde

use std::fmt;
use std::str::FromStr;

/// MAC Address (6 bytes)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct MacAddr(pub [u8; 6]);

impl MacAddr {
    /// Create a new MAC address
    pub const fn new(bytes: [u8; 6]) -> Self {
        Self(bytes)
    }

    /// Broadcast MAC address (ff:ff:ff:ff:ff:ff)
    pub const fn broadcast() -> Self {
        Self([0xff; 6])
    }

    /// Zero MAC address (00:00:00:00:00:00)
    pub const fn zero() -> Self {
        Self([0x00; 6])
    }

    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 6]
    }

    /// Get bytes as slice
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn octets(&self) -> [u8; 6] {
        self.0
    }
}

impl fmt::Display for MacAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02x}:{:02x}:{:02x}:{:02x}:{:02x}:{:02x}",
            self.0[0], self.0[1], self.0[2], self.0[3], self.0[4], self.0[5]
        )
    }
}

impl FromStr for MacAddr {
    type Err = crate::Error;

    /// Accepts `aa:bb:cc:dd:ee:ff`, `aa-bb-cc-dd-ee-ff`, `aabb.ccdd.eeff`
    /// and `aabb:ccdd:eeff`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || {
            crate::Error::invalid_option("mac", s, "expected six hex octets")
        };

        let parts: Vec<&str> = s.trim().split([':', '-', '.']).collect();
        if !parts.iter().all(|p| p.chars().all(|c| c.is_ascii_hexdigit())) {
            return Err(invalid());
        }
        let hex: String = match parts.len() {
            6 if parts.iter().all(|p| !p.is_empty() && p.len() <= 2) => parts
                .iter()
                .map(|p| format!("{:0>2}", p))
                .collect(),
            3 if parts.iter().all(|p| p.len() == 4) => parts.concat(),
            _ => return Err(invalid()),
        };

        let mut bytes = [0u8; 6];
        for (i, byte) in bytes.iter_mut().enumerate() {
            *byte = u8::from_str_radix(&hex[i * 2..i * 2 + 2], 16).map_err(|_| invalid())?;
        }

        Ok(MacAddr(bytes))
    }
}

/// Namespace a frame is registered in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FrameType {
    /// Fully resolved frame with wire bytes
    #[default]
    Normal,
    /// Template whose fields backfill unset fields of normal frames
    Default,
}

impl fmt::Display for FrameType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameType::Normal => write!(f, "Normal"),
            FrameType::Default => write!(f, "Default"),
        }
    }
}

/// Ethertype constants
pub mod ethertypes {
    pub const IPV4: u16 = 0x0800;
    pub const DOT1Q: u16 = 0x8100;
    pub const IPV6: u16 = 0x86DD;
    pub const QINQ: u16 = 0x88A8;
}

/// IP protocol numbers used by the L4 layers
pub mod ip_protocols {
    pub const ICMP: u8 = 1;
    pub const TCP: u8 = 6;
    pub const UDP: u8 = 17;
    pub const ICMPV6: u8 = 58;
    pub const SCTP: u8 = 132;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mac_colon_form() {
        let mac: MacAddr = "00:11:22:33:44:55".parse().unwrap();
        assert_eq!(mac.0, [0x00, 0x11, 0x22, 0x33, 0x44, 0x55]);
        assert_eq!(mac.to_string(), "00:11:22:33:44:55");
    }

    #[test]
    fn test_mac_alternate_forms() {
        let expected = MacAddr([0xaa, 0xbb, 0xcc, 0xdd, 0xee, 0xff]);
        assert_eq!("aa-bb-cc-dd-ee-ff".parse::<MacAddr>().unwrap(), expected);
        assert_eq!("aabb.ccdd.eeff".parse::<MacAddr>().unwrap(), expected);
        assert_eq!("AABB:CCDD:EEFF".parse::<MacAddr>().unwrap(), expected);
        assert_eq!(
            "0:1:2:3:4:5".parse::<MacAddr>().unwrap(),
            MacAddr([0, 1, 2, 3, 4, 5])
        );
    }

    #[test]
    fn test_mac_invalid() {
        assert!("00:11:22:33:44".parse::<MacAddr>().is_err());
        assert!("zz:11:22:33:44:55".parse::<MacAddr>().is_err());
        assert!("aabb.ccdd".parse::<MacAddr>().is_err());
        assert!("".parse::<MacAddr>().is_err());
        assert!("+1:11:22:33:44:55".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_non_ascii_rejected() {
        let err = "a\u{e9}a.bbcc.ddee".parse::<MacAddr>().unwrap_err();
        assert!(matches!(err, crate::Error::InvalidOption { .. }));
        assert!("\u{e9}\u{e9}:11:22:33:44:55".parse::<MacAddr>().is_err());
    }

    #[test]
    fn test_mac_zero() {
        assert!(MacAddr::zero().is_zero());
        assert!(!MacAddr::broadcast().is_zero());
        assert_eq!(MacAddr::default(), MacAddr::zero());
    }
}
