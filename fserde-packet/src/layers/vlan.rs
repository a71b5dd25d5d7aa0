//! 802.1Q, 802.1ad and QinQ VLAN tags
//!
//! Tag layers follow the Ethernet header in the frame description but their
//! bytes belong between the MAC addresses and the EtherType, so they are
//! inserted at offset 12 instead of appended.

use super::{EtherLayer, LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_bits, parse_number, parse_options, split_top_level};
use fserde_core::{ethertypes, Error, Result};
use std::fmt;
use tracing::debug;

/// VLAN ID used when neither `vid` nor `tci` is given
pub const DEFAULT_VLAN_ID: u16 = 1;

/// One 4-byte VLAN tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VlanTag {
    pub tpid: u16,    // Tag Protocol Identifier
    pub pcp: u8,      // Priority Code Point (3 bits)
    pub dei: bool,    // Drop Eligible Indicator
    pub vlan_id: u16, // VLAN ID (12 bits)
    /// Raw TCI; when non-zero it replaces pcp, dei and vlan_id
    pub tci: u16,
}

impl VlanTag {
    pub const SIZE: usize = 4;

    /// Parse the Dot1Q option keys, ignoring unknown ones
    fn parse(&mut self, layer: &str, options: &str) -> Result<()> {
        for opt in parse_options(layer, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "tpid" => self.tpid = parse_number(layer, key, value)?,
                "pcp" | "prio" => self.pcp = parse_bits(layer, key, value, 3)? as u8,
                "dei" | "cfi" => {
                    self.dei = match value {
                        "true" => true,
                        "false" => false,
                        _ => parse_bits(layer, key, value, 1)? == 1,
                    }
                }
                "vid" | "vlan" => self.vlan_id = parse_bits(layer, key, value, 12)? as u16,
                "tci" => self.tci = parse_number(layer, key, value)?,
                _ => debug!("{}: ignoring option '{}'", layer, key),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &VlanTag) {
        if self.tpid == 0 {
            self.tpid = defaults.tpid;
        }
        if self.pcp == 0 {
            self.pcp = defaults.pcp;
        }
        if !self.dei {
            self.dei = defaults.dei;
        }
        if self.vlan_id == 0 {
            self.vlan_id = defaults.vlan_id;
        }
        if self.tci == 0 {
            self.tci = defaults.tci;
        }
    }

    fn apply_builtin_defaults(&mut self, tpid: u16) {
        if self.tpid == 0 {
            self.tpid = tpid;
        }
        if self.tci == 0 && self.vlan_id == 0 {
            self.vlan_id = DEFAULT_VLAN_ID;
        }
    }

    /// Tag Control Information as written on the wire
    pub fn tci(&self) -> u16 {
        if self.tci != 0 {
            return self.tci;
        }
        let pcp_bits = (self.pcp as u16 & 0x07) << 13;
        let dei_bit = if self.dei { 1u16 << 12 } else { 0 };
        pcp_bits | dei_bit | (self.vlan_id & 0x0FFF)
    }

    pub fn to_bytes(&self) -> [u8; 4] {
        let mut bytes = [0u8; 4];
        bytes[0..2].copy_from_slice(&self.tpid.to_be_bytes());
        bytes[2..4].copy_from_slice(&self.tci().to_be_bytes());
        bytes
    }
}

impl fmt::Display for VlanTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tpid=0x{:04x}", self.tpid)?;
        if self.tci != 0 {
            write!(f, ", tci=0x{:04x}", self.tci)
        } else {
            write!(
                f,
                ", prio={}, cfi={}, vlan={}",
                self.pcp, self.dei as u8, self.vlan_id
            )
        }
    }
}

fn insert_tags(buf: &mut FrameBuffer, tags: &[&VlanTag]) -> Result<()> {
    let bytes: Vec<u8> = tags.iter().flat_map(|tag| tag.to_bytes()).collect();
    buf.insert_at(EtherLayer::ETHER_TYPE_OFFSET, &bytes)
}

/// `Dot1Q(tpid=.., prio=.., cfi=.., vlan=.., tci=..)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dot1QLayer {
    pub tag: VlanTag,
}

impl LayerCodec for Dot1QLayer {
    const KIND: LayerKind = LayerKind::Dot1Q;

    fn parse(&mut self, options: &str) -> Result<()> {
        self.tag.parse(Self::KIND.name(), options)
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        self.tag.apply_defaults(&defaults.tag);
    }

    fn apply_builtin_defaults(&mut self) {
        self.tag.apply_builtin_defaults(ethertypes::DOT1Q);
    }

    fn header_len(&self) -> usize {
        VlanTag::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        insert_tags(buf, &[&self.tag])
    }
}

impl fmt::Display for Dot1QLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dot1Q({})", self.tag)
    }
}

/// `Dot1AD(..)`: a single 802.1ad service tag
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Dot1ADLayer {
    pub tag: VlanTag,
}

impl LayerCodec for Dot1ADLayer {
    const KIND: LayerKind = LayerKind::Dot1AD;

    fn parse(&mut self, options: &str) -> Result<()> {
        self.tag.parse(Self::KIND.name(), options)
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        self.tag.apply_defaults(&defaults.tag);
    }

    fn apply_builtin_defaults(&mut self) {
        self.tag.apply_builtin_defaults(ethertypes::QINQ);
    }

    fn header_len(&self) -> usize {
        VlanTag::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        insert_tags(buf, &[&self.tag])
    }
}

impl fmt::Display for Dot1ADLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Dot1AD({})", self.tag)
    }
}

/// `QinQ(Dot1q{..}, Dot1q{..})`: service tag followed by customer tag
///
/// The outer tag always carries TPID 0x88A8.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QinQLayer {
    pub outer: VlanTag,
    pub inner: VlanTag,
}

impl QinQLayer {
    fn parse_group(group: &str) -> Result<&str> {
        let malformed = || {
            Error::malformed(format!(
                "QinQ: expected Dot1q{{...}}, found '{}'",
                group
            ))
        };

        let (name, rest) = match group.split_once('{') {
            Some((name, rest)) => (name, rest.strip_suffix('}').ok_or_else(malformed)?),
            None => (group, ""),
        };
        if !name.trim().eq_ignore_ascii_case("dot1q") {
            return Err(malformed());
        }
        Ok(rest)
    }
}

impl LayerCodec for QinQLayer {
    const KIND: LayerKind = LayerKind::QinQ;

    fn parse(&mut self, options: &str) -> Result<()> {
        let groups: Vec<&str> = split_top_level(options, ',')
            .into_iter()
            .filter(|g| !g.is_empty())
            .collect();
        if groups.len() > 2 {
            return Err(Error::malformed(format!(
                "QinQ: at most two Dot1q groups, found {}",
                groups.len()
            )));
        }

        let tags = [&mut self.outer, &mut self.inner];
        for (tag, group) in tags.into_iter().zip(groups) {
            tag.parse(Self::KIND.name(), Self::parse_group(group)?)?;
        }
        self.outer.tpid = ethertypes::QINQ;
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        self.outer.apply_defaults(&defaults.outer);
        self.inner.apply_defaults(&defaults.inner);
    }

    fn apply_builtin_defaults(&mut self) {
        self.outer.apply_builtin_defaults(ethertypes::QINQ);
        self.inner.apply_builtin_defaults(ethertypes::DOT1Q);
    }

    fn header_len(&self) -> usize {
        2 * VlanTag::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        insert_tags(buf, &[&self.outer, &self.inner])
    }
}

impl fmt::Display for QinQLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "QinQ(Dot1q{{{}}}, Dot1q{{{}}})", self.outer, self.inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ether_bytes() -> FrameBuffer {
        let mut buf = FrameBuffer::new();
        buf.put_slice(&[0x11; 6]).put_slice(&[0x22; 6]).put_u16(0x0800);
        buf
    }

    #[test]
    fn test_tci_packing() {
        let tag = VlanTag {
            tpid: 0x8100,
            pcp: 7,
            dei: true,
            vlan_id: 0x22,
            tci: 0,
        };
        assert_eq!(tag.tci(), 0xF022);
        assert_eq!(tag.to_bytes(), [0x81, 0x00, 0xF0, 0x22]);
    }

    #[test]
    fn test_dot1q_builtin_defaults() {
        let mut layer = Dot1QLayer::default();
        layer.parse("").unwrap();
        layer.apply_builtin_defaults();
        assert_eq!(layer.tag.tpid, 0x8100);
        assert_eq!(layer.tag.vlan_id, 1);
    }

    #[test]
    fn test_dot1q_aliases_and_insert() {
        let mut layer = Dot1QLayer::default();
        layer.parse("tpid=0x8100, vlan=0x22, cfi=1, prio=7").unwrap();
        layer.apply_builtin_defaults();

        let mut buf = ether_bytes();
        layer.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 18);
        assert_eq!(&buf.as_slice()[12..18], &[0x81, 0x00, 0xF0, 0x22, 0x08, 0x00]);
        assert_eq!(&buf.as_slice()[..12], &ether_bytes().as_slice()[..12]);
    }

    #[test]
    fn test_dot1q_tci_overrides_fields() {
        let mut layer = Dot1QLayer::default();
        layer.parse("vid=5, tci=0x3064, dei=true").unwrap();
        assert_eq!(layer.tag.tci(), 0x3064);
    }

    #[test]
    fn test_dot1q_ignores_unknown_keys() {
        let mut layer = Dot1QLayer::default();
        layer.parse("vid=10, color=blue").unwrap();
        assert_eq!(layer.tag.vlan_id, 10);
    }

    #[test]
    fn test_dot1q_rejects_out_of_range() {
        let mut layer = Dot1QLayer::default();
        assert!(layer.parse("vid=4096").is_err());
        assert!(layer.parse("pcp=8").is_err());
        assert!(layer.parse("dei=maybe").is_err());
    }

    #[test]
    fn test_dot1q_defaults_from_template() {
        let mut layer = Dot1QLayer::default();
        layer.parse("prio=3").unwrap();
        layer.apply_builtin_defaults();
        let mut template = Dot1QLayer::default();
        template.parse("vlan=100, prio=5, tpid=0x9100").unwrap();

        layer.apply_defaults(&template);
        assert_eq!(layer.tag.pcp, 3);
        assert_eq!(layer.tag.vlan_id, DEFAULT_VLAN_ID);
        assert_eq!(layer.tag.tpid, 0x8100);

        let mut bare = Dot1QLayer::default();
        bare.parse("").unwrap();
        bare.apply_builtin_defaults();
        let mut tci_template = Dot1QLayer::default();
        tci_template.parse("tci=0x2064").unwrap();
        bare.apply_defaults(&tci_template);
        assert_eq!(bare.tag.tci(), 0x2064);
    }

    #[test]
    fn test_dot1ad_uses_service_tpid() {
        let mut layer = Dot1ADLayer::default();
        layer.parse("vlan=300").unwrap();
        layer.apply_builtin_defaults();

        let mut buf = ether_bytes();
        layer.write(&mut buf).unwrap();
        assert_eq!(&buf.as_slice()[12..16], &[0x88, 0xA8, 0x01, 0x2C]);
    }

    #[test]
    fn test_qinq_two_groups() {
        let mut layer = QinQLayer::default();
        layer.parse("Dot1q{vlan=12}, dot1Q{vlan=212, prio=1}").unwrap();
        layer.apply_builtin_defaults();

        let mut buf = ether_bytes();
        layer.write(&mut buf).unwrap();
        assert_eq!(buf.len(), 22);
        assert_eq!(
            &buf.as_slice()[12..22],
            &[0x88, 0xA8, 0x00, 0x0C, 0x81, 0x00, 0x20, 0xD4, 0x08, 0x00]
        );
    }

    #[test]
    fn test_qinq_outer_tpid_is_forced() {
        let mut layer = QinQLayer::default();
        layer.parse("Dot1q{tpid=0x9100, vlan=1}").unwrap();
        assert_eq!(layer.outer.tpid, 0x88A8);
    }

    #[test]
    fn test_qinq_bad_groups() {
        let mut layer = QinQLayer::default();
        assert!(matches!(
            layer.parse("Dot1x{vlan=1}").unwrap_err(),
            Error::MalformedFrameString(_)
        ));
        assert!(layer
            .parse("Dot1q{vlan=1}, Dot1q{vlan=2}, Dot1q{vlan=3}")
            .is_err());
        assert!(layer.parse("Dot1q{vlan=1").is_err());
    }

    #[test]
    fn test_qinq_display_reparses() {
        let mut layer = QinQLayer::default();
        layer.parse("Dot1q{vlan=12}, Dot1q{vlan=212}").unwrap();
        layer.apply_builtin_defaults();
        let text = layer.to_string();
        assert!(text.starts_with("QinQ(Dot1q{tpid=0x88a8"));

        let inner = &text["QinQ(".len()..text.len() - 1];
        let mut again = QinQLayer::default();
        again.parse(inner).unwrap();
        assert_eq!(again.inner.vlan_id, 212);
    }

    #[test]
    fn test_insert_before_ether_fails() {
        let layer = Dot1QLayer::default();
        let mut buf = FrameBuffer::new();
        assert!(matches!(
            layer.write(&mut buf).unwrap_err(),
            Error::BufferBoundsViolation { .. }
        ));
    }
}
