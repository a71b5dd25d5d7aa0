//! VXLAN header (RFC 7348)

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_bits, parse_number, parse_options, unknown_key};
use fserde_core::Result;
use std::fmt;

/// Flags with the I bit set (valid VNI)
pub const VXLAN_FLAG_VNI: u8 = 0x08;

/// `VxLan(flags=.., vni=..)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VxlanLayer {
    pub flags: u8,
    /// 24-bit VXLAN Network Identifier
    pub vni: u32,
}

impl VxlanLayer {
    pub const HEADER_SIZE: usize = 8;
}

impl LayerCodec for VxlanLayer {
    const KIND: LayerKind = LayerKind::VxLan;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "flags" => self.flags = parse_number(name, key, value)?,
                "vni" => self.vni = parse_bits(name, key, value, 24)?,
                _ => return Err(unknown_key(name, key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.flags == 0 {
            self.flags = defaults.flags;
        }
        if self.vni == 0 {
            self.vni = defaults.vni;
        }
    }

    fn apply_builtin_defaults(&mut self) {
        if self.flags == 0 {
            self.flags = VXLAN_FLAG_VNI;
        }
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        // flags(8) reserved(24) vni(24) reserved(8)
        buf.put_u32((self.flags as u32) << 24)
            .put_u32((self.vni & 0x00FF_FFFF) << 8);
        Ok(())
    }
}

impl fmt::Display for VxlanLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "VxLan(flags=0x{:02x}, vni={})", self.flags, self.vni)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write_with_default_flags() {
        let mut vxlan = VxlanLayer::default();
        vxlan.parse("vni=0x123456").unwrap();
        vxlan.apply_builtin_defaults();

        let mut buf = FrameBuffer::new();
        vxlan.write(&mut buf).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0x08, 0x00, 0x00, 0x00, 0x12, 0x34, 0x56, 0x00]
        );
    }

    #[test]
    fn test_vni_range() {
        let mut vxlan = VxlanLayer::default();
        assert!(vxlan.parse("vni=0x1000000").is_err());
        assert!(vxlan.parse("port=4789").is_err());
    }
}
