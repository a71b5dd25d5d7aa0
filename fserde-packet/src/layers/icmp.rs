//! ICMPv4 and ICMPv6 echo-style headers
//!
//! Both write type, code, checksum, identifier and sequence number. The
//! checksum is patched once the whole frame is written: ICMPv4 sums the
//! message alone, ICMPv6 adds the IPv6 pseudo-header.

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_number, parse_options};
use fserde_core::Result;
use std::fmt;
use tracing::debug;

/// Fields shared by both ICMP versions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IcmpHeader {
    pub icmp_type: u8,
    pub code: u8,
    pub identifier: u16,
    pub sequence: u16,
}

impl IcmpHeader {
    pub const SIZE: usize = 8;

    /// Offset of the checksum field
    pub const CHECKSUM_OFFSET: usize = 2;

    fn parse(&mut self, layer: &str, options: &str) -> Result<()> {
        for opt in parse_options(layer, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "type" => self.icmp_type = parse_number(layer, key, value)?,
                "code" => self.code = parse_number(layer, key, value)?,
                "ident" | "identifier" | "id" => self.identifier = parse_number(layer, key, value)?,
                "seq" | "seqnum" => self.sequence = parse_number(layer, key, value)?,
                _ => debug!("{}: ignoring option '{}'", layer, key),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &IcmpHeader) {
        if self.icmp_type == 0 {
            self.icmp_type = defaults.icmp_type;
        }
        if self.code == 0 {
            self.code = defaults.code;
        }
        if self.identifier == 0 {
            self.identifier = defaults.identifier;
        }
        if self.sequence == 0 {
            self.sequence = defaults.sequence;
        }
    }

    fn write(&self, buf: &mut FrameBuffer) {
        buf.put_u8(self.icmp_type)
            .put_u8(self.code)
            .put_u16(0)
            .put_u16(self.identifier)
            .put_u16(self.sequence);
    }
}

impl fmt::Display for IcmpHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "type={}, code={}, ident={}, seq={}",
            self.icmp_type, self.code, self.identifier, self.sequence
        )
    }
}

/// `ICMPv4(type=.., code=.., ident=.., seq=..)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icmpv4Layer {
    pub header: IcmpHeader,
}

impl LayerCodec for Icmpv4Layer {
    const KIND: LayerKind = LayerKind::Icmpv4;

    fn parse(&mut self, options: &str) -> Result<()> {
        self.header.parse(Self::KIND.name(), options)
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        self.header.apply_defaults(&defaults.header);
    }

    fn header_len(&self) -> usize {
        IcmpHeader::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        self.header.write(buf);
        Ok(())
    }
}

impl fmt::Display for Icmpv4Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ICMPv4({})", self.header)
    }
}

/// `ICMPv6(type=.., code=.., ident=.., seq=..)`
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Icmpv6Layer {
    pub header: IcmpHeader,
}

impl LayerCodec for Icmpv6Layer {
    const KIND: LayerKind = LayerKind::Icmpv6;

    fn parse(&mut self, options: &str) -> Result<()> {
        self.header.parse(Self::KIND.name(), options)
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        self.header.apply_defaults(&defaults.header);
    }

    fn header_len(&self) -> usize {
        IcmpHeader::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        self.header.write(buf);
        Ok(())
    }
}

impl fmt::Display for Icmpv6Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ICMPv6({})", self.header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_icmpv4_echo_request() {
        let mut icmp = Icmpv4Layer::default();
        icmp.parse("type=8, code=0, ident=0x1234, seq=1").unwrap();

        let mut buf = FrameBuffer::new();
        icmp.write(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0x08, 0x00, 0x00, 0x00, 0x12, 0x34, 0x00, 0x01]);
    }

    #[test]
    fn test_icmpv6_aliases_and_defaults() {
        let mut icmp = Icmpv6Layer::default();
        icmp.parse("identifier=7, seqnum=9, color=red").unwrap();

        let mut template = Icmpv6Layer::default();
        template.parse("type=128, seq=100").unwrap();

        icmp.apply_defaults(&template);
        assert_eq!(icmp.header.icmp_type, 128);
        assert_eq!(icmp.header.identifier, 7);
        assert_eq!(icmp.header.sequence, 9);
    }

    #[test]
    fn test_rejects_bad_number() {
        let mut icmp = Icmpv4Layer::default();
        assert!(icmp.parse("type=256").is_err());
    }
}
