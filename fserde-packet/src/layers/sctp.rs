//! SCTP common header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_number, parse_options, unknown_key};
use fserde_core::Result;
use std::fmt;

/// `SCTP(sport=.., dport=.., tag=..)`
///
/// Unknown keys are rejected. The CRC-32c checksum covers the whole SCTP
/// packet and is patched once the frame is complete.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SctpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub verification_tag: u32,
}

impl SctpLayer {
    pub const HEADER_SIZE: usize = 12;

    /// Offset of the CRC-32c field
    pub const CHECKSUM_OFFSET: usize = 8;
}

impl LayerCodec for SctpLayer {
    const KIND: LayerKind = LayerKind::Sctp;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "sport" => self.src_port = parse_number(name, key, value)?,
                "dport" => self.dst_port = parse_number(name, key, value)?,
                "tag" | "vtag" => self.verification_tag = parse_number(name, key, value)?,
                _ => return Err(unknown_key(name, key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.src_port == 0 {
            self.src_port = defaults.src_port;
        }
        if self.dst_port == 0 {
            self.dst_port = defaults.dst_port;
        }
        if self.verification_tag == 0 {
            self.verification_tag = defaults.verification_tag;
        }
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        buf.put_u16(self.src_port)
            .put_u16(self.dst_port)
            .put_u32(self.verification_tag)
            .put_u32(0);
        Ok(())
    }
}

impl fmt::Display for SctpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "SCTP(sport={}, dport={}, tag=0x{:08x})",
            self.src_port, self.dst_port, self.verification_tag
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_write() {
        let mut sctp = SctpLayer::default();
        sctp.parse("sport=2905, dport=2905, vtag=0xdeadbeef").unwrap();

        let mut buf = FrameBuffer::new();
        sctp.write(&mut buf).unwrap();
        assert_eq!(
            buf.as_slice(),
            &[0x0b, 0x59, 0x0b, 0x59, 0xde, 0xad, 0xbe, 0xef, 0, 0, 0, 0]
        );
    }

    #[test]
    fn test_strict_keys() {
        let mut sctp = SctpLayer::default();
        assert!(sctp.parse("chunk=1").is_err());
    }
}
