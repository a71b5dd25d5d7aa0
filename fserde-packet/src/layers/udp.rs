//! UDP header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_bool, parse_number, parse_options};
use fserde_core::Result;
use std::fmt;
use tracing::debug;

/// `UDP(sport=.., dport=.., checksum=on|off)`
///
/// Unknown keys are ignored. `length` is set from the rest of the frame. The
/// checksum is computed only when enabled; otherwise the field stays zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub length: u16,
    pub checksum: bool,
}

impl UdpLayer {
    /// UDP header size in bytes
    pub const HEADER_SIZE: usize = 8;

    /// Offset of the checksum field
    pub const CHECKSUM_OFFSET: usize = 6;
}

impl LayerCodec for UdpLayer {
    const KIND: LayerKind = LayerKind::Udp;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "sport" | "srcport" | "src" => self.src_port = parse_number(name, key, value)?,
                "dport" | "dstport" | "dst" => self.dst_port = parse_number(name, key, value)?,
                "checksum" => self.checksum = parse_bool(name, key, value)?,
                _ => debug!("{}: ignoring option '{}'", name, key),
            }
        }
        Ok(())
    }

    /// A template can enable the checksum but never disable it
    fn apply_defaults(&mut self, defaults: &Self) {
        if self.src_port == 0 {
            self.src_port = defaults.src_port;
        }
        if self.dst_port == 0 {
            self.dst_port = defaults.dst_port;
        }
        self.checksum |= defaults.checksum;
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        buf.put_u16(self.src_port)
            .put_u16(self.dst_port)
            .put_u16(self.length)
            .put_u16(0); // checksum, patched once the frame is complete
        Ok(())
    }
}

impl fmt::Display for UdpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "UDP(sport={}, dport={}, checksum={})",
            self.src_port,
            self.dst_port,
            if self.checksum { "on" } else { "off" }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parsed(options: &str) -> UdpLayer {
        let mut udp = UdpLayer::default();
        udp.parse(options).unwrap();
        udp
    }

    #[test]
    fn test_parse_aliases() {
        let udp = parsed("srcport=1111, dst=3333, checksum=true");
        assert_eq!(udp.src_port, 1111);
        assert_eq!(udp.dst_port, 3333);
        assert!(udp.checksum);
    }

    #[test]
    fn test_ignores_unknown_keys() {
        let udp = parsed("sport=1, ttl=4");
        assert_eq!(udp.src_port, 1);
    }

    #[test]
    fn test_bad_values_rejected() {
        let mut udp = UdpLayer::default();
        assert!(udp.parse("sport=70000").is_err());
        assert!(udp.parse("checksum=sometimes").is_err());
    }

    #[test]
    fn test_write() {
        let mut udp = parsed("sport=53, dport=53");
        udp.length = 8;
        let mut buf = FrameBuffer::new();
        udp.write(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0x00, 0x35, 0x00, 0x35, 0x00, 0x08, 0x00, 0x00]);
    }

    #[test]
    fn test_defaults_fill_only_zero_port() {
        let template = parsed("dport=9000");

        let mut udp = parsed("dport=0");
        udp.apply_defaults(&template);
        assert_eq!(udp.dst_port, 9000);

        let mut udp = parsed("dport=53");
        udp.apply_defaults(&template);
        assert_eq!(udp.dst_port, 53);
    }

    #[test]
    fn test_checksum_default_is_one_directional() {
        let on = parsed("checksum=on");
        let off = parsed("checksum=off");

        let mut udp = parsed("checksum=off");
        udp.apply_defaults(&on);
        assert!(udp.checksum);

        let mut udp = parsed("checksum=on");
        udp.apply_defaults(&off);
        assert!(udp.checksum);
    }
}
