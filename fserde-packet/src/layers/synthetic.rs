//! Test-traffic layers that are not wire protocols

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_number, parse_options, unknown_key};
use fserde_core::Result;
use std::fmt;
use tracing::debug;

/// `Echo()`: marks the frame for echo handling, contributes no bytes
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EchoLayer;

impl LayerCodec for EchoLayer {
    const KIND: LayerKind = LayerKind::Echo;

    fn parse(&mut self, options: &str) -> Result<()> {
        if !options.trim().is_empty() {
            debug!("Echo: ignoring options '{}'", options.trim());
        }
        Ok(())
    }

    fn apply_defaults(&mut self, _defaults: &Self) {}

    fn header_len(&self) -> usize {
        0
    }

    fn write(&self, _buf: &mut FrameBuffer) -> Result<()> {
        Ok(())
    }
}

impl fmt::Display for EchoLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Echo()")
    }
}

/// `TSC(value=..)`: 8-byte timestamp counter slot stamped at transmit time
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TscLayer {
    pub value: u64,
}

impl TscLayer {
    /// 8 bytes, a full 64-bit counter; the 4-byte slot of older captures is not produced
    pub const SIZE: usize = 8;
}

impl LayerCodec for TscLayer {
    const KIND: LayerKind = LayerKind::Tsc;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            match opt.key.as_str() {
                "value" => self.value = parse_number(name, &opt.key, &opt.value)?,
                _ => return Err(unknown_key(name, &opt.key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.value == 0 {
            self.value = defaults.value;
        }
    }

    fn header_len(&self) -> usize {
        Self::SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        buf.put_u64(self.value);
        Ok(())
    }
}

impl fmt::Display for TscLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.value == 0 {
            write!(f, "TSC()")
        } else {
            write!(f, "TSC(value={})", self.value)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_echo_writes_nothing() {
        let mut echo = EchoLayer;
        echo.parse("").unwrap();
        let mut buf = FrameBuffer::new();
        echo.write(&mut buf).unwrap();
        assert!(buf.is_empty());
    }

    #[test]
    fn test_tsc_placeholder() {
        let mut tsc = TscLayer::default();
        tsc.parse("").unwrap();
        let mut buf = FrameBuffer::new();
        tsc.write(&mut buf).unwrap();
        assert_eq!(buf.as_slice(), &[0u8; 8]);

        tsc.parse("value=0x0102").unwrap();
        assert_eq!(tsc.to_string(), "TSC(value=258)");
    }

    #[test]
    fn test_tsc_rejects_unknown_key() {
        let mut tsc = TscLayer::default();
        assert!(tsc.parse("hz=100").is_err());
    }
}
