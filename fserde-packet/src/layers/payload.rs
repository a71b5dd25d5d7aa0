//! Payload bytes following the protocol headers

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_number, parse_options};
use fserde_core::Result;
use std::fmt;
use tracing::debug;

/// How payload bytes are generated
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum FillPattern {
    /// All zero bytes
    #[default]
    None,
    Fill8(u8),
    Fill16(u16),
    Fill32(u32),
    Fill64(u64),
    /// Literal bytes, repeated when the payload is longer
    Literal(Vec<u8>),
}

impl FillPattern {
    /// One period of the pattern in network byte order
    pub fn bytes(&self) -> Vec<u8> {
        match self {
            FillPattern::None => vec![0],
            FillPattern::Fill8(v) => vec![*v],
            FillPattern::Fill16(v) => v.to_be_bytes().to_vec(),
            FillPattern::Fill32(v) => v.to_be_bytes().to_vec(),
            FillPattern::Fill64(v) => v.to_be_bytes().to_vec(),
            FillPattern::Literal(data) if data.is_empty() => vec![0],
            FillPattern::Literal(data) => data.clone(),
        }
    }

    pub fn is_none(&self) -> bool {
        matches!(self, FillPattern::None)
    }
}

impl fmt::Display for FillPattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FillPattern::None => Ok(()),
            FillPattern::Fill8(v) => write!(f, ", fill=0x{:02x}", v),
            FillPattern::Fill16(v) => write!(f, ", fill16=0x{:04x}", v),
            FillPattern::Fill32(v) => write!(f, ", fill32=0x{:08x}", v),
            FillPattern::Fill64(v) => write!(f, ", fill64=0x{:016x}", v),
            FillPattern::Literal(data) => {
                write!(f, ", string='{}'", String::from_utf8_lossy(data))
            }
        }
    }
}

/// `Payload(size=.., fill=.. | fill16=.. | fill32=.. | fill64=.. | string='..')`
///
/// Unknown keys are ignored. A string without a size sets the size to the
/// string length.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PayloadLayer {
    pub length: u16,
    pub fill: FillPattern,
}

impl LayerCodec for PayloadLayer {
    const KIND: LayerKind = LayerKind::Payload;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "size" | "length" | "len" => self.length = parse_number(name, key, value)?,
                "fill" | "fill8" => self.fill = FillPattern::Fill8(parse_number(name, key, value)?),
                "fill16" => self.fill = FillPattern::Fill16(parse_number(name, key, value)?),
                "fill32" => self.fill = FillPattern::Fill32(parse_number(name, key, value)?),
                "fill64" => self.fill = FillPattern::Fill64(parse_number(name, key, value)?),
                "string" => self.fill = FillPattern::Literal(value.as_bytes().to_vec()),
                _ => debug!("{}: ignoring option '{}'", name, key),
            }
        }

        if self.length == 0 {
            if let FillPattern::Literal(data) = &self.fill {
                self.length = data.len().min(u16::MAX as usize) as u16;
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.length == 0 {
            self.length = defaults.length;
        }
        if self.fill.is_none() {
            self.fill = defaults.fill.clone();
        }
    }

    fn header_len(&self) -> usize {
        self.length as usize
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        let pattern = self.fill.bytes();
        let data: Vec<u8> = pattern
            .iter()
            .copied()
            .cycle()
            .take(self.length as usize)
            .collect();
        buf.put_slice(&data);
        Ok(())
    }
}

impl fmt::Display for PayloadLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Payload(size={}{})", self.length, self.fill)
    }
}
