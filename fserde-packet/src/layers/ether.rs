//! Ethernet II header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_mac, parse_number, parse_options, unknown_key};
use fserde_core::{MacAddr, Result};
use std::fmt;

/// `Ether(dst=.., src=.., proto=..)`
///
/// Unknown keys are rejected. MAC addresses left unset are written as zero.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EtherLayer {
    pub dst: MacAddr,
    pub src: MacAddr,
    pub ether_type: u16,
}

impl EtherLayer {
    pub const HEADER_SIZE: usize = 14;

    /// Offset of the EtherType field, where VLAN tags are inserted
    pub const ETHER_TYPE_OFFSET: usize = 12;
}

impl LayerCodec for EtherLayer {
    const KIND: LayerKind = LayerKind::Ether;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            match opt.key.as_str() {
                "dst" => self.dst = parse_mac(name, &opt.key, &opt.value)?,
                "src" => self.src = parse_mac(name, &opt.key, &opt.value)?,
                "proto" | "ethertype" => {
                    self.ether_type = parse_number(name, &opt.key, &opt.value)?
                }
                _ => return Err(unknown_key(name, &opt.key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.dst.is_zero() {
            self.dst = defaults.dst;
        }
        if self.src.is_zero() {
            self.src = defaults.src;
        }
        if self.ether_type == 0 {
            self.ether_type = defaults.ether_type;
        }
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        buf.put_mac(&self.dst)
            .put_mac(&self.src)
            .put_u16(self.ether_type);
        Ok(())
    }
}

impl fmt::Display for EtherLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Ether(dst={}, src={}, proto=0x{:04x})",
            self.dst, self.src, self.ether_type
        )
    }
}
