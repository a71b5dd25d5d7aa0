//! IPv6 fixed header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_bits, parse_ipv6, parse_number, parse_options, unknown_key};
use fserde_core::{Error, Result};
use std::fmt;
use std::net::Ipv6Addr;

/// Hop limit used when none is given
pub const DEFAULT_HOP_LIMIT: u8 = 64;

/// `IPv6(ver=6, tc=.., flow=.., hlim=.., nh=.., src=.., dst=..)`
///
/// Unknown keys are rejected. `payload_length` is set from the rest of the
/// frame and `next_header` from the L4 layer when the frame has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv6Layer {
    pub version: u8,
    pub traffic_class: u8,
    pub flow_label: u32,
    pub payload_length: u16,
    pub next_header: u8,
    pub hop_limit: u8,
    pub src: Ipv6Addr,
    pub dst: Ipv6Addr,
}

impl Default for Ipv6Layer {
    fn default() -> Self {
        Self {
            version: 0,
            traffic_class: 0,
            flow_label: 0,
            payload_length: 0,
            next_header: 0,
            hop_limit: 0,
            src: Ipv6Addr::UNSPECIFIED,
            dst: Ipv6Addr::UNSPECIFIED,
        }
    }
}

impl Ipv6Layer {
    pub const HEADER_SIZE: usize = 40;
}

impl LayerCodec for Ipv6Layer {
    const KIND: LayerKind = LayerKind::IPv6;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "ver" | "version" => {
                    let ver: u8 = parse_number(name, key, value)?;
                    if ver != 6 {
                        return Err(Error::invalid_option(
                            name,
                            key,
                            format!("invalid version {}", ver),
                        ));
                    }
                    self.version = ver;
                }
                "tc" | "trafficclass" => self.traffic_class = parse_number(name, key, value)?,
                "flow" | "flowlabel" => self.flow_label = parse_bits(name, key, value, 20)?,
                "hlim" | "hoplimit" | "ttl" => self.hop_limit = parse_number(name, key, value)?,
                "nh" | "nexthdr" => self.next_header = parse_number(name, key, value)?,
                "src" => self.src = parse_ipv6(name, key, value)?,
                "dst" => self.dst = parse_ipv6(name, key, value)?,
                _ => return Err(unknown_key(name, key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.version == 0 {
            self.version = defaults.version;
        }
        if self.traffic_class == 0 {
            self.traffic_class = defaults.traffic_class;
        }
        if self.flow_label == 0 {
            self.flow_label = defaults.flow_label;
        }
        if self.next_header == 0 {
            self.next_header = defaults.next_header;
        }
        if self.hop_limit == 0 {
            self.hop_limit = defaults.hop_limit;
        }
        if self.src.is_unspecified() {
            self.src = defaults.src;
        }
        if self.dst.is_unspecified() {
            self.dst = defaults.dst;
        }
    }

    fn apply_builtin_defaults(&mut self) {
        if self.version == 0 {
            self.version = 6;
        }
        if self.hop_limit == 0 {
            self.hop_limit = DEFAULT_HOP_LIMIT;
        }
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        let word = ((self.version as u32) << 28)
            | ((self.traffic_class as u32) << 20)
            | (self.flow_label & 0x000F_FFFF);

        buf.put_u32(word)
            .put_u16(self.payload_length)
            .put_u8(self.next_header)
            .put_u8(self.hop_limit)
            .put_ipv6(&self.src)
            .put_ipv6(&self.dst);
        Ok(())
    }
}

impl fmt::Display for Ipv6Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "IPv6(ver={}, tc={}, flow={}, hlim={}, nh={}, src={}, dst={})",
            self.version,
            self.traffic_class,
            self.flow_label,
            self.hop_limit,
            self.next_header,
            self.src,
            self.dst
        )
    }
}
