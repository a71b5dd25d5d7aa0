//! IPv4 header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::checksum::internet_checksum;
use crate::options::{parse_bits, parse_ipv4, parse_number, parse_options, unknown_key};
use fserde_core::{Error, Result};
use std::fmt;
use std::net::Ipv4Addr;

/// Identification used when none is given
pub const DEFAULT_IPV4_ID: u16 = 1234;

/// TTL used when none is given
pub const DEFAULT_TTL: u8 = 64;

/// `IPv4(ver=4, tos=.., id=.., flags=.., frag=.., ttl=.., protocol=.., src=.., dst=..)`
///
/// Unknown keys are rejected. `total_length` is set from the rest of the
/// frame and `protocol` from the L4 layer when the frame has one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipv4Layer {
    pub version: u8,
    pub tos: u8,
    pub total_length: u16,
    pub id: u16,
    pub flags: u8,
    pub frag_offset: u16,
    pub ttl: u8,
    pub protocol: u8,
    pub src: Ipv4Addr,
    pub dst: Ipv4Addr,
}

impl Default for Ipv4Layer {
    fn default() -> Self {
        Self {
            version: 0,
            tos: 0,
            total_length: 0,
            id: 0,
            flags: 0,
            frag_offset: 0,
            ttl: 0,
            protocol: 0,
            src: Ipv4Addr::UNSPECIFIED,
            dst: Ipv4Addr::UNSPECIFIED,
        }
    }
}

impl Ipv4Layer {
    /// Header size without options
    pub const HEADER_SIZE: usize = 20;

    /// Offset of the header checksum field
    pub const CHECKSUM_OFFSET: usize = 10;

    /// Serialize the 20-byte header with its checksum filled in
    pub fn header_bytes(&self) -> Result<FrameBuffer> {
        let mut hdr = FrameBuffer::with_capacity(Self::HEADER_SIZE);
        let ihl = (Self::HEADER_SIZE / 4) as u8;

        hdr.put_u8((self.version << 4) | ihl)
            .put_u8(self.tos)
            .put_u16(self.total_length)
            .put_u16(self.id)
            .put_u16(((self.flags as u16) << 13) | (self.frag_offset & 0x1FFF))
            .put_u8(self.ttl)
            .put_u8(self.protocol)
            .put_u16(0) // checksum, filled below
            .put_ipv4(&self.src)
            .put_ipv4(&self.dst);

        let checksum = internet_checksum(hdr.as_slice());
        hdr.write_u16_at(Self::CHECKSUM_OFFSET, checksum)?;
        Ok(hdr)
    }
}

impl LayerCodec for Ipv4Layer {
    const KIND: LayerKind = LayerKind::IPv4;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "ver" | "version" => {
                    let ver: u8 = parse_number(name, key, value)?;
                    if ver != 4 {
                        return Err(Error::invalid_option(
                            name,
                            key,
                            format!("invalid version {}", ver),
                        ));
                    }
                    self.version = ver;
                }
                "len" | "ihl" => {
                    let len: usize = parse_number(name, key, value)?;
                    let expected = if key == "ihl" {
                        Self::HEADER_SIZE / 4
                    } else {
                        Self::HEADER_SIZE
                    };
                    if len != expected {
                        return Err(Error::invalid_option(
                            name,
                            key,
                            format!("header length must be {}, IPv4 options are not supported", expected),
                        ));
                    }
                }
                "tos" => {
                    let tos: u8 = parse_number(name, key, value)?;
                    if tos == 0 {
                        return Err(Error::invalid_option(name, key, "invalid TOS 0"));
                    }
                    self.tos = tos;
                }
                "id" => self.id = parse_number(name, key, value)?,
                "flags" => self.flags = parse_bits(name, key, value, 3)? as u8,
                "frag" | "fragoffset" => {
                    self.frag_offset = parse_bits(name, key, value, 13)? as u16
                }
                "ttl" => self.ttl = parse_number(name, key, value)?,
                "protocol" | "proto" => self.protocol = parse_number(name, key, value)?,
                "src" => self.src = parse_ipv4(name, key, value)?,
                "dst" => self.dst = parse_ipv4(name, key, value)?,
                _ => return Err(unknown_key(name, key)),
            }
        }
        Ok(())
    }

    fn apply_defaults(&mut self, defaults: &Self) {
        if self.version == 0 {
            self.version = defaults.version;
        }
        if self.tos == 0 {
            self.tos = defaults.tos;
        }
        if self.id == 0 {
            self.id = defaults.id;
        }
        if self.flags == 0 {
            self.flags = defaults.flags;
        }
        if self.frag_offset == 0 {
            self.frag_offset = defaults.frag_offset;
        }
        if self.ttl == 0 {
            self.ttl = defaults.ttl;
        }
        if self.protocol == 0 {
            self.protocol = defaults.protocol;
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
            self.version = 4;
        }
        if self.id == 0 {
            self.id = DEFAULT_IPV4_ID;
        }
        if self.ttl == 0 {
            self.ttl = DEFAULT_TTL;
        }
    }

    fn header_len(&self) -> usize {
        Self::HEADER_SIZE
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        buf.put_buffer(&self.header_bytes()?);
        Ok(())
    }
}

impl fmt::Display for Ipv4Layer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "IPv4(ver={}", self.version)?;
        if self.tos != 0 {
            write!(f, ", tos={}", self.tos)?;
        }
        write!(
            f,
            ", id={}, flags={}, frag={}, ttl={}, protocol={}, src={}, dst={})",
            self.id, self.flags, self.frag_offset, self.ttl, self.protocol, self.src, self.dst
        )
    }
}
