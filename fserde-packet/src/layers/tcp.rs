//! TCP header

use super::{LayerCodec, LayerKind};
use crate::buffer::FrameBuffer;
use crate::options::{parse_number, parse_options, unknown_key};
use fserde_core::{Error, Result};
use std::fmt;

/// TCP flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TcpFlags {
    /// FIN - No more data from sender
    pub fin: bool,
    /// SYN - Synchronize sequence numbers
    pub syn: bool,
    /// RST - Reset the connection
    pub rst: bool,
    /// PSH - Push function
    pub psh: bool,
    /// ACK - Acknowledgment field is significant
    pub ack: bool,
    /// URG - Urgent pointer field is significant
    pub urg: bool,
    /// ECE - ECN-Echo
    pub ece: bool,
    /// CWR - Congestion Window Reduced
    pub cwr: bool,
}

impl TcpFlags {
    const NAMES: [&'static str; 8] = ["fin", "syn", "rst", "psh", "ack", "urg", "ece", "cwr"];

    /// Convert flags to u8 value
    pub fn to_u8(self) -> u8 {
        [
            self.fin, self.syn, self.rst, self.psh, self.ack, self.urg, self.ece, self.cwr,
        ]
        .iter()
        .enumerate()
        .filter(|(_, set)| **set)
        .fold(0u8, |flags, (bit, _)| flags | (1 << bit))
    }

    /// Parse flags from u8 value
    pub fn from_u8(value: u8) -> Self {
        TcpFlags {
            fin: (value & 0b00000001) != 0,
            syn: (value & 0b00000010) != 0,
            rst: (value & 0b00000100) != 0,
            psh: (value & 0b00001000) != 0,
            ack: (value & 0b00010000) != 0,
            urg: (value & 0b00100000) != 0,
            ece: (value & 0b01000000) != 0,
            cwr: (value & 0b10000000) != 0,
        }
    }

    pub fn is_empty(self) -> bool {
        self.to_u8() == 0
    }

    /// Parse a number or a bracketed mnemonic list such as `[syn|ack]`
    pub fn parse(layer: &str, key: &str, value: &str) -> Result<Self> {
        let value = value.trim();
        let list = match value.strip_prefix('[').and_then(|v| v.strip_suffix(']')) {
            Some(list) => list,
            None => return Ok(Self::from_u8(parse_number(layer, key, value)?)),
        };

        let mut bits = 0u8;
        for name in list.split('|').map(str::trim).filter(|n| !n.is_empty()) {
            let name = if name == "ecn" { "ece" } else { name };
            let bit = Self::NAMES.iter().position(|n| *n == name).ok_or_else(|| {
                Error::invalid_option(layer, key, format!("unknown TCP flag '{}'", name))
            })?;
            bits |= 1 << bit;
        }
        Ok(Self::from_u8(bits))
    }
}

impl fmt::Display for TcpFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let bits = self.to_u8();
        let names: Vec<&str> = Self::NAMES
            .iter()
            .enumerate()
            .filter(|(bit, _)| bits & (1 << bit) != 0)
            .map(|(_, name)| *name)
            .collect();
        write!(f, "[{}]", names.join("|"))
    }
}

/// `TCP(sport=.., dport=.., seq=.., ack=.., flags=.., window=.., urgent=.., options='..')`
///
/// Unknown keys are rejected. The data offset always covers the 20-byte
/// header plus the options, which are zero-padded to a multiple of 4.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcpLayer {
    pub src_port: u16,
    pub dst_port: u16,
    pub seq: u32,
    pub ack: u32,
    pub flags: TcpFlags,
    pub window: u16,
    pub urgent: u16,
    /// Option bytes, already padded
    pub options: Vec<u8>,
}

impl TcpLayer {
    /// Minimum TCP header size (without options)
    pub const MIN_HEADER_SIZE: usize = 20;

    /// Maximum TCP header size (with maximum options)
    pub const MAX_HEADER_SIZE: usize = 60;

    /// Offset of the checksum field
    pub const CHECKSUM_OFFSET: usize = 16;

    fn parse_tcp_options(layer: &str, key: &str, value: &str) -> Result<Vec<u8>> {
        let mut bytes = value.as_bytes().to_vec();
        let pad = (4 - bytes.len() % 4) % 4;
        bytes.resize(bytes.len() + pad, 0);

        if bytes.len() > Self::MAX_HEADER_SIZE - Self::MIN_HEADER_SIZE {
            return Err(Error::invalid_option(
                layer,
                key,
                format!("{} option bytes exceed 40", bytes.len()),
            ));
        }
        Ok(bytes)
    }
}

impl LayerCodec for TcpLayer {
    const KIND: LayerKind = LayerKind::Tcp;

    fn parse(&mut self, options: &str) -> Result<()> {
        let name = Self::KIND.name();
        for opt in parse_options(name, options)? {
            let (key, value) = (opt.key.as_str(), opt.value.as_str());
            match key {
                "sport" => self.src_port = parse_number(name, key, value)?,
                "dport" => self.dst_port = parse_number(name, key, value)?,
                "seq" => self.seq = parse_number(name, key, value)?,
                "ack" => self.ack = parse_number(name, key, value)?,
                "flags" => self.flags = TcpFlags::parse(name, key, value)?,
                "window" => self.window = parse_number(name, key, value)?,
                "urgent" => self.urgent = parse_number(name, key, value)?,
                "options" => self.options = Self::parse_tcp_options(name, key, value)?,
                // header length is always derived from the options
                "len" | "length" => {
                    parse_number::<u16>(name, key, value)?;
                }
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
        if self.seq == 0 {
            self.seq = defaults.seq;
        }
        if self.ack == 0 {
            self.ack = defaults.ack;
        }
        if self.flags.is_empty() {
            self.flags = defaults.flags;
        }
        if self.window == 0 {
            self.window = defaults.window;
        }
        if self.urgent == 0 {
            self.urgent = defaults.urgent;
        }
        if self.options.is_empty() {
            self.options = defaults.options.clone();
        }
    }

    fn header_len(&self) -> usize {
        Self::MIN_HEADER_SIZE + self.options.len()
    }

    fn write(&self, buf: &mut FrameBuffer) -> Result<()> {
        let data_offset = (self.header_len() / 4) as u16;

        buf.put_u16(self.src_port)
            .put_u16(self.dst_port)
            .put_u32(self.seq)
            .put_u32(self.ack)
            .put_u16((data_offset << 12) | self.flags.to_u8() as u16)
            .put_u16(self.window)
            .put_u16(0) // checksum, patched once the frame is complete
            .put_u16(self.urgent)
            .put_slice(&self.options);
        Ok(())
    }
}

impl fmt::Display for TcpLayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "TCP(sport={}, dport={}, seq={}, ack={}, flags={}, window={}, urgent={}",
            self.src_port, self.dst_port, self.seq, self.ack, self.flags, self.window, self.urgent
        )?;
        if !self.options.is_empty() {
            let text: String = self
                .options
                .iter()
                .take_while(|b| **b != 0)
                .map(|b| *b as char)
                .collect();
            write!(f, ", options='{}'", text)?;
        }
        write!(f, ")")
    }
}
