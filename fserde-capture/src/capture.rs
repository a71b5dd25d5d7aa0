//! In-memory capture accumulator and classic pcap writer

use bytes::{BufMut, Bytes, BytesMut};
use fserde_core::Result;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info};

/// Magic number for microsecond timestamps
pub const MICROSECOND_MAGIC: u32 = 0xA1B2_C3D4;

/// Magic number for nanosecond timestamps
pub const NANOSECOND_MAGIC: u32 = 0xA1B2_3C4D;

pub const MAJOR_VERSION: u16 = 2;
pub const MINOR_VERSION: u16 = 4;

/// Link type for Ethernet frames
pub const LINKTYPE_ETHERNET: u16 = 1;

/// Default snapshot length (maximum bytes per record)
pub const DEFAULT_SNAPLEN: u32 = 9 * 1024;

/// Default FCS length advertised in the link type word
pub const DEFAULT_FCS_LENGTH: u8 = 4;

/// Size of the global file header
pub const FILE_HEADER_SIZE: usize = 24;

/// Size of each record header
pub const RECORD_HEADER_SIZE: usize = 16;

/// Configuration for a capture file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureConfig {
    /// Maximum bytes stored per record
    pub snaplen: u32,
    /// Use nanosecond timestamps instead of microseconds
    pub nanosecond: bool,
    /// FCS length in the high bits of the link type word (3 bits)
    pub fcs_length: u8,
    /// FCS present flag (bit 28 of the link type word)
    pub fcs_present: bool,
    /// Link layer type
    pub link_type: u16,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            snaplen: DEFAULT_SNAPLEN,
            nanosecond: false,
            fcs_length: DEFAULT_FCS_LENGTH,
            fcs_present: false,
            link_type: LINKTYPE_ETHERNET,
        }
    }
}

impl CaptureConfig {
    pub fn magic(&self) -> u32 {
        if self.nanosecond {
            NANOSECOND_MAGIC
        } else {
            MICROSECOND_MAGIC
        }
    }

    /// Link type word: link type, FCS length in bits 29-31, FCS present in bit 28
    pub fn link_type_word(&self) -> u32 {
        let mut word = self.link_type as u32;
        word |= ((self.fcs_length & 0x07) as u32) << 29;
        if self.fcs_present {
            word |= 1 << 28;
        }
        word
    }
}

/// One timestamped capture record
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptureRecord {
    /// Seconds since the Unix epoch
    pub seconds: u32,
    /// Microseconds or nanoseconds within the second
    pub fraction: u32,
    /// Number of bytes stored in the file
    pub captured_length: u32,
    /// Length of the packet before truncation
    pub original_length: u32,
    /// Stored bytes
    pub data: Bytes,
}

/// Accumulates packets and serializes them as a pcap file
#[derive(Debug, Clone, Default)]
pub struct PacketCapture {
    config: CaptureConfig,
    records: Vec<CaptureRecord>,
}

impl PacketCapture {
    /// Create a capture with the default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a capture with a custom configuration
    pub fn with_config(config: CaptureConfig) -> Self {
        Self {
            config,
            records: Vec::new(),
        }
    }

    pub fn config(&self) -> &CaptureConfig {
        &self.config
    }

    /// Set snapshot length
    pub fn set_snaplen(&mut self, snaplen: u32) {
        self.config.snaplen = snaplen;
        debug!("Snapshot length: {}", snaplen);
    }

    pub fn records(&self) -> &[CaptureRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Append one record stamped with the current time.
    ///
    /// The stored bytes are clamped to the snapshot length; the original
    /// length is always the full packet length.
    pub fn add_packet(&mut self, data: &[u8]) {
        let (seconds, fraction) = self.timestamp();
        let captured = data.len().min(self.config.snaplen as usize);

        self.records.push(CaptureRecord {
            seconds,
            fraction,
            captured_length: captured as u32,
            original_length: data.len() as u32,
            data: Bytes::copy_from_slice(&data[..captured]),
        });
    }

    fn timestamp(&self) -> (u32, u32) {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default();
        let fraction = if self.config.nanosecond {
            now.subsec_nanos()
        } else {
            now.subsec_micros()
        };
        (now.as_secs() as u32, fraction)
    }

    /// Serialize the 24-byte global header
    pub fn file_header(&self) -> [u8; FILE_HEADER_SIZE] {
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE);
        buf.put_u32_le(self.config.magic());
        buf.put_u16_le(MAJOR_VERSION);
        buf.put_u16_le(MINOR_VERSION);
        buf.put_u32_le(0); // thiszone
        buf.put_u32_le(0); // sigfigs
        buf.put_u32_le(self.config.snaplen);
        buf.put_u32_le(self.config.link_type_word());

        let mut header = [0u8; FILE_HEADER_SIZE];
        header.copy_from_slice(&buf);
        header
    }

    /// Serialize the whole capture file into memory
    pub fn to_bytes(&self) -> Vec<u8> {
        let body: usize = self
            .records
            .iter()
            .map(|r| RECORD_HEADER_SIZE + r.data.len())
            .sum();
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE + body);

        buf.put_slice(&self.file_header());
        for record in &self.records {
            buf.put_u32_le(record.seconds);
            buf.put_u32_le(record.fraction);
            buf.put_u32_le(record.captured_length);
            buf.put_u32_le(record.original_length);
            buf.put_slice(&record.data);
        }

        buf.to_vec()
    }

    /// Write the capture file to any writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        writer.write_all(&self.to_bytes())?;
        writer.flush()?;
        Ok(())
    }

    /// Write the capture file to disk, replacing any existing file
    pub fn write<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = BufWriter::new(File::create(path)?);
        self.write_to(&mut writer)?;

        info!(
            "Wrote {} records to capture file {}",
            self.records.len(),
            path.display()
        );
        Ok(())
    }
}
