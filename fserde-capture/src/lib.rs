//! Capture file writer for fserde
//!
//! This crate accumulates frames in memory and serializes them as a classic
//! little-endian pcap file (magic `0xA1B2C3D4` or `0xA1B23C4D`, version 2.4).
//!
//! ## Example
//!
//! ```no_run
//! use fserde_capture::PacketCapture;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut capture = PacketCapture::new();
//! capture.add_packet(&[0u8; 60]);
//! capture.write("/tmp/out.pcap")?;
//! # Ok(())
//! # }
//! ```

pub mod capture;

// Re-export main types
pub use capture::{CaptureConfig, CaptureRecord, PacketCapture};
