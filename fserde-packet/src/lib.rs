//! Textual frame descriptions to Ethernet frame bytes
//!
//! A frame is described as a chain of layers:
//!
//! ```text
//! P0 := Ether(dst=00:11:22:33:44:55)/IPv4(src=10.0.0.2,dst=10.0.0.1)/UDP(dport=3333)/Payload(size=18)
//! ```
//!
//! [`FrameSerde`] parses such descriptions into [`Frame`]s, backfills unset
//! fields from named defaults templates, computes length fields and
//! transport checksums, and writes the result to a pcap capture file.
//!
//! # Modules
//!
//! - [`serde`] - Frame registry and the parse/resolve pipeline
//! - [`frame`] - Frames, their layers and byte ranges
//! - [`layers`] - Per-protocol option parsing and header encoding
//! - [`options`] - `key=value` option lists and value parsers
//! - [`buffer`] - Growable frame buffer with offset patching
//! - [`checksum`] - Internet checksum, pseudo-headers and CRC32c
//!
//! # Quick Start
//!
//! ```rust
//! use fserde_core::FrameType;
//! use fserde_packet::FrameSerde;
//!
//! let mut serde = FrameSerde::new("demo").unwrap();
//! serde
//!     .add("D0 := Ether(src=02:00:00:00:00:01)", FrameType::Default)
//!     .unwrap();
//!
//! let frame = serde
//!     .add(
//!         "F1 := Defaults(D0)/Ether(dst=ff:ff:ff:ff:ff:ff)/IPv4(src=10.0.0.1,dst=10.0.0.2)/UDP(dport=53)",
//!         FrameType::Normal,
//!     )
//!     .unwrap();
//! assert_eq!(frame.len(), 42);
//! assert_eq!(&frame.bytes()[6..12], &[0x02, 0, 0, 0, 0, 0x01]);
//! ```

pub mod buffer;
pub mod checksum;
pub mod frame;
pub mod layers;
pub mod options;
pub mod serde;

// Re-export commonly used types for convenience
pub use buffer::FrameBuffer;
pub use checksum::{internet_checksum, sctp_checksum};
pub use frame::{Frame, LayerInfo, ProtoInfo};
pub use layers::{Layer, LayerCodec, LayerKind};
pub use serde::{FrameSerde, FrameSerdeConfig, MIN_FRAME_LEN};
