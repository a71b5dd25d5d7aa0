//! TOML frame files
//!
//! ```toml
//! pcap-output-file = "/tmp/out.pcap"
//! Defaults = ["Defaults-0 := Ether(src=00:01:02:03:04:ff)/UDP(dport=9000)"]
//! Packets = ["P0 := Ether()/IPv4(dst=10.0.0.1)/UDP()/Defaults(Defaults-0)"]
//!
//! [capture]
//! nanosecond = false
//! snap-length = 9216
//! ```

use fserde_capture::CaptureConfig;
use fserde_core::{Error, Result};
use serde::Deserialize;
use std::fs;
use std::path::Path;

/// Contents of a frame file
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FrameFile {
    #[serde(rename = "pcap-output-file")]
    pub pcap_output_file: Option<String>,

    #[serde(rename = "Defaults", default)]
    pub defaults: Vec<String>,

    #[serde(rename = "Packets", default)]
    pub packets: Vec<String>,

    #[serde(default)]
    pub capture: Option<CaptureSection>,
}

/// Optional `[capture]` table; missing keys keep the capture defaults
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
pub struct CaptureSection {
    pub nanosecond: Option<bool>,
    pub snap_length: Option<u32>,
    pub fcs_length: Option<u8>,
    pub fcs_present: Option<bool>,
}

impl FrameFile {
    /// Read and parse a frame file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)?;
        Self::parse(&text).map_err(|e| Error::config(format!("{}: {}", path.display(), e)))
    }

    /// Parse frame file text. Line breaks inside frame strings are removed.
    pub fn parse(text: &str) -> Result<Self> {
        let mut file: FrameFile = toml::from_str(text).map_err(|e| Error::config(e.to_string()))?;

        for frame in file.defaults.iter_mut().chain(file.packets.iter_mut()) {
            *frame = flatten(frame);
        }
        file.defaults.retain(|f| !f.is_empty());
        file.packets.retain(|f| !f.is_empty());
        Ok(file)
    }

    /// Capture settings with the `[capture]` overrides applied
    pub fn capture_config(&self) -> CaptureConfig {
        let mut config = CaptureConfig::default();
        if let Some(section) = &self.capture {
            if let Some(nanosecond) = section.nanosecond {
                config.nanosecond = nanosecond;
            }
            if let Some(snaplen) = section.snap_length {
                config.snaplen = snaplen;
            }
            if let Some(fcs_length) = section.fcs_length {
                config.fcs_length = fcs_length;
            }
            if let Some(fcs_present) = section.fcs_present {
                config.fcs_present = fcs_present;
            }
        }
        config
    }
}

fn flatten(frame: &str) -> String {
    frame
        .trim()
        .chars()
        .filter(|c| *c != '\n' && *c != '\r')
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_frame_file() {
        let file = FrameFile::parse(
            r#"
pcap-output-file = "out.pcap"
Defaults = ["D0 := Ether(src=00:01:02:03:04:ff)"]
Packets = [
    """
    P0 := Ether()/
          IPv4(dst=10.0.0.1)/
          UDP()
    """,
]
"#,
        )
        .unwrap();

        assert_eq!(file.pcap_output_file.as_deref(), Some("out.pcap"));
        assert_eq!(file.defaults, vec!["D0 := Ether(src=00:01:02:03:04:ff)"]);
        assert_eq!(file.packets.len(), 1);
        assert!(!file.packets[0].contains('\n'));
        assert!(file.packets[0].starts_with("P0 := Ether()/"));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = FrameFile::parse("Frames = []").unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_capture_section() {
        let file = FrameFile::parse(
            r#"
Packets = []

[capture]
nanosecond = true
snap-length = 128
"#,
        )
        .unwrap();

        let config = file.capture_config();
        assert!(config.nanosecond);
        assert_eq!(config.snaplen, 128);
        assert_eq!(config.fcs_length, CaptureConfig::default().fcs_length);
    }

    #[test]
    fn test_empty_file() {
        let file = FrameFile::parse("").unwrap();
        assert!(file.packets.is_empty());
        assert!(file.capture.is_none());
    }
}
