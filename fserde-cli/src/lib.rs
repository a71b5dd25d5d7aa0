//! CLI interface for fserde
//!
//! Collects frame strings from a TOML file and the command line, builds
//! them and either writes a pcap file or prints the frames.

pub mod args;
pub mod config;

pub use args::Cli;
pub use config::{CaptureSection, FrameFile};

use fserde_capture::CaptureConfig;
use fserde_core::{Error, FrameType, Result};
use fserde_packet::{Frame, FrameSerde, FrameSerdeConfig};
use std::io::Write;
use std::path::PathBuf;
use tracing::{info, warn};

/// Frames and output settings gathered from all inputs
#[derive(Debug, Default)]
pub struct Job {
    pub defaults: Vec<String>,
    pub packets: Vec<String>,
    pub pcap_file: Option<PathBuf>,
    pub capture: CaptureConfig,
}

impl Job {
    /// Merge the TOML file (if any) with the command-line frames.
    ///
    /// File frames come first; `--pcap-file` overrides the file's output.
    pub fn from_cli(cli: &Cli) -> Result<Self> {
        let file = match &cli.file_toml {
            Some(path) => FrameFile::load(path)?,
            None => FrameFile::default(),
        };

        let mut job = Job {
            capture: file.capture_config(),
            defaults: file.defaults,
            packets: file.packets,
            pcap_file: file
                .pcap_output_file
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),
        };
        job.defaults.extend(cli.defaults.iter().cloned());
        job.packets.extend(cli.frames.iter().cloned());
        if let Some(path) = &cli.pcap_file {
            job.pcap_file = Some(path.clone());
        }

        if job.packets.is_empty() {
            return Err(Error::config("no frames given, use --file-toml or --frame"));
        }
        Ok(job)
    }

    /// Register the defaults templates, then build every packet
    pub fn build(&self) -> Result<FrameSerde> {
        let config = FrameSerdeConfig {
            defaults: self.defaults.clone(),
        };
        let mut serde = FrameSerde::with_config("fserde", &config)?;
        serde.add_frames(&self.packets, FrameType::Normal)?;
        Ok(serde)
    }
}

/// Run the tool, writing human-readable output to `out`
pub fn run<W: Write>(cli: &Cli, out: &mut W) -> Result<()> {
    info!("Frame Serde version {}", env!("CARGO_PKG_VERSION"));

    let job = Job::from_cli(cli)?;
    let serde = job.build()?;

    match &job.pcap_file {
        Some(path) => {
            if cli.dump {
                warn!("--dump is ignored when writing a pcap file");
            }
            serde.write_pcap_with(path, FrameType::Normal, job.capture)?;
            writeln!(
                out,
                "Wrote {} frames to {}",
                serde.len(FrameType::Normal),
                path.display()
            )?;
        }
        None => {
            for frame in serde.frames(FrameType::Normal) {
                write!(out, "{}", render(frame, cli.dump))?;
            }
        }
    }
    Ok(())
}

/// Frame text with one layer per line, optionally followed by a hex dump
pub fn render(frame: &Frame, dump: bool) -> String {
    let layers: Vec<String> = frame.layers().iter().map(|l| l.layer.to_string()).collect();

    let mut text = format!("{}:=", frame.name());
    for (i, layer) in layers.iter().enumerate() {
        if i > 0 {
            text.push_str("    ");
        }
        text.push_str(layer);
        if i + 1 < layers.len() {
            text.push('/');
        }
        text.push('\n');
    }
    if dump {
        text.push_str(&frame.buffer().dump());
        text.push('\n');
    }
    text
}
