//! CLI argument parsing

use clap::{ArgAction, Parser};
use std::path::PathBuf;
use tracing::Level;

#[derive(Parser, Debug)]
#[command(name = "fserde")]
#[command(version, about = "Convert textual frame descriptions into Ethernet frames", long_about = None)]
pub struct Cli {
    /// TOML file containing frame strings
    #[arg(short = 't', long, value_name = "FILE")]
    pub file_toml: Option<PathBuf>,

    /// Frame string to build (repeatable)
    #[arg(short = 'f', long = "frame", value_name = "FRAME")]
    pub frames: Vec<String>,

    /// Defaults template string (repeatable)
    #[arg(short = 'd', long = "defaults", value_name = "FRAME")]
    pub defaults: Vec<String>,

    /// PCAP file to write the frames to
    #[arg(short = 'p', long, value_name = "FILE")]
    pub pcap_file: Option<PathBuf>,

    /// Print a hex dump of every frame
    #[arg(long)]
    pub dump: bool,

    /// Verbose output (-v, -vv, -vvv for increasing verbosity)
    #[arg(short = 'v', long, action = ArgAction::Count)]
    pub verbose: u8,
}

impl Cli {
    /// Parse command-line arguments
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Log level selected by the number of `-v` flags
    pub fn log_level(&self) -> Level {
        match self.verbose {
            0 => Level::WARN,
            1 => Level::INFO,
            2 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeatable_frames() {
        let cli = Cli::try_parse_from([
            "fserde",
            "-d",
            "D0:=Ether()",
            "-f",
            "A:=Ether()",
            "--frame",
            "B:=Ether()",
            "-p",
            "out.pcap",
        ])
        .unwrap();

        assert_eq!(cli.defaults, vec!["D0:=Ether()"]);
        assert_eq!(cli.frames, vec!["A:=Ether()", "B:=Ether()"]);
        assert_eq!(cli.pcap_file, Some(PathBuf::from("out.pcap")));
        assert!(!cli.dump);
    }

    #[test]
    fn test_verbosity_levels() {
        let quiet = Cli::try_parse_from(["fserde"]).unwrap();
        assert_eq!(quiet.log_level(), Level::WARN);

        let loud = Cli::try_parse_from(["fserde", "-vv"]).unwrap();
        assert_eq!(loud.verbose, 2);
        assert_eq!(loud.log_level(), Level::DEBUG);
    }

    #[test]
    fn test_toml_file_flag() {
        let cli = Cli::try_parse_from(["fserde", "--file-toml", "frames.toml", "--dump"]).unwrap();
        assert_eq!(cli.file_toml, Some(PathBuf::from("frames.toml")));
        assert!(cli.dump);
    }
}
