//! Command-line runs against temporary frame and pcap files

use clap::Parser;
use fserde_cli::{run, Cli, Job};
use fserde_core::{Error, FrameType};
use std::fs;

fn cli(args: &[&str]) -> Cli {
    Cli::try_parse_from(std::iter::once("fserde").chain(args.iter().copied())).unwrap()
}

fn run_to_string(cli: &Cli) -> fserde_core::Result<String> {
    let mut out = Vec::new();
    run(cli, &mut out)?;
    Ok(String::from_utf8(out).unwrap())
}

const FRAMES: &str = r#"
Defaults = ["Defaults-0 := Ether(src=00:01:02:03:04:ff)/UDP(dport=9000)"]
Packets = [
    "P0 := Ether(dst=00:11:22:33:44:55)/IPv4(src=10.0.0.2, dst=10.0.0.1)/UDP()/Defaults(Defaults-0)",
    "P1 := Ether()/IPv4(src=10.0.0.2, dst=10.0.0.1)/TCP(dport=80)/Count(3)",
]
"#;

#[test]
fn toml_frames_printed_one_layer_per_line() {
    let dir = tempfile::tempdir().unwrap();
    let toml = dir.path().join("frames.toml");
    fs::write(&toml, FRAMES).unwrap();

    let output = run_to_string(&cli(&["-t", toml.to_str().unwrap()])).unwrap();
    let lines: Vec<&str> = output.lines().collect();

    assert!(lines[0].starts_with("P0:=Ether("), "{}", output);
    assert!(lines[0].ends_with('/'));
    assert!(lines[1].starts_with("    IPv4("));
    assert!(output.contains("P1:=Ether("));
    assert!(output.contains("    Count(3)"));
    assert!(!output.contains("0000:"));
}

#[test]
fn dump_adds_hex_bytes() {
    let output = run_to_string(&cli(&[
        "--frame",
        "A := Ether(dst=ff:ff:ff:ff:ff:ff)/Payload(size=2, fill=0xee)",
        "--dump",
    ]))
    .unwrap();

    assert!(output.contains("0000: ff ff ff ff ff ff"), "{}", output);
    assert!(output.contains("ee ee"));
}

#[test]
fn pcap_written_from_toml_and_flags() {
    let dir = tempfile::tempdir().unwrap();
    let toml = dir.path().join("frames.toml");
    let pcap = dir.path().join("frames.pcap");
    fs::write(&toml, FRAMES).unwrap();

    let output = run_to_string(&cli(&[
        "-t",
        toml.to_str().unwrap(),
        "-f",
        "P2 := Defaults(Defaults-0)/Ether()/IPv4(src=1.1.1.1, dst=2.2.2.2)/UDP()",
        "-p",
        pcap.to_str().unwrap(),
    ]))
    .unwrap();
    assert!(output.starts_with("Wrote 3 frames"), "{}", output);

    // P0 once, P1 three times, P2 once; every frame is under 60 bytes
    let data = fs::read(&pcap).unwrap();
    assert_eq!(data.len(), 24 + 5 * (16 + 60));
}

#[test]
fn pcap_path_from_toml() {
    let dir = tempfile::tempdir().unwrap();
    let toml = dir.path().join("frames.toml");
    let pcap = dir.path().join("from-file.pcap");
    fs::write(
        &toml,
        format!(
            "pcap-output-file = {:?}\nPackets = [\"A := Ether()/Payload(size=100)\"]\n\n[capture]\nnanosecond = true\n",
            pcap.to_str().unwrap()
        ),
    )
    .unwrap();

    run_to_string(&cli(&["-t", toml.to_str().unwrap()])).unwrap();

    let data = fs::read(&pcap).unwrap();
    assert_eq!(&data[0..4], &0xA1B2_3C4Du32.to_le_bytes());
    assert_eq!(data.len(), 24 + 16 + 114);
}

#[test]
fn job_merges_inputs_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let toml = dir.path().join("frames.toml");
    fs::write(&toml, FRAMES).unwrap();

    let job = Job::from_cli(&cli(&[
        "-t",
        toml.to_str().unwrap(),
        "-d",
        "D1 := UDP(sport=7)",
        "-f",
        "P9 := Ether()",
    ]))
    .unwrap();
    assert_eq!(job.defaults.len(), 2);
    assert_eq!(job.packets.len(), 3);
    assert!(job.pcap_file.is_none());

    let serde = job.build().unwrap();
    assert_eq!(serde.names(FrameType::Normal), ["P0", "P1", "P9"]);
    assert!(serde.get("D1", FrameType::Default).is_some());
}

#[test]
fn errors_surface() {
    assert!(matches!(run_to_string(&cli(&[])), Err(Error::Config(_))));

    assert!(matches!(
        run_to_string(&cli(&["-t", "/nonexistent/frames.toml"])),
        Err(Error::Io(_))
    ));

    assert!(matches!(
        run_to_string(&cli(&["-f", "A := Ether()/Bogus()"])),
        Err(Error::UnknownLayer(_))
    ));

    let dir = tempfile::tempdir().unwrap();
    let toml = dir.path().join("bad.toml");
    fs::write(&toml, "Packets = [\"A := Ether()\"]\nColour = 1\n").unwrap();
    assert!(matches!(
        run_to_string(&cli(&["-t", toml.to_str().unwrap()])),
        Err(Error::Config(_))
    ));
}
