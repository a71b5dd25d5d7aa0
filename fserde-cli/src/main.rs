use fserde_cli::{run, Cli};

fn main() {
    let cli = Cli::parse_args();

    tracing_subscriber::fmt()
        .with_max_level(cli.log_level())
        .with_writer(std::io::stderr)
        .init();

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    if let Err(e) = run(&cli, &mut out) {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
