use std::path::PathBuf;
use std::sync::Arc;

use paddock::adapters::CommandProvisioner;
use paddock::config::{self, PaddockConfig};
use paddock::event_log::{EventLogger, FileEventLogger, NullEventLogger};

const USAGE: &str = "\
paddock - terminal dashboard for Vagrant-style environments

Usage: paddock [options]

Options:
  --tool <name>       provisioning tool binary (overrides config)
  --event-log <path>  append structured JSONL events to <path>
  --version           print the paddock version and exit
  --help              print this help and exit
";

#[derive(Debug, Clone, PartialEq, Eq, Default)]
struct CliArgs {
    show_help: bool,
    show_version: bool,
    tool_override: Option<String>,
    event_log_path: Option<PathBuf>,
}

fn parse_cli_args(args: impl IntoIterator<Item = String>) -> std::io::Result<CliArgs> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();

    while let Some(argument) = args.next() {
        match argument.as_str() {
            "--help" | "-h" => {
                cli.show_help = true;
            }
            "--version" => {
                cli.show_version = true;
            }
            "--tool" => {
                let Some(tool) = args.next() else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "--tool requires a binary name",
                    ));
                };
                cli.tool_override = Some(tool);
            }
            "--event-log" => {
                let Some(path) = args.next() else {
                    return Err(std::io::Error::new(
                        std::io::ErrorKind::InvalidInput,
                        "--event-log requires a file path",
                    ));
                };
                cli.event_log_path = Some(PathBuf::from(path));
            }
            _ => {}
        }
    }

    Ok(cli)
}

fn load_config() -> PaddockConfig {
    match config::load() {
        Ok(loaded) => loaded.config,
        Err(message) => {
            eprintln!("paddock: {message}, using defaults");
            PaddockConfig::default()
        }
    }
}

fn main() -> std::io::Result<()> {
    let cli = parse_cli_args(std::env::args().skip(1))?;

    if cli.show_help {
        print!("{USAGE}");
        return Ok(());
    }
    if cli.show_version {
        println!("paddock {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    let mut config = load_config();
    if let Some(tool) = cli.tool_override {
        config.tool = tool;
    }

    // Without the tool there is nothing to supervise; stop before any UI.
    let (provisioner, tool_version) = match CommandProvisioner::locate(&config.tool) {
        Ok(located) => located,
        Err(error) => {
            eprintln!("paddock: {}", error.message());
            std::process::exit(1);
        }
    };

    let event_log: Box<dyn EventLogger> = match cli.event_log_path {
        Some(path) => Box::new(FileEventLogger::open(&path)?),
        None => Box::new(NullEventLogger),
    };

    paddock::ui::tui::run(Arc::new(provisioner), tool_version, &config, event_log)
}
