//! IP Camera Adapter - Main Entry Point

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ipcam_cli::{init_logging, load_settings, parse, plan, poll_list, push};
use serde::Serialize;
use std::io::Read;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser)]
#[command(name = "ipcam-adapter", version, about = "Foscam/INSTAR camera protocol adapter")]
struct Cli {
    /// Settings file (TOML); IPCAM_* variables override it
    #[arg(short, long, env = "IPCAM_CONFIG")]
    config: Option<PathBuf>,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Show the requests a command would issue
    Plan {
        /// Channel id, e.g. enableMotionAlarm
        channel: String,
        /// ON, OFF, REFRESH, a number or overlay text
        value: String,
    },
    /// Parse a captured reply
    Parse {
        /// Response kind, e.g. device-state
        kind: String,
        /// Reply body; read from stdin when omitted
        file: Option<PathBuf>,
    },
    /// Decode a push callback path
    Push { path: String },
    /// List the low-priority poll requests
    PollList,
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    info!("=== IP Camera Adapter v{} ===", env!("CARGO_PKG_VERSION"));
    let settings = load_settings(cli.config.as_deref())?;

    match cli.command {
        Command::Plan { channel, value } => print_json(&plan(&settings, &channel, &value)?),
        Command::Parse { kind, file } => {
            let body = match file {
                Some(path) => std::fs::read_to_string(&path)
                    .with_context(|| format!("reading {}", path.display()))?,
                None => {
                    let mut body = String::new();
                    std::io::stdin()
                        .read_to_string(&mut body)
                        .context("reading stdin")?;
                    body
                }
            };
            print_json(&parse(&settings, &kind, &body)?)
        }
        Command::Push { path } => print_json(&push(&settings, &path)),
        Command::PollList => print_json(&poll_list(&settings)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parses_subcommands() {
        let cli = Cli::try_parse_from(["ipcam-adapter", "-c", "cam.toml", "plan", "autoLED", "ON"])
            .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("cam.toml")));
        assert!(matches!(
            cli.command,
            Command::Plan { ref channel, ref value } if channel == "autoLED" && value == "ON"
        ));

        let cli = Cli::try_parse_from(["ipcam-adapter", "parse", "device-state"]).unwrap();
        assert!(matches!(cli.command, Command::Parse { file: None, .. }));

        assert!(Cli::try_parse_from(["ipcam-adapter", "poll-list"]).is_ok());
        assert!(Cli::try_parse_from(["ipcam-adapter"]).is_err());
    }
}
