//! ChainAccess CLI: inspect value payloads and follow live access-node streams.
//!
//! # Commands
//! ```text
//! chainaccess decode    --payload <hex> [--strict]
//! chainaccess transcode --payload <hex> --to compact|verbose
//! chainaccess subscribe <kind> --url <ws-url> (--start-height N | --start-id ID | --latest)
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use chainaccess_codec::DecodeOptions;
use chainaccess_core::Encoding;

mod cmd_subscribe;
mod config;

use cmd_subscribe::{SubscribeArgs, SubscribeKind};

#[derive(Parser)]
#[command(
    name = "chainaccess",
    about = "Inspect value payloads and follow access-node streams",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Detect the encoding of a payload and print the decoded value as JSON
    Decode {
        /// Payload bytes, hex (0x prefix optional)
        #[arg(long)]
        payload: String,
        /// Reject bare-string static types
        #[arg(long)]
        strict: bool,
    },

    /// Decode a payload and re-encode it in the other encoding
    Transcode {
        #[arg(long)]
        payload: String,
        /// Target encoding: compact | verbose
        #[arg(long)]
        to: Encoding,
    },

    /// Subscribe to a stream and print one JSON record per line
    Subscribe {
        kind: SubscribeKind,
        #[command(flatten)]
        args: SubscribeArgs,
        /// JSON config file (transport, subscribe and log sections)
        #[arg(long)]
        config: Option<PathBuf>,
        /// Emit logs as JSON lines on stderr
        #[arg(long)]
        json_logs: bool,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Decode { payload, strict } => cmd_decode(&payload, strict),
        Commands::Transcode { payload, to } => cmd_transcode(&payload, to),
        Commands::Subscribe {
            kind,
            args,
            config,
            json_logs,
        } => {
            let mut cfg = match config {
                Some(path) => config::AccessConfig::load(&path)?,
                None => config::AccessConfig::default(),
            };
            cfg.log.json |= json_logs;
            chainaccess_observability::init_tracing(&cfg.log);
            cmd_subscribe::run(kind, args, cfg).await
        }
    }
}

fn parse_hex(payload: &str) -> Result<Vec<u8>> {
    let trimmed = payload.trim();
    hex::decode(trimmed.strip_prefix("0x").unwrap_or(trimmed)).context("payload is not valid hex")
}

fn cmd_decode(payload: &str, strict: bool) -> Result<()> {
    let bytes = parse_hex(payload)?;
    let options = if strict {
        DecodeOptions::strict()
    } else {
        DecodeOptions::default()
    };
    let encoding = chainaccess_codec::detect(&bytes);
    let value = chainaccess_codec::decode(&bytes, &options)?;

    let out = serde_json::json!({ "encoding": encoding, "value": value });
    println!("{}", serde_json::to_string_pretty(&out)?);
    Ok(())
}

fn cmd_transcode(payload: &str, to: Encoding) -> Result<()> {
    let bytes = parse_hex(payload)?;
    let out = chainaccess_codec::transcode(&bytes, to, &DecodeOptions::default())?;
    match to {
        Encoding::Compact => println!("{}", hex::encode(out)),
        Encoding::Verbose => println!("{}", String::from_utf8_lossy(&out)),
    }
    Ok(())
}
