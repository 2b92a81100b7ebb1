//! Offline message board tool.
//! Derives record addresses, lays out encoded records field by field and runs
//! append/list sessions against an in-memory ledger.
//! Prints one JSON object to stdout per command; logs go to stderr.

use anyhow::{anyhow, Result};
use base64::{engine::general_purpose::STANDARD, Engine};
use clap::{Parser, Subcommand, ValueEnum};
use msgboard_client::{
    plan_chunks, Address, BoardClient, BoardConfig, LocalLedger, Message, SENTINEL,
};
use msgboard_program::{
    address::{channel_address, channel_seeds, message_address, message_nonce},
    codec::{layout, Field, FieldSpan, Record},
    ChannelRecord, MessageRecord,
};
use serde::Serialize;
use tracing::Level;

/// Defines the CLI and the selected subcommand.
#[derive(Parser, Debug)]
#[command(name = "msgboard-cli")]
#[command(about = "Message board helper (derive inspect demo)", long_about = None)]
struct Cli {
    /// Logs at DEBUG instead of INFO.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Program that owns the records (defaults to the built-in id).
    #[arg(long, global = true)]
    program_id: Option<Address>,

    /// Payload bytes per chunk record.
    #[arg(long, global = true)]
    chunk_bytes: Option<usize>,

    /// Traversal step limit.
    #[arg(long, global = true)]
    max_steps: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

/// Lists available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Derives a channel address and its seeds.
    DeriveChannel {
        #[arg(long)]
        name: String,
    },
    /// Derives the address of one chunk of a message.
    DeriveMessage {
        #[arg(long)]
        sender: Address,
        #[arg(long)]
        channel: Address,
        /// Channel tail the append started from (defaults to the sentinel).
        #[arg(long)]
        anchor: Option<Address>,
        /// Full message text; chunked with --chunk-bytes.
        #[arg(long)]
        text: String,
        #[arg(long, default_value_t = 0)]
        part: u64,
    },
    /// Decodes a base64 record and reports where each field sits.
    Inspect {
        #[arg(long, value_enum)]
        kind: RecordKind,
        #[arg(long)]
        data: String,
    },
    /// Appends messages to a fresh local channel, then lists it.
    Demo {
        #[arg(long, default_value = "general")]
        channel: String,
        /// Message text; repeat for several messages, oldest first.
        #[arg(long = "message", required = true)]
        messages: Vec<String>,
    },
}

/// Record type of an inspected blob.
#[derive(Clone, Copy, Debug, ValueEnum)]
enum RecordKind {
    Channel,
    Message,
}

/// Holds JSON output of derive-channel.
#[derive(Serialize)]
struct OutChannel {
    name: String,
    address: String,
    #[serde(rename = "seedsB64")]
    seeds_b64: Vec<String>,
}

/// Holds JSON output of derive-message.
#[derive(Serialize)]
struct OutMessageAddress {
    address: String,
    anchor: String,
    #[serde(rename = "nonceB64")]
    nonce_b64: String,
    parts: u64,
    part: u64,
}

/// Holds one field row of inspect.
#[derive(Serialize)]
struct OutField {
    name: &'static str,
    start: usize,
    end: usize,
    #[serde(rename = "bytesB64")]
    bytes_b64: String,
}

/// Holds JSON output of inspect.
#[derive(Serialize)]
struct OutInspect {
    kind: &'static str,
    len: usize,
    padding: usize,
    fields: Vec<OutField>,
    record: serde_json::Value,
}

/// Holds one listed message of demo.
#[derive(Serialize)]
struct OutMessage {
    address: String,
    sender: String,
    size: u64,
    parts: u64,
    chunks: Vec<String>,
    text: String,
}

/// Holds JSON output of demo.
#[derive(Serialize)]
struct OutDemo {
    channel: String,
    appended: Vec<String>,
    transactions: usize,
    records: usize,
    messages: Vec<OutMessage>,
}

impl From<Message> for OutMessage {
    fn from(m: Message) -> Self {
        Self {
            address: m.address.to_string(),
            sender: m.sender.to_string(),
            size: m.size,
            parts: m.parts,
            chunks: m.chunks.iter().map(ToString::to_string).collect(),
            text: m.text().to_owned(),
        }
    }
}

fn config(cli: &Cli) -> BoardConfig {
    let mut config = BoardConfig::new(cli.program_id.unwrap_or_else(msgboard_program::id));
    if let Some(bytes) = cli.chunk_bytes {
        config = config.with_chunk_bytes(bytes);
    }
    if let Some(steps) = cli.max_steps {
        config = config.with_traversal_steps(steps);
    }
    config
}

fn fields(schema: &[Field], bytes: &[u8]) -> Result<(Vec<OutField>, usize)> {
    let spans: Vec<FieldSpan> = layout(schema, bytes)?;
    let used = spans.last().map_or(0, |s| s.range.end);
    let out = spans
        .into_iter()
        .map(|s| OutField {
            name: s.name,
            start: s.range.start,
            end: s.range.end,
            bytes_b64: STANDARD.encode(&bytes[s.range]),
        })
        .collect();
    Ok((out, bytes.len() - used))
}

fn inspect(kind: RecordKind, bytes: &[u8]) -> Result<OutInspect> {
    let (kind, schema, record) = match kind {
        RecordKind::Channel => {
            let r = ChannelRecord::decode(bytes)?;
            let json = serde_json::json!({ "name": r.name, "tail": r.tail.to_string() });
            ("channel", ChannelRecord::SCHEMA, json)
        }
        RecordKind::Message => {
            let r = MessageRecord::decode(bytes)?;
            let json = serde_json::json!({
                "sender": r.sender.to_string(),
                "next": r.next.to_string(),
                "payloadTag": r.payload.tag(),
                "text": r.payload.as_text(),
                "size": r.size,
                "parts": r.parts,
            });
            ("message", MessageRecord::SCHEMA, json)
        }
    };
    let (fields, padding) = fields(schema, bytes)?;
    Ok(OutInspect { kind, len: bytes.len(), padding, fields, record })
}

async fn demo(config: BoardConfig, channel: &str, messages: &[String]) -> Result<OutDemo> {
    let board = BoardClient::new(LocalLedger::new(config.program_id), config)?;
    let sender = Address::new_unique();
    let channel = board.ensure_channel(channel, &sender).await?;

    let mut appended = Vec::with_capacity(messages.len());
    for text in messages {
        appended.push(board.append_message(&channel, &sender, text).await?.to_string());
    }
    let listed = board.collect_messages(&channel).await?;

    Ok(OutDemo {
        channel: channel.to_string(),
        appended,
        transactions: board.ledger().transaction_count(),
        records: board.ledger().record_count(),
        messages: listed.into_iter().map(OutMessage::from).collect(),
    })
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let level = if cli.verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .init();

    let config = config(&cli);
    config.validate()?;

    match &cli.command {
        Commands::DeriveChannel { name } => {
            let seeds = channel_seeds(name)?;
            let out = OutChannel {
                name: name.clone(),
                address: channel_address(&config.program_id, name)?.to_string(),
                seeds_b64: seeds.iter().map(|s| STANDARD.encode(s)).collect(),
            };
            println!("{}", serde_json::to_string(&out)?);
        }
        Commands::DeriveMessage { sender, channel, anchor, text, part } => {
            let anchor = anchor.unwrap_or(SENTINEL);
            let parts = plan_chunks(text, config.max_chunk_bytes).len() as u64;
            let nonce = message_nonce(text, parts);
            let address = message_address(&config.program_id, sender, channel, &anchor, &nonce, *part)?;
            let out = OutMessageAddress {
                address: address.to_string(),
                anchor: anchor.to_string(),
                nonce_b64: STANDARD.encode(nonce),
                parts,
                part: *part,
            };
            println!("{}", serde_json::to_string(&out)?);
        }
        Commands::Inspect { kind, data } => {
            let bytes = STANDARD.decode(data)?;
            let out = inspect(*kind, &bytes).map_err(|e| anyhow!("invalid {kind:?} record: {e}"))?;
            println!("{}", serde_json::to_string(&out)?);
        }
        Commands::Demo { channel, messages } => {
            let out = demo(config, channel, messages).await?;
            println!("{}", serde_json::to_string(&out)?);
        }
    }

    Ok(())
}
