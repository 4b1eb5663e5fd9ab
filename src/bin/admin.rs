//! agrichain-admin: offline maintenance for a ledger journal.

use std::io::Write;
use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};

use agrichain_ledger::access::ApiKeyValidator;
use agrichain_ledger::server::JournalConfig;
use agrichain_ledger::{Address, BatchId, Journal, LedgerState};

#[derive(Debug, Parser)]
#[command(name = "agrichain-admin")]
#[command(about = "Inspect, export and verify an agrichain ledger journal")]
struct Args {
    /// Journal location (`sqlite://path.db`)
    #[arg(long, env = "JOURNAL_URL", default_value = "sqlite://agrichain.db")]
    journal_url: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create the journal database and apply migrations
    Migrate,
    /// Replay the journal and print aggregate counts
    Summary,
    /// Replay the journal, reporting the first corrupted entry
    Verify,
    /// Dump journal entries
    Export {
        /// First sequence to export
        #[arg(long, default_value_t = 1)]
        from: u64,
        /// Output file (stdout when omitted)
        #[arg(long)]
        output: Option<PathBuf>,
        #[arg(long, value_enum, default_value_t = ExportFormat::Ndjson)]
        format: ExportFormat,
    },
    /// Print a batch with its transfers, quality checks and history
    Batch { batch_id: String },
    /// Generate an API key for an address, for use in LEDGER_API_KEYS
    GenerateKey { address: Address },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ExportFormat {
    Json,
    Ndjson,
}

async fn open_journal(url: &str) -> anyhow::Result<std::sync::Arc<dyn Journal>> {
    let config = JournalConfig::parse(url)?;
    if config == JournalConfig::Memory {
        anyhow::bail!("an in-memory journal has nothing to inspect; pass a sqlite: URL");
    }
    config.open().await
}

async fn replay(journal: &dyn Journal) -> anyhow::Result<LedgerState> {
    let entries = journal.read_from(1).await?;
    Ok(LedgerState::replay(&entries)?)
}

fn print_json(value: &impl serde::Serialize) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    match args.command {
        Command::Migrate => {
            open_journal(&args.journal_url).await?;
            println!("migrations applied to {}", args.journal_url);
        }
        Command::Summary => {
            let journal = open_journal(&args.journal_url).await?;
            let state = replay(journal.as_ref()).await?;
            print_json(&state.summary())?;
        }
        Command::Verify => {
            let journal = open_journal(&args.journal_url).await?;
            let head = journal.head().await?;
            match replay(journal.as_ref()).await {
                Ok(state) => println!(
                    "journal ok: {} entries replayed, head {}",
                    state.last_sequence(),
                    head
                ),
                Err(e) => {
                    eprintln!("journal verification failed: {e}");
                    std::process::exit(1);
                }
            }
        }
        Command::Export {
            from,
            output,
            format,
        } => {
            let journal = open_journal(&args.journal_url).await?;
            let entries = journal.read_from(from).await?;

            let mut out: Box<dyn Write> = match &output {
                Some(path) => Box::new(std::io::BufWriter::new(std::fs::File::create(path)?)),
                None => Box::new(std::io::stdout().lock()),
            };
            match format {
                ExportFormat::Json => {
                    serde_json::to_writer_pretty(&mut out, &entries)?;
                    writeln!(out)?;
                }
                ExportFormat::Ndjson => {
                    for entry in &entries {
                        serde_json::to_writer(&mut out, entry)?;
                        writeln!(out)?;
                    }
                }
            }
            out.flush()?;
            eprintln!("exported {} entries", entries.len());
        }
        Command::Batch { batch_id } => {
            let journal = open_journal(&args.journal_url).await?;
            let state = replay(journal.as_ref()).await?;
            let batch_id = BatchId::from(batch_id);
            print_json(&serde_json::json!({
                "batch": state.get_batch(&batch_id)?,
                "transfers": state.get_transfer_history(&batch_id)?,
                "quality_checks": state.get_quality_checks(&batch_id)?,
                "history": state.get_batch_history(&batch_id)?,
            }))?;
        }
        Command::GenerateKey { address } => {
            let (key, key_hash) = ApiKeyValidator::generate_key(&address);
            println!("key:      {key}");
            println!("key_hash: {key_hash}");
            println!("LEDGER_API_KEYS entry: {key}={address}");
        }
    }

    Ok(())
}
