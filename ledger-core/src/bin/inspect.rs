//! Ledger inspection binary
//!
//! Dumps stored documents as JSON.
//!
//! ```text
//! ledger-inspect [--config ledger.toml] polls
//! ledger-inspect [--config ledger.toml] members
//! ledger-inspect [--config ledger.toml] poll <id>
//! ledger-inspect [--config ledger.toml] member <id>
//! ```

use anyhow::{bail, Context};
use ledger_core::{Config, Ledger, Member, MemberId, Poll, PollId};

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let mut args: Vec<String> = std::env::args().skip(1).collect();

    // Load configuration
    let config = match args.iter().position(|a| a == "--config") {
        Some(idx) => {
            let path = args
                .get(idx + 1)
                .cloned()
                .context("--config needs a path")?;
            args.drain(idx..=idx + 1);
            Config::from_file(&path).with_context(|| format!("loading {}", path))?
        }
        None => Config::from_env()?,
    };

    tracing::info!(data_dir = ?config.data_dir, "Opening ledger");
    let ledger = Ledger::open(&config)?;

    let output = match args.iter().map(String::as_str).collect::<Vec<_>>().as_slice() {
        ["polls"] => serde_json::to_string_pretty(&ledger.list::<Poll>()?)?,
        ["members"] => serde_json::to_string_pretty(&ledger.list::<Member>()?)?,
        ["poll", id] => serde_json::to_string_pretty(&ledger.load::<Poll>(&PollId::new(*id))?)?,
        ["member", id] => {
            serde_json::to_string_pretty(&ledger.load::<Member>(&MemberId::new(*id))?)?
        }
        _ => bail!("usage: ledger-inspect [--config FILE] (polls | members | poll ID | member ID)"),
    };

    println!("{}", output);
    Ok(())
}
