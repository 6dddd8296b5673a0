//! Main ledger orchestration layer
//!
//! Ties a [`DocumentStore`] to the retry policy. Callers describe a
//! transaction as a closure over a [`Transaction`]; the ledger runs it, commits
//! the staged writes with compare-and-swap, and re-runs the closure from a
//! fresh read whenever another writer got there first.
//!
//! # Example
//!
//! ```no_run
//! use ledger_core::{Config, Ledger, Member, MemberId, Role};
//!
//! #[tokio::main]
//! async fn main() -> ledger_core::Result<()> {
//!     let ledger = Ledger::open(&Config::default())?;
//!
//!     ledger
//!         .transact("register", |tx| {
//!             tx.put(&Member::new(MemberId::new("m1"), "Minji", Role::Member))
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

use crate::{
    config::TransactionConfig,
    document::{decode, Document},
    metrics::Metrics,
    storage::{DocumentStore, MemoryStore, RocksStore},
    transaction::Transaction,
    Config, Error, Result,
};
use rand::Rng;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::Duration;

/// Main ledger interface
#[derive(Clone)]
pub struct Ledger {
    /// Document store
    store: Arc<dyn DocumentStore>,

    /// Retry policy
    config: TransactionConfig,

    /// Transaction metrics
    metrics: Metrics,
}

impl std::fmt::Debug for Ledger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ledger")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl Ledger {
    /// Open the RocksDB-backed ledger
    pub fn open(config: &Config) -> Result<Self> {
        let store = Arc::new(RocksStore::open(config)?);
        Self::with_store(store, config.transactions.clone())
    }

    /// Ledger over an in-process store
    pub fn in_memory(config: TransactionConfig) -> Result<Self> {
        Self::with_store(Arc::new(MemoryStore::new()), config)
    }

    /// Ledger over any store implementation
    pub fn with_store(store: Arc<dyn DocumentStore>, config: TransactionConfig) -> Result<Self> {
        let metrics = Metrics::new()
            .map_err(|e| Error::Other(format!("Failed to create metrics: {}", e)))?;

        Ok(Self {
            store,
            config,
            metrics,
        })
    }

    /// Transaction metrics
    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    /// Run a read-compute-write transaction, retrying on conflict
    ///
    /// The closure may run several times and must derive every decision from
    /// what it reads through the transaction. An `Err` from the closure aborts
    /// without writing anything.
    pub async fn transact<T, E, F>(&self, name: &'static str, mut f: F) -> std::result::Result<T, E>
    where
        F: FnMut(&mut Transaction<'_>) -> std::result::Result<T, E>,
        E: From<Error>,
    {
        let mut attempt: u32 = 0;

        loop {
            let started = Instant::now();
            let outcome = {
                let mut tx = Transaction::begin(self.store.as_ref());
                let value = f(&mut tx)?;
                tx.commit().map(|writes| (value, writes))
            };

            match outcome {
                Ok((value, writes)) => {
                    self.metrics
                        .record_commit(started.elapsed().as_secs_f64());
                    tracing::debug!(transaction = name, attempt, writes, "Transaction committed");
                    return Ok(value);
                }
                Err(err) if err.is_conflict() && attempt < self.config.max_retries => {
                    self.metrics.record_conflict();
                    attempt += 1;
                    tracing::debug!(transaction = name, attempt, error = %err, "Retrying after conflict");
                    tokio::time::sleep(self.backoff(attempt)).await;
                }
                Err(err) if err.is_conflict() => {
                    self.metrics.record_conflict();
                    self.metrics.record_exhausted();
                    tracing::warn!(transaction = name, attempts = attempt + 1, "Transaction retries exhausted");
                    return Err(Error::RetriesExhausted {
                        attempts: attempt + 1,
                    }
                    .into());
                }
                Err(err) => return Err(err.into()),
            }
        }
    }

    /// Snapshot read outside any transaction
    pub fn get<D: Document>(&self, id: &D::Id) -> Result<Option<D>> {
        let versioned = self.store.read(&D::key_for(id))?;
        versioned.body.as_deref().map(decode::<D>).transpose()
    }

    /// Snapshot read of a document that must exist
    pub fn load<D: Document>(&self, id: &D::Id) -> Result<D> {
        self.get::<D>(id)?
            .ok_or_else(|| Error::not_found(D::COLLECTION, id))
    }

    /// Every live document of a collection
    pub fn list<D: Document>(&self) -> Result<Vec<D>> {
        self.store
            .scan(D::COLLECTION)?
            .iter()
            .map(|bytes| decode::<D>(bytes))
            .collect()
    }

    /// Exponential backoff with jitter
    fn backoff(&self, attempt: u32) -> Duration {
        let exp = self
            .config
            .backoff_base_ms
            .saturating_mul(1u64 << attempt.min(16));
        let capped = exp.min(self.config.backoff_max_ms);
        let jitter = rand::thread_rng().gen_range(0..=capped / 2);
        Duration::from_millis(capped / 2 + jitter)
    }
}
