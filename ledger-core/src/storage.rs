//! Storage backends
//!
//! Every document is stored as a versioned envelope. Versions start at 1 and
//! grow by one on every write; deletes leave a tombstone so a version is never
//! reused. Version 0 means "never written".
//!
//! # Column Families
//!
//! - `members` - Member documents (key: member id)
//! - `polls` - Poll documents (key: poll id)

use crate::{
    document::{Document, DocumentKey},
    error::{Error, Result},
    poll::Poll,
    types::Member,
    Config,
};
use parking_lot::Mutex;
use rocksdb::{ColumnFamily, ColumnFamilyDescriptor, IteratorMode, Options, WriteBatch, DB};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Column family names
const CF_MEMBERS: &str = Member::COLLECTION;
const CF_POLLS: &str = Poll::COLLECTION;

/// Every collection the store knows about
pub const COLLECTIONS: [&str; 2] = [CF_MEMBERS, CF_POLLS];

/// Document bytes at a given version
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Versioned {
    /// 0 if the document was never written
    pub version: u64,
    /// None if absent or deleted
    pub body: Option<Vec<u8>>,
}

impl Versioned {
    /// Never-written document
    pub fn absent() -> Self {
        Self {
            version: 0,
            body: None,
        }
    }
}

/// Conditional write set
#[derive(Debug, Clone, Default)]
pub struct CommitBatch {
    /// Versions that must still be current for the commit to apply
    pub expected: Vec<(DocumentKey, u64)>,
    /// New bodies (None = delete)
    pub writes: Vec<(DocumentKey, Option<Vec<u8>>)>,
}

impl CommitBatch {
    /// Nothing to write
    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }
}

/// Compare-and-swap document store
///
/// `commit` must apply all writes or none, and only if every expected
/// version still matches. A mismatch is reported as [`Error::Conflict`].
pub trait DocumentStore: Send + Sync {
    /// Read the current version of a document
    fn read(&self, key: &DocumentKey) -> Result<Versioned>;

    /// Atomically check expectations and apply writes
    fn commit(&self, batch: &CommitBatch) -> Result<()>;

    /// Bodies of every live document in a collection
    fn scan(&self, collection: &'static str) -> Result<Vec<Vec<u8>>>;
}

/// Value stored under each key
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Envelope {
    version: u64,
    body: Option<Vec<u8>>,
}

impl From<Envelope> for Versioned {
    fn from(envelope: Envelope) -> Self {
        Versioned {
            version: envelope.version,
            body: envelope.body,
        }
    }
}

/// RocksDB-backed store
pub struct RocksStore {
    db: DB,
    /// Single writer: expectation checks and the write batch happen under this lock
    commit_lock: Mutex<()>,
}

impl RocksStore {
    /// Open or create database
    pub fn open(config: &Config) -> Result<Self> {
        let path = &config.data_dir;

        std::fs::create_dir_all(path)?;

        let mut db_opts = Options::default();
        db_opts.create_if_missing(true);
        db_opts.create_missing_column_families(true);
        db_opts.set_write_buffer_size(config.rocksdb.write_buffer_size_mb * 1024 * 1024);
        db_opts.set_max_write_buffer_number(config.rocksdb.max_write_buffer_number);
        db_opts.set_max_background_jobs(config.rocksdb.max_background_jobs);

        if config.rocksdb.enable_statistics {
            db_opts.enable_statistics();
        }

        let cf_descriptors = COLLECTIONS
            .iter()
            .map(|name| ColumnFamilyDescriptor::new(*name, Self::cf_options()))
            .collect::<Vec<_>>();

        let db = DB::open_cf_descriptors(&db_opts, path, cf_descriptors)?;

        tracing::info!(
            "Opened RocksDB at {:?} with {} column families",
            path,
            COLLECTIONS.len()
        );

        Ok(Self {
            db,
            commit_lock: Mutex::new(()),
        })
    }

    fn cf_options() -> Options {
        let mut opts = Options::default();
        // Documents are read on every transaction, favour speed
        opts.set_compression_type(rocksdb::DBCompressionType::Lz4);
        opts
    }

    fn cf_handle(&self, name: &str) -> Result<&ColumnFamily> {
        self.db
            .cf_handle(name)
            .ok_or_else(|| Error::Storage(format!("Column family {} not found", name)))
    }

    fn read_envelope(&self, key: &DocumentKey) -> Result<Option<Envelope>> {
        let cf = self.cf_handle(key.collection)?;
        match self.db.get_cf(cf, key.id.as_bytes())? {
            Some(bytes) => Ok(Some(bincode::deserialize(&bytes)?)),
            None => Ok(None),
        }
    }

    /// Close database (graceful shutdown)
    pub fn close(self) -> Result<()> {
        drop(self.db);
        tracing::info!("RocksDB closed gracefully");
        Ok(())
    }
}

impl DocumentStore for RocksStore {
    fn read(&self, key: &DocumentKey) -> Result<Versioned> {
        Ok(self
            .read_envelope(key)?
            .map(Versioned::from)
            .unwrap_or_else(Versioned::absent))
    }

    fn commit(&self, batch: &CommitBatch) -> Result<()> {
        let _guard = self.commit_lock.lock();

        for (key, expected) in &batch.expected {
            let current = self.read_envelope(key)?.map_or(0, |e| e.version);
            if current != *expected {
                return Err(Error::Conflict(key.to_string()));
            }
        }

        let mut write_batch = WriteBatch::default();
        for (key, body) in &batch.writes {
            let cf = self.cf_handle(key.collection)?;
            let version = self.read_envelope(key)?.map_or(0, |e| e.version) + 1;
            let envelope = Envelope {
                version,
                body: body.clone(),
            };
            write_batch.put_cf(cf, key.id.as_bytes(), bincode::serialize(&envelope)?);
        }

        // Atomic commit
        self.db.write(write_batch)?;

        tracing::debug!(writes = batch.writes.len(), "Batch committed");

        Ok(())
    }

    fn scan(&self, collection: &'static str) -> Result<Vec<Vec<u8>>> {
        let cf = self.cf_handle(collection)?;
        let mut bodies = Vec::new();
        for item in self.db.iterator_cf(cf, IteratorMode::Start) {
            let (_, value) = item?;
            let envelope: Envelope = bincode::deserialize(&value)?;
            if let Some(body) = envelope.body {
                bodies.push(body);
            }
        }
        Ok(bodies)
    }
}

/// In-process store with the same commit contract
#[derive(Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<DocumentKey, Envelope>>,
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for MemoryStore {
    fn read(&self, key: &DocumentKey) -> Result<Versioned> {
        Ok(self
            .documents
            .lock()
            .get(key)
            .cloned()
            .map(Versioned::from)
            .unwrap_or_else(Versioned::absent))
    }

    fn commit(&self, batch: &CommitBatch) -> Result<()> {
        let mut documents = self.documents.lock();

        for (key, expected) in &batch.expected {
            let current = documents.get(key).map_or(0, |e| e.version);
            if current != *expected {
                return Err(Error::Conflict(key.to_string()));
            }
        }

        for (key, body) in &batch.writes {
            let version = documents.get(key).map_or(0, |e| e.version) + 1;
            documents.insert(
                key.clone(),
                Envelope {
                    version,
                    body: body.clone(),
                },
            );
        }

        Ok(())
    }

    fn scan(&self, collection: &'static str) -> Result<Vec<Vec<u8>>> {
        let documents = self.documents.lock();
        let mut entries: Vec<_> = documents
            .iter()
            .filter(|(key, _)| key.collection == collection)
            .filter_map(|(key, envelope)| envelope.body.clone().map(|body| (key.id.clone(), body)))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(entries.into_iter().map(|(_, body)| body).collect())
    }
}
