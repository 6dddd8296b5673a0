//! Optimistic read-compute-write transactions
//!
//! A [`Transaction`] remembers the version of every document it reads and
//! stages writes in memory. [`Transaction::commit`] hands both to the store,
//! which applies the writes only if none of the read versions moved. Nothing
//! reaches the store before commit, so an aborted or conflicting transaction
//! leaves no trace.

use std::collections::BTreeMap;

use crate::{
    document::{decode, encode, Document, DocumentKey},
    storage::{CommitBatch, DocumentStore},
    Error, Result,
};

/// One attempt of a transaction
pub struct Transaction<'s> {
    store: &'s dyn DocumentStore,
    reads: BTreeMap<DocumentKey, u64>,
    writes: BTreeMap<DocumentKey, Option<Vec<u8>>>,
}

impl<'s> Transaction<'s> {
    /// Start an attempt against a store
    pub fn begin(store: &'s dyn DocumentStore) -> Self {
        Self {
            store,
            reads: BTreeMap::new(),
            writes: BTreeMap::new(),
        }
    }

    /// Read a document. Sees this transaction's own staged writes.
    pub fn get<D: Document>(&mut self, id: &D::Id) -> Result<Option<D>> {
        let key = D::key_for(id);

        if let Some(staged) = self.writes.get(&key) {
            return staged.as_deref().map(decode::<D>).transpose();
        }

        let versioned = self.store.read(&key)?;
        self.reads.entry(key).or_insert(versioned.version);
        versioned.body.as_deref().map(decode::<D>).transpose()
    }

    /// Read a document that must exist
    pub fn require<D: Document>(&mut self, id: &D::Id) -> Result<D> {
        self.get::<D>(id)?
            .ok_or_else(|| Error::not_found(D::COLLECTION, id))
    }

    /// Stage a full-document write
    pub fn put<D: Document>(&mut self, doc: &D) -> Result<()> {
        let key = doc.key();
        self.observe(&key)?;
        self.writes.insert(key, Some(encode(doc)?));
        Ok(())
    }

    /// Stage a delete
    pub fn delete<D: Document>(&mut self, id: &D::Id) -> Result<()> {
        let key = D::key_for(id);
        self.observe(&key)?;
        self.writes.insert(key, None);
        Ok(())
    }

    /// Number of staged writes
    pub fn pending_writes(&self) -> usize {
        self.writes.len()
    }

    /// Blind writes still carry an expectation: the version current right now.
    fn observe(&mut self, key: &DocumentKey) -> Result<()> {
        if !self.reads.contains_key(key) {
            let version = self.store.read(key)?.version;
            self.reads.insert(key.clone(), version);
        }
        Ok(())
    }

    /// Apply staged writes if every read is still current
    pub fn commit(self) -> Result<usize> {
        if self.writes.is_empty() {
            return Ok(0);
        }

        let batch = CommitBatch {
            expected: self.reads.into_iter().collect(),
            writes: self.writes.into_iter().collect(),
        };
        self.store.commit(&batch)?;
        Ok(batch.writes.len())
    }
}
