//! Document addressing and encoding

use serde::{de::DeserializeOwned, Serialize};
use std::fmt;

use crate::Result;

/// A top-level document kept in the store
pub trait Document: Serialize + DeserializeOwned {
    /// Collection (column family) name
    const COLLECTION: &'static str;

    /// Identifier type
    type Id: fmt::Display;

    /// Document identifier
    fn id(&self) -> &Self::Id;

    /// Store key of a document with the given ID
    fn key_for(id: &Self::Id) -> DocumentKey {
        DocumentKey::new(Self::COLLECTION, id.to_string())
    }

    /// Store key of this document
    fn key(&self) -> DocumentKey {
        Self::key_for(self.id())
    }
}

/// Collection + id
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct DocumentKey {
    /// Collection name
    pub collection: &'static str,
    /// Document id
    pub id: String,
}

impl DocumentKey {
    /// Create key
    pub fn new(collection: &'static str, id: impl Into<String>) -> Self {
        Self {
            collection,
            id: id.into(),
        }
    }
}

impl fmt::Display for DocumentKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.collection, self.id)
    }
}

/// Encode a document body
pub fn encode<D: Document>(doc: &D) -> Result<Vec<u8>> {
    Ok(bincode::serialize(doc)?)
}

/// Decode a document body
pub fn decode<D: Document>(bytes: &[u8]) -> Result<D> {
    Ok(bincode::deserialize(bytes)?)
}
