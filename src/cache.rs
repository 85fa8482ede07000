use serde::{Deserialize, Serialize};

use crate::io::Response;
use crate::time::Milliseconds;
use crate::Result;

pub mod filesystem;
pub mod inmemory;
pub mod nocache;

pub use filesystem::{FileCache, FileIndex};
pub use inmemory::InMemoryIndex;
pub use nocache::NoCache;

/// Response cache contract consulted by the HTTP client. `lookup` returns a
/// previously stored response for a request fingerprint, or `None` on a
/// miss. `offer` hands over a freshly received response; implementors decide
/// whether it is admitted.
pub trait Cache {
    fn lookup(&self, fingerprint: &str) -> Result<Option<Response>>;
    fn offer(&self, fingerprint: &str, response: &Response) -> Result<()>;
}

/// Metadata record for one cached payload file. `id` is the request
/// fingerprint and the primary key: upserting an existing id replaces the
/// record, never duplicates it. The record and its payload file are owned
/// together and must be deleted together.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
pub struct CacheRecord {
    pub id: String,
    pub valid_until: Milliseconds,
    pub last_used: Milliseconds,
    pub size: u64,
    pub file_path: String,
}

/// Metadata index backing the response cache. Any embedded store works: the
/// cache only needs point lookups by fingerprint and a full scan for space
/// accounting and the eviction pass.
pub trait CacheIndex {
    fn get(&self, id: &str) -> Result<Option<CacheRecord>>;
    fn upsert(&self, record: CacheRecord) -> Result<()>;
    fn delete(&self, id: &str) -> Result<()>;
    fn list_all(&self) -> Result<Vec<CacheRecord>>;
}
