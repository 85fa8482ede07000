use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufReader, BufWriter};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::cache::{Cache, CacheIndex, CacheRecord};
use crate::codec;
use crate::config::Config;
use crate::error::{self, THError};
use crate::io::Response;
use crate::log_debug;
use crate::time::{now_epoch_milliseconds, Milliseconds, Seconds};
use crate::Result;

/// Disk-backed response cache. Payload files live in the cache directory,
/// one per fingerprint, serialized by the codec; their metadata lives in the
/// index. A global mutex serializes lookups, admissions and evictions so a
/// payload file is never deleted while being read and space accounting never
/// double-counts during concurrent inserts.
#[derive(Debug)]
pub struct FileCache<I> {
    index: Mutex<I>,
    directory: PathBuf,
    max_size: u64,
}

impl<I: CacheIndex> FileCache<I> {
    pub fn new(index: I, directory: impl Into<PathBuf>, max_size: u64) -> Result<Self> {
        let directory = directory.into();
        validate_cache_location(&directory)?;
        Ok(FileCache {
            index: Mutex::new(index),
            directory,
            max_size,
        })
    }

    pub fn max_size(&self) -> u64 {
        self.max_size
    }

    /// Bytes still available under the configured budget, recomputed from
    /// the metadata index.
    pub fn remaining_space(&self) -> Result<u64> {
        let index = self.lock_index()?;
        remaining_space(&*index, self.max_size)
    }

    fn lock_index(&self) -> Result<MutexGuard<'_, I>> {
        self.index
            .lock()
            .map_err(|_| error::gen("cache index mutex poisoned"))
    }

    fn cache_file(&self, fingerprint: &str) -> PathBuf {
        self.directory.join(encoded_file_name(fingerprint))
    }

    fn remove_entry(&self, index: &I, record: &CacheRecord) -> Result<()> {
        // the payload file and its metadata record are owned together
        match fs::remove_file(&record.file_path) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => {
                return Err(THError::CacheIO(format!(
                    "cannot remove cached file {}: {}",
                    record.file_path, err
                ))
                .into())
            }
        }
        index.delete(&record.id)
    }

    fn free_space(&self, index: &I, required: u64) -> Result<()> {
        // least-recently-used entries go first
        let mut records = index.list_all()?;
        records.sort_by_key(|record| record.last_used);
        for record in records {
            if remaining_space(index, self.max_size)? >= required {
                break;
            }
            log_debug!("evicting {} to reclaim {} bytes", record.id, record.size);
            self.remove_entry(index, &record)?;
        }
        Ok(())
    }
}

impl FileCache<FileIndex> {
    pub fn from_config(config: &Config) -> Result<Self> {
        let directory = config.cache_location().ok_or_else(|| {
            THError::ConfigurationError("no cache location configured".to_string())
        })?;
        FileCache::new(FileIndex::new(directory), directory, config.cache_max_size())
    }
}

impl<I: CacheIndex> Cache for FileCache<I> {
    fn lookup(&self, fingerprint: &str) -> Result<Option<Response>> {
        let index = self.lock_index()?;
        let Some(mut record) = index.get(fingerprint)? else {
            return Ok(None);
        };
        let now = now_epoch_milliseconds();
        if record.valid_until <= now {
            // expired entries are purged on observation
            self.remove_entry(&index, &record)?;
            return Ok(None);
        }
        record.last_used = now;
        let file_path = record.file_path.clone();
        index.upsert(record)?;
        let file = File::open(&file_path).map_err(|err| {
            THError::CacheIO(format!("cannot open cached file {file_path}: {err}"))
        })?;
        let response = codec::read_response(&mut BufReader::new(file))?;
        Ok(Some(response))
    }

    fn offer(&self, fingerprint: &str, response: &Response) -> Result<()> {
        let Some(max_age) = cacheable_max_age(response) else {
            return Ok(());
        };
        let length = response.length();
        if length > self.max_size {
            log_debug!(
                "{} bytes exceed the whole cache budget, not caching {}",
                length,
                fingerprint
            );
            return Ok(());
        }
        let index = self.lock_index()?;
        if index.get(fingerprint)?.is_some() {
            return Ok(());
        }
        if remaining_space(&*index, self.max_size)? < length {
            self.free_space(&*index, length)?;
        }
        let path = self.cache_file(fingerprint);
        persist_response(response, &path)?;
        let now = now_epoch_milliseconds();
        let record = CacheRecord {
            id: fingerprint.to_string(),
            valid_until: now + Milliseconds::from(max_age),
            last_used: now,
            size: length,
            file_path: path.to_string_lossy().into_owned(),
        };
        if let Err(err) = index.upsert(record) {
            // a payload file without its metadata record would leak
            let _ = fs::remove_file(&path);
            return Err(err);
        }
        Ok(())
    }
}

// base64 encode to avoid problematic slashes, colons, etc in file names
fn encoded_file_name(fingerprint: &str) -> String {
    URL_SAFE_NO_PAD.encode(fingerprint)
}

fn remaining_space<I: CacheIndex>(index: &I, max_size: u64) -> Result<u64> {
    let used: u64 = index.list_all()?.iter().map(|record| record.size).sum();
    Ok(max_size.saturating_sub(used))
}

/// Admission rule for the `Cache-Control` header: a `public` or `private`
/// directive carrying a strictly positive integer `max-age`. The max-age
/// value is the run of digits after `max-age=`; anything malformed or absent
/// makes the response non-cacheable.
fn cacheable_max_age(response: &Response) -> Option<Seconds> {
    let directive = response.header("cache-control")?.to_lowercase();
    if !directive.starts_with("public") && !directive.starts_with("private") {
        return None;
    }
    let start = directive.find("max-age=")? + "max-age=".len();
    let digits: String = directive[start..]
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    match digits.parse::<u64>() {
        Ok(seconds) if seconds > 0 => Some(Seconds::new(seconds)),
        _ => None,
    }
}

fn persist_response(response: &Response, path: &Path) -> Result<()> {
    let file = File::create(path).map_err(|err| {
        THError::CacheIO(format!("cannot create cached file {}: {}", path.display(), err))
    })?;
    codec::write_response(response, &mut BufWriter::new(file))
}

fn validate_cache_location(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(THError::CacheLocationDoesNotExist(format!(
            "Cache directory does not exist: {}",
            path.display()
        ))
        .into());
    }

    if !path.is_dir() {
        return Err(THError::CacheLocationIsNotADirectory(format!(
            "Cache location is not a directory: {}",
            path.display()
        ))
        .into());
    }

    // Check if we can write to the directory
    let test_file_path = path.join(".write_test_cache_file");
    match File::create(&test_file_path) {
        Ok(_) => {
            if let Err(e) = fs::remove_file(&test_file_path) {
                return Err(THError::CacheLocationIsNotWriteable(format!(
                    "Failed to remove cache test file {}: {}",
                    test_file_path.display(),
                    e
                ))
                .into());
            }
        }
        Err(e) => {
            return Err(THError::CacheLocationIsNotWriteable(format!(
                "No write permission for cache directory {}: {}",
                path.display(),
                e
            ))
            .into());
        }
    }
    Ok(())
}

/// Metadata index persisted as a JSON document next to the payload files.
/// Every operation reloads the document; the cache serializes access, so
/// this trades throughput for crash simplicity.
#[derive(Debug)]
pub struct FileIndex {
    path: PathBuf,
}

const INDEX_FILE: &str = "index.json";

impl FileIndex {
    pub fn new(directory: impl AsRef<Path>) -> Self {
        FileIndex {
            path: directory.as_ref().join(INDEX_FILE),
        }
    }

    fn load(&self) -> Result<BTreeMap<String, CacheRecord>> {
        if !self.path.exists() {
            return Ok(BTreeMap::new());
        }
        let data = fs::read_to_string(&self.path).map_err(|err| {
            THError::CacheIO(format!(
                "cannot read cache index {}: {}",
                self.path.display(),
                err
            ))
        })?;
        let records = serde_json::from_str(&data).map_err(|err| {
            THError::CacheIO(format!(
                "cache index {} is corrupt: {}",
                self.path.display(),
                err
            ))
        })?;
        Ok(records)
    }

    fn store(&self, records: &BTreeMap<String, CacheRecord>) -> Result<()> {
        let data = serde_json::to_string(records)?;
        fs::write(&self.path, data).map_err(|err| {
            THError::CacheIO(format!(
                "cannot write cache index {}: {}",
                self.path.display(),
                err
            ))
        })?;
        Ok(())
    }
}

impl CacheIndex for FileIndex {
    fn get(&self, id: &str) -> Result<Option<CacheRecord>> {
        Ok(self.load()?.get(id).cloned())
    }

    fn upsert(&self, record: CacheRecord) -> Result<()> {
        let mut records = self.load()?;
        records.insert(record.id.clone(), record);
        self.store(&records)
    }

    fn delete(&self, id: &str) -> Result<()> {
        let mut records = self.load()?;
        records.remove(id);
        self.store(&records)
    }

    fn list_all(&self) -> Result<Vec<CacheRecord>> {
        Ok(self.load()?.into_values().collect())
    }
}
