use std::collections::BTreeMap;

use tracing::trace;

use crate::cache::Backend;
use crate::cpv::Cpv;
use crate::error::{Error, Result};
use crate::record::MetadataRecord;

/// In-memory [`Backend`].
///
/// Writes land in a staging area until [`raw_commit`](Backend::raw_commit)
/// applies them, unless the backend auto-commits. Reads see staged data.
/// Useful for tests and for tools that regenerate metadata before choosing
/// where to persist it.
#[derive(Debug, Clone)]
pub struct MemoryBackend {
    committed: BTreeMap<Cpv, MetadataRecord>,
    // `None` marks a staged deletion.
    staged: BTreeMap<Cpv, Option<MetadataRecord>>,
    autocommits: bool,
    readonly: bool,
    cleanse_keys: bool,
    serialize_eclasses: bool,
    writes: usize,
    commits: usize,
}

impl MemoryBackend {
    /// An empty, batching, writable backend.
    pub fn new() -> Self {
        MemoryBackend {
            committed: BTreeMap::new(),
            staged: BTreeMap::new(),
            autocommits: false,
            readonly: false,
            cleanse_keys: false,
            serialize_eclasses: true,
            writes: 0,
            commits: 0,
        }
    }

    /// Persist every write immediately.
    pub fn autocommitting(mut self) -> Self {
        self.autocommits = true;
        self
    }

    /// Refuse all writes.
    pub fn read_only(mut self) -> Self {
        self.readonly = true;
        self
    }

    /// Ask the cache to drop empty values before storing.
    pub fn cleansing(mut self) -> Self {
        self.cleanse_keys = true;
        self
    }

    /// Store `_eclasses_` as handed over instead of letting the cache
    /// encode it.
    pub fn raw_eclasses(mut self) -> Self {
        self.serialize_eclasses = false;
        self
    }

    /// Number of accepted set/delete calls.
    pub fn writes(&self) -> usize {
        self.writes
    }

    /// Number of commits performed.
    pub fn commits(&self) -> usize {
        self.commits
    }

    /// Number of writes waiting for a commit.
    pub fn staged(&self) -> usize {
        self.staged.len()
    }

    /// The durable entry for `cpv`, ignoring staged writes.
    pub fn committed(&self, cpv: &Cpv) -> Option<&MetadataRecord> {
        self.committed.get(cpv)
    }

    fn stage(&mut self, cpv: &Cpv, record: Option<MetadataRecord>) -> Result<()> {
        if self.readonly {
            return Err(Error::ReadOnly);
        }
        self.writes += 1;
        if self.autocommits {
            match record {
                Some(record) => self.committed.insert(cpv.clone(), record),
                None => self.committed.remove(cpv),
            };
        } else {
            self.staged.insert(cpv.clone(), record);
        }
        Ok(())
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl Backend for MemoryBackend {
    fn raw_get(&self, cpv: &Cpv) -> Result<MetadataRecord> {
        let found = match self.staged.get(cpv) {
            Some(staged) => staged.as_ref(),
            None => self.committed.get(cpv),
        };
        found.cloned().ok_or_else(|| Error::NotFound(cpv.to_string()))
    }

    fn raw_set(&mut self, cpv: &Cpv, record: MetadataRecord) -> Result<()> {
        self.stage(cpv, Some(record))
    }

    fn raw_delete(&mut self, cpv: &Cpv) -> Result<()> {
        if !self.raw_contains(cpv)? {
            return Err(Error::NotFound(cpv.to_string()));
        }
        self.stage(cpv, None)
    }

    fn raw_keys(&self) -> Result<Vec<Cpv>> {
        let mut keys: Vec<Cpv> = self
            .committed
            .keys()
            .filter(|cpv| !self.staged.contains_key(*cpv))
            .cloned()
            .collect();
        keys.extend(
            self.staged
                .iter()
                .filter(|(_, record)| record.is_some())
                .map(|(cpv, _)| cpv.clone()),
        );
        keys.sort();
        Ok(keys)
    }

    fn raw_contains(&self, cpv: &Cpv) -> Result<bool> {
        Ok(match self.staged.get(cpv) {
            Some(staged) => staged.is_some(),
            None => self.committed.contains_key(cpv),
        })
    }

    fn raw_commit(&mut self) -> Result<()> {
        trace!(staged = self.staged.len(), "Applying staged writes");
        for (cpv, record) in std::mem::take(&mut self.staged) {
            match record {
                Some(record) => self.committed.insert(cpv, record),
                None => self.committed.remove(&cpv),
            };
        }
        self.commits += 1;
        Ok(())
    }

    fn autocommits(&self) -> bool {
        self.autocommits
    }

    fn cleanse_keys(&self) -> bool {
        self.cleanse_keys
    }

    fn serialize_eclasses(&self) -> bool {
        self.serialize_eclasses
    }

    fn readonly(&self) -> bool {
        self.readonly
    }
}
