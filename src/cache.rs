use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::cpv::Cpv;
use crate::eclass::{deconstruct_eclasses, reconstruct_eclasses};
use crate::error::{Error, Result};
use crate::record::{MetadataRecord, MetadataValue};
use crate::schema::{Schema, ECLASSES_KEY};

/// Raw storage primitives for a metadata cache.
///
/// A backend stores records in their storage form: every value is text,
/// `_eclasses_` included, unless the backend opts out of eclass
/// serialization and handles the decoded form itself.
///
/// The capability flags are read once, when a [`MetadataCache`] is built
/// around the backend. Defaults describe a batching backend that stores
/// complete eclass entries.
pub trait Backend {
    /// Fetch the stored record for `cpv`.
    fn raw_get(&self, cpv: &Cpv) -> Result<MetadataRecord>;

    /// Store `record` under `cpv`, replacing any previous entry.
    fn raw_set(&mut self, cpv: &Cpv, record: MetadataRecord) -> Result<()>;

    /// Remove the entry for `cpv`.
    fn raw_delete(&mut self, cpv: &Cpv) -> Result<()>;

    /// All coordinates with a stored entry.
    fn raw_keys(&self) -> Result<Vec<Cpv>>;

    /// Whether an entry exists for `cpv`.
    fn raw_contains(&self, cpv: &Cpv) -> Result<bool> {
        Ok(self.raw_keys()?.contains(cpv))
    }

    /// Persist batched writes. Only called on backends that do not
    /// auto-commit.
    fn raw_commit(&mut self) -> Result<()> {
        Err(Error::NotImplemented("commit"))
    }

    /// Whether every write is persisted immediately.
    fn autocommits(&self) -> bool {
        false
    }

    /// Whether full eclass data is stored, rather than provenance only.
    fn complete_eclass_entries(&self) -> bool {
        true
    }

    /// Whether empty values should be dropped before storing.
    fn cleanse_keys(&self) -> bool {
        false
    }

    /// Whether the cache layer owns the `_eclasses_` text encoding.
    fn serialize_eclasses(&self) -> bool {
        true
    }

    /// Whether the underlying storage is immutable.
    fn readonly(&self) -> bool {
        false
    }
}

/// Policy layer over a [`Backend`].
///
/// Enforces read-only mode, validates keys against the schema, converts
/// `_eclasses_` between its decoded and text forms, and batches commits:
/// with a non auto-committing backend, every write bumps a pending counter
/// and the backend is committed once the counter exceeds the sync rate.
/// Reads flush a backlog first so just-written data is visible.
///
/// Not internally synchronized. Use one cache per session or wrap it in a
/// mutex.
///
/// # Examples
///
/// ```
/// use portage_cache::{CacheConfig, Cpv, MemoryBackend, MetadataCache, MetadataRecord};
///
/// let mut cache = MetadataCache::new(MemoryBackend::new(), CacheConfig::default());
/// let cpv = Cpv::parse("dev-libs/foo-1.0").unwrap();
///
/// let mut record = MetadataRecord::new();
/// record.insert("SLOT", "0");
/// cache.set(&cpv, &record).unwrap();
///
/// assert!(cache.contains(&cpv).unwrap());
/// assert_eq!(cache.get(&cpv).unwrap().get_text("SLOT"), Some("0"));
/// ```
#[derive(Debug)]
pub struct MetadataCache<B: ?Sized = dyn Backend> {
    schema: Schema,
    readonly: bool,
    autocommits: bool,
    cleanse_keys: bool,
    serialize_eclasses: bool,
    complete_eclass_entries: bool,
    sync_rate: usize,
    updates: usize,
    backend: Box<B>,
}

impl<B: Backend> MetadataCache<B> {
    /// Build a cache over `backend`.
    pub fn new(backend: B, config: CacheConfig) -> Self {
        Self::from_boxed(Box::new(backend), config)
    }
}

impl<B: Backend + ?Sized> MetadataCache<B> {
    /// Build a cache over an already boxed backend, typically a
    /// `Box<dyn Backend>` chosen at runtime.
    pub fn from_boxed(backend: Box<B>, config: CacheConfig) -> Self {
        MetadataCache {
            schema: config.schema(),
            readonly: config.readonly || backend.readonly(),
            autocommits: backend.autocommits(),
            cleanse_keys: backend.cleanse_keys(),
            serialize_eclasses: backend.serialize_eclasses(),
            complete_eclass_entries: backend.complete_eclass_entries(),
            sync_rate: config.sync_rate,
            updates: 0,
            backend,
        }
    }

    /// Fetch the record for `cpv`, decoding `_eclasses_` when this layer
    /// owns its serialization.
    pub fn get(&mut self, cpv: &Cpv) -> Result<MetadataRecord> {
        self.flush_if_backlogged()?;
        let mut record = self.backend.raw_get(cpv)?;
        if self.serialize_eclasses {
            if let Some(MetadataValue::Text(raw)) = record.get(ECLASSES_KEY) {
                let eclasses = reconstruct_eclasses(cpv, raw).map_err(|e| {
                    warn!(%cpv, "Corrupt eclass data in cache: {e}");
                    e
                })?;
                record.insert(ECLASSES_KEY, eclasses);
            }
        }
        Ok(record)
    }

    /// Store `record` under `cpv`.
    ///
    /// The caller's record is left untouched; a transformed copy is handed
    /// to the backend.
    pub fn set(&mut self, cpv: &Cpv, record: &MetadataRecord) -> Result<()> {
        if self.readonly {
            return Err(Error::ReadOnly);
        }
        self.schema.validate(record)?;

        let mut stored = record.clone();
        if self.cleanse_keys {
            stored.retain_non_empty();
        }
        if self.serialize_eclasses {
            if let Some(MetadataValue::Eclasses(map)) = stored.get(ECLASSES_KEY) {
                let text = deconstruct_eclasses(map);
                stored.insert(ECLASSES_KEY, text);
            }
        }

        self.backend.raw_set(cpv, stored)?;
        if !self.autocommits {
            self.updates += 1;
            self.flush_if_backlogged()?;
        }
        Ok(())
    }

    /// Remove the entry for `cpv`.
    pub fn delete(&mut self, cpv: &Cpv) -> Result<()> {
        if self.readonly {
            return Err(Error::ReadOnly);
        }
        if !self.autocommits {
            self.updates += 1;
        }
        self.backend.raw_delete(cpv)?;
        self.flush_if_backlogged()
    }

    pub fn contains(&self, cpv: &Cpv) -> Result<bool> {
        self.backend.raw_contains(cpv)
    }

    pub fn keys(&self) -> Result<Vec<Cpv>> {
        self.backend.raw_keys()
    }

    /// Every stored entry, decoded as by [`get`](Self::get).
    pub fn items(&mut self) -> Result<Vec<(Cpv, MetadataRecord)>> {
        let keys = self.keys()?;
        let mut items = Vec::with_capacity(keys.len());
        for cpv in keys {
            let record = self.get(&cpv)?;
            items.push((cpv, record));
        }
        Ok(items)
    }

    /// Change the sync rate. A rate of zero commits immediately.
    pub fn sync(&mut self, rate: usize) -> Result<()> {
        self.sync_rate = rate;
        if rate == 0 {
            self.commit()?;
        }
        Ok(())
    }

    /// Persist pending writes. A no-op for auto-committing backends.
    pub fn commit(&mut self) -> Result<()> {
        if self.autocommits {
            return Ok(());
        }
        debug!(pending = self.updates, "Committing metadata cache");
        self.backend.raw_commit()
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn is_readonly(&self) -> bool {
        self.readonly
    }

    pub fn autocommits(&self) -> bool {
        self.autocommits
    }

    pub fn complete_eclass_entries(&self) -> bool {
        self.complete_eclass_entries
    }

    pub fn sync_rate(&self) -> usize {
        self.sync_rate
    }

    /// The wrapped backend.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    fn flush_if_backlogged(&mut self) -> Result<()> {
        if self.updates > self.sync_rate {
            debug!(
                pending = self.updates,
                sync_rate = self.sync_rate,
                "Pending writes exceed sync rate, flushing"
            );
            self.commit()?;
            self.updates = 0;
        }
        Ok(())
    }
}
