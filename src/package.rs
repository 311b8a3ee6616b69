use portage_atom::Slot;

use crate::cpv::Cpv;
use crate::error::{Error, Result};
use crate::record::MetadataRecord;
use crate::tracker::{Restriction, Slotted};

/// A package version proposed for the merge plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    cpv: Cpv,
    key: String,
    slot: Slot,
}

impl Package {
    pub fn new(cpv: Cpv, slot: Slot) -> Self {
        Package {
            key: cpv.key(),
            cpv,
            slot,
        }
    }

    /// Build a package from its cached metadata, which must carry `SLOT`.
    ///
    /// # Examples
    ///
    /// ```
    /// use portage_cache::{Cpv, MetadataRecord, Package};
    ///
    /// let record = MetadataRecord::parse("SLOT=3/3.1\n").unwrap();
    /// let pkg = Package::from_record(Cpv::parse("dev-libs/foo-3.1").unwrap(), &record).unwrap();
    /// assert_eq!(pkg.slot().slot, "3");
    /// ```
    pub fn from_record(cpv: Cpv, record: &MetadataRecord) -> Result<Self> {
        let slot = record
            .slot()
            .ok_or_else(|| Error::InvalidCacheEntry(format!("missing SLOT for {cpv}")))?;
        Ok(Package::new(cpv, slot))
    }

    pub fn cpv(&self) -> &Cpv {
        &self.cpv
    }

    pub fn slot(&self) -> &Slot {
        &self.slot
    }
}

impl Slotted for Package {
    fn key(&self) -> &str {
        &self.key
    }

    fn slot(&self) -> &Slot {
        &self.slot
    }
}

/// Blocks every version of a package, optionally only within one slot.
///
/// A slot restriction compares the main slot only; sub-slots are ignored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Blocker {
    key: String,
    slot: Option<Slot>,
}

impl Blocker {
    /// Block `key` (`category/package`) in every slot.
    pub fn new(key: impl Into<String>) -> Self {
        Blocker {
            key: key.into(),
            slot: None,
        }
    }

    /// Restrict the blocker to one slot.
    pub fn in_slot(mut self, slot: Slot) -> Self {
        self.slot = Some(slot);
        self
    }
}

impl Restriction<Package> for Blocker {
    fn key(&self) -> &str {
        &self.key
    }

    fn matches(&self, candidate: &Package) -> bool {
        candidate.key == self.key
            && self
                .slot
                .as_ref()
                .map_or(true, |slot| slot.slot == candidate.slot.slot)
    }
}
