//! Gentoo metadata cache orchestration and slot conflict tracking.
//!
//! This crate provides the two data structures a package manager leans on
//! while it resolves a merge plan:
//!
//! - [`MetadataCache`], a policy layer over pluggable [`Backend`] storage
//!   mapping a package coordinate ([`Cpv`]) to its [`MetadataRecord`]. It
//!   enforces read-only mode, batches commits, and encodes the inherited
//!   eclass provenance (`_eclasses_`) in the tab-separated text form used by
//!   on-disk caches, legacy two-field entries included.
//! - [`SlotConflictTracker`], which records which package occupies which
//!   slot and reports collisions with other occupants or with blockers
//!   before a plan is committed.
//!
//! # Examples
//!
//! Regenerate an entry and slot it:
//!
//! ```
//! use portage_cache::{
//!     Blocker, CacheConfig, Cpv, MemoryBackend, MetadataCache, MetadataRecord, Package,
//!     SlotConflictTracker,
//! };
//!
//! let mut cache = MetadataCache::new(MemoryBackend::new(), CacheConfig::default());
//! let cpv = Cpv::parse("dev-libs/openssl-3.1.4").unwrap();
//! let record = MetadataRecord::parse("EAPI=8\nSLOT=0/3\n").unwrap();
//! cache.set(&cpv, &record).unwrap();
//!
//! let pkg = Package::from_record(cpv.clone(), &cache.get(&cpv).unwrap()).unwrap();
//! let blocker = Blocker::new("dev-libs/openssl");
//!
//! let mut tracker = SlotConflictTracker::new();
//! assert!(tracker.fill_slotting(&pkg).is_empty());
//! assert_eq!(tracker.add_limiter(&blocker), vec![&pkg]);
//! ```

mod cache;
mod config;
mod cpv;
mod eclass;
mod error;
mod memory;
mod package;
mod record;
mod schema;
mod tracker;

// Re-export public types
pub use cache::{Backend, MetadataCache};
pub use config::CacheConfig;
pub use cpv::Cpv;
pub use eclass::{deconstruct_eclasses, reconstruct_eclasses, EclassEntry, EclassMap};
pub use error::{Error, Result};
pub use memory::MemoryBackend;
pub use package::{Blocker, Package};
pub use portage_atom::Slot;
pub use record::{MetadataRecord, MetadataValue};
pub use schema::{Schema, ECLASSES_KEY, METADATA_KEYS};
pub use tracker::{Entry, Restriction, SlotConflictTracker, Slotted};
