use portage_cache::{
    Backend, Blocker, CacheConfig, Cpv, MemoryBackend, MetadataCache, MetadataRecord, Package,
    SlotConflictTracker,
};
use tracing_subscriber::EnvFilter;

const ENTRIES: &[(&str, &str)] = &[
    (
        "dev-python/clang-python-10.0.0_rc1",
        "\
DEFINED_PHASES=install test unpack
DESCRIPTION=Python bindings for sys-devel/clang
EAPI=7
SLOT=0
_eclasses_=llvm.org\t/var/db/repos/gentoo/eclass\t1580000000\tmultibuild\t/var/db/repos/gentoo/eclass\t1570000000
_md5_=4539d849d3cea8ac84debad9b3154143
",
    ),
    (
        "dev-python/clang-python-11.0.0",
        "\
DESCRIPTION=Python bindings for sys-devel/clang
EAPI=7
SLOT=0
_eclasses_=llvm.org\t1600000000
",
    ),
    (
        "sys-devel/clang-10.0.0",
        "\
DESCRIPTION=C language family frontend for LLVM
EAPI=7
SLOT=10
",
    ),
];

const CONFIG: &str = "sync_rate = 2\n";

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let config = CacheConfig::from_toml(CONFIG).expect("invalid cache config");
    let mut cache = MetadataCache::new(MemoryBackend::new(), config);

    // Entries arrive in storage form; store them as a regeneration pass would.
    let mut backend = MemoryBackend::new();
    for (cpv, text) in ENTRIES {
        let cpv = Cpv::parse(cpv).expect("invalid CPV");
        let record = MetadataRecord::parse(text).expect("failed to parse cache entry");
        backend.raw_set(&cpv, record).expect("store failed");
    }
    let mut source = MetadataCache::new(backend, CacheConfig::default());

    println!("=== Decoded Entries ===");
    for (cpv, record) in source.items().expect("failed to read cache") {
        println!("{cpv}");
        println!("  SLOT:     {}", record.get_text("SLOT").unwrap_or("-"));
        if let Some(eclasses) = record.eclasses() {
            for (name, entry) in eclasses {
                let path = if entry.path.is_empty() { "<legacy>" } else { entry.path.as_str() };
                println!("  eclass:   {name} {path} {}", entry.mtime);
            }
        }
        cache.set(&cpv, &record).expect("write failed");
    }
    cache.sync(0).expect("commit failed");
    println!("commits: {}", cache.backend().commits());

    println!("\n=== Slotting ===");
    let packages: Vec<Package> = cache
        .items()
        .expect("failed to read cache")
        .into_iter()
        .map(|(cpv, record)| Package::from_record(cpv, &record).expect("missing SLOT"))
        .collect();
    let blocker = Blocker::new("sys-devel/clang");

    let mut tracker = SlotConflictTracker::new();
    for pkg in &packages {
        let conflicts = tracker.fill_slotting(pkg);
        if conflicts.is_empty() {
            println!("slotted   {}", pkg.cpv());
        } else {
            println!("conflict  {} ({} existing)", pkg.cpv(), conflicts.len());
        }
    }
    for pkg in tracker.add_limiter(&blocker) {
        println!("blocked   {}", pkg.cpv());
    }
}
