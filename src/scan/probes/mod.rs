//! Concrete probe implementations.

pub mod appcompat;
pub mod bam;
pub mod browser;
pub mod dns_cache;
pub mod filesystem;
pub mod prefetch;
pub mod process;
pub mod recent_items;
pub mod registry;
pub mod steam;
pub mod virtualization;

use crate::scan::Scanner;

pub use appcompat::AppCompatProbe;
pub use bam::BamProbe;
pub use browser::BrowserHistoryProbe;
pub use dns_cache::DnsCacheProbe;
pub use filesystem::FileSystemProbe;
pub use prefetch::PrefetchProbe;
pub use process::ProcessProbe;
pub use recent_items::RecentItemsProbe;
pub use registry::RegistryProbe;
pub use steam::SteamProbe;
pub use virtualization::VirtualizationProbe;

/// All probes in report order, optionally filtered to the named subset
/// (case-insensitive).
pub fn build_probes(filter: Option<&[String]>) -> Vec<Box<dyn Scanner>> {
    let mut probes: Vec<Box<dyn Scanner>> = vec![
        Box::new(FileSystemProbe),
        Box::new(PrefetchProbe),
        Box::new(RecentItemsProbe),
        Box::new(SteamProbe),
        Box::new(RegistryProbe),
        Box::new(AppCompatProbe),
        Box::new(BamProbe),
        Box::new(VirtualizationProbe),
        Box::new(ProcessProbe),
        Box::new(BrowserHistoryProbe),
        Box::new(DnsCacheProbe),
    ];
    if let Some(names) = filter {
        let wanted: Vec<String> = names.iter().map(|n| n.to_lowercase()).collect();
        probes.retain(|p| wanted.iter().any(|w| w == &p.name().to_lowercase()));
    }
    probes
}

/// Probe names with their concurrency groups, for `--list-probes`.
pub fn probe_catalog() -> Vec<(&'static str, crate::models::ScanGroup)> {
    build_probes(None)
        .iter()
        .map(|p| (p.name(), p.group()))
        .collect()
}
