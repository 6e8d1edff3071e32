// Re-export all items from the submodules
mod defaults;
mod env_vars;
mod scan_config;

pub use env_vars::expand_windows_env_vars;
pub use scan_config::{KeywordConfig, RegistryTarget, ScanConfig, ScanRoot, ScanSettings};
