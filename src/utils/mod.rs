/// Scan report rendering (text + JSON mirror)
pub mod report;

/// Retrying snapshot copies of locked files
pub mod snapshot;
