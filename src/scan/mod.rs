//! Scan engine: probe contract, orchestration, progress and walking.

pub mod context;
pub mod orchestrator;
pub mod probes;
pub mod progress;
pub mod walker;

use async_trait::async_trait;

use crate::error::ScanError;
use crate::models::ScanGroup;

pub use context::ScanContext;
pub use orchestrator::{ScanEngine, ScanHandle};
pub use progress::FindingSink;

/// Capability interface every probe implements.
///
/// A probe pushes findings into the sink as it goes; the orchestrator
/// wraps the call with the group deadline and turns the outcome into a
/// `ScanResult`. Probes must check `ctx.check_cancelled()` at every loop
/// boundary that could otherwise run long, and go through
/// `ctx.executor` for any external command.
#[async_trait]
pub trait Scanner: Send + Sync {
    /// Stable display name, used as the finding tag.
    fn name(&self) -> &'static str;

    /// Concurrency group this probe is scheduled in.
    fn group(&self) -> ScanGroup;

    async fn scan(&self, ctx: &ScanContext, out: &mut FindingSink) -> Result<(), ScanError>;
}
