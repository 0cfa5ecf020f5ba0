//! Developer Tooling: grid inspector, debug integrity sweep, coverage display.
//!
//! # Invariants
//! - Tools only read; nothing here mutates the index or the world.

mod inspector;

pub use inspector::{GridInspector, GridSummary, IntegrityReport};

pub fn crate_info() -> &'static str {
    "proxgrid-tools v0.1.0"
}
