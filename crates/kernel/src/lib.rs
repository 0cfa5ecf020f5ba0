//! World Kernel: authoritative object state and lifecycle events.
//!
//! # Invariants
//! - Every object mutation flows through an explicit operation and is logged.
//! - A slot's generation is bumped on despawn, so stale handles never resolve.

pub mod object;
pub mod world;

pub use object::{ObjectData, ObjectKind, Sensor, SensorKind};
pub use world::{World, WorldEvent, splitmix64};
