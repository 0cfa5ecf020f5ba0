/// Errors from the chunk slab heap.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SlabError {
    #[error("could not reserve storage for {requested} records")]
    Reserve { requested: usize },
    #[error("slab heap exhausted at {capacity} records")]
    Exhausted { capacity: usize },
}

/// Errors from building or configuring the proximity index.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IndexError {
    #[error("slab heap error: {0}")]
    Slab(#[from] SlabError),
    #[error("invalid grid configuration: {0}")]
    InvalidConfig(String),
}
