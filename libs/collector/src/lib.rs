mod aggregate;
mod collect;
mod memory;

pub use aggregate::{Summary, aggregate, aggregate_by_asset};
pub use collect::WindowedCollector;
pub use memory::MemorySource;
