//! Platform services the bridge runs against.

mod file_store;
mod persistence;

pub use file_store::FileStore;
pub use persistence::{MemoryStore, Persistence};
