//! User and object storage backends

pub mod blob;
pub mod memory;
pub mod traits;

// Re-export the storage interfaces and built-in backends
pub use blob::{unique_blob_name, LocalObjectStore, MemoryObjectStore};
pub use memory::{LockoutPolicy, MemoryUserStore};
pub use traits::{ObjectStore, SignInResult, UserStore};
