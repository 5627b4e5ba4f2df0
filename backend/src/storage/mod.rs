pub mod http;
pub mod memory;
pub mod object_store;

pub use http::HttpObjectStore;
pub use memory::MemoryObjectStore;
pub use object_store::{ObjectStore, RemoveOutcome, StorageError, StorageResult};
