#![forbid(unsafe_code)]

pub mod record;
pub mod repository;
pub mod sqlite;

pub use record::{ProgressRecord, RecordError, decode_progress, encode_progress, progress_key};
pub use repository::{InMemoryStore, PersistenceStore, Storage, StorageError};
