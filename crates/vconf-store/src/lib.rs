//! vconf Record Stores
//!
//! The versioned key-value capability the request handlers depend on, plus
//! two implementations:
//!
//! - [`MemoryRecordStore`]: process-local, used by tests and dev mode
//! - [`FileRecordStore`]: one YAML manifest per record, lock-guarded writes
//!
//! Every store must reject a [`RecordStore::patch`] whose expected
//! [`VersionToken`] is stale; the update loop is only correct under
//! concurrent writers if it does.

#![warn(missing_docs)]
#![warn(unreachable_pub)]

mod error;
mod file;
mod memory;
mod record;
mod store;

pub use error::{StoreError, StoreResult};
pub use file::FileRecordStore;
pub use memory::MemoryRecordStore;
pub use record::{RecordKey, StoredRecord, VersionToken, DEFAULT_PAYLOAD_KEY};
pub use store::RecordStore;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
