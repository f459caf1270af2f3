//! Client side of the durability layer: the reconciling writer used by every
//! domain mutation and the fallback reader used by every domain read.

pub mod gateway;
pub mod primary;
pub mod reader;
pub mod revive;
pub mod temp_id;
pub mod writer;

pub use gateway::{BackupGateway, HttpBackupGateway, LocalBackupGateway};
pub use primary::{MemoryPrimaryStore, PrimaryStore};
pub use reader::{FallbackRead, FallbackReader, ReadSource, ReaderConfig};
pub use revive::{DomainRecord, DomainValue};
pub use temp_id::{generate_temp_id, is_temp_id};
pub use writer::{LocalBackup, PendingWrite, ReconcilingWriter, WriteOutcome, WriterConfig};
