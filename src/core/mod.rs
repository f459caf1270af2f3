pub mod error;
pub mod time;
pub mod types;

pub use error::{Result, VaultError};
pub use types::{
    Action, ActivityEvent, Actor, AssetRecord, BACKUP_TIMESTAMP_FIELD, Record, collections,
    record_id, require_id, validate_collection,
};
