pub mod assets;
pub mod config;
pub mod files;
pub mod local_store;
pub mod locks;
pub mod master;
pub mod monthly;
pub mod stats;

pub use config::StoreConfig;
pub use local_store::{LocalStore, Mutation, MutationReceipt};
pub use locks::CollectionLocks;
pub use master::MasterSnapshot;
pub use monthly::{MonthlyActivityLog, MonthlyAssetLog};
pub use stats::StoreStats;
