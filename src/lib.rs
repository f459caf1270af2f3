// ============================================================================
// localvault Library
// ============================================================================
//
// Local durability layer for policy and task data: a file-backed store, the
// HTTP backup gateway in front of it, and the client pieces that route every
// write through the local backup before the primary store is trusted.

pub mod client;
pub mod core;
pub mod gateway;
pub mod storage;

// Re-export main types for convenience
pub use core::{Action, ActivityEvent, Actor, AssetRecord, Record, Result, VaultError};
pub use storage::{LocalStore, Mutation, StoreConfig, StoreStats};

pub use gateway::{GatewayConfig, GatewayState, UploadLimits, build_router};

pub use client::{
    BackupGateway, FallbackReader, HttpBackupGateway, LocalBackupGateway, MemoryPrimaryStore,
    PrimaryStore, ReadSource, ReconcilingWriter, WriteOutcome,
};
