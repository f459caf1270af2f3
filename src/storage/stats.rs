use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Diagnostic aggregate computed by scanning the store directories.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreStats {
    /// Records in each collection's master snapshot
    pub per_collection_count: BTreeMap<String, usize>,
    /// File names found in the monthly log directory
    pub monthly_log_file_names: Vec<String>,
    /// Uploaded binaries per `YYYY-MM` directory
    pub per_month_asset_count: BTreeMap<String, usize>,
    pub total_asset_count: usize,
}
