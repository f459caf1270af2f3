use std::path::{Path, PathBuf};

/// On-disk layout of the local store.
///
/// Everything lives under `data_dir` by default:
/// `master/<collection>.json`, `monthly/<YYYY-MM>_<collection>.json` and
/// `assets/<YYYY-MM>/...`. Each directory can be relocated individually.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Root data directory
    pub data_dir: PathBuf,

    /// Full-state snapshot per collection
    pub master_dir: PathBuf,

    /// Monthly activity logs
    pub monthly_dir: PathBuf,

    /// Month-partitioned uploaded binaries and asset logs
    pub assets_dir: PathBuf,
}

impl StoreConfig {
    pub fn new<P: AsRef<Path>>(data_dir: P) -> Self {
        let data_dir = data_dir.as_ref().to_path_buf();
        Self {
            master_dir: data_dir.join("master"),
            monthly_dir: data_dir.join("monthly"),
            assets_dir: data_dir.join("assets"),
            data_dir,
        }
    }

    /// Set the snapshot directory
    pub fn master_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.master_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the activity log directory
    pub fn monthly_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.monthly_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the asset directory
    pub fn assets_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.assets_dir = dir.as_ref().to_path_buf();
        self
    }

    pub fn master_path(&self, collection: &str) -> PathBuf {
        self.master_dir.join(format!("{collection}.json"))
    }

    pub fn monthly_path(&self, month: &str, collection: &str) -> PathBuf {
        self.monthly_dir.join(format!("{month}_{collection}.json"))
    }

    pub fn asset_month_dir(&self, month: &str) -> PathBuf {
        self.assets_dir.join(month)
    }

    pub fn asset_log_path(&self, month: &str) -> PathBuf {
        self.asset_month_dir(month).join(ASSET_LOG_FILE)
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::new("data")
    }
}

pub const ASSET_LOG_FILE: &str = "asset_log.json";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derives_layout_from_data_dir() {
        let config = StoreConfig::new("/srv/backup");
        assert_eq!(config.master_path("policies"), PathBuf::from("/srv/backup/master/policies.json"));
        assert_eq!(
            config.monthly_path("2024-03", "tasks"),
            PathBuf::from("/srv/backup/monthly/2024-03_tasks.json")
        );
        assert_eq!(
            config.asset_log_path("2024-03"),
            PathBuf::from("/srv/backup/assets/2024-03/asset_log.json")
        );
    }

    #[test]
    fn directories_can_be_relocated() {
        let config = StoreConfig::new("/srv/backup").monthly_dir("/var/log/vault");
        assert_eq!(
            config.monthly_path("2024-03", "tasks"),
            PathBuf::from("/var/log/vault/2024-03_tasks.json")
        );
        assert_eq!(config.master_dir, PathBuf::from("/srv/backup/master"));
    }
}
