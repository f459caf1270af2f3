use super::config::UploadLimits;
use crate::storage::LocalStore;
use std::sync::Arc;

#[derive(Clone)]
pub struct GatewayState {
    pub store: Arc<LocalStore>,
    pub limits: UploadLimits,
}

impl GatewayState {
    pub fn new(store: Arc<LocalStore>, limits: UploadLimits) -> Self {
        Self { store, limits }
    }
}
