use std::path::PathBuf;
use std::sync::Arc;

use crate::config::{AuthConfig, Config};
use crate::mail::Mailer;
use crate::store::Store;

/// Where uploaded files go and how large they may be.
#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub dir: PathBuf,
    pub max_bytes: usize,
}

/// Shared application state, registered once as `web::Data<AppState>`.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,
    pub mailer: Arc<dyn Mailer>,
    pub auth: AuthConfig,
    pub frontend_url: String,
    pub uploads: UploadSettings,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>, config: &Config) -> Self {
        Self {
            store,
            mailer,
            auth: config.auth.clone(),
            frontend_url: config.frontend_url.trim_end_matches('/').to_string(),
            uploads: UploadSettings {
                dir: config.upload_dir.clone(),
                max_bytes: config.max_upload_bytes,
            },
        }
    }

    pub fn reset_link(&self, token: &str) -> String {
        format!("{}/reset-password/{}", self.frontend_url, token)
    }
}
