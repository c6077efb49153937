//! Application state shared by all handlers.

use std::sync::Arc;

use leadrelay_core::Config;
use leadrelay_storage::Storage;

use crate::services::email::Notifier;
use crate::services::upload::AttachmentService;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub attachments: Arc<AttachmentService>,
    /// `None` when notifications are disabled
    pub notifier: Option<Arc<dyn Notifier>>,
}

impl AppState {
    pub fn new(
        config: Config,
        storage: Arc<dyn Storage>,
        notifier: Option<Arc<dyn Notifier>>,
    ) -> Self {
        Self {
            attachments: Arc::new(AttachmentService::new(storage)),
            config,
            notifier,
        }
    }
}
