use std::sync::Arc;
use tracing::info;

use crate::models::backup::{BackupDocument, ImportSummary, BACKUP_VERSION};
use crate::services::BackupService;
use crate::state::AppState;
use crate::utils::errors::{bad_request_error, AppResult};

/// Copias de segurança (JSON completo e CSV de máquinas)
pub struct BackupController {
    service: BackupService,
}

impl BackupController {
    pub fn new(state: &AppState) -> Self {
        Self {
            service: BackupService::new(Arc::clone(&state.entities)),
        }
    }

    pub async fn export_json(&self) -> AppResult<BackupDocument> {
        self.service.export_json().await
    }

    pub async fn import_json(&self, document: BackupDocument) -> AppResult<ImportSummary> {
        if document.version != BACKUP_VERSION {
            info!(
                "📦 Cópia na versão {} (actual {}), a importar na mesma",
                document.version, BACKUP_VERSION
            );
        }
        self.service.import_json(document).await
    }

    pub async fn export_csv(&self) -> AppResult<String> {
        self.service.export_csv().await
    }

    pub async fn import_csv(&self, content: &str) -> AppResult<ImportSummary> {
        if content.trim().is_empty() {
            return Err(bad_request_error("Ficheiro CSV vazio"));
        }
        self.service.import_csv(content).await
    }
}
