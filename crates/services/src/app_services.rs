use std::sync::Arc;

use storage::repository::Storage;
use tracing::warn;

use crate::Clock;
use crate::error::AppServicesError;
use crate::progress_service::ProgressService;
use crate::translation::{HttpTranslator, PassthroughTranslator, Translator, TranslatorConfig};

/// Assembles the services the HTTP layer depends on.
#[derive(Clone)]
pub struct AppServices {
    progress: Arc<ProgressService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        translator: Arc<dyn Translator>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::from_storage(&storage, clock, translator))
    }

    /// Build services over an in-memory store.
    #[must_use]
    pub fn in_memory(clock: Clock, translator: Arc<dyn Translator>) -> Self {
        Self::from_storage(&Storage::in_memory(), clock, translator)
    }

    #[must_use]
    pub fn from_storage(storage: &Storage, clock: Clock, translator: Arc<dyn Translator>) -> Self {
        let progress = Arc::new(ProgressService::new(
            clock,
            Arc::clone(&storage.progress),
            translator,
        ));
        Self { progress }
    }

    #[must_use]
    pub fn progress(&self) -> Arc<ProgressService> {
        Arc::clone(&self.progress)
    }
}

/// Picks the HTTP translator when configured, otherwise passes text through.
#[must_use]
pub fn translator_from_config(config: Option<TranslatorConfig>) -> Arc<dyn Translator> {
    match config {
        Some(config) => Arc::new(HttpTranslator::new(config)),
        None => {
            warn!("no translation backend configured; records will be served untranslated");
            Arc::new(PassthroughTranslator)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use progress_core::model::{Language, NewProgress, UserId};
    use progress_core::time::fixed_clock;

    #[tokio::test]
    async fn in_memory_services_share_one_store() {
        let services = AppServices::in_memory(fixed_clock(), translator_from_config(None));
        let user = UserId::new("u1");

        services
            .progress()
            .log_progress(&user, NewProgress::new("incomplete", "view"))
            .await
            .unwrap();

        let listed = services
            .progress()
            .list_progress(&user, Language::Es)
            .await
            .unwrap();
        assert_eq!(listed.len(), 1);
    }

    #[tokio::test]
    async fn sqlite_services_boot_and_migrate() {
        let services = AppServices::new_sqlite(
            "sqlite:file:memdb_app_services?mode=memory&cache=shared",
            fixed_clock(),
            Arc::new(PassthroughTranslator),
        )
        .await
        .expect("sqlite services");
        let listed = services
            .progress()
            .list_progress(&UserId::new("u1"), Language::En)
            .await
            .unwrap();
        assert!(listed.is_empty());
    }
}
