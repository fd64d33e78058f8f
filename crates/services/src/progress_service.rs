use std::sync::Arc;

use progress_core::model::{
    Language, Metadata, NewProgress, ProgressId, ProgressRecord, ProgressUpdate, UserId,
};
use storage::repository::{ProgressRepository, StoredProgress, Translations};
use tracing::{debug, info};

use crate::Clock;
use crate::error::ProgressServiceError;
use crate::localize::localize_metadata;
use crate::translation::Translator;

/// Orchestrates progress logging, localized listing and partial updates.
#[derive(Clone)]
pub struct ProgressService {
    clock: Clock,
    progress: Arc<dyn ProgressRepository>,
    translator: Arc<dyn Translator>,
}

impl ProgressService {
    #[must_use]
    pub fn new(
        clock: Clock,
        progress: Arc<dyn ProgressRepository>,
        translator: Arc<dyn Translator>,
    ) -> Self {
        Self {
            clock,
            progress,
            translator,
        }
    }

    /// Assign an id, stamp the timestamp if missing, translate metadata and persist.
    ///
    /// Nothing is stored if any translation fails.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Translation` if localizing metadata fails.
    /// Returns `ProgressServiceError::Storage` if persistence fails.
    pub async fn log_progress(
        &self,
        user_id: &UserId,
        draft: NewProgress,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        let record = draft.into_record(ProgressId::generate(), self.clock.now());
        let translations = self.translate_all(&record.metadata).await?;
        let doc = StoredProgress::new(user_id.clone(), record).with_translations(translations);
        self.progress.insert_progress(&doc).await?;

        info!(
            user_id = %user_id,
            progress_id = %doc.record.id,
            activity_type = %doc.record.activity_type,
            "progress logged"
        );
        Ok(doc.record)
    }

    /// All of the user's records, oldest first, with metadata in `language`.
    ///
    /// An empty vector means the user has no records.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    /// Returns `ProgressServiceError::Translation` if a missing translation
    /// cannot be computed.
    pub async fn list_progress(
        &self,
        user_id: &UserId,
        language: Language,
    ) -> Result<Vec<ProgressRecord>, ProgressServiceError> {
        let docs = self.progress.list_progress(user_id).await?;
        debug!(user_id = %user_id, %language, count = docs.len(), "listing progress");

        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            records.push(self.localize(doc, language).await?);
        }
        Ok(records)
    }

    /// Merge the supplied fields into the user's record and persist it.
    ///
    /// Returns `Ok(None)` when the update names no field, or when no record
    /// with that id belongs to the user.
    ///
    /// # Errors
    ///
    /// Returns `ProgressServiceError::Translation` if new metadata cannot be localized.
    /// Returns `ProgressServiceError::Storage` if repository access fails.
    pub async fn update_progress(
        &self,
        user_id: &UserId,
        progress_id: &ProgressId,
        update: &ProgressUpdate,
    ) -> Result<Option<ProgressRecord>, ProgressServiceError> {
        if update.is_empty() {
            debug!(user_id = %user_id, progress_id = %progress_id, "empty progress update");
            return Ok(None);
        }

        let Some(mut doc) = self.progress.get_progress(user_id, progress_id).await? else {
            return Ok(None);
        };

        update.apply_to(&mut doc.record);
        if update.touches_metadata() {
            doc.translations = self.translate_all(&doc.record.metadata).await?;
        }

        if !self.progress.update_progress(&doc).await? {
            return Ok(None);
        }

        info!(
            user_id = %user_id,
            progress_id = %progress_id,
            status = %doc.record.status,
            "progress updated"
        );
        Ok(Some(doc.record))
    }

    async fn translate_all(
        &self,
        metadata: &Metadata,
    ) -> Result<Translations, ProgressServiceError> {
        let mut translations = Translations::new();
        if self.translator.is_identity() {
            return Ok(translations);
        }
        for language in Language::translated() {
            let localized =
                localize_metadata(self.translator.as_ref(), metadata, language).await?;
            translations.insert(language, localized);
        }
        Ok(translations)
    }

    /// Metadata in `language`, preferring the stored translation.
    ///
    /// A missing translation is computed live and written back, unless the
    /// translator is an identity or the metadata changed in the meantime.
    async fn localize(
        &self,
        mut doc: StoredProgress,
        language: Language,
    ) -> Result<ProgressRecord, ProgressServiceError> {
        if let Some(stored) = doc.metadata_in(language).cloned() {
            doc.record.metadata = stored;
            return Ok(doc.record);
        }

        let localized =
            localize_metadata(self.translator.as_ref(), &doc.record.metadata, language).await?;
        if !self.translator.is_identity() {
            doc.translations.insert(language, localized.clone());
            if !self.progress.save_translations(&doc).await? {
                debug!(progress_id = %doc.record.id, %language, "translation not saved");
            }
        }
        doc.record.metadata = localized;
        Ok(doc.record)
    }
}
