use async_trait::async_trait;
use progress_core::model::{Language, Metadata, ProgressId, ProgressRecord, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Errors surfaced by storage adapters.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum StorageError {
    #[error("conflict")]
    Conflict,

    #[error("connection error: {0}")]
    Connection(String),

    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Localized copies of a record's metadata, keyed by target language.
pub type Translations = BTreeMap<Language, Metadata>;

/// Persisted shape of a progress document.
///
/// Wraps the domain record with its owner and the metadata translations
/// computed when the metadata was last written.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredProgress {
    pub user_id: UserId,
    pub record: ProgressRecord,
    pub translations: Translations,
}

impl StoredProgress {
    #[must_use]
    pub fn new(user_id: UserId, record: ProgressRecord) -> Self {
        Self {
            user_id,
            record,
            translations: Translations::new(),
        }
    }

    #[must_use]
    pub fn with_translations(mut self, translations: Translations) -> Self {
        self.translations = translations;
        self
    }

    /// Stored metadata for `language`, if one was computed.
    ///
    /// The source language always resolves to the record's own metadata.
    #[must_use]
    pub fn metadata_in(&self, language: Language) -> Option<&Metadata> {
        if language.is_source() {
            return Some(&self.record.metadata);
        }
        self.translations.get(&language)
    }
}

/// Repository contract for progress documents.
///
/// Every read and write is scoped to a user: a document owned by someone
/// else behaves exactly like a missing one.
#[async_trait]
pub trait ProgressRepository: Send + Sync {
    /// Persist a new document.
    ///
    /// # Errors
    ///
    /// Returns `StorageError::Conflict` if the id is already taken, or other
    /// storage errors.
    async fn insert_progress(&self, doc: &StoredProgress) -> Result<(), StorageError>;

    /// Fetch one document owned by `user_id`.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn get_progress(
        &self,
        user_id: &UserId,
        id: &ProgressId,
    ) -> Result<Option<StoredProgress>, StorageError>;

    /// All documents owned by `user_id`, oldest first (timestamp, then id).
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<StoredProgress>, StorageError>;

    /// Write back the mutable part of a document: status, score, metadata
    /// and translations. Course links and timestamp are never rewritten.
    ///
    /// Returns false when no document with that id is owned by the user.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn update_progress(&self, doc: &StoredProgress) -> Result<bool, StorageError>;

    /// Replace the stored translations of a document, but only while its
    /// metadata still equals `doc.record.metadata`.
    ///
    /// Returns false when the document is missing, foreign, or its metadata
    /// changed since `doc` was read.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backend fails.
    async fn save_translations(&self, doc: &StoredProgress) -> Result<bool, StorageError>;
}

/// Simple in-memory repository implementation for testing and prototyping.
#[derive(Clone, Default)]
pub struct InMemoryRepository {
    docs: Arc<Mutex<HashMap<ProgressId, StoredProgress>>>,
}

impl InMemoryRepository {
    #[must_use]
    pub fn new() -> Self {
        Self {
            docs: Arc::new(Mutex::new(HashMap::new())),
        }
    }
}

#[async_trait]
impl ProgressRepository for InMemoryRepository {
    async fn insert_progress(&self, doc: &StoredProgress) -> Result<(), StorageError> {
        let mut guard = self
            .docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        if guard.contains_key(&doc.record.id) {
            return Err(StorageError::Conflict);
        }
        guard.insert(doc.record.id.clone(), doc.clone());
        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        id: &ProgressId,
    ) -> Result<Option<StoredProgress>, StorageError> {
        let guard = self
            .docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        Ok(guard.get(id).filter(|doc| &doc.user_id == user_id).cloned())
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<StoredProgress>, StorageError> {
        let guard = self
            .docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let mut docs: Vec<StoredProgress> = guard
            .values()
            .filter(|doc| &doc.user_id == user_id)
            .cloned()
            .collect();
        docs.sort_by(|a, b| {
            a.record
                .timestamp
                .cmp(&b.record.timestamp)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        Ok(docs)
    }

    async fn update_progress(&self, doc: &StoredProgress) -> Result<bool, StorageError> {
        let mut guard = self
            .docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(existing) = guard
            .get_mut(&doc.record.id)
            .filter(|existing| existing.user_id == doc.user_id)
        else {
            return Ok(false);
        };
        existing.record.status.clone_from(&doc.record.status);
        existing.record.score = doc.record.score;
        existing.record.metadata.clone_from(&doc.record.metadata);
        existing.translations.clone_from(&doc.translations);
        Ok(true)
    }

    async fn save_translations(&self, doc: &StoredProgress) -> Result<bool, StorageError> {
        let mut guard = self
            .docs
            .lock()
            .map_err(|e| StorageError::Connection(e.to_string()))?;
        let Some(existing) = guard.get_mut(&doc.record.id).filter(|existing| {
            existing.user_id == doc.user_id && existing.record.metadata == doc.record.metadata
        }) else {
            return Ok(false);
        };
        existing.translations.clone_from(&doc.translations);
        Ok(true)
    }
}

/// Repositories behind trait objects for easy backend swapping.
#[derive(Clone)]
pub struct Storage {
    pub progress: Arc<dyn ProgressRepository>,
}

impl Storage {
    #[must_use]
    pub fn in_memory() -> Self {
        let progress: Arc<dyn ProgressRepository> = Arc::new(InMemoryRepository::new());
        Self { progress }
    }
}
