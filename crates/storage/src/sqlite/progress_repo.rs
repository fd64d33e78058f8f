use progress_core::model::{ProgressId, UserId};

use super::SqliteRepository;
use super::mapping::{map_progress_row, metadata_to_text, translations_to_text};
use crate::repository::{ProgressRepository, StorageError, StoredProgress};

const SELECT_COLUMNS: &str = r"
    SELECT id, user_id, course_id, topic_id, subtopic_id, material_id, quiz_id, question_id,
           score, status, activity_type, metadata, translations, timestamp
    FROM progress_records
";

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

#[async_trait::async_trait]
impl ProgressRepository for SqliteRepository {
    async fn insert_progress(&self, doc: &StoredProgress) -> Result<(), StorageError> {
        let record = &doc.record;
        sqlx::query(
            r"
            INSERT INTO progress_records (
                id, user_id, course_id, topic_id, subtopic_id, material_id, quiz_id, question_id,
                score, status, activity_type, metadata, translations, timestamp
            )
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            ",
        )
        .bind(record.id.as_str())
        .bind(doc.user_id.as_str())
        .bind(record.course_id.as_deref())
        .bind(record.topic_id.as_deref())
        .bind(record.subtopic_id.as_deref())
        .bind(record.material_id.as_deref())
        .bind(record.quiz_id.as_deref())
        .bind(record.question_id.as_deref())
        .bind(record.score)
        .bind(record.status.as_str())
        .bind(record.activity_type.as_str())
        .bind(metadata_to_text(&record.metadata)?)
        .bind(translations_to_text(&doc.translations)?)
        .bind(record.timestamp)
        .execute(&self.pool)
        .await
        .map_err(|e| {
            if is_unique_violation(&e) {
                StorageError::Conflict
            } else {
                StorageError::Connection(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn get_progress(
        &self,
        user_id: &UserId,
        id: &ProgressId,
    ) -> Result<Option<StoredProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE id = ?1 AND user_id = ?2");
        let row = sqlx::query(&sql)
            .bind(id.as_str())
            .bind(user_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        row.as_ref().map(map_progress_row).transpose()
    }

    async fn list_progress(&self, user_id: &UserId) -> Result<Vec<StoredProgress>, StorageError> {
        let sql = format!("{SELECT_COLUMNS} WHERE user_id = ?1 ORDER BY timestamp ASC, id ASC");
        let rows = sqlx::query(&sql)
            .bind(user_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let mut docs = Vec::with_capacity(rows.len());
        for row in &rows {
            docs.push(map_progress_row(row)?);
        }
        Ok(docs)
    }

    async fn update_progress(&self, doc: &StoredProgress) -> Result<bool, StorageError> {
        let record = &doc.record;
        let res = sqlx::query(
            r"
            UPDATE progress_records
            SET status = ?1, score = ?2, metadata = ?3, translations = ?4
            WHERE id = ?5 AND user_id = ?6
            ",
        )
        .bind(record.status.as_str())
        .bind(record.score)
        .bind(metadata_to_text(&record.metadata)?)
        .bind(translations_to_text(&doc.translations)?)
        .bind(record.id.as_str())
        .bind(doc.user_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }

    async fn save_translations(&self, doc: &StoredProgress) -> Result<bool, StorageError> {
        let record = &doc.record;
        let res = sqlx::query(
            r"
            UPDATE progress_records
            SET translations = ?1
            WHERE id = ?2 AND user_id = ?3 AND metadata = ?4
            ",
        )
        .bind(translations_to_text(&doc.translations)?)
        .bind(record.id.as_str())
        .bind(doc.user_id.as_str())
        .bind(metadata_to_text(&record.metadata)?)
        .execute(&self.pool)
        .await
        .map_err(|e| StorageError::Connection(e.to_string()))?;

        Ok(res.rows_affected() > 0)
    }
}
