use std::collections::BTreeMap;

use progress_core::model::{Language, Metadata, ProgressId, ProgressRecord, UserId};
use sqlx::Row;
use sqlx::sqlite::SqliteRow;

use crate::repository::{StorageError, StoredProgress, Translations};

fn ser<E: core::fmt::Display>(e: E) -> StorageError {
    StorageError::Serialization(e.to_string())
}

pub(crate) fn metadata_to_text(metadata: &Metadata) -> Result<String, StorageError> {
    serde_json::to_string(metadata).map_err(ser)
}

pub(crate) fn metadata_from_text(raw: &str) -> Result<Metadata, StorageError> {
    serde_json::from_str(raw).map_err(ser)
}

/// Translations are stored as one JSON object keyed by language code.
pub(crate) fn translations_to_text(translations: &Translations) -> Result<String, StorageError> {
    let by_code: BTreeMap<&str, &Metadata> = translations
        .iter()
        .map(|(lang, metadata)| (lang.code(), metadata))
        .collect();
    serde_json::to_string(&by_code).map_err(ser)
}

pub(crate) fn translations_from_text(raw: &str) -> Result<Translations, StorageError> {
    let by_code: BTreeMap<String, Metadata> = serde_json::from_str(raw).map_err(ser)?;
    by_code
        .into_iter()
        .map(|(code, metadata)| {
            let lang: Language = code
                .parse()
                .map_err(|_| StorageError::Serialization(format!("invalid language: {code}")))?;
            Ok((lang, metadata))
        })
        .collect()
}

pub(crate) fn map_progress_row(row: &SqliteRow) -> Result<StoredProgress, StorageError> {
    let metadata: String = row.try_get("metadata").map_err(ser)?;
    let translations: String = row.try_get("translations").map_err(ser)?;

    let record = ProgressRecord {
        id: ProgressId::new(row.try_get::<String, _>("id").map_err(ser)?),
        course_id: row.try_get("course_id").map_err(ser)?,
        topic_id: row.try_get("topic_id").map_err(ser)?,
        subtopic_id: row.try_get("subtopic_id").map_err(ser)?,
        material_id: row.try_get("material_id").map_err(ser)?,
        quiz_id: row.try_get("quiz_id").map_err(ser)?,
        question_id: row.try_get("question_id").map_err(ser)?,
        score: row.try_get("score").map_err(ser)?,
        status: row.try_get("status").map_err(ser)?,
        activity_type: row.try_get("activity_type").map_err(ser)?,
        metadata: metadata_from_text(&metadata)?,
        timestamp: row.try_get("timestamp").map_err(ser)?,
    };

    Ok(StoredProgress {
        user_id: UserId::new(row.try_get::<String, _>("user_id").map_err(ser)?),
        record,
        translations: translations_from_text(&translations)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn translations_round_trip_through_codes() {
        let mut translations = Translations::new();
        translations.insert(
            Language::Hi,
            json!({"note": "नमस्ते"}).as_object().cloned().unwrap(),
        );
        let text = translations_to_text(&translations).unwrap();
        assert_eq!(text, r#"{"hi":{"note":"नमस्ते"}}"#);
        assert_eq!(translations_from_text(&text).unwrap(), translations);
    }

    #[test]
    fn unknown_language_in_store_is_a_serialization_error() {
        let err = translations_from_text(r#"{"xx":{}}"#).unwrap_err();
        assert!(matches!(err, StorageError::Serialization(_)));
    }

    #[test]
    fn metadata_text_must_be_an_object() {
        assert!(metadata_from_text("{}").unwrap().is_empty());
        assert!(metadata_from_text("[1]").is_err());
    }
}
