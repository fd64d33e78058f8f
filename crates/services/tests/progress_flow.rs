use std::sync::Arc;

use progress_core::model::{Language, NewProgress, ProgressUpdate, UserId};
use progress_core::time::fixed_clock;
use serde_json::json;
use async_trait::async_trait;
use services::{PassthroughTranslator, ProgressService, TranslationError, Translator};
use storage::repository::{ProgressRepository, Storage};

struct Tagging;

#[async_trait]
impl Translator for Tagging {
    async fn translate(&self, text: &str, target: Language) -> Result<String, TranslationError> {
        Ok(format!("{target}:{text}"))
    }
}

#[tokio::test]
async fn progress_flow_log_list_update() {
    let storage = Storage::sqlite("sqlite:file:memdb_progress_flow?mode=memory&cache=shared")
        .await
        .expect("connect sqlite");
    let service = ProgressService::new(
        fixed_clock(),
        Arc::clone(&storage.progress),
        Arc::new(PassthroughTranslator),
    );
    let student = UserId::new("student-1");

    let draft = NewProgress::from_json(json!({
        "status": "incomplete",
        "activity_type": "quiz_attempt",
        "course_id": "c1",
        "quiz_id": "q1",
        "score": 30.0,
        "metadata": {"answers": ["b", "c"]}
    }))
    .expect("valid draft");
    let created = service
        .log_progress(&student, draft)
        .await
        .expect("log progress");

    let listed = service
        .list_progress(&student, "FR".parse::<Language>().unwrap())
        .await
        .expect("list progress");
    assert_eq!(listed, vec![created.clone()]);

    let update = ProgressUpdate::from_json(json!({"status": "complete", "score": 95.0}))
        .expect("valid update");
    let updated = service
        .update_progress(&student, &created.id, &update)
        .await
        .expect("update progress")
        .expect("record exists");
    assert_eq!(updated.status, "complete");
    assert_eq!(updated.score, Some(95.0));
    assert_eq!(updated.quiz_id.as_deref(), Some("q1"));
    assert_eq!(updated.metadata, created.metadata);

    // Reopen through a fresh listing to confirm the merge was persisted.
    let listed = service
        .list_progress(&student, Language::En)
        .await
        .expect("list after update");
    assert_eq!(listed, vec![updated]);

    let cleared = ProgressUpdate::from_json(json!({"score": null})).expect("valid update");
    let after_clear = service
        .update_progress(&student, &created.id, &cleared)
        .await
        .expect("clear score")
        .expect("record exists");
    assert_eq!(after_clear.score, None);
    assert_eq!(after_clear.status, "complete");
}

#[tokio::test]
async fn records_logged_without_backend_translate_once_one_is_configured() {
    let url = "sqlite:file:memdb_progress_backend_later?mode=memory&cache=shared";
    let storage = Storage::sqlite(url)
        .await
        .expect("connect sqlite");
    let student = UserId::new("student-2");

    let untranslated = ProgressService::new(
        fixed_clock(),
        Arc::clone(&storage.progress),
        Arc::new(PassthroughTranslator),
    );
    let draft = NewProgress::from_json(json!({
        "status": "incomplete",
        "activity_type": "view",
        "metadata": {"note": "watched"}
    }))
    .expect("valid draft");
    let created = untranslated
        .log_progress(&student, draft)
        .await
        .expect("log progress");

    let translated = ProgressService::new(
        fixed_clock(),
        Arc::clone(&storage.progress),
        Arc::new(Tagging),
    );
    let listed = translated
        .list_progress(&student, Language::Fr)
        .await
        .expect("list progress");
    assert_eq!(listed[0].metadata["note"], "fr:watched");

    let doc = storage
        .progress
        .get_progress(&student, &created.id)
        .await
        .expect("get progress")
        .expect("record exists");
    assert_eq!(doc.translations[&Language::Fr]["note"], "fr:watched");
}
