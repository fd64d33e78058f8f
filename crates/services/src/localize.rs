use std::collections::{BTreeSet, HashMap};

use progress_core::model::{Language, Metadata};
use serde_json::Value;

use crate::error::TranslationError;
use crate::translation::Translator;

/// Returns a copy of `metadata` with every string value translated into `target`.
///
/// Keys, numbers, booleans and nulls are kept as-is; nested objects and
/// arrays are walked. Each distinct string is sent to the translator once.
///
/// # Errors
///
/// Returns the first `TranslationError` raised by the translator.
pub async fn localize_metadata(
    translator: &dyn Translator,
    metadata: &Metadata,
    target: Language,
) -> Result<Metadata, TranslationError> {
    if target.is_source() {
        return Ok(metadata.clone());
    }

    let mut texts = BTreeSet::new();
    for value in metadata.values() {
        collect_strings(value, &mut texts);
    }

    let mut translated = HashMap::with_capacity(texts.len());
    for text in texts {
        let out = translator.translate(text, target).await?;
        translated.insert(text, out);
    }

    Ok(metadata
        .iter()
        .map(|(key, value)| (key.clone(), replace_strings(value, &translated)))
        .collect())
}

fn collect_strings<'a>(value: &'a Value, out: &mut BTreeSet<&'a str>) {
    match value {
        Value::String(s) if !s.trim().is_empty() => {
            out.insert(s.as_str());
        }
        Value::Array(items) => items.iter().for_each(|item| collect_strings(item, out)),
        Value::Object(map) => map.values().for_each(|item| collect_strings(item, out)),
        _ => {}
    }
}

fn replace_strings(value: &Value, translated: &HashMap<&str, String>) -> Value {
    match value {
        Value::String(s) => translated
            .get(s.as_str())
            .map_or_else(|| value.clone(), |t| Value::String(t.clone())),
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| replace_strings(item, translated))
                .collect(),
        ),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), replace_strings(v, translated)))
                .collect(),
        ),
        _ => value.clone(),
    }
}
