use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;

use crate::model::ids::ProgressId;
use crate::model::patch::Patch;

/// Free-form key/value payload attached to a record. Always an object.
pub type Metadata = Map<String, Value>;

pub const STATUS_INCOMPLETE: &str = "incomplete";
pub const STATUS_COMPLETE: &str = "complete";

pub const ACTIVITY_VIEW: &str = "view";
pub const ACTIVITY_QUIZ_ATTEMPT: &str = "quiz_attempt";
pub const ACTIVITY_DISCUSSION: &str = "discussion";

//
// ─── ERRORS ────────────────────────────────────────────────────────────────────
//

/// Rejection of a progress payload at the boundary.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[non_exhaustive]
pub enum ValidationError {
    #[error("request body must be a JSON object")]
    NotAnObject,

    #[error("{0}: field required")]
    MissingField(&'static str),

    #[error("{field}: {reason}")]
    InvalidField { field: &'static str, reason: String },

    #[error("malformed progress payload: {0}")]
    Malformed(String),

    #[error("invalid query string: {0}")]
    Query(String),
}

impl ValidationError {
    /// Name of the offending field, when one can be pinned down.
    #[must_use]
    pub fn field(&self) -> Option<&'static str> {
        match self {
            ValidationError::MissingField(field) | ValidationError::InvalidField { field, .. } => {
                Some(*field)
            }
            ValidationError::NotAnObject
            | ValidationError::Malformed(_)
            | ValidationError::Query(_) => None,
        }
    }
}

//
// ─── FIELD RULES ───────────────────────────────────────────────────────────────
//

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Expect {
    String,
    Number,
    Object,
}

impl Expect {
    fn matches(self, value: &Value) -> bool {
        match self {
            Expect::String => value.is_string(),
            Expect::Number => value.is_number(),
            Expect::Object => value.is_object(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Expect::String => "a string",
            Expect::Number => "a number",
            Expect::Object => "an object",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Presence {
    /// Must be present and non-null.
    Required,
    /// May be omitted, but not sent as null.
    Optional,
    /// May be omitted or null.
    Nullable,
}

#[derive(Debug, Clone, Copy)]
struct FieldRule {
    name: &'static str,
    expect: Expect,
    presence: Presence,
}

impl FieldRule {
    const fn new(name: &'static str, expect: Expect, presence: Presence) -> Self {
        Self {
            name,
            expect,
            presence,
        }
    }

    fn check(&self, value: Option<&Value>) -> Result<(), ValidationError> {
        match value {
            None if self.presence == Presence::Required => {
                Err(ValidationError::MissingField(self.name))
            }
            None => Ok(()),
            Some(Value::Null) if self.presence == Presence::Nullable => Ok(()),
            Some(Value::Null) => Err(ValidationError::InvalidField {
                field: self.name,
                reason: "must not be null".into(),
            }),
            Some(v) if self.expect.matches(v) => Ok(()),
            Some(v) => Err(ValidationError::InvalidField {
                field: self.name,
                reason: format!("expected {}, found {}", self.expect.name(), json_kind(v)),
            }),
        }
    }
}

const NEW_PROGRESS_RULES: &[FieldRule] = &[
    FieldRule::new("status", Expect::String, Presence::Required),
    FieldRule::new("activity_type", Expect::String, Presence::Required),
    FieldRule::new("course_id", Expect::String, Presence::Nullable),
    FieldRule::new("topic_id", Expect::String, Presence::Nullable),
    FieldRule::new("subtopic_id", Expect::String, Presence::Nullable),
    FieldRule::new("material_id", Expect::String, Presence::Nullable),
    FieldRule::new("quiz_id", Expect::String, Presence::Nullable),
    FieldRule::new("question_id", Expect::String, Presence::Nullable),
    FieldRule::new("score", Expect::Number, Presence::Nullable),
    FieldRule::new("metadata", Expect::Object, Presence::Optional),
    FieldRule::new("timestamp", Expect::String, Presence::Optional),
];

const UPDATE_RULES: &[FieldRule] = &[
    FieldRule::new("status", Expect::String, Presence::Optional),
    FieldRule::new("score", Expect::Number, Presence::Nullable),
    FieldRule::new("metadata", Expect::Object, Presence::Optional),
];

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

fn check_rules(value: &Value, rules: &[FieldRule]) -> Result<(), ValidationError> {
    let Value::Object(map) = value else {
        return Err(ValidationError::NotAnObject);
    };
    for rule in rules {
        rule.check(map.get(rule.name))?;
    }
    if let Some(Value::String(raw)) = map.get("timestamp") {
        DateTime::<FixedOffset>::parse_from_rfc3339(raw).map_err(|e| {
            ValidationError::InvalidField {
                field: "timestamp",
                reason: format!("expected an RFC 3339 datetime ({e})"),
            }
        })?;
    }
    Ok(())
}

//
// ─── RECORD ────────────────────────────────────────────────────────────────────
//

/// One logged unit of student activity against the course hierarchy.
///
/// The course links are immutable once stored; only `status`, `score` and
/// `metadata` change after creation, through [`ProgressUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressRecord {
    pub id: ProgressId,
    pub course_id: Option<String>,
    pub topic_id: Option<String>,
    pub subtopic_id: Option<String>,
    pub material_id: Option<String>,
    pub quiz_id: Option<String>,
    pub question_id: Option<String>,
    pub score: Option<f64>,
    pub status: String,
    pub activity_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    pub timestamp: DateTime<Utc>,
}

impl ProgressRecord {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.status == STATUS_COMPLETE
    }
}

//
// ─── CREATE ────────────────────────────────────────────────────────────────────
//

/// Body of a create request: a full record minus its identifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProgress {
    #[serde(default)]
    pub course_id: Option<String>,
    #[serde(default)]
    pub topic_id: Option<String>,
    #[serde(default)]
    pub subtopic_id: Option<String>,
    #[serde(default)]
    pub material_id: Option<String>,
    #[serde(default)]
    pub quiz_id: Option<String>,
    #[serde(default)]
    pub question_id: Option<String>,
    #[serde(default)]
    pub score: Option<f64>,
    pub status: String,
    pub activity_type: String,
    #[serde(default)]
    pub metadata: Metadata,
    /// Creation time; the service fills it in when the client leaves it out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime<Utc>>,
}

impl NewProgress {
    /// A record with only the required fields set.
    #[must_use]
    pub fn new(status: impl Into<String>, activity_type: impl Into<String>) -> Self {
        Self {
            course_id: None,
            topic_id: None,
            subtopic_id: None,
            material_id: None,
            quiz_id: None,
            question_id: None,
            score: None,
            status: status.into(),
            activity_type: activity_type.into(),
            metadata: Metadata::new(),
            timestamp: None,
        }
    }

    /// Validates and decodes a create body.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the body is not an object, `status` or
    /// `activity_type` is missing or not a string, or any other field has
    /// the wrong type.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        check_rules(&value, NEW_PROGRESS_RULES)?;
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// Stamps the draft with its identifier, defaulting the timestamp to `now`.
    #[must_use]
    pub fn into_record(self, id: ProgressId, now: DateTime<Utc>) -> ProgressRecord {
        ProgressRecord {
            id,
            course_id: self.course_id,
            topic_id: self.topic_id,
            subtopic_id: self.subtopic_id,
            material_id: self.material_id,
            quiz_id: self.quiz_id,
            question_id: self.question_id,
            score: self.score,
            status: self.status,
            activity_type: self.activity_type,
            metadata: self.metadata,
            timestamp: self.timestamp.unwrap_or(now),
        }
    }
}

//
// ─── UPDATE ────────────────────────────────────────────────────────────────────
//

/// Partial update: only keys present in the request are applied.
///
/// `status` and `metadata` can be set but never cleared, so they stay plain
/// options and an explicit `null` is rejected by [`ProgressUpdate::from_json`].
/// `score` may be cleared and carries the full tri-state. Course links and
/// `timestamp` are not updatable; such keys in a body are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Patch::is_absent")]
    pub score: Patch<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Metadata>,
}

impl ProgressUpdate {
    /// Validates and decodes an update body.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError` if the body is not an object, `status` or
    /// `metadata` is null, or a field has the wrong type.
    pub fn from_json(value: Value) -> Result<Self, ValidationError> {
        check_rules(&value, UPDATE_RULES)?;
        serde_json::from_value(value).map_err(|e| ValidationError::Malformed(e.to_string()))
    }

    /// True when the request named no updatable field.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.score.is_absent() && self.metadata.is_none()
    }

    #[must_use]
    pub fn touches_metadata(&self) -> bool {
        self.metadata.is_some()
    }

    /// Merges the supplied fields into `record`. Returns false if nothing was supplied.
    pub fn apply_to(&self, record: &mut ProgressRecord) -> bool {
        let mut touched = false;
        if let Some(status) = &self.status {
            record.status.clone_from(status);
            touched = true;
        }
        touched |= self.score.clone().apply(&mut record.score);
        if let Some(metadata) = &self.metadata {
            record.metadata.clone_from(metadata);
            touched = true;
        }
        touched
    }
}

//
// ─── TESTS ─────────────────────────────────────────────────────────────────────
//
