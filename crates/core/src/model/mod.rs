mod ids;
mod language;
mod patch;
mod progress;

pub use ids::{ProgressId, UserId};
pub use language::{Language, LanguageError};
pub use patch::Patch;
pub use progress::{
    ACTIVITY_DISCUSSION, ACTIVITY_QUIZ_ATTEMPT, ACTIVITY_VIEW, Metadata, NewProgress,
    ProgressRecord, ProgressUpdate, STATUS_COMPLETE, STATUS_INCOMPLETE, ValidationError,
};
