#![forbid(unsafe_code)]

pub mod app_services;
pub mod error;
pub mod localize;
pub mod progress_service;
pub mod translation;

pub use progress_core::Clock;

pub use app_services::{AppServices, translator_from_config};
pub use error::{AppServicesError, ProgressServiceError, TranslationError};
pub use localize::localize_metadata;
pub use progress_service::ProgressService;
pub use translation::{HttpTranslator, PassthroughTranslator, Translator, TranslatorConfig};
