//! Wine selection: preference extraction, catalog retrieval, scoring and ranking,
//! plus the submission service and HTTP routes built on top of them.

pub mod catalog;
pub mod domain;
pub mod extractor;
pub mod notifier;
pub mod pipeline;
pub mod questionnaire;
pub mod ranking;
pub mod repository;
pub mod retriever;
pub mod router;
pub mod scoring;
pub mod service;

#[cfg(test)]
mod tests;

pub use catalog::{
    CatalogError, CatalogImportError, CatalogImporter, CatalogQuery, CatalogStore, FieldMatch,
    InMemoryCatalog, MatchField,
};
pub use domain::{
    ColorWeights, CultivationMethod, DrinkingWindow, Filters, RedPreferences, RedTaste,
    ScoredWine, SelectionCriteria, SubmissionId, TasteProfile, TastePreferences, WhitePreferences,
    WhiteTaste, WineColor, WineId, WineRecord,
};
pub use extractor::{
    ExtractionError, LlmExtractorSettings, LlmPreferenceExtractor, PreferenceExtractor,
    RuleBasedExtractor,
};
pub use notifier::{MailSettings, ResendNotifier};
pub use pipeline::{SelectionError, SelectionPipeline, SelectionStage, SELECTION_UNAVAILABLE};
pub use questionnaire::{ExperienceLevel, QuestionnaireAnswers, QuestionnaireV1};
pub use ranking::{rank, rank_scored, DEFAULT_SELECTION_SIZE};
pub use repository::{
    NotificationError, Notifier, RepositoryError, SubmissionRecord, SubmissionRepository,
};
pub use retriever::{CandidateRetriever, Candidates, RetrievalPolicy};
pub use router::selection_router;
pub use scoring::{score, score_all, score_components, CultivationBand, ScoreBreakdown};
pub use service::{SelectionService, SelectionServiceError, SubmissionOutcome};
