use async_trait::async_trait;
use cellar_select::config::{AppConfig, ExtractorConfig, MailConfig};
use cellar_select::error::AppError;
use cellar_select::selection::{
    CatalogImporter, InMemoryCatalog, LlmPreferenceExtractor, NotificationError, Notifier,
    PreferenceExtractor, QuestionnaireAnswers, RepositoryError, ResendNotifier,
    RuleBasedExtractor, SelectionPipeline, SubmissionId, SubmissionRecord, SubmissionRepository,
    WineRecord,
};
use cellar_select::BUNDLED_CATALOG_CSV;
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, PoisonError};
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemorySubmissionRepository {
    records: Arc<Mutex<HashMap<SubmissionId, SubmissionRecord>>>,
}

fn poisoned<T>(_: PoisonError<T>) -> RepositoryError {
    RepositoryError::Unavailable("submission store lock poisoned".to_string())
}

impl SubmissionRepository for InMemorySubmissionRepository {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().map_err(poisoned)?;
        Ok(guard.get(id).cloned())
    }

    fn update_client_email(&self, id: &SubmissionId, email: &str) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().map_err(poisoned)?;
        match guard.get_mut(id) {
            Some(record) => {
                record.client_email = Some(email.to_string());
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}

/// Notifier that only logs, used when no mail provider is configured.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNotifier;

#[async_trait]
impl Notifier for LoggingNotifier {
    async fn notify_submission(
        &self,
        answers: &QuestionnaireAnswers,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        info!(
            level = answers.v1().level.label(),
            wines = selection.len(),
            "submission received (mail disabled)"
        );
        Ok(())
    }

    async fn send_selection(
        &self,
        email: &str,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        info!(%email, wines = selection.len(), "selection mail skipped (mail disabled)");
        Ok(())
    }
}

/// Mail backend chosen from configuration at startup.
#[derive(Debug, Clone)]
pub(crate) enum ConfiguredNotifier {
    Resend(ResendNotifier),
    Logging(LoggingNotifier),
}

impl ConfiguredNotifier {
    pub(crate) fn from_config(config: &MailConfig) -> Self {
        match config.resend_settings() {
            Some(settings) => Self::Resend(ResendNotifier::new(settings)),
            None => Self::Logging(LoggingNotifier),
        }
    }

    pub(crate) fn label(&self) -> &'static str {
        match self {
            Self::Resend(_) => "resend",
            Self::Logging(_) => "logging",
        }
    }
}

#[async_trait]
impl Notifier for ConfiguredNotifier {
    async fn notify_submission(
        &self,
        answers: &QuestionnaireAnswers,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        match self {
            Self::Resend(notifier) => notifier.notify_submission(answers, selection).await,
            Self::Logging(notifier) => notifier.notify_submission(answers, selection).await,
        }
    }

    async fn send_selection(
        &self,
        email: &str,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        match self {
            Self::Resend(notifier) => notifier.send_selection(email, selection).await,
            Self::Logging(notifier) => notifier.send_selection(email, selection).await,
        }
    }
}

/// Catalog from `path`, or the bundled sample when none is given.
pub(crate) fn load_catalog(path: Option<&Path>) -> Result<InMemoryCatalog, AppError> {
    let catalog = match path {
        Some(path) => CatalogImporter::from_path(path)?,
        None => CatalogImporter::from_reader(BUNDLED_CATALOG_CSV.as_bytes())?,
    };
    info!(
        wines = catalog.len(),
        source = path.map(|path| path.display().to_string()).as_deref().unwrap_or("bundled"),
        "catalog loaded"
    );
    Ok(catalog)
}

/// Model-backed extractor when an API key is set, rule-based otherwise.
pub(crate) fn build_extractor(config: &ExtractorConfig) -> Arc<dyn PreferenceExtractor> {
    match config.llm_settings() {
        Some(settings) => {
            info!(model = %settings.model, "using language model extractor");
            Arc::new(LlmPreferenceExtractor::new(settings))
        }
        None => {
            info!("LLM_API_KEY not set; using rule-based extractor");
            Arc::new(RuleBasedExtractor)
        }
    }
}

pub(crate) fn build_pipeline(config: &AppConfig, catalog: InMemoryCatalog) -> SelectionPipeline {
    SelectionPipeline::new(
        build_extractor(&config.extractor),
        Arc::new(catalog),
        config.selection.retrieval_policy(),
    )
    .with_selection_size(config.selection.selection_size)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cellar_select::selection::{ExperienceLevel, QuestionnaireV1};

    fn record(id: &str) -> SubmissionRecord {
        SubmissionRecord {
            id: SubmissionId(id.to_string()),
            answers: QuestionnaireAnswers::V1(QuestionnaireV1 {
                level: ExperienceLevel::Beginner,
                email: None,
                consumption_moments: Vec::new(),
                color_ranking: Vec::new(),
                taste: Default::default(),
                cultivation_importance: None,
                preferred_regions: Vec::new(),
                favorite_references: None,
                budget: None,
                explore_new_regions: None,
                comments: None,
            }),
            selection: Vec::new(),
            submitted_at: Default::default(),
            client_email: None,
        }
    }

    #[test]
    fn repository_rejects_duplicate_ids_and_updates_email() {
        let repository = InMemorySubmissionRepository::default();
        repository.insert(record("s-1")).expect("first insert");
        assert!(matches!(
            repository.insert(record("s-1")),
            Err(RepositoryError::Conflict)
        ));

        let id = SubmissionId("s-1".to_string());
        repository
            .update_client_email(&id, "guest@example.com")
            .expect("update succeeds");
        let stored = repository
            .fetch(&id)
            .expect("fetch succeeds")
            .expect("record present");
        assert_eq!(stored.client_email.as_deref(), Some("guest@example.com"));

        assert!(matches!(
            repository.update_client_email(&SubmissionId("s-2".to_string()), "x@example.com"),
            Err(RepositoryError::NotFound)
        ));
    }

    #[test]
    fn bundled_catalog_loads_without_a_path() {
        let catalog = load_catalog(None).expect("bundled catalog loads");
        assert!(!catalog.is_empty());
    }

    #[test]
    fn mail_falls_back_to_logging_without_resend_settings() {
        let notifier = ConfiguredNotifier::from_config(&MailConfig::default());
        assert_eq!(notifier.label(), "logging");
    }
}
