use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::response::Response;
use serde_json::Value;

use crate::selection::catalog::{CatalogError, CatalogQuery, CatalogStore, InMemoryCatalog};
use crate::selection::domain::{
    ColorWeights, CultivationMethod, Filters, RedPreferences, RedTaste, SelectionCriteria,
    SubmissionId, TastePreferences, TasteProfile, WhiteTaste, WineColor, WineId, WineRecord,
};
use crate::selection::extractor::{ExtractionError, PreferenceExtractor};
use crate::selection::pipeline::SelectionPipeline;
use crate::selection::questionnaire::{
    ExperienceLevel, QuestionnaireAnswers, QuestionnaireV1, TasteRatings,
};
use crate::selection::repository::{
    NotificationError, Notifier, RepositoryError, SubmissionRecord, SubmissionRepository,
};
use crate::selection::retriever::RetrievalPolicy;
use crate::selection::service::SelectionService;

pub(super) fn red_wine(id: &str, price: f64) -> WineRecord {
    WineRecord {
        id: WineId(id.to_string()),
        region: "Bourgogne".to_string(),
        appellation: "Pommard".to_string(),
        estate: format!("Domaine {id}"),
        color: WineColor::Red,
        price,
        taste: TasteProfile::Red(RedTaste {
            fruitiness: Some(3),
            spice: Some(3),
            oakiness: Some(3),
            tannin: Some(3),
        }),
        quality_rating: 3.0,
        cultivation: CultivationMethod::Traditional,
        dominant_grape: Some("Pinot Noir".to_string()),
        drinking_window: None,
    }
}

pub(super) fn white_wine(id: &str, color: WineColor, price: f64) -> WineRecord {
    WineRecord {
        id: WineId(id.to_string()),
        region: "Loire".to_string(),
        appellation: "Sancerre".to_string(),
        estate: format!("Domaine {id}"),
        color,
        price,
        taste: TasteProfile::White(WhiteTaste {
            fruitiness: Some(4),
            minerality: Some(5),
            butteriness: Some(1),
            oakiness: Some(1),
            sweetness: Some(2),
        }),
        quality_rating: 4.0,
        cultivation: CultivationMethod::Biodynamic,
        dominant_grape: None,
        drinking_window: None,
    }
}

pub(super) fn in_region(mut wine: WineRecord, region: &str) -> WineRecord {
    wine.region = region.to_string();
    wine
}

/// `matching` Provence wines followed by `others` Loire wines, all priced 30.
pub(super) fn mixed_catalog(matching: usize, others: usize) -> InMemoryCatalog {
    let provence =
        (0..matching).map(|index| in_region(red_wine(&format!("pro-{index:02}"), 30.0), "Provence"));
    let loire =
        (0..others).map(|index| in_region(red_wine(&format!("loi-{index:02}"), 30.0), "Loire"));
    InMemoryCatalog::new(provence.chain(loire).collect())
}

pub(super) fn provence_filters() -> Filters {
    Filters {
        regions: vec!["provence".to_string()],
        widen_search: Some(false),
        ..Filters::default()
    }
}

pub(super) fn red_lover_criteria() -> SelectionCriteria {
    let mut color_weights = ColorWeights::default();
    color_weights.set(WineColor::Red, 4);
    color_weights.set(WineColor::White, 2);
    SelectionCriteria {
        filters: Filters::default(),
        color_weights,
        preferences: TastePreferences {
            red: Some(RedPreferences {
                fruitiness: Some(5),
                ..RedPreferences::default()
            }),
            white: None,
            cultivation: Some(3),
        },
    }
}

pub(super) fn answers() -> QuestionnaireAnswers {
    QuestionnaireAnswers::V1(QuestionnaireV1 {
        level: ExperienceLevel::Connoisseur,
        email: Some("client@example.com".to_string()),
        consumption_moments: vec!["dinner with friends".to_string()],
        color_ranking: vec![WineColor::Red, WineColor::White],
        taste: TasteRatings::default(),
        cultivation_importance: Some(3),
        preferred_regions: vec!["Provence".to_string()],
        favorite_references: None,
        budget: Some("20-60".to_string()),
        explore_new_regions: Some(true),
        comments: None,
    })
}

pub(super) fn ids(wines: &[WineRecord]) -> Vec<&str> {
    wines.iter().map(|wine| wine.id.0.as_str()).collect()
}

/// Extractor returning canned criteria.
pub(super) struct FixedExtractor {
    pub(super) criteria: SelectionCriteria,
}

#[async_trait]
impl PreferenceExtractor for FixedExtractor {
    async fn extract(
        &self,
        _answers: &QuestionnaireAnswers,
    ) -> Result<SelectionCriteria, ExtractionError> {
        Ok(self.criteria.clone())
    }
}

pub(super) struct FailingExtractor;

#[async_trait]
impl PreferenceExtractor for FailingExtractor {
    async fn extract(
        &self,
        _answers: &QuestionnaireAnswers,
    ) -> Result<SelectionCriteria, ExtractionError> {
        Err(ExtractionError::NoToolCall)
    }
}

/// Catalog wrapper recording every query it serves.
#[derive(Default)]
pub(super) struct RecordingCatalog {
    inner: InMemoryCatalog,
    queries: Mutex<Vec<CatalogQuery>>,
}

impl RecordingCatalog {
    pub(super) fn new(inner: InMemoryCatalog) -> Self {
        Self {
            inner,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub(super) fn queries(&self) -> Vec<CatalogQuery> {
        self.queries.lock().expect("catalog mutex poisoned").clone()
    }
}

#[async_trait]
impl CatalogStore for RecordingCatalog {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<WineRecord>, CatalogError> {
        self.queries
            .lock()
            .expect("catalog mutex poisoned")
            .push(query.clone());
        self.inner.find(query).await
    }
}

/// Catalog that ignores exclusions, returning everything it holds.
pub(super) struct OverlappingCatalog {
    pub(super) inner: InMemoryCatalog,
}

#[async_trait]
impl CatalogStore for OverlappingCatalog {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<WineRecord>, CatalogError> {
        let relaxed = CatalogQuery {
            exclude_ids: Default::default(),
            ..query.clone()
        };
        self.inner.find(&relaxed).await
    }
}

/// Fails on the query with index `fail_on` (0-based).
pub(super) struct FailingCatalog {
    pub(super) inner: InMemoryCatalog,
    pub(super) fail_on: usize,
    calls: Mutex<usize>,
}

impl FailingCatalog {
    pub(super) fn new(inner: InMemoryCatalog, fail_on: usize) -> Self {
        Self {
            inner,
            fail_on,
            calls: Mutex::new(0),
        }
    }
}

#[async_trait]
impl CatalogStore for FailingCatalog {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<WineRecord>, CatalogError> {
        let call = {
            let mut calls = self.calls.lock().expect("catalog mutex poisoned");
            let call = *calls;
            *calls += 1;
            call
        };
        if call == self.fail_on {
            return Err(CatalogError::Unavailable("connection reset".to_string()));
        }
        self.inner.find(query).await
    }
}

pub(super) fn pipeline(
    extractor: Arc<dyn PreferenceExtractor>,
    catalog: Arc<dyn CatalogStore>,
) -> SelectionPipeline {
    SelectionPipeline::new(extractor, catalog, RetrievalPolicy::default())
}

pub(super) fn red_lover_pipeline(catalog: InMemoryCatalog) -> Arc<SelectionPipeline> {
    Arc::new(pipeline(
        Arc::new(FixedExtractor {
            criteria: red_lover_criteria(),
        }),
        Arc::new(catalog),
    ))
}

pub(super) fn build_service() -> (
    SelectionService<MemoryRepository, MemoryNotifier>,
    Arc<MemoryRepository>,
    Arc<MemoryNotifier>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let notifier = Arc::new(MemoryNotifier::default());
    let service = SelectionService::new(
        red_lover_pipeline(mixed_catalog(4, 8)),
        repository.clone(),
        notifier.clone(),
    );
    (service, repository, notifier)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) records: Arc<Mutex<HashMap<SubmissionId, SubmissionRecord>>>,
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&record.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update_client_email(&self, id: &SubmissionId, email: &str) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.client_email = Some(email.to_string());
        Ok(())
    }
}

pub(super) struct UnavailableRepository;

impl SubmissionRepository for UnavailableRepository {
    fn insert(&self, _record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn fetch(&self, _id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update_client_email(
        &self,
        _id: &SubmissionId,
        _email: &str,
    ) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(super) enum MailEvent {
    Submission { wines: usize },
    Selection { email: String, wines: usize },
}

#[derive(Default, Clone)]
pub(super) struct MemoryNotifier {
    events: Arc<Mutex<Vec<MailEvent>>>,
}

impl MemoryNotifier {
    pub(super) fn events(&self) -> Vec<MailEvent> {
        self.events.lock().expect("notifier mutex poisoned").clone()
    }
}

#[async_trait]
impl Notifier for MemoryNotifier {
    async fn notify_submission(
        &self,
        _answers: &QuestionnaireAnswers,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(MailEvent::Submission {
                wines: selection.len(),
            });
        Ok(())
    }

    async fn send_selection(
        &self,
        email: &str,
        selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.events
            .lock()
            .expect("notifier mutex poisoned")
            .push(MailEvent::Selection {
                email: email.to_string(),
                wines: selection.len(),
            });
        Ok(())
    }
}

pub(super) struct FailingNotifier;

#[async_trait]
impl Notifier for FailingNotifier {
    async fn notify_submission(
        &self,
        _answers: &QuestionnaireAnswers,
        _selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Transport("smtp relay down".to_string()))
    }

    async fn send_selection(
        &self,
        _email: &str,
        _selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        Err(NotificationError::Rejected("422: invalid recipient".to_string()))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
