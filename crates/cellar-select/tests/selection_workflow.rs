use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use cellar_select::selection::{
    selection_router, CatalogImporter, NotificationError, Notifier, QuestionnaireAnswers,
    RepositoryError, RetrievalPolicy, RuleBasedExtractor, SelectionPipeline, SelectionService,
    SubmissionId, SubmissionRecord, SubmissionRepository, WineColor, WineRecord,
};
use cellar_select::BUNDLED_CATALOG_CSV;
use serde_json::{json, Value};
use tower::ServiceExt;

fn burgundy_answers() -> QuestionnaireAnswers {
    serde_json::from_value(json!({
        "version": "v1",
        "level": "connoisseur",
        "email": "client@example.com",
        "consumption_moments": ["weekend dinners"],
        "color_ranking": ["red", "white"],
        "taste": {
            "red": { "fruitiness": 4, "spice": 5, "oakiness": 2, "tannin": 3 }
        },
        "cultivation_importance": 2,
        "preferred_regions": ["Bourgogne"],
        "favorite_references": "",
        "budget": "20-60",
        "explore_new_regions": false
    }))
    .expect("answers deserialize")
}

fn pipeline() -> Arc<SelectionPipeline> {
    let catalog = CatalogImporter::from_reader(BUNDLED_CATALOG_CSV.as_bytes())
        .expect("bundled catalog imports");
    Arc::new(SelectionPipeline::new(
        Arc::new(RuleBasedExtractor),
        Arc::new(catalog),
        RetrievalPolicy::default(),
    ))
}

#[tokio::test]
async fn rule_based_selection_over_bundled_catalog() {
    let scored = pipeline()
        .select_scored(&burgundy_answers())
        .await
        .expect("selection succeeds");

    assert_eq!(scored.len(), 10);
    assert!(scored.windows(2).all(|pair| pair[0].score >= pair[1].score));
    assert_eq!(scored[0].wine.color, WineColor::Red);
    assert!(scored
        .iter()
        .all(|candidate| (10.0..=60.0).contains(&candidate.wine.price)));

    let ids: HashSet<_> = scored.iter().map(|candidate| candidate.wine.id.clone()).collect();
    assert_eq!(ids.len(), scored.len());
}

#[derive(Default)]
struct MemoryRepository {
    records: Mutex<HashMap<SubmissionId, SubmissionRecord>>,
}

impl SubmissionRepository for MemoryRepository {
    fn insert(&self, record: SubmissionRecord) -> Result<SubmissionRecord, RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex");
        guard.insert(record.id.clone(), record.clone());
        Ok(record)
    }

    fn fetch(&self, id: &SubmissionId) -> Result<Option<SubmissionRecord>, RepositoryError> {
        Ok(self.records.lock().expect("repository mutex").get(id).cloned())
    }

    fn update_client_email(&self, id: &SubmissionId, email: &str) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex");
        let record = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        record.client_email = Some(email.to_string());
        Ok(())
    }
}

#[derive(Default)]
struct Outbox {
    sent: Mutex<Vec<String>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn notify_submission(
        &self,
        _answers: &QuestionnaireAnswers,
        _selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.sent.lock().expect("outbox mutex").push("team".to_string());
        Ok(())
    }

    async fn send_selection(
        &self,
        email: &str,
        _selection: &[WineRecord],
    ) -> Result<(), NotificationError> {
        self.sent.lock().expect("outbox mutex").push(email.to_string());
        Ok(())
    }
}

async fn read_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn submit_then_fetch_then_mail_over_http() {
    let outbox = Arc::new(Outbox::default());
    let service = Arc::new(SelectionService::new(
        pipeline(),
        Arc::new(MemoryRepository::default()),
        outbox.clone(),
    ));
    let router = selection_router(service);

    let submitted = router
        .clone()
        .oneshot(
            Request::post("/submit")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    serde_json::to_vec(&burgundy_answers()).expect("answers serialize"),
                ))
                .expect("request builds"),
        )
        .await
        .expect("submit executes");
    assert_eq!(submitted.status(), StatusCode::OK);
    let submitted = read_json(submitted).await;
    let submission_id = submitted["submission_id"]
        .as_str()
        .expect("submission id")
        .to_string();

    let fetched = router
        .clone()
        .oneshot(
            Request::get(format!("/selection/{submission_id}"))
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("fetch executes");
    assert_eq!(fetched.status(), StatusCode::OK);
    assert_eq!(read_json(fetched).await, submitted["selection"]);

    let mailed = router
        .oneshot(
            Request::post("/send-email")
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(
                    json!({ "email": "friend@example.com", "submission_id": submission_id })
                        .to_string(),
                ))
                .expect("request builds"),
        )
        .await
        .expect("mail executes");
    assert_eq!(mailed.status(), StatusCode::OK);
    assert_eq!(
        *outbox.sent.lock().expect("outbox mutex"),
        vec!["team".to_string(), "friend@example.com".to_string()]
    );
}
