use std::collections::HashSet;
use std::sync::Arc;

use super::common::*;
use crate::selection::catalog::InMemoryCatalog;
use crate::selection::domain::WineColor;
use crate::selection::extractor::ExtractionError;
use crate::selection::pipeline::{SelectionError, SelectionStage, SELECTION_UNAVAILABLE};

#[tokio::test]
async fn select_wines_returns_at_most_ten_distinct_wines() {
    let pipeline = red_lover_pipeline(mixed_catalog(6, 20));

    let selection = pipeline
        .select_wines(&answers())
        .await
        .expect("selection succeeds");

    assert_eq!(selection.len(), 10);
    let unique: HashSet<_> = selection.iter().map(|wine| wine.id.clone()).collect();
    assert_eq!(unique.len(), selection.len());
}

#[tokio::test]
async fn small_catalogs_yield_smaller_selections() {
    let pipeline = red_lover_pipeline(mixed_catalog(2, 4));

    let selection = pipeline
        .select_wines(&answers())
        .await
        .expect("selection succeeds");

    assert_eq!(selection.len(), 6);
}

#[tokio::test]
async fn equal_scores_keep_retrieval_order() {
    let catalog = InMemoryCatalog::new(vec![
        white_wine("white", WineColor::White, 20.0),
        red_wine("red-first", 20.0),
        red_wine("red-second", 20.0),
    ]);
    let pipeline = red_lover_pipeline(catalog);

    let scored = pipeline
        .select_scored(&answers())
        .await
        .expect("selection succeeds");

    assert_eq!(scored[0].wine.id.0, "red-first");
    assert_eq!(scored[1].wine.id.0, "red-second");
    assert_eq!(scored[0].score, 80.0);
    assert_eq!(scored[1].score, 80.0);
    assert_eq!(scored[2].wine.id.0, "white");
}

#[tokio::test]
async fn prioritized_matches_do_not_outrank_better_fallback_wines() {
    let mut criteria = red_lover_criteria();
    criteria.filters = provence_filters();
    let catalog = InMemoryCatalog::new(vec![
        in_region(white_wine("provence-white", WineColor::White, 20.0), "Provence"),
        red_wine("loire-red", 20.0),
    ]);
    let pipeline = pipeline(
        Arc::new(FixedExtractor { criteria }),
        Arc::new(catalog),
    );

    let selection = pipeline
        .select_wines(&answers())
        .await
        .expect("selection succeeds");

    assert_eq!(ids(&selection), vec!["loire-red", "provence-white"]);
}

#[tokio::test]
async fn extraction_failure_is_reported_as_unavailable() {
    let pipeline = pipeline(Arc::new(FailingExtractor), Arc::new(mixed_catalog(3, 3)));

    match pipeline.select_wines(&answers()).await {
        Err(error @ SelectionError::Extraction(_)) => {
            assert_eq!(error.stage(), SelectionStage::Extracting);
            assert_eq!(error.user_message(), SELECTION_UNAVAILABLE);
        }
        other => panic!("expected extraction failure, got {other:?}"),
    }
}

#[tokio::test]
async fn retrieval_failure_aborts_the_selection() {
    let pipeline = pipeline(
        Arc::new(FixedExtractor {
            criteria: red_lover_criteria(),
        }),
        Arc::new(FailingCatalog::new(mixed_catalog(3, 3), 0)),
    );

    match pipeline.select_wines(&answers()).await {
        Err(error @ SelectionError::Retrieval(_)) => {
            assert_eq!(error.stage(), SelectionStage::Retrieving);
        }
        other => panic!("expected retrieval failure, got {other:?}"),
    }
}

#[tokio::test]
async fn selection_size_is_configurable() {
    let pipeline = pipeline(
        Arc::new(FixedExtractor {
            criteria: red_lover_criteria(),
        }),
        Arc::new(mixed_catalog(12, 0)),
    )
    .with_selection_size(3);

    let scored = pipeline
        .select_with_criteria(&red_lover_criteria())
        .await
        .expect("selection succeeds");

    assert_eq!(pipeline.selection_size(), 3);
    assert_eq!(scored.len(), 3);
}

#[tokio::test]
async fn out_of_range_criteria_are_rejected_before_retrieval() {
    let catalog = Arc::new(RecordingCatalog::new(mixed_catalog(4, 4)));
    let pipeline = pipeline(
        Arc::new(FixedExtractor {
            criteria: red_lover_criteria(),
        }),
        catalog.clone(),
    );

    let mut criteria = red_lover_criteria();
    criteria.color_weights.red = Some(200);
    criteria.preferences.cultivation = Some(250);

    match pipeline.select_with_criteria(&criteria).await {
        Err(error @ SelectionError::Extraction(ExtractionError::Malformed(_))) => {
            assert_eq!(error.stage(), SelectionStage::Extracting);
            assert_eq!(error.user_message(), SELECTION_UNAVAILABLE);
        }
        other => panic!("expected malformed criteria, got {other:?}"),
    }
    assert!(catalog.queries().is_empty());
}
