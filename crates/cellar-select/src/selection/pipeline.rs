use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use super::catalog::{CatalogError, CatalogStore};
use super::domain::{ScoredWine, SelectionCriteria, WineRecord};
use super::extractor::{ExtractionError, PreferenceExtractor};
use super::questionnaire::QuestionnaireAnswers;
use super::ranking::{rank_scored, DEFAULT_SELECTION_SIZE};
use super::retriever::{CandidateRetriever, RetrievalPolicy};
use super::scoring::score_all;

/// Message shown to end users whenever a selection cannot be produced.
pub const SELECTION_UNAVAILABLE: &str = "selection temporarily unavailable";

/// Steps a single submission moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SelectionStage {
    AwaitingExtraction,
    Extracting,
    Retrieving,
    Scoring,
    Ranking,
    Complete,
    Failed,
}

impl SelectionStage {
    pub fn label(&self) -> &'static str {
        match self {
            Self::AwaitingExtraction => "awaiting_extraction",
            Self::Extracting => "extracting",
            Self::Retrieving => "retrieving",
            Self::Scoring => "scoring",
            Self::Ranking => "ranking",
            Self::Complete => "complete",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for SelectionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SelectionError {
    #[error("preference extraction failed: {0}")]
    Extraction(#[from] ExtractionError),
    #[error("candidate retrieval failed: {0}")]
    Retrieval(#[from] CatalogError),
}

impl SelectionError {
    /// Stage the pipeline was in when it failed.
    pub fn stage(&self) -> SelectionStage {
        match self {
            Self::Extraction(_) => SelectionStage::Extracting,
            Self::Retrieval(_) => SelectionStage::Retrieving,
        }
    }

    /// Opaque text safe to show to the respondent.
    pub fn user_message(&self) -> &'static str {
        SELECTION_UNAVAILABLE
    }
}

/// Extractor, retriever, scorer and ranker run in sequence for one submission.
pub struct SelectionPipeline {
    extractor: Arc<dyn PreferenceExtractor>,
    retriever: CandidateRetriever<dyn CatalogStore>,
    selection_size: usize,
}

impl SelectionPipeline {
    pub fn new(
        extractor: Arc<dyn PreferenceExtractor>,
        catalog: Arc<dyn CatalogStore>,
        policy: RetrievalPolicy,
    ) -> Self {
        Self {
            extractor,
            retriever: CandidateRetriever::new(catalog, policy),
            selection_size: DEFAULT_SELECTION_SIZE,
        }
    }

    pub fn with_selection_size(mut self, selection_size: usize) -> Self {
        self.selection_size = selection_size;
        self
    }

    pub fn selection_size(&self) -> usize {
        self.selection_size
    }

    pub fn retrieval_policy(&self) -> &RetrievalPolicy {
        self.retriever.policy()
    }

    /// Ranked selection for `answers`, at most `selection_size` wines.
    pub async fn select_wines(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<Vec<WineRecord>, SelectionError> {
        Ok(self
            .select_scored(answers)
            .await?
            .into_iter()
            .map(|scored| scored.wine)
            .collect())
    }

    /// Same as [`Self::select_wines`] but keeps the scores for display.
    pub async fn select_scored(
        &self,
        answers: &QuestionnaireAnswers,
    ) -> Result<Vec<ScoredWine>, SelectionError> {
        transition(SelectionStage::AwaitingExtraction, SelectionStage::Extracting);
        let criteria = match self.extractor.extract(answers).await {
            Ok(criteria) => criteria,
            Err(err) => {
                transition(SelectionStage::Extracting, SelectionStage::Failed);
                warn!(error = %err, "preference extraction failed");
                return Err(err.into());
            }
        };

        self.run_criteria(&criteria).await
    }

    /// Runs retrieval, scoring and ranking for criteria obtained elsewhere.
    ///
    /// Criteria are validated the same way extractor output is.
    pub async fn select_with_criteria(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<ScoredWine>, SelectionError> {
        if let Err(violation) = criteria.validate() {
            transition(SelectionStage::AwaitingExtraction, SelectionStage::Failed);
            warn!(error = %violation, "rejected out-of-range criteria");
            return Err(ExtractionError::from(violation).into());
        }

        self.run_criteria(criteria).await
    }

    async fn run_criteria(
        &self,
        criteria: &SelectionCriteria,
    ) -> Result<Vec<ScoredWine>, SelectionError> {
        transition(SelectionStage::Extracting, SelectionStage::Retrieving);
        let candidates = match self.retriever.retrieve(&criteria.filters).await {
            Ok(candidates) => candidates,
            Err(err) => {
                transition(SelectionStage::Retrieving, SelectionStage::Failed);
                warn!(error = %err, "candidate retrieval failed");
                return Err(err.into());
            }
        };

        transition(SelectionStage::Retrieving, SelectionStage::Scoring);
        let scored = score_all(
            candidates,
            &criteria.color_weights,
            &criteria.preferences,
        );

        transition(SelectionStage::Scoring, SelectionStage::Ranking);
        let ranked = rank_scored(scored, self.selection_size);

        transition(SelectionStage::Ranking, SelectionStage::Complete);
        debug!(selected = ranked.len(), "selection complete");
        Ok(ranked)
    }
}

/// Stages are reported through logs only; failures carry theirs in [`SelectionError::stage`].
fn transition(from: SelectionStage, to: SelectionStage) {
    debug!(%from, %to, "selection stage transition");
}
