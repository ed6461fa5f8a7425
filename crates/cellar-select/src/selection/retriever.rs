use std::sync::Arc;

use tracing::debug;

use super::catalog::{CatalogError, CatalogQuery, CatalogStore, FieldMatch, MatchField};
use super::domain::{Filters, WineRecord};
use super::ranking::DEFAULT_SELECTION_SIZE;

/// Knobs controlling the prioritized and fallback catalog queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetrievalPolicy {
    /// Amount subtracted from the user's price floor (never below 0).
    pub price_floor_margin: f64,
    /// Maximum rows the fallback query may add.
    pub fallback_limit: usize,
    /// The fallback query runs whenever the prioritized query returns fewer rows.
    pub min_results_before_widening: usize,
}

impl Default for RetrievalPolicy {
    fn default() -> Self {
        Self {
            price_floor_margin: 10.0,
            fallback_limit: DEFAULT_SELECTION_SIZE,
            min_results_before_widening: DEFAULT_SELECTION_SIZE,
        }
    }
}

/// Candidate set split by the query that produced it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Candidates {
    pub prioritized: Vec<WineRecord>,
    pub fallback: Vec<WineRecord>,
    pub widened: bool,
}

impl Candidates {
    pub fn len(&self) -> usize {
        self.prioritized.len() + self.fallback.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Prioritized rows followed by fallback rows.
    pub fn into_ordered(self) -> Vec<WineRecord> {
        let mut wines = self.prioritized;
        wines.extend(self.fallback);
        wines
    }
}

/// Issues the prioritized query and, when needed, the widening fallback query.
pub struct CandidateRetriever<C: ?Sized> {
    catalog: Arc<C>,
    policy: RetrievalPolicy,
}

impl<C> CandidateRetriever<C>
where
    C: CatalogStore + ?Sized,
{
    pub fn new(catalog: Arc<C>, policy: RetrievalPolicy) -> Self {
        Self { catalog, policy }
    }

    pub fn policy(&self) -> &RetrievalPolicy {
        &self.policy
    }

    pub async fn retrieve(&self, filters: &Filters) -> Result<Vec<WineRecord>, CatalogError> {
        Ok(self.retrieve_candidates(filters).await?.into_ordered())
    }

    pub async fn retrieve_candidates(&self, filters: &Filters) -> Result<Candidates, CatalogError> {
        let (price_floor, price_ceiling) = self.price_bounds(filters);

        let prioritized_query = CatalogQuery {
            any_of: content_predicate(filters),
            price_floor,
            price_ceiling,
            ..CatalogQuery::default()
        };
        let prioritized = self.catalog.find(&prioritized_query).await?;

        let widened = filters.widening_requested()
            || prioritized.len() < self.policy.min_results_before_widening;
        debug!(
            prioritized = prioritized.len(),
            widen_requested = filters.widening_requested(),
            widened,
            "prioritized catalog query complete"
        );

        if !widened {
            return Ok(Candidates {
                prioritized,
                fallback: Vec::new(),
                widened,
            });
        }

        let mut fallback_query = CatalogQuery {
            any_of: Vec::new(),
            price_floor,
            price_ceiling,
            exclude_ids: prioritized.iter().map(|wine| wine.id.clone()).collect(),
            limit: Some(self.policy.fallback_limit),
        };
        let mut fallback = self.catalog.find(&fallback_query).await?;
        // Stores are not trusted to honor the exclusion list.
        fallback.retain(|wine| fallback_query.exclude_ids.insert(wine.id.clone()));
        fallback.truncate(self.policy.fallback_limit);
        debug!(fallback = fallback.len(), "fallback catalog query complete");

        Ok(Candidates {
            prioritized,
            fallback,
            widened,
        })
    }

    /// Relaxes the floor by the policy margin; non-positive bounds count as absent.
    fn price_bounds(&self, filters: &Filters) -> (Option<f64>, Option<f64>) {
        let floor = filters
            .price_min
            .filter(|floor| *floor > 0.0)
            .map(|floor| (floor - self.policy.price_floor_margin).max(0.0));
        let ceiling = filters.price_max.filter(|ceiling| *ceiling > 0.0);
        (floor, ceiling)
    }
}

fn content_predicate(filters: &Filters) -> Vec<FieldMatch> {
    let groups = [
        (MatchField::Region, &filters.regions),
        (MatchField::Appellation, &filters.appellations),
        (MatchField::Estate, &filters.estates),
    ];

    groups
        .into_iter()
        .flat_map(|(field, terms)| {
            terms
                .iter()
                .map(|term| term.trim())
                .filter(|term| !term.is_empty())
                .map(move |term| FieldMatch::new(field, term))
        })
        .collect()
}
