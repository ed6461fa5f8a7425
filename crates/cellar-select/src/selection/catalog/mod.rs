mod import;
mod parser;

pub use import::{CatalogImportError, CatalogImporter};

use std::collections::BTreeSet;

use async_trait::async_trait;

use super::domain::{WineId, WineRecord};

/// Catalog column a substring predicate applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchField {
    Region,
    Appellation,
    Estate,
}

/// Case-insensitive substring match on one column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldMatch {
    pub field: MatchField,
    pub needle: String,
}

impl FieldMatch {
    pub fn new(field: MatchField, needle: impl Into<String>) -> Self {
        Self {
            field,
            needle: needle.into(),
        }
    }

    pub fn matches(&self, wine: &WineRecord) -> bool {
        let haystack = match self.field {
            MatchField::Region => &wine.region,
            MatchField::Appellation => &wine.appellation,
            MatchField::Estate => &wine.estate,
        };
        haystack
            .to_lowercase()
            .contains(&self.needle.trim().to_lowercase())
    }
}

/// Catalog lookup: an OR over `any_of` (empty matches everything), inclusive price bounds,
/// excluded ids and an optional row limit.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CatalogQuery {
    pub any_of: Vec<FieldMatch>,
    pub price_floor: Option<f64>,
    pub price_ceiling: Option<f64>,
    pub exclude_ids: BTreeSet<WineId>,
    pub limit: Option<usize>,
}

impl CatalogQuery {
    pub fn accepts(&self, wine: &WineRecord) -> bool {
        if self.exclude_ids.contains(&wine.id) {
            return false;
        }
        if self.price_floor.is_some_and(|floor| wine.price < floor) {
            return false;
        }
        if self.price_ceiling.is_some_and(|ceiling| wine.price > ceiling) {
            return false;
        }
        self.any_of.is_empty() || self.any_of.iter().any(|term| term.matches(wine))
    }
}

/// Read-only wine catalog. Results are returned in catalog order.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<WineRecord>, CatalogError>;
}

#[derive(Debug, thiserror::Error)]
pub enum CatalogError {
    #[error("catalog unavailable: {0}")]
    Unavailable(String),
    #[error("catalog query rejected: {0}")]
    Query(String),
}

/// Catalog held in memory, typically loaded once from a CSV export.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    wines: Vec<WineRecord>,
}

impl InMemoryCatalog {
    pub fn new(wines: Vec<WineRecord>) -> Self {
        Self { wines }
    }

    pub fn wines(&self) -> &[WineRecord] {
        &self.wines
    }

    pub fn len(&self) -> usize {
        self.wines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.wines.is_empty()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn find(&self, query: &CatalogQuery) -> Result<Vec<WineRecord>, CatalogError> {
        let matches = self.wines.iter().filter(|wine| query.accepts(wine)).cloned();
        Ok(match query.limit {
            Some(limit) => matches.take(limit).collect(),
            None => matches.collect(),
        })
    }
}
